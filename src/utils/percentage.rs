use std::{fmt::Display, ops::Deref, str::FromStr};

use anyhow::anyhow;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}%", self.0)
    }
}

impl Percentage {
    pub const ZERO: Percentage = Percentage(0.);

    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. || value.is_nan() {
            None
        } else {
            Some(Percentage(value))
        }
    }
}

impl FromStr for Percentage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_end_matches("%");
        let v = s.parse::<f64>()?;
        Percentage::new_opt(v).ok_or_else(|| anyhow!("Can't parse {s} into percentage"))
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Share of `part` in `whole`. Empty `whole` yields `None`.
pub fn ratio_percentage(part: u32, whole: u32) -> Option<Percentage> {
    if whole == 0 {
        return None;
    }
    Percentage::new_opt(part as f64 / whole as f64 * 100.)
}

#[cfg(test)]
mod tests {
    use super::{ratio_percentage, Percentage};

    #[test]
    fn test_ratio_percentage() {
        assert_eq!(*ratio_percentage(1, 4).unwrap(), 25.);
        assert_eq!(ratio_percentage(3, 0), None);
        assert_eq!(ratio_percentage(2, 3).unwrap().to_string(), "67%");
    }

    #[test]
    fn test_parse_percentage() {
        assert_eq!(*"50%".parse::<Percentage>().unwrap(), 50.);
        assert!("-1".parse::<Percentage>().is_err());
        assert_eq!("0%".parse::<Percentage>().unwrap(), Percentage::ZERO);
        assert_eq!(Percentage::ZERO.to_string(), "0%");
    }
}
