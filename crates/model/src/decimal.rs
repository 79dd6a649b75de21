use std::{
    fmt::{Debug, Display},
    iter::Sum,
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const DECIMALS: u8 = 4;
const SCALE: i64 = 10i64.pow(DECIMALS as u32);

/// Fixed-point number with four fractional digits.
///
/// Stored as a scaled integer so that adding and subtracting the same
/// amount always lands on exact zero.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal(i64);

impl Decimal {
    pub fn int(value: i64) -> Decimal {
        Decimal(value * SCALE)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn zero() -> Decimal {
        Decimal(0)
    }

    pub fn inner(&self) -> i64 {
        self.0
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    pub fn checked_add(self, other: Decimal) -> Option<Decimal> {
        self.0.checked_add(other.0).map(Decimal)
    }

    pub fn checked_sub(self, other: Decimal) -> Option<Decimal> {
        self.0.checked_sub(other.0).map(Decimal)
    }
}

impl Debug for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let int = abs / SCALE as u64;
        let frac = abs % SCALE as u64;
        if frac == 0 {
            return write!(f, "{}{}", sign, int);
        }
        let frac = format!("{:0width$}", frac, width = DECIMALS as usize);
        write!(f, "{}{}.{}", sign, int, frac.trim_end_matches('0'))
    }
}

impl From<f64> for Decimal {
    fn from(value: f64) -> Self {
        Decimal((value * SCALE as f64).round() as i64)
    }
}

impl TryFrom<&str> for Decimal {
    type Error = ParseDecimalError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let val = value.trim().parse::<f64>().map_err(|_| ParseDecimalError)?;
        if !val.is_finite() {
            return Err(ParseDecimalError);
        }
        Ok(Decimal::from(val))
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::try_from(s)
    }
}

impl From<u32> for Decimal {
    fn from(value: u32) -> Self {
        Decimal::int(value as i64)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, other: Decimal) {
        self.0 += other.0;
    }
}

impl std::ops::SubAssign for Decimal {
    fn sub_assign(&mut self, other: Decimal) {
        self.0 -= other.0;
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, other: Decimal) -> Decimal {
        Decimal(self.0 + other.0)
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, other: Decimal) -> Decimal {
        Decimal(self.0 - other.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::zero(), |acc, x| acc + x)
    }
}

#[derive(Debug)]
pub struct ParseDecimalError;

impl std::fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse decimal value")
    }
}

impl std::error::Error for ParseDecimalError {}

impl Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        Ok(Decimal(value))
    }
}

/// Serde adapter for JSON payloads, where hours travel as plain numbers.
///
/// Incoming numbers are rounded to the nearest 1/10000 of an hour; values
/// beyond the `i64` range saturate.
pub mod as_f64 {
    use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

    use super::Decimal;

    pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(D::Error::custom("hours must be a finite number"));
        }
        Ok(Decimal::from(value))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!("12", format!("{}", Decimal::int(12)));
        assert_eq!("-12", format!("{}", Decimal::int(-12)));
        assert_eq!("0", format!("{}", Decimal::zero()));
        assert_eq!("1.5", format!("{}", Decimal::from(1.5)));
        assert_eq!("0.8333", format!("{}", Decimal::from(0.83333)));
        assert_eq!("-0.25", format!("{}", Decimal::from(-0.25)));
    }

    #[test]
    fn test_from_f64_rounds() {
        assert_eq!(Decimal::from(0.29).inner(), 2900);
        assert_eq!(Decimal::from(0.00004).inner(), 0);
        assert_eq!(Decimal::from(0.00005).inner(), 1);
        assert_eq!(Decimal::from(2.5).inner(), 25000);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Decimal::try_from("3.5").unwrap(), Decimal::from(3.5));
        assert_eq!(Decimal::try_from(" 2 ").unwrap(), Decimal::int(2));
        assert!(Decimal::try_from("abc").is_err());
        assert!(Decimal::try_from("inf").is_err());
    }

    #[test]
    fn test_add_sub_reaches_exact_zero() {
        let mut total = Decimal::zero();
        for _ in 0..10 {
            total += Decimal::from(0.1);
        }
        assert_eq!(total, Decimal::int(1));
        for _ in 0..10 {
            total -= Decimal::from(0.1);
        }
        assert!(total.is_zero());
    }

    #[test]
    fn test_sum() {
        let total: Decimal = [1.5, 2.25, 0.25].into_iter().map(Decimal::from).sum();
        assert_eq!(total, Decimal::int(4));
    }

    #[test]
    fn test_json_hours() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "as_f64")]
            hours: Decimal,
        }
        let parsed: Wrapper = serde_json::from_str(r#"{"hours":1.5}"#).unwrap();
        assert_eq!(parsed.hours, Decimal::from(1.5));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), r#"{"hours":1.5}"#);
    }
}
