use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Exact decimal monetary amount.
///
/// Balances may go negative (a reversal is not funds-checked), so the type is
/// signed; positivity of caller-supplied amounts is checked by [`Entry`](crate::Entry).
///
/// Rendered the same way everywhere: as a normalized decimal string
/// (`"12.5"`, never `"12.50"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Amount(value)
    }

    /// Build an amount from an integer mantissa and a decimal scale, e.g. `(1050, 2)` is `10.50`.
    pub fn from_scaled(mantissa: i64, scale: u32) -> Self {
        Amount(Decimal::new(mantissa, scale))
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str_exact(s.trim()).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl std::ops::Neg for Amount {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Amount(-self.0)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        Amount(iter.map(|a| a.0).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn from_scaled_preserves_value() {
        assert_eq!(Amount::from_scaled(1050, 2), Amount::new(dec!(10.50)));
        assert_eq!(Amount::from_scaled(1, 4), Amount::new(dec!(0.0001)));
    }

    #[test]
    fn parse_is_exact() {
        let a: Amount = "0.1".parse().unwrap();
        let b: Amount = "0.2".parse().unwrap();
        assert_eq!(a.checked_add(b).unwrap(), "0.3".parse().unwrap());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("ten".parse::<Amount>().is_err());
        assert!("".parse::<Amount>().is_err());
    }

    #[test]
    fn display_is_normalized() {
        assert_eq!(Amount::new(dec!(100.00)).to_string(), "100");
        assert_eq!(Amount::new(dec!(1.50)).to_string(), "1.5");
        assert_eq!(Amount::new(dec!(-30)).to_string(), "-30");
        assert_eq!(Amount::ZERO.to_string(), "0");
    }

    #[test]
    fn default_is_zero() {
        assert_eq!(Amount::default(), Amount::ZERO);
    }

    #[test]
    fn positivity() {
        assert!(Amount::new(dec!(0.01)).is_positive());
        assert!(!Amount::ZERO.is_positive());
        assert!(!Amount::new(dec!(-1)).is_positive());
    }

    #[test]
    fn checked_sub_can_go_negative() {
        let balance = Amount::new(dec!(70));
        assert_eq!(
            balance.checked_sub(Amount::new(dec!(100))),
            Some(Amount::new(dec!(-30)))
        );
    }

    #[test]
    fn checked_add_overflow() {
        assert_eq!(Amount::new(Decimal::MAX).checked_add(Amount::new(dec!(1))), None);
    }

    #[test]
    fn sum_and_neg() {
        let total: Amount = [dec!(100), dec!(-30), dec!(-100)]
            .into_iter()
            .map(Amount::new)
            .sum();
        assert_eq!(total, Amount::new(dec!(-30)));
        assert_eq!(-Amount::new(dec!(5)), Amount::new(dec!(-5)));
    }

    #[test]
    fn serde_uses_strings() {
        let json = serde_json::to_string(&Amount::new(dec!(12.34))).unwrap();
        assert_eq!(json, "\"12.34\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Amount::new(dec!(12.34)));
    }

    #[test]
    fn serde_matches_display() {
        let amount = Amount::new(dec!(12.50));
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, format!("\"{amount}\""));
        assert_eq!(json, "\"12.5\"");
    }
}
