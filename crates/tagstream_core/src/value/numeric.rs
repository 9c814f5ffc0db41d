use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// An integer stored as an `i64` while it fits and as a [`BigInt`] otherwise.
///
/// Equality is numeric, so `Small(5)` equals `Big(5)`.
#[derive(Debug, Clone)]
pub enum HybridInt {
    Small(i64),
    Big(BigInt),
}

impl HybridInt {
    /// Picks the small form whenever the value fits.
    pub fn normalized(value: BigInt) -> Self {
        match value.to_i64() {
            Some(small) => Self::Small(small),
            None => Self::Big(value),
        }
    }

    pub fn to_bigint(&self) -> BigInt {
        match self {
            Self::Small(v) => BigInt::from(*v),
            Self::Big(v) => v.clone(),
        }
    }
}

impl PartialEq for HybridInt {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Small(a), Self::Small(b)) => a == b,
            _ => self.to_bigint() == other.to_bigint(),
        }
    }
}

impl From<i64> for HybridInt {
    fn from(v: i64) -> Self {
        Self::Small(v)
    }
}

impl From<BigInt> for HybridInt {
    fn from(v: BigInt) -> Self {
        Self::normalized(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_equality() {
        assert_eq!(HybridInt::Small(5), HybridInt::Big(BigInt::from(5)));
        assert_ne!(HybridInt::Small(5), HybridInt::Small(6));
    }

    #[test]
    fn test_normalized() {
        let big = BigInt::from(i64::MAX) + 1i64;
        assert!(matches!(HybridInt::from(big.clone()), HybridInt::Big(b) if b == big));
        assert!(matches!(
            HybridInt::from(BigInt::from(-7)),
            HybridInt::Small(-7)
        ));
    }
}
