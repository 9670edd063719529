use serde::Serialize;

use crate::congruence::residue;

/// Which unbounded end of the integers a residue query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Values above the threshold.
    Above,
    /// Values below the negated threshold.
    Below,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Above => f.write_str("above"),
            Side::Below => f.write_str("below"),
        }
    }
}

/// Label of a value under a [`ResidueProfile`]. Equal keys imply
/// interchangeable values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKey {
    Exact(i64),
    Above(i64),
    Below(i64),
}

/// Shape of a decomposition found by the Presburger procedure: values
/// beyond `±threshold` are interchangeable within each residue class
/// modulo `modulus`, on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResidueProfile {
    pub modulus: i64,
    pub threshold: i64,
}

impl ResidueProfile {
    pub fn class_key(&self, value: i64) -> ClassKey {
        if value > self.threshold {
            ClassKey::Above(residue(value, self.modulus))
        } else if value < -self.threshold {
            ClassKey::Below(residue(value, self.modulus))
        } else {
            ClassKey::Exact(value)
        }
    }

    /// Number of distinct keys, an upper bound on the number of classes.
    pub fn key_count(&self) -> u128 {
        let exact = 2 * self.threshold as u128 + 1;
        exact + 2 * self.modulus as u128
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_split_at_the_threshold() {
        let profile = ResidueProfile {
            modulus: 3,
            threshold: 2,
        };
        assert_eq!(profile.class_key(2), ClassKey::Exact(2));
        assert_eq!(profile.class_key(-2), ClassKey::Exact(-2));
        assert_eq!(profile.class_key(3), ClassKey::Above(0));
        assert_eq!(profile.class_key(7), ClassKey::Above(1));
        assert_eq!(profile.class_key(-3), ClassKey::Below(0));
        assert_eq!(profile.class_key(-4), ClassKey::Below(2));
        assert_eq!(profile.key_count(), 11);
    }

    #[test]
    fn zero_threshold_keeps_zero_exact() {
        let profile = ResidueProfile {
            modulus: 1,
            threshold: 0,
        };
        assert_eq!(profile.class_key(0), ClassKey::Exact(0));
        assert_eq!(profile.class_key(i64::MAX), ClassKey::Above(0));
        assert_eq!(profile.class_key(i64::MIN), ClassKey::Below(0));
    }
}
