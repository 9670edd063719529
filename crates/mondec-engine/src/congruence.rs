use crate::error::MondecError;

/// Whether `m` divides `a - b`.
///
/// Computed in `i128`, so it holds for every pair of `i64`s.
pub fn congruent(a: i64, b: i64, m: i64) -> Result<bool, MondecError> {
    if m <= 0 {
        return Err(MondecError::InvalidArgument(format!(
            "modulus must be positive, got {m}"
        )));
    }
    let diff = i128::from(a) - i128::from(b);
    Ok(diff.rem_euclid(i128::from(m)) == 0)
}

/// Least non-negative residue of `a` modulo `m` (`m > 0`).
pub(crate) fn residue(a: i64, m: i64) -> i64 {
    a.rem_euclid(m)
}

pub(crate) fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    // gcd of two i64 magnitudes only exceeds i64::MAX for gcd(MIN, MIN)/gcd(MIN, 0)
    i64::try_from(a).unwrap_or(i64::MAX)
}

/// Least common multiple of two positive integers, `None` on overflow.
pub(crate) fn lcm(a: i64, b: i64) -> Option<i64> {
    if a <= 0 || b <= 0 {
        return None;
    }
    (a / gcd(a, b)).checked_mul(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn congruent_basic() {
        assert!(congruent(7, 1, 3).unwrap());
        assert!(!congruent(7, 2, 3).unwrap());
        assert!(congruent(-1, 1, 2).unwrap());
        assert!(congruent(5, 5, 1).unwrap());
    }

    #[test]
    fn congruent_rejects_non_positive_modulus() {
        assert!(matches!(
            congruent(1, 1, 0),
            Err(MondecError::InvalidArgument(_))
        ));
        assert!(matches!(
            congruent(1, 1, -4),
            Err(MondecError::InvalidArgument(_))
        ));
    }

    #[test]
    fn congruent_extreme_values_do_not_overflow() {
        assert!(congruent(i64::MAX, i64::MIN, 1).unwrap());
        // MAX - MIN = 2^64 - 1, which is odd
        assert!(!congruent(i64::MAX, i64::MIN, 2).unwrap());
    }

    #[test]
    fn lcm_and_gcd() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(-4, 6), 2);
        assert_eq!(lcm(4, 6), Some(12));
        assert_eq!(lcm(1, 7), Some(7));
        assert_eq!(lcm(i64::MAX, i64::MAX - 1), None);
        assert_eq!(lcm(0, 3), None);
    }

    #[test]
    fn residue_is_non_negative() {
        assert_eq!(residue(-7, 3), 2);
        assert_eq!(residue(7, 3), 1);
    }

    proptest! {
        #[test]
        fn congruence_is_symmetric(a in any::<i64>(), b in any::<i64>(), m in 1i64..1000) {
            prop_assert_eq!(congruent(a, b, m).unwrap(), congruent(b, a, m).unwrap());
        }

        #[test]
        fn congruence_is_reflexive(a in any::<i64>(), m in 1i64..i64::MAX) {
            prop_assert!(congruent(a, a, m).unwrap());
        }

        #[test]
        fn congruence_survives_shift(
            a in -1_000_000i64..1_000_000,
            b in -1_000_000i64..1_000_000,
            m in 1i64..1000,
        ) {
            if congruent(a, b, m).unwrap() {
                prop_assert!(congruent(a + m, b, m).unwrap());
            }
        }

        #[test]
        fn lcm_is_a_common_multiple(a in 1i64..10_000, b in 1i64..10_000) {
            let l = lcm(a, b).unwrap();
            prop_assert_eq!(l % a, 0);
            prop_assert_eq!(l % b, 0);
            prop_assert!(l <= a * b);
        }
    }
}
