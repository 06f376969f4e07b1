//! Numeric helpers shared by the scanner and the grouper.

/// Rounds to the nearest integer, ties to even (`100.5 -> 100`,
/// `101.5 -> 102`), the rounding used for window sizes and rectangle
/// coordinates by the reference cascade runtime.
pub fn round_half_even(v: f64) -> f64 {
    let r = v.round();
    if (v - v.trunc()).abs() == 0.5 && r % 2.0 != 0.0 {
        r - v.signum()
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(100.5, 100.0)]
    #[case(101.5, 102.0)]
    #[case(0.5, 0.0)]
    #[case(-0.5, 0.0)]
    #[case(-1.5, -2.0)]
    #[case(-2.5, -2.0)]
    #[case(2.4999, 2.0)]
    #[case(2.5001, 3.0)]
    #[case(7.0, 7.0)]
    fn test_round_half_even(#[case] v: f64, #[case] expected: f64) {
        assert_eq!(round_half_even(v), expected);
    }
}
