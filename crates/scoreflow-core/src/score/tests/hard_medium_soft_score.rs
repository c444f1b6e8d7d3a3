use crate::score::{HardMediumSoftScore, ParseableScore, Score};

#[test]
fn test_comparison_order() {
    let a = HardMediumSoftScore::of(0, -1, 0);
    let b = HardMediumSoftScore::of(0, 0, -1000);

    assert!(b > a);
    assert!(HardMediumSoftScore::of(-1, 100, 100) < HardMediumSoftScore::of(0, -100, -100));
}

#[test]
fn test_feasibility() {
    assert!(HardMediumSoftScore::of(0, -5, -5).is_feasible());
    assert!(!HardMediumSoftScore::of(-1, 5, 5).is_feasible());
}

#[test]
fn test_arithmetic() {
    let a = HardMediumSoftScore::of(-1, -2, -3);
    let b = HardMediumSoftScore::of(1, 1, 1);

    assert_eq!(a + b, HardMediumSoftScore::of(0, -1, -2));
    assert_eq!(-a, HardMediumSoftScore::of(1, 2, 3));
}

#[test]
fn test_parse_roundtrip() {
    let score = HardMediumSoftScore::of(0, -3, -100);
    assert_eq!(score.to_string_repr(), "0hard/-3medium/-100soft");
    assert_eq!(
        HardMediumSoftScore::parse("0hard/-3medium/-100soft").unwrap(),
        score
    );
}
