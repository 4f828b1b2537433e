//! Dice rolling behaviour across many seeds.
//!
//! Run with: `cargo test -p tabletop-core --test dice_rolls`

use tabletop_core::dice::ability_modifier;
use tabletop_core::{DiceError, DiceExpression, DiceRoller};

#[test]
fn test_rolls_stay_in_range() {
    for seed in 0..50 {
        let mut roller = DiceRoller::seeded(seed);
        let result = roller.roll("d8", 4, -2).unwrap();

        assert_eq!(result.rolls().len(), 4);
        assert!(result.rolls().iter().all(|r| (1..=8).contains(r)));
        let sum: i32 = result.rolls().iter().map(|&r| r as i32).sum();
        assert_eq!(result.total(), sum - 2);
    }
}

#[test]
fn test_expression_found_inside_text() {
    let mut roller = DiceRoller::seeded(11);
    let result = roller.parse_expression("attack for 2d6+3 slashing").unwrap();
    assert_eq!(result.rolls().len(), 2);
    assert_eq!(result.modifier(), 3);

    let expr: DiceExpression = "roll 1D20-1 now".parse().unwrap();
    assert_eq!(expr, DiceExpression::new(1, 20, -1));
    assert_eq!(expr.to_string(), "1d20-1");
}

#[test]
fn test_bad_input() {
    let mut roller = DiceRoller::seeded(0);
    assert!(matches!(
        roller.parse_expression("no dice here"),
        Err(DiceError::InvalidExpression(_))
    ));
    assert!(roller.roll("dx", 1, 0).is_err());
    assert!(roller.roll("d0", 1, 0).is_err());
}

#[test]
fn test_zero_count_is_just_modifier() {
    let mut roller = DiceRoller::seeded(0);
    let result = roller.roll("d6", 0, 4).unwrap();
    assert!(result.rolls().is_empty());
    assert_eq!(result.total(), 4);
}

#[test]
fn test_attribute_check_uses_modifier() {
    for seed in 0..20 {
        let mut roller = DiceRoller::seeded(seed);
        let result = roller.roll_attribute(8);
        assert_eq!(result.modifier(), ability_modifier(8));
        assert_eq!(result.modifier(), -1);
        assert_eq!(result.total(), result.rolls()[0] as i32 - 1);
    }
}
