//! Dice rolling system.
//!
//! Supports single-term dice notation (`XdY+Z`, e.g. `2d6+3`, `1D20-1`, `4d8`),
//! typed rolls such as `d20`, and ability-check rolls. All randomness flows
//! through a [`DiceRoller`], which owns an injected [`Rng`] so tests can seed it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing and rolling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Invalid dice type: {0:?}")]
    InvalidDiceType(String),
    #[error("Invalid dice expression {0:?}. Please use format like \"2d6+3\".")]
    InvalidExpression(String),
    #[error("Invalid die size: {0}")]
    InvalidSides(u32),
    #[error("Too many dice: {0} (at most {MAX_DICE})")]
    TooManyDice(u32),
    #[error("Modifier out of range: {0} (at most {MAX_MODIFIER} either way)")]
    ModifierOutOfRange(i64),
}

/// Most dice a single roll may throw.
pub const MAX_DICE: u32 = 1_000;

/// Largest die size accepted.
pub const MAX_SIDES: u32 = 1_000_000;

/// Largest flat modifier accepted, in either direction.
///
/// With the dice limits this keeps every total well inside `i32`.
pub const MAX_MODIFIER: i32 = 1_000_000;

lazy_static::lazy_static! {
    /// `<count>d<sides>[(+|-)<modifier>]`, searched anywhere in the input.
    static ref DICE_PATTERN: Regex =
        Regex::new(r"(\d+)[dD](\d+)(?:([-+])(\d+))?").expect("dice pattern is valid");
}

/// Standard ability modifier: `floor((score - 10) / 2)`.
///
/// Uses Euclidean division so odd scores below 10 round down (7 => -2).
pub fn ability_modifier(score: i32) -> i32 {
    let modifier = (i64::from(score) - 10).div_euclid(2);
    // |modifier| <= 2^30 + 5 for any i32 score.
    modifier as i32
}

/// Parse a die type like `"d20"` into its side count.
pub fn parse_dice_type(dice_type: &str) -> Result<u32, DiceError> {
    let trimmed = dice_type.trim();
    let sides = trimmed
        .strip_prefix('d')
        .or_else(|| trimmed.strip_prefix('D'))
        .and_then(|n| n.parse::<u32>().ok())
        .ok_or_else(|| DiceError::InvalidDiceType(dice_type.to_string()))?;

    if sides == 0 || sides > MAX_SIDES {
        return Err(DiceError::InvalidDiceType(dice_type.to_string()));
    }
    Ok(sides)
}

/// A parsed dice expression (e.g., 2d6+3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiceExpression {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DiceExpression {
    pub fn new(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            modifier,
        }
    }

    /// Parse the first dice term found in `text`.
    ///
    /// Surrounding text is ignored, so `"attack: 1d20+5"` parses the same as
    /// `"1d20+5"`. Only the first term is used.
    pub fn parse(text: &str) -> Result<Self, DiceError> {
        let invalid = || DiceError::InvalidExpression(text.to_string());
        let caps = DICE_PATTERN.captures(text).ok_or_else(invalid)?;

        let count: u32 = caps[1]
            .parse()
            .map_err(|_| DiceError::TooManyDice(u32::MAX))?;
        let sides: u32 = caps[2]
            .parse()
            .map_err(|_| DiceError::InvalidSides(u32::MAX))?;

        let modifier = match (caps.get(3), caps.get(4)) {
            (Some(sign), Some(value)) => {
                let magnitude: i64 = value
                    .as_str()
                    .parse()
                    .map_err(|_| DiceError::ModifierOutOfRange(i64::MAX))?;
                let signed = if sign.as_str() == "-" {
                    -magnitude
                } else {
                    magnitude
                };
                i32::try_from(signed).map_err(|_| DiceError::ModifierOutOfRange(signed))?
            }
            _ => 0,
        };

        let expr = Self::new(count, sides, modifier);
        expr.validate()?;
        Ok(expr)
    }

    /// Check the expression against [`MAX_DICE`], [`MAX_SIDES`] and [`MAX_MODIFIER`].
    pub fn validate(&self) -> Result<(), DiceError> {
        if self.sides == 0 || self.sides > MAX_SIDES {
            return Err(DiceError::InvalidSides(self.sides));
        }
        if self.count > MAX_DICE {
            return Err(DiceError::TooManyDice(self.count));
        }
        if self.modifier.unsigned_abs() > MAX_MODIFIER.unsigned_abs() {
            return Err(DiceError::ModifierOutOfRange(i64::from(self.modifier)));
        }
        Ok(())
    }

    /// Roll the expression with a specific RNG.
    pub fn roll_with_rng<R: Rng>(&self, rng: &mut R) -> Result<DiceResult, DiceError> {
        self.validate()?;
        let rolls = roll_dice_with_rng(rng, self.count, self.sides)?;
        Ok(DiceResult::new(rolls, self.modifier))
    }
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}

/// Roll `count` dice with `sides` faces each.
fn roll_dice_with_rng<R: Rng>(
    rng: &mut R,
    count: u32,
    sides: u32,
) -> Result<Vec<u32>, DiceError> {
    if sides == 0 || sides > MAX_SIDES {
        return Err(DiceError::InvalidSides(sides));
    }
    if count > MAX_DICE {
        return Err(DiceError::TooManyDice(count));
    }
    Ok((0..count).map(|_| rng.gen_range(1..=sides)).collect())
}

/// Result of a dice roll: the individual dice, the flat modifier, and the total.
///
/// The total is computed on construction and equals the sum of the rolls plus
/// the modifier. Results built by [`DiceRoller`] stay within the dice limits,
/// so the total is exact; hand-built results saturate at the `i32` bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiceResult {
    rolls: Vec<u32>,
    modifier: i32,
    total: i32,
}

impl DiceResult {
    pub fn new(rolls: Vec<u32>, modifier: i32) -> Self {
        let dice_total: i64 = rolls.iter().map(|&r| i64::from(r)).sum();
        let total = (dice_total + i64::from(modifier)).clamp(i64::from(i32::MIN), i64::from(i32::MAX));
        Self {
            total: total as i32,
            rolls,
            modifier,
        }
    }

    pub fn rolls(&self) -> &[u32] {
        &self.rolls
    }

    pub fn modifier(&self) -> i32 {
        self.modifier
    }

    pub fn total(&self) -> i32 {
        self.total
    }
}

impl fmt::Display for DiceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rolls = self
            .rolls
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} ({rolls}", self.total)?;
        if self.modifier > 0 {
            write!(f, " +{}", self.modifier)?;
        } else if self.modifier < 0 {
            write!(f, " {}", self.modifier)?;
        }
        write!(f, ")")
    }
}

/// Produces dice rolls from an owned randomness source.
#[derive(Debug, Clone)]
pub struct DiceRoller<R = StdRng> {
    rng: R,
}

impl DiceRoller<StdRng> {
    /// A roller seeded from operating-system entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// A deterministic roller, useful for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl Default for DiceRoller<StdRng> {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl<R: Rng> DiceRoller<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Direct access to the randomness source.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Roll `count` independent dice, each uniform in `[1, sides]`.
    pub fn roll_dice(&mut self, count: u32, sides: u32) -> Result<Vec<u32>, DiceError> {
        roll_dice_with_rng(&mut self.rng, count, sides)
    }

    /// Roll a single d20.
    pub fn d20(&mut self) -> u32 {
        self.rng.gen_range(1..=20)
    }

    /// Roll `count` dice of `dice_type` (e.g. `"d6"`) and add `modifier`.
    pub fn roll(
        &mut self,
        dice_type: &str,
        count: u32,
        modifier: i32,
    ) -> Result<DiceResult, DiceError> {
        let sides = parse_dice_type(dice_type)?;
        DiceExpression::new(count, sides, modifier).roll_with_rng(&mut self.rng)
    }

    /// Parse free-text notation like `"2d6+3"` and roll it.
    pub fn parse_expression(&mut self, text: &str) -> Result<DiceResult, DiceError> {
        let expr = DiceExpression::parse(text)?;
        let sides = format!("d{}", expr.sides);
        self.roll(&sides, expr.count, expr.modifier)
    }

    /// Roll a d20 ability check for the given ability score.
    pub fn roll_attribute(&mut self, score: i32) -> DiceResult {
        let roll = self.d20();
        DiceResult::new(vec![roll], ability_modifier(score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_modifier() {
        let expr = DiceExpression::parse("2d6+3").unwrap();
        assert_eq!(expr, DiceExpression::new(2, 6, 3));

        let expr = DiceExpression::parse("1d20-5").unwrap();
        assert_eq!(expr.modifier, -5);

        let expr = DiceExpression::parse("4d8").unwrap();
        assert_eq!(expr.modifier, 0);
    }

    #[test]
    fn test_parse_uppercase_and_surrounding_text() {
        let expr = DiceExpression::parse("1D20-1").unwrap();
        assert_eq!(expr, DiceExpression::new(1, 20, -1));

        let expr = DiceExpression::parse("sword: 1d8+2 slashing").unwrap();
        assert_eq!(expr, DiceExpression::new(1, 8, 2));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            DiceExpression::parse("not dice"),
            Err(DiceError::InvalidExpression(_))
        ));
        assert!(matches!(
            DiceExpression::parse("d20"),
            Err(DiceError::InvalidExpression(_))
        ));
        assert_eq!(
            DiceExpression::parse("3d0"),
            Err(DiceError::InvalidSides(0))
        );
    }

    #[test]
    fn test_expression_display() {
        assert_eq!(DiceExpression::new(2, 6, 3).to_string(), "2d6+3");
        assert_eq!(DiceExpression::new(1, 20, -1).to_string(), "1d20-1");
        assert_eq!(DiceExpression::new(4, 8, 0).to_string(), "4d8");
        assert_eq!("3d6+2".parse::<DiceExpression>().unwrap().count, 3);
    }

    #[test]
    fn test_parse_dice_type() {
        assert_eq!(parse_dice_type("d20"), Ok(20));
        assert_eq!(parse_dice_type("D6"), Ok(6));
        assert!(matches!(
            parse_dice_type("dx"),
            Err(DiceError::InvalidDiceType(_))
        ));
        assert!(matches!(
            parse_dice_type("20"),
            Err(DiceError::InvalidDiceType(_))
        ));
        assert!(matches!(
            parse_dice_type("d0"),
            Err(DiceError::InvalidDiceType(_))
        ));
    }

    #[test]
    fn test_roll_dice_range() {
        let mut roller = DiceRoller::seeded(7);
        for sides in [1, 4, 6, 20, 100] {
            for count in 0..8 {
                let rolls = roller.roll_dice(count, sides).unwrap();
                assert_eq!(rolls.len(), count as usize);
                assert!(rolls.iter().all(|&r| (1..=sides).contains(&r)));
            }
        }
    }

    #[test]
    fn test_roll_dice_zero_sides() {
        let mut roller = DiceRoller::seeded(1);
        assert_eq!(roller.roll_dice(2, 0), Err(DiceError::InvalidSides(0)));
    }

    #[test]
    fn test_result_total_includes_modifier() {
        assert_eq!(DiceResult::new(vec![3, 4], 2).total(), 9);
        assert_eq!(DiceResult::new(vec![1], -5).total(), -4);
        assert_eq!(DiceResult::new(vec![], 3).total(), 3);
    }

    #[test]
    fn test_result_display() {
        assert_eq!(DiceResult::new(vec![4, 4], 3).to_string(), "11 (4, 4 +3)");
        assert_eq!(DiceResult::new(vec![12], -1).to_string(), "11 (12 -1)");
        assert_eq!(DiceResult::new(vec![2, 5, 1], 0).to_string(), "8 (2, 5, 1)");
    }

    #[test]
    fn test_roll_typed() {
        let mut roller = DiceRoller::seeded(42);
        for _ in 0..100 {
            let result = roller.roll("d20", 1, 5).unwrap();
            assert!(result.total() >= 6 && result.total() <= 25);
            assert_eq!(result.modifier(), 5);
        }
        assert!(matches!(
            roller.roll("dice", 1, 0),
            Err(DiceError::InvalidDiceType(_))
        ));
    }

    #[test]
    fn test_parse_expression_rolls() {
        let mut roller = DiceRoller::seeded(3);
        let result = roller.parse_expression("2d6+3").unwrap();
        assert_eq!(result.rolls().len(), 2);
        assert_eq!(result.modifier(), 3);
        assert_eq!(
            result.total(),
            result.rolls().iter().sum::<u32>() as i32 + 3
        );

        assert!(matches!(
            roller.parse_expression("not dice"),
            Err(DiceError::InvalidExpression(_))
        ));
    }

    #[test]
    fn test_ability_modifier() {
        assert_eq!(ability_modifier(10), 0);
        assert_eq!(ability_modifier(11), 0);
        assert_eq!(ability_modifier(8), -1);
        assert_eq!(ability_modifier(7), -2);
        assert_eq!(ability_modifier(19), 4);
        assert_eq!(ability_modifier(1), -5);
    }

    #[test]
    fn test_ability_modifier_extreme_scores() {
        assert_eq!(ability_modifier(i32::MIN), -1_073_741_829);
        assert_eq!(ability_modifier(i32::MAX), 1_073_741_818);
    }

    #[test]
    fn test_huge_dice_rejected() {
        let mut roller = DiceRoller::seeded(5);
        assert_eq!(
            roller.parse_expression("1d4294967295"),
            Err(DiceError::InvalidSides(4_294_967_295))
        );
        assert_eq!(
            roller.parse_expression("1d99999999999"),
            Err(DiceError::InvalidSides(u32::MAX))
        );
        assert_eq!(
            roller.parse_expression("4294967295d6"),
            Err(DiceError::TooManyDice(4_294_967_295))
        );
        assert_eq!(
            roller.roll("d6", MAX_DICE + 1, 0),
            Err(DiceError::TooManyDice(MAX_DICE + 1))
        );
        assert_eq!(
            roller.roll_dice(u32::MAX, 6),
            Err(DiceError::TooManyDice(u32::MAX))
        );
        assert!(matches!(
            roller.roll("d4294967295", 1, 0),
            Err(DiceError::InvalidDiceType(_))
        ));
    }

    #[test]
    fn test_huge_modifier_rejected() {
        let mut roller = DiceRoller::seeded(5);
        assert_eq!(
            roller.parse_expression("1d20+2147483647"),
            Err(DiceError::ModifierOutOfRange(2_147_483_647))
        );
        assert_eq!(
            roller.parse_expression("1d20-2147483648"),
            Err(DiceError::ModifierOutOfRange(-2_147_483_648))
        );
        assert_eq!(
            roller.roll("d20", 1, i32::MIN),
            Err(DiceError::ModifierOutOfRange(i64::from(i32::MIN)))
        );
    }

    #[test]
    fn test_totals_exact_at_limits() {
        let mut roller = DiceRoller::seeded(8);
        for modifier in [MAX_MODIFIER, -MAX_MODIFIER] {
            let result = roller.roll(&format!("d{MAX_SIDES}"), MAX_DICE, modifier).unwrap();
            let sum: i64 = result.rolls().iter().map(|&r| i64::from(r)).sum();
            assert_eq!(i64::from(result.total()), sum + i64::from(modifier));
        }
    }

    #[test]
    fn test_hand_built_result_saturates() {
        assert_eq!(DiceResult::new(vec![u32::MAX], i32::MAX).total(), i32::MAX);
        assert_eq!(DiceResult::new(vec![], i32::MIN).total(), i32::MIN);
    }

    #[test]
    fn test_roll_attribute() {
        let mut roller = DiceRoller::seeded(11);
        for (score, modifier) in [(10, 0), (8, -1), (19, 4)] {
            let result = roller.roll_attribute(score);
            assert_eq!(result.modifier(), modifier);
            assert_eq!(result.rolls().len(), 1);
            assert!((1..=20).contains(&result.rolls()[0]));
        }
    }

    #[test]
    fn test_seeded_rollers_agree() {
        let mut a = DiceRoller::seeded(99);
        let mut b = DiceRoller::seeded(99);
        assert_eq!(
            a.parse_expression("4d6").unwrap(),
            b.parse_expression("4d6").unwrap()
        );
    }
}
