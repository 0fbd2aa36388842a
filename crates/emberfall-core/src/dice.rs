//! Dice notation parsing and resolution.
//!
//! Supported notation:
//! - `NdM` and `NdM+K` for plain rolls (`^\d+d\d+(\+\d+)?$`)
//! - `2d20kh1±K` / `2d20kl1±K` for advantage and disadvantage
//!
//! Every roll draws from an injected [`DeterministicRng`]. Combat code that
//! needs a specific natural d20 uses [`RollOverrides`], a per-encounter value
//! rather than process-wide state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rng::DeterministicRng;

/// Error when parsing dice notation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    /// The notation does not match any supported grammar.
    #[error("malformed dice notation: {0}")]
    MalformedNotation(String),
}

/// Which die to keep when rolling with advantage or disadvantage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Keep {
    /// Keep the highest die (advantage).
    Highest,
    /// Keep the lowest die (disadvantage).
    Lowest,
}

/// A parsed dice expression such as `2d6+3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceExpression {
    /// Number of dice rolled.
    pub count: u32,
    /// Faces per die.
    pub sides: u32,
    /// Keep-one rule for advantage/disadvantage rolls.
    pub keep: Option<Keep>,
    /// Flat modifier added once to the result.
    pub modifier: i32,
}

impl DiceExpression {
    /// Builds a plain `NdM+K` expression.
    #[must_use]
    pub const fn plain(count: u32, sides: u32, modifier: i32) -> Self {
        Self {
            count,
            sides,
            keep: None,
            modifier,
        }
    }

    /// Parses dice notation.
    ///
    /// # Errors
    ///
    /// Returns `DiceError::MalformedNotation` if the input does not match the
    /// plain or keep-one grammar.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let malformed = || DiceError::MalformedNotation(notation.to_owned());

        let (count_str, rest) = notation.split_once('d').ok_or_else(malformed)?;
        let count = parse_digits(count_str).ok_or_else(malformed)?;

        let sides_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let sides = parse_digits(&rest[..sides_len]).ok_or_else(malformed)?;
        let mut tail = &rest[sides_len..];

        if count == 0 || sides == 0 {
            return Err(malformed());
        }

        let keep = if let Some(after) = tail.strip_prefix("kh1") {
            tail = after;
            Some(Keep::Highest)
        } else if let Some(after) = tail.strip_prefix("kl1") {
            tail = after;
            Some(Keep::Lowest)
        } else {
            None
        };

        let modifier = match keep {
            Some(_) => {
                if count != 2 || sides != 20 {
                    return Err(malformed());
                }
                // Keep-one rolls always carry an explicit signed modifier.
                let (negative, digits) = if let Some(d) = tail.strip_prefix('+') {
                    (false, d)
                } else if let Some(d) = tail.strip_prefix('-') {
                    (true, d)
                } else {
                    return Err(malformed());
                };
                let magnitude = parse_signed_magnitude(digits).ok_or_else(malformed)?;
                if negative { -magnitude } else { magnitude }
            }
            None => {
                if tail.is_empty() {
                    0
                } else {
                    let digits = tail.strip_prefix('+').ok_or_else(malformed)?;
                    parse_signed_magnitude(digits).ok_or_else(malformed)?
                }
            }
        };

        Ok(Self {
            count,
            sides,
            keep,
            modifier,
        })
    }

    /// Smallest possible result.
    #[must_use]
    pub fn min(&self) -> i32 {
        match self.keep {
            Some(_) => self.modifier.saturating_add(1),
            None => to_i32(self.count).saturating_add(self.modifier),
        }
    }

    /// Largest possible result.
    #[must_use]
    pub fn max(&self) -> i32 {
        match self.keep {
            Some(_) => to_i32(self.sides).saturating_add(self.modifier),
            None => to_i32(self.count.saturating_mul(self.sides)).saturating_add(self.modifier),
        }
    }

    /// Average result of the dice, rounded down, plus the modifier.
    ///
    /// Uses the table convention of `sides / 2 + 1` per die, so a d10
    /// averages 6 and a d8 averages 5.
    #[must_use]
    pub fn average(&self) -> i32 {
        let per_die = to_i32(self.sides / 2 + 1);
        match self.keep {
            Some(_) => per_die.saturating_add(self.modifier),
            None => per_die
                .saturating_mul(to_i32(self.count))
                .saturating_add(self.modifier),
        }
    }

    /// Rolls the expression.
    pub fn roll(&self, rng: &mut dyn DeterministicRng) -> i32 {
        self.roll_with_dice_multiplier(rng, 1)
    }

    /// Critical damage: the dice twice, the modifier once.
    pub fn roll_doubled_dice(&self, rng: &mut dyn DeterministicRng) -> i32 {
        self.roll_with_dice_multiplier(rng, 2)
    }

    /// Rolls the dice `multiplier` times over, adding the flat modifier once.
    ///
    /// Critical hits use a multiplier of 2.
    pub fn roll_with_dice_multiplier(&self, rng: &mut dyn DeterministicRng, multiplier: u32) -> i32 {
        match self.keep {
            Some(keep) => {
                let first = rng.next_u32_range(1, self.sides);
                let second = rng.next_u32_range(1, self.sides);
                let kept = match keep {
                    Keep::Highest => first.max(second),
                    Keep::Lowest => first.min(second),
                };
                to_i32(kept).saturating_add(self.modifier)
            }
            None => {
                let dice = self.count.saturating_mul(multiplier.max(1));
                (0..dice)
                    .map(|_| to_i32(rng.next_u32_range(1, self.sides)))
                    .fold(self.modifier, i32::saturating_add)
            }
        }
    }
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.keep {
            Some(Keep::Highest) => write!(f, "kh1{:+}", self.modifier),
            Some(Keep::Lowest) => write!(f, "kl1{:+}", self.modifier),
            None if self.modifier != 0 => write!(f, "{:+}", self.modifier),
            None => Ok(()),
        }
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_signed_magnitude(s: &str) -> Option<i32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Parses and rolls dice notation in one step.
///
/// # Errors
///
/// Returns `DiceError::MalformedNotation` on unparsable input.
pub fn roll(notation: &str, rng: &mut dyn DeterministicRng) -> Result<i32, DiceError> {
    let expression = DiceExpression::parse(notation)?;
    let result = expression.roll(rng);
    tracing::debug!(notation, result, "dice rolled");
    Ok(result)
}

/// Ability score to modifier: `floor((score - 10) / 2)`.
#[must_use]
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// The side of an encounter a roll is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RollContext {
    /// Rolls made by or for the player character.
    Player,
    /// Rolls made by or for the opposing creature.
    Enemy,
}

/// One-shot forced natural d20 results, keyed by roll context.
///
/// A forced value is consumed by the first d20 rolled in its context and
/// never reused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollOverrides {
    player: Option<u32>,
    enemy: Option<u32>,
}

impl RollOverrides {
    /// Forces the next d20 rolled in `context`.
    pub fn force(&mut self, context: RollContext, natural: u32) {
        *self.slot(context) = Some(natural.clamp(1, 20));
    }

    /// Takes the forced value for `context`, clearing it.
    pub fn take(&mut self, context: RollContext) -> Option<u32> {
        self.slot(context).take()
    }

    /// Returns `true` if no override is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.player.is_none() && self.enemy.is_none()
    }

    fn slot(&mut self, context: RollContext) -> &mut Option<u32> {
        match context {
            RollContext::Player => &mut self.player,
            RollContext::Enemy => &mut self.enemy,
        }
    }
}

/// Rolls a natural d20, honouring a pending override for `context`.
pub fn roll_d20(
    rng: &mut dyn DeterministicRng,
    overrides: &mut RollOverrides,
    context: RollContext,
) -> u32 {
    if let Some(forced) = overrides.take(context) {
        tracing::debug!(?context, forced, "forced d20 consumed");
        return forced;
    }
    rng.next_u32_range(1, 20)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::StdRngSource;

    struct Fixed(Vec<u32>, usize);

    impl DeterministicRng for Fixed {
        fn next_u32_range(&mut self, _min: u32, _max: u32) -> u32 {
            let value = self.0[self.1];
            self.1 += 1;
            value
        }

        fn next_f64(&mut self) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_parse_plain_notation() {
        let expr = DiceExpression::parse("3d6+2").unwrap();

        assert_eq!(expr.count, 3);
        assert_eq!(expr.sides, 6);
        assert_eq!(expr.keep, None);
        assert_eq!(expr.modifier, 2);
    }

    #[test]
    fn test_parse_without_modifier() {
        let expr = DiceExpression::parse("1d20").unwrap();
        assert_eq!(expr.modifier, 0);
        assert_eq!(expr.to_string(), "1d20");
    }

    #[test]
    fn test_parse_advantage_and_disadvantage() {
        let adv = DiceExpression::parse("2d20kh1+5").unwrap();
        let dis = DiceExpression::parse("2d20kl1-1").unwrap();

        assert_eq!(adv.keep, Some(Keep::Highest));
        assert_eq!(adv.modifier, 5);
        assert_eq!(dis.keep, Some(Keep::Lowest));
        assert_eq!(dis.modifier, -1);
        assert_eq!(dis.to_string(), "2d20kl1-1");
    }

    #[test]
    fn test_parse_rejects_malformed_notation() {
        for bad in [
            "", "d6", "3x6", "0d6", "2d0", "2d6-1", "2d6+", "2d6+a", "1d20kh1+2", "2d20kh1",
            "2d20kh2+1", " 1d6", "1d6 ",
        ] {
            assert_eq!(
                DiceExpression::parse(bad),
                Err(DiceError::MalformedNotation(bad.to_owned())),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_roll_stays_within_bounds() {
        let mut rng = StdRngSource::from_seed(99);
        for notation in ["1d4", "2d6+3", "4d8+10", "10d10", "2d20kh1+4", "2d20kl1-2"] {
            let expr = DiceExpression::parse(notation).unwrap();
            for _ in 0..200 {
                let value = expr.roll(&mut rng);
                assert!(
                    (expr.min()..=expr.max()).contains(&value),
                    "{notation} produced {value}"
                );
            }
        }
    }

    #[test]
    fn test_keep_highest_and_lowest_select_correct_die() {
        let adv = DiceExpression::parse("2d20kh1+1").unwrap();
        let dis = DiceExpression::parse("2d20kl1+1").unwrap();

        assert_eq!(adv.roll(&mut Fixed(vec![4, 17], 0)), 18);
        assert_eq!(dis.roll(&mut Fixed(vec![4, 17], 0)), 5);
    }

    #[test]
    fn test_dice_multiplier_doubles_dice_not_modifier() {
        let expr = DiceExpression::parse("1d8+3").unwrap();
        let mut rng = Fixed(vec![5, 7], 0);

        assert_eq!(expr.roll_doubled_dice(&mut rng), 15);
    }

    #[test]
    fn test_average_uses_half_plus_one() {
        assert_eq!(DiceExpression::parse("1d10").unwrap().average(), 6);
        assert_eq!(DiceExpression::parse("1d8").unwrap().average(), 5);
        assert_eq!(DiceExpression::parse("2d6+1").unwrap().average(), 9);
    }

    #[test]
    fn test_extreme_notation_saturates_instead_of_overflowing() {
        // Arrange
        let expr = DiceExpression::parse("1d2147483647+2147483647").unwrap();
        let low = DiceExpression::parse("3d2147483647-2147483647").unwrap();

        // Act
        let rolled = expr.roll_doubled_dice(&mut Fixed(vec![2_147_483_647, 2_147_483_647], 0));

        // Assert
        assert_eq!(expr.max(), i32::MAX);
        assert_eq!(expr.min(), i32::MAX);
        assert_eq!(expr.average(), i32::MAX);
        assert_eq!(rolled, i32::MAX);
        assert_eq!(low.min(), -2_147_483_644);
    }

    #[test]
    fn test_roll_function_surfaces_malformed_notation() {
        let mut rng = StdRngSource::from_seed(1);
        assert!(roll("abc", &mut rng).is_err());
    }

    #[test]
    fn test_ability_modifier_table() {
        assert_eq!(ability_modifier(10), 0);
        assert_eq!(ability_modifier(11), 0);
        assert_eq!(ability_modifier(16), 3);
        assert_eq!(ability_modifier(9), -1);
        assert_eq!(ability_modifier(8), -1);
        assert_eq!(ability_modifier(1), -5);
    }

    #[test]
    fn test_override_is_consumed_exactly_once() {
        let mut overrides = RollOverrides::default();
        overrides.force(RollContext::Player, 20);
        let mut rng = Fixed(vec![7], 0);

        assert_eq!(roll_d20(&mut rng, &mut overrides, RollContext::Player), 20);
        assert_eq!(roll_d20(&mut rng, &mut overrides, RollContext::Player), 7);
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_override_is_scoped_to_its_context() {
        let mut overrides = RollOverrides::default();
        overrides.force(RollContext::Enemy, 1);
        let mut rng = Fixed(vec![12], 0);

        assert_eq!(roll_d20(&mut rng, &mut overrides, RollContext::Player), 12);
        assert_eq!(overrides.take(RollContext::Enemy), Some(1));
    }
}
