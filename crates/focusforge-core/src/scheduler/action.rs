//! Discrete action space.
//!
//! Nine actions cover every combination of {-5, 0, +5} minutes applied to the
//! work and break durations:
//!
//! ```text
//! work_delta  = (action / 3 - 1) * 5
//! break_delta = (action % 3 - 1) * 5
//! ```

use serde::{Deserialize, Serialize};

use crate::error::InvalidActionError;

/// Size of the action space.
pub const ACTION_COUNT: usize = 9;

/// Minutes moved by one action step.
pub const DELTA_STEP: i32 = 5;

/// A validated action id in `0..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Action(u8);

impl Action {
    /// Keep both durations unchanged.
    pub const HOLD: Action = Action(4);

    pub fn new(raw: i64) -> Result<Self, InvalidActionError> {
        if (0..ACTION_COUNT as i64).contains(&raw) {
            Ok(Action(raw as u8))
        } else {
            Err(InvalidActionError::OutOfRange { action: raw })
        }
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn delta(self) -> DurationDelta {
        let a = i32::from(self.0);
        DurationDelta {
            work_delta: (a / 3 - 1) * DELTA_STEP,
            break_delta: (a % 3 - 1) * DELTA_STEP,
        }
    }

    pub fn all() -> impl Iterator<Item = Action> {
        (0..ACTION_COUNT as u8).map(Action)
    }
}

impl TryFrom<i64> for Action {
    type Error = InvalidActionError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Action::new(raw)
    }
}

impl From<Action> for i64 {
    fn from(action: Action) -> Self {
        i64::from(action.0)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Minute deltas for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationDelta {
    pub work_delta: i32,
    pub break_delta: i32,
}

/// Stateless mapping between action ids and duration deltas.
pub struct ActionCodec;

impl ActionCodec {
    /// Decode a raw action id.
    ///
    /// # Errors
    /// Returns [`InvalidActionError::OutOfRange`] outside `0..=8`.
    pub fn decode(action: i64) -> Result<DurationDelta, InvalidActionError> {
        Ok(Action::new(action)?.delta())
    }

    /// Inverse of [`ActionCodec::decode`].
    ///
    /// # Errors
    /// Returns [`InvalidActionError::InvalidDelta`] unless both deltas are in
    /// {-5, 0, 5}.
    pub fn encode(work_delta: i32, break_delta: i32) -> Result<Action, InvalidActionError> {
        let step = |delta: i32| match delta {
            d if d == -DELTA_STEP => Some(0u8),
            0 => Some(1),
            d if d == DELTA_STEP => Some(2),
            _ => None,
        };
        match (step(work_delta), step(break_delta)) {
            (Some(w), Some(b)) => Ok(Action(w * 3 + b)),
            _ => Err(InvalidActionError::InvalidDelta {
                work_delta,
                break_delta,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decode_table() {
        let expected = [
            (-5, -5),
            (-5, 0),
            (-5, 5),
            (0, -5),
            (0, 0),
            (0, 5),
            (5, -5),
            (5, 0),
            (5, 5),
        ];
        for (action, (w, b)) in expected.iter().enumerate() {
            let delta = ActionCodec::decode(action as i64).unwrap();
            assert_eq!((delta.work_delta, delta.break_delta), (*w, *b));
        }
    }

    #[test]
    fn hold_is_zero_delta() {
        assert_eq!(
            Action::HOLD.delta(),
            DurationDelta {
                work_delta: 0,
                break_delta: 0
            }
        );
    }

    #[test]
    fn encode_rejects_off_grid_deltas() {
        assert!(matches!(
            ActionCodec::encode(10, 0),
            Err(InvalidActionError::InvalidDelta { .. })
        ));
        assert!(ActionCodec::encode(0, 3).is_err());
    }

    #[test]
    fn serde_rejects_out_of_range() {
        assert_eq!(serde_json::from_str::<Action>("7").unwrap(), Action::new(7).unwrap());
        assert!(serde_json::from_str::<Action>("9").is_err());
    }

    proptest! {
        #[test]
        fn decode_encode_round_trip(action in 0i64..9) {
            let delta = ActionCodec::decode(action).unwrap();
            prop_assert!([-5, 0, 5].contains(&delta.work_delta));
            prop_assert!([-5, 0, 5].contains(&delta.break_delta));
            let back = ActionCodec::encode(delta.work_delta, delta.break_delta).unwrap();
            prop_assert_eq!(i64::from(back), action);
        }

        #[test]
        fn decode_rejects_out_of_range(action in prop_oneof![i64::MIN..0i64, 9i64..i64::MAX]) {
            prop_assert_eq!(
                ActionCodec::decode(action),
                Err(InvalidActionError::OutOfRange { action })
            );
        }
    }
}
