//! Split-Action Resolution
//!
//! Pure routine deriving the action and pointer subset of a split event from
//! the source action, the source pointer order, and the kept-id set. Kept
//! separate from the mutable event object so every action/cardinality
//! combination is testable in isolation.

use crate::bitarray::BitArray;
use crate::event::MotionAction;

/// Set of pointer ids kept by a split, one bit per id in
/// `[0, MAX_POINTER_ID]`
pub type PointerIdSet = BitArray<1>;

/// Outcome of resolving a split against a kept-id set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitResolution {
    /// Action of the split event
    pub action: MotionAction,
    /// Indices into the source pointer order, ascending, one per kept
    /// pointer
    pub kept_indices: Vec<usize>,
}

/// Resolve the action and pointer subset for a split.
///
/// `pointer_ids` is the source event's pointer-id order; `kept` selects the
/// ids the split event retains. Multi-pointer DOWN/UP actions targeting a
/// pointer outside the kept set degrade to MOVE; ones targeting a kept
/// pointer become the single-pointer action when one pointer remains
/// (CANCEL instead of UP when `canceled` is set) or are re-indexed to the
/// pointer's position in the filtered set otherwise.
pub fn resolve_split(
    action: MotionAction,
    canceled: bool,
    pointer_ids: &[i32],
    kept: &PointerIdSet,
) -> SplitResolution {
    let kept_indices: Vec<usize> = pointer_ids
        .iter()
        .enumerate()
        .filter(|(_, id)| **id >= 0 && kept.test(**id as usize))
        .map(|(index, _)| index)
        .collect();

    let action = match action {
        MotionAction::PointerDown { index } | MotionAction::PointerUp { index } => {
            let going_down = matches!(action, MotionAction::PointerDown { .. });
            let target_position = kept_indices
                .iter()
                .position(|kept_index| *kept_index == index as usize);
            match target_position {
                None => MotionAction::Move,
                Some(_) if kept_indices.len() == 1 => {
                    if going_down {
                        MotionAction::Down
                    } else if canceled {
                        MotionAction::Cancel
                    } else {
                        MotionAction::Up
                    }
                }
                Some(new_index) => {
                    let index = new_index as u8;
                    if going_down {
                        MotionAction::PointerDown { index }
                    } else {
                        MotionAction::PointerUp { index }
                    }
                }
            }
        }
        other => other,
    };

    SplitResolution {
        action,
        kept_indices,
    }
}
