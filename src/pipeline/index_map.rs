//! Translation table between relative user-turn indices and absolute ordinals.
//!
//! The LLM only ever sees user turns numbered `[0]`, `[1]`, ... and answers in
//! those numbers. [`UserIndexMap`] is the one place that turns them back into
//! positions in the full dialogue.

use crate::dialogue::Turn;

/// Ordinals of all user turns, in dialogue order.
///
/// Strictly increasing: entry `i` is the ordinal of the `i`-th user turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserIndexMap {
    ordinals: Vec<usize>,
}

impl UserIndexMap {
    pub fn build(turns: &[Turn]) -> Self {
        let ordinals = turns
            .iter()
            .filter(|t| t.is_user())
            .map(|t| t.ordinal)
            .collect();
        Self { ordinals }
    }

    pub fn len(&self) -> usize {
        self.ordinals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordinals.is_empty()
    }

    pub fn ordinals(&self) -> &[usize] {
        &self.ordinals
    }

    /// Absolute ordinal of the user turn with the given relative index.
    pub fn ordinal(&self, relative: usize) -> Option<usize> {
        self.ordinals.get(relative).copied()
    }

    /// Maps relative indices to ordinals, dropping anything out of range.
    pub fn remap(&self, relative: &[i64]) -> Vec<usize> {
        relative
            .iter()
            .filter_map(|&i| usize::try_from(i).ok())
            .filter_map(|i| self.ordinal(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::{turns, Role};

    #[test]
    fn test_build_is_strictly_increasing() {
        let dialogue = turns(&[
            (Role::Assistant, "welcome"),
            (Role::User, "a"),
            (Role::User, "b"),
            (Role::Assistant, "c"),
            (Role::Assistant, "d"),
            (Role::User, "e"),
        ]);
        let map = UserIndexMap::build(&dialogue);
        assert_eq!(map.ordinals(), &[1, 2, 5]);
        assert!(map.ordinals().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_remap_drops_out_of_range() {
        let map = UserIndexMap {
            ordinals: vec![2, 5, 9],
        };
        assert_eq!(map.remap(&[1, 2]), vec![5, 9]);
        assert_eq!(map.remap(&[0, 3, -1, 7]), vec![2]);
    }
}
