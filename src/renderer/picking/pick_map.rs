//! Typed pick-target resolution from raw picking texels.

use rustc_hash::FxHashMap;

use crate::data::Interval;
use crate::instance::decode_pick_color;

/// A typed pick target resolved from a picking texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickTarget {
    /// Background, or an id no loaded interval carries.
    None,
    /// An interval instance.
    Interval {
        /// Interval id as encoded in the pick color.
        id: u32,
        /// Ordinal index of the instance.
        index: usize,
    },
}

impl PickTarget {
    /// Instance index, if any.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match *self {
            Self::Interval { index, .. } => Some(index),
            Self::None => None,
        }
    }

    /// Returns `true` if this target is `None`.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Maps interval ids decoded from the picking target to instance indices.
#[derive(Debug, Clone, Default)]
pub struct PickMap {
    indices: FxHashMap<u32, usize>,
}

impl PickMap {
    /// Build from the interval list a buffer was dispatched from.
    #[must_use]
    pub fn from_intervals(intervals: &[Interval]) -> Self {
        Self::from_ids(intervals.iter().map(|i| i.id))
    }

    /// Build from ids in instance order.
    pub fn from_ids(ids: impl IntoIterator<Item = u32>) -> Self {
        let mut indices = FxHashMap::default();
        for (index, id) in ids.into_iter().enumerate() {
            if indices.insert(id, index).is_some() {
                log::warn!("duplicate interval id {id}; keeping index {index}");
            }
        }
        Self { indices }
    }

    /// Instance index of `id`.
    #[must_use]
    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.indices.get(&id).copied()
    }

    /// Resolve a raw RGBA8 texel read back from the picking target.
    #[must_use]
    pub fn resolve(&self, texel: [u8; 4]) -> PickTarget {
        decode_pick_color(texel)
            .and_then(|id| {
                self.index_of(id).map(|index| PickTarget::Interval { id, index })
            })
            .unwrap_or(PickTarget::None)
    }

    /// Number of mapped ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether no ids are mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::encode_pick_id;

    fn texel(id: u32) -> [u8; 4] {
        encode_pick_id(id)
            .unwrap()
            .map(|c| (c * 255.0).round() as u8)
    }

    #[test]
    fn background_resolves_to_none() {
        let map = PickMap::from_ids([0, 1, 2]);
        assert!(map.resolve([0, 0, 0, 0]).is_none());
    }

    #[test]
    fn ids_resolve_to_ordinal_index() {
        let map = PickMap::from_ids([40, 7, 70_000]);
        assert_eq!(
            map.resolve(texel(7)),
            PickTarget::Interval { id: 7, index: 1 }
        );
        assert_eq!(map.resolve(texel(70_000)).index(), Some(2));
    }

    #[test]
    fn unknown_id_is_none() {
        let map = PickMap::from_ids([1, 2]);
        assert!(map.resolve(texel(99)).is_none());
    }

    #[test]
    fn from_intervals_uses_interval_ids() {
        let intervals = [
            Interval::new([0.0; 3], [0.0, 0.0, 1.0], 1.0, 10),
            Interval::new([0.0; 3], [0.0, 0.0, 1.0], 1.0, 11),
        ];
        let map = PickMap::from_intervals(&intervals);
        assert_eq!(map.len(), 2);
        assert_eq!(map.index_of(11), Some(1));
    }
}
