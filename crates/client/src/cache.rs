//! Game state cache: one slot per room, overwritten on every update.

use std::collections::HashMap;

use crate::error::NoStateError;
use crate::types::{RoomId, Snapshot};

#[derive(Debug, Default)]
pub struct StateCache {
    slots: HashMap<RoomId, Snapshot>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the room's snapshot.
    pub fn update(&mut self, room_id: RoomId, snapshot: Snapshot) {
        self.slots.insert(room_id, snapshot);
    }

    /// Latest snapshot for the room.
    pub fn current(&self, room_id: &RoomId) -> Result<&Snapshot, NoStateError> {
        self.slots
            .get(room_id)
            .ok_or_else(|| NoStateError(room_id.clone()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_without_update_is_no_state() {
        let cache = StateCache::new();
        let room = RoomId::new("r1");
        assert_eq!(cache.current(&room), Err(NoStateError(room.clone())));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_last_update_wins() {
        let mut cache = StateCache::new();
        let room = RoomId::new("r1");
        for turn in 0..5 {
            cache.update(room.clone(), Snapshot::new(format!("<state turn=\"{turn}\"/>")));
        }
        assert_eq!(cache.current(&room).unwrap().as_str(), "<state turn=\"4\"/>");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_handed_out_snapshot_outlives_overwrite() {
        let mut cache = StateCache::new();
        let room = RoomId::new("r1");
        cache.update(room.clone(), Snapshot::new("<state turn=\"1\"/>"));
        let held = cache.current(&room).unwrap().clone();
        cache.update(room.clone(), Snapshot::new("<state turn=\"2\"/>"));
        assert_eq!(held.as_str(), "<state turn=\"1\"/>");
        assert_eq!(cache.current(&room).unwrap().as_str(), "<state turn=\"2\"/>");
    }

    #[test]
    fn test_rooms_are_independent() {
        let mut cache = StateCache::new();
        cache.update(RoomId::new("a"), Snapshot::new("<a/>"));
        cache.update(RoomId::new("b"), Snapshot::new("<b/>"));
        assert_eq!(cache.current(&RoomId::new("a")).unwrap().as_str(), "<a/>");
        assert_eq!(cache.current(&RoomId::new("b")).unwrap().as_str(), "<b/>");
    }
}
