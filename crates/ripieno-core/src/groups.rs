//! Function-block group allocation.
//!
//! MIDI 2.0 offers 16 function-block groups per endpoint; each live plugin
//! instance holds at most one. Released groups go onto a free list and are
//! reused most-recently-released first; fresh groups come from a monotonic
//! counter until all 16 are minted.

use std::collections::HashMap;

use crate::InstanceId;

/// Number of function-block groups a UMP endpoint exposes.
pub const GROUP_COUNT: u8 = 16;

/// Bidirectional instance <-> group mapping with bounded allocation.
///
/// Control-thread only; the audio thread reads each node's cached group
/// instead of consulting the allocator.
#[derive(Default)]
pub struct GroupAllocator {
    assigned: HashMap<InstanceId, u8>,
    by_group: HashMap<u8, InstanceId>,
    free: Vec<u8>,
    next: u8,
}

impl GroupAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a group to `instance_id`, or return its existing group.
    ///
    /// Returns `None` without blocking when all 16 groups are live; the
    /// caller drops the event or proceeds ungrouped.
    pub fn assign(&mut self, instance_id: InstanceId) -> Option<u8> {
        if let Some(&group) = self.assigned.get(&instance_id) {
            return Some(group);
        }

        let group = if let Some(group) = self.free.pop() {
            group
        } else if self.next < GROUP_COUNT {
            let group = self.next;
            self.next += 1;
            group
        } else {
            tracing::warn!(instance_id, "no function-block group available");
            return None;
        };

        self.assigned.insert(instance_id, group);
        self.by_group.insert(group, instance_id);
        Some(group)
    }

    /// Release the group held by `instance_id`, returning it to the free
    /// list for reuse. No-op when the instance holds none.
    pub fn release(&mut self, instance_id: InstanceId) {
        if let Some(group) = self.assigned.remove(&instance_id) {
            self.by_group.remove(&group);
            self.free.push(group);
        }
    }

    pub fn group_for_instance(&self, instance_id: InstanceId) -> Option<u8> {
        self.assigned.get(&instance_id).copied()
    }

    pub fn instance_for_group(&self, group: u8) -> Option<InstanceId> {
        self.by_group.get(&group).copied()
    }

    /// Number of currently assigned groups.
    pub fn live_count(&self) -> usize {
        self.assigned.len()
    }
}
