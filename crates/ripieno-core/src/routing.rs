//! Function-block route resolution.
//!
//! A routing target is an overloaded `i32`: a known instance id, a group
//! number mapped back to its instance, or a raw track index. Resolution
//! tries the three interpretations in that order. The table is derived
//! data, rebuilt after every topology change so stale entries cannot leak.

use std::collections::HashMap;
use std::sync::Arc;

use crate::groups::GroupAllocator;
use crate::track::Track;
use crate::InstanceId;

/// A resolved routing destination.
#[derive(Clone)]
pub struct Route {
    pub track: Arc<Track>,
    pub track_index: usize,
    pub instance_id: InstanceId,
}

#[derive(Default)]
pub(crate) struct RouteTable {
    entries: HashMap<InstanceId, (Arc<Track>, usize)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instance_id: InstanceId, track: Arc<Track>, track_index: usize) {
        self.entries.insert(instance_id, (track, track_index));
    }

    pub fn remove(&mut self, instance_id: InstanceId) {
        self.entries.remove(&instance_id);
    }

    pub fn get(&self, instance_id: InstanceId) -> Option<Route> {
        self.entries.get(&instance_id).map(|(track, index)| Route {
            track: track.clone(),
            track_index: *index,
            instance_id,
        })
    }

    /// Rebuild the whole table from the current topology, assigning groups
    /// to any instance that lacks one and refreshing each node's cached
    /// group.
    pub fn refresh(&mut self, tracks: &[Arc<Track>], groups: &mut GroupAllocator) {
        self.entries.clear();
        for (track_index, track) in tracks.iter().enumerate() {
            for node in track.nodes() {
                let instance_id = node.instance_id();
                self.entries
                    .insert(instance_id, (track.clone(), track_index));
                node.set_group(groups.assign(instance_id));
            }
        }
    }

    /// Resolve `target` as (1) an instance id, (2) a group number, or
    /// (3) a track index.
    ///
    /// A raw track index resolves to the track's first plugin instance; the
    /// route is recorded and a group assigned if the instance lacks one.
    pub fn resolve(
        &mut self,
        target: i32,
        tracks: &[Arc<Track>],
        groups: &mut GroupAllocator,
    ) -> Option<Route> {
        if let Some(route) = self.get(target) {
            return Some(route);
        }

        if (0..16).contains(&target) {
            if let Some(instance_id) = groups.instance_for_group(target as u8) {
                if let Some(route) = self.get(instance_id) {
                    return Some(route);
                }
            }
        }

        if target < 0 {
            return None;
        }
        let track_index = target as usize;
        let track = tracks.get(track_index)?;
        let instance_id = track.first_instance_id()?;

        self.entries
            .insert(instance_id, (track.clone(), track_index));
        let node = track.find_node(instance_id)?;
        node.set_group(groups.assign(instance_id));

        Some(Route {
            track: track.clone(),
            track_index,
            instance_id,
        })
    }
}
