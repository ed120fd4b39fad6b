//! Registry of live plugin instances.
//!
//! All mutating operations share one short-held exclusive lock; lookups
//! clone the `Arc` out so callers never hold the registry lock while
//! touching an instance.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use ripieno_plugin::ListenerToken;

use crate::track::PluginNode;
use crate::InstanceId;

struct RegistryEntry {
    node: Arc<PluginNode>,
    listener_token: Option<ListenerToken>,
}

#[derive(Default)]
pub struct InstanceRegistry {
    entries: Mutex<HashMap<InstanceId, RegistryEntry>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, instance_id: InstanceId, node: Arc<PluginNode>) {
        self.entries.lock().insert(
            instance_id,
            RegistryEntry {
                node,
                listener_token: None,
            },
        );
    }

    /// Unlink an instance, handing back its node and any registered
    /// parameter-change listener token for teardown.
    pub fn remove(&self, instance_id: InstanceId) -> Option<(Arc<PluginNode>, Option<ListenerToken>)> {
        self.entries
            .lock()
            .remove(&instance_id)
            .map(|entry| (entry.node, entry.listener_token))
    }

    pub fn get(&self, instance_id: InstanceId) -> Option<Arc<PluginNode>> {
        self.entries
            .lock()
            .get(&instance_id)
            .map(|entry| entry.node.clone())
    }

    pub fn contains(&self, instance_id: InstanceId) -> bool {
        self.entries.lock().contains_key(&instance_id)
    }

    pub fn set_listener_token(&self, instance_id: InstanceId, token: ListenerToken) {
        if let Some(entry) = self.entries.lock().get_mut(&instance_id) {
            entry.listener_token = Some(token);
        }
    }

    /// Returns whether the instance was found.
    pub fn set_bypassed(&self, instance_id: InstanceId, bypassed: bool) -> bool {
        match self.entries.lock().get(&instance_id) {
            Some(entry) => {
                entry.node.set_bypassed(bypassed);
                true
            }
            None => false,
        }
    }

    pub fn is_bypassed(&self, instance_id: InstanceId) -> bool {
        self.entries
            .lock()
            .get(&instance_id)
            .is_some_and(|entry| entry.node.is_bypassed())
    }

    pub fn instance_ids(&self) -> Vec<InstanceId> {
        let mut ids: Vec<_> = self.entries.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
