//! Tracks and the plugin nodes they chain.
//!
//! A track is an ordered chain of plugin nodes sharing one process context.
//! Incoming UMP events land on a bounded track-level queue; at process time
//! the queue is drained into a pending list and each node receives the
//! events addressed to its function-block group, in FIFO order.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use ripieno_plugin::{PluginInstance, ProcessContext};
use ripieno_ump::packet::{group as packet_group, packet_words, MAX_PACKET_WORDS};
use ripieno_ump::EventBuffer;

use crate::error::{Error, Result};
use crate::InstanceId;

/// Sentinel stored in a node's group cache while no group is assigned.
const NO_GROUP: u8 = 0xFF;

/// Maximum number of UMP events buffered per track between callbacks.
///
/// 256 events covers extreme scenarios; when the queue is full,
/// `schedule_events` reports failure and the caller drops the event.
const EVENTS_PER_TRACK: usize = 256;

/// One queued UMP packet with its host timestamp.
#[derive(Clone, Copy, Debug)]
pub struct UmpEvent {
    pub timestamp: i64,
    words: [u32; MAX_PACKET_WORDS],
    len: u8,
}

impl UmpEvent {
    fn from_packet(timestamp: i64, packet: &[u32]) -> Self {
        let mut words = [0u32; MAX_PACKET_WORDS];
        words[..packet.len()].copy_from_slice(packet);
        Self {
            timestamp,
            words,
            len: packet.len() as u8,
        }
    }

    #[inline]
    pub fn words(&self) -> &[u32] {
        &self.words[..self.len as usize]
    }

    #[inline]
    pub fn group(&self) -> u8 {
        packet_group(self.words[0])
    }
}

/// One plugin instance mounted on a track.
///
/// The boxed instance sits behind a short mutex: the audio thread holds it
/// for the duration of one `process` call, the control thread for bounded
/// parameter/state access. The assigned group and bypass flag are cached
/// as atomics so the audio thread never consults control-plane state.
pub struct PluginNode {
    instance_id: InstanceId,
    instance: Mutex<Box<dyn PluginInstance>>,
    group: AtomicU8,
    bypassed: AtomicBool,
}

impl PluginNode {
    pub fn new(instance_id: InstanceId, instance: Box<dyn PluginInstance>) -> Self {
        Self {
            instance_id,
            instance: Mutex::new(instance),
            group: AtomicU8::new(NO_GROUP),
            bypassed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    pub fn instance(&self) -> &Mutex<Box<dyn PluginInstance>> {
        &self.instance
    }

    #[inline]
    pub fn group(&self) -> Option<u8> {
        match self.group.load(Ordering::Acquire) {
            NO_GROUP => None,
            group => Some(group),
        }
    }

    pub(crate) fn set_group(&self, group: Option<u8>) {
        self.group.store(group.unwrap_or(NO_GROUP), Ordering::Release);
    }

    #[inline]
    pub fn is_bypassed(&self) -> bool {
        self.bypassed.load(Ordering::Relaxed)
    }

    pub fn set_bypassed(&self, bypassed: bool) {
        self.bypassed.store(bypassed, Ordering::Relaxed);
    }
}

/// An ordered chain of plugin nodes with one event-input queue.
pub struct Track {
    nodes: RwLock<Vec<Arc<PluginNode>>>,
    events_tx: Sender<UmpEvent>,
    events_rx: Receiver<UmpEvent>,
    /// Audio-thread spill for events drained from the queue but not yet
    /// delivered (group mismatch or full event buffer).
    pending: Mutex<Vec<UmpEvent>>,
    bypassed: AtomicBool,
    frozen: AtomicBool,
}

impl Track {
    pub fn new() -> Self {
        let (events_tx, events_rx) = crossbeam_channel::bounded(EVENTS_PER_TRACK);
        Self {
            nodes: RwLock::new(Vec::new()),
            events_tx,
            events_rx,
            pending: Mutex::new(Vec::new()),
            bypassed: AtomicBool::new(false),
            frozen: AtomicBool::new(false),
        }
    }

    /// Snapshot of the node chain, in processing order.
    pub fn nodes(&self) -> Vec<Arc<PluginNode>> {
        self.nodes.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    pub fn first_instance_id(&self) -> Option<InstanceId> {
        self.nodes.read().first().map(|n| n.instance_id())
    }

    pub fn find_node(&self, instance_id: InstanceId) -> Option<Arc<PluginNode>> {
        self.nodes
            .read()
            .iter()
            .find(|n| n.instance_id() == instance_id)
            .cloned()
    }

    pub(crate) fn append_node(&self, node: Arc<PluginNode>) {
        self.nodes.write().push(node);
    }

    pub(crate) fn remove_node(&self, instance_id: InstanceId) -> bool {
        let mut nodes = self.nodes.write();
        let before = nodes.len();
        nodes.retain(|n| n.instance_id() != instance_id);
        nodes.len() != before
    }

    pub fn bypassed(&self) -> bool {
        self.bypassed.load(Ordering::Relaxed)
    }

    pub fn set_bypassed(&self, value: bool) {
        self.bypassed.store(value, Ordering::Relaxed);
    }

    pub fn frozen(&self) -> bool {
        self.frozen.load(Ordering::Relaxed)
    }

    pub fn set_frozen(&self, value: bool) {
        self.frozen.store(value, Ordering::Relaxed);
    }

    /// Enqueue every whole UMP packet in `words` onto this track's event
    /// queue. Returns `false` when the queue fills up; the remaining
    /// packets are dropped, never blocked on.
    pub fn schedule_events(&self, timestamp: i64, words: &[u32]) -> bool {
        let mut offset = 0;
        while offset < words.len() {
            let len = packet_words(words[offset]);
            if offset + len > words.len() {
                break;
            }
            let event = UmpEvent::from_packet(timestamp, &words[offset..offset + len]);
            if self.events_tx.try_send(event).is_err() {
                return false;
            }
            offset += len;
        }
        true
    }

    /// Process one buffer through the node chain.
    ///
    /// Events drained since the previous callback are delivered to each
    /// node filtered by its assigned group (a node without a group accepts
    /// everything). `on_plugin_output` receives each node's event output
    /// for dispatch before the chain advances.
    pub(crate) fn process(
        &self,
        ctx: &mut ProcessContext,
        on_plugin_output: &mut dyn FnMut(&Arc<PluginNode>, &mut EventBuffer),
    ) -> Result<()> {
        ctx.output.clear();
        if self.bypassed() {
            return Ok(());
        }

        let mut pending = self.pending.lock();
        while let Ok(event) = self.events_rx.try_recv() {
            pending.push(event);
        }

        let nodes = self.nodes.read();
        let node_count = nodes.len();
        for (idx, node) in nodes.iter().enumerate() {
            ctx.events_in.clear();
            let group = node.group();
            let mut full = false;
            pending.retain(|event| {
                if full {
                    return true;
                }
                if let Some(group) = group {
                    if event.group() != group {
                        return true;
                    }
                }
                if ctx.events_in.push_packet(event.words()) {
                    false
                } else {
                    full = true;
                    true
                }
            });

            if node.is_bypassed() {
                let channels = ctx.input.channel_count().min(ctx.output.channel_count());
                let (input, output) = (&ctx.input, &mut ctx.output);
                for ch in 0..channels {
                    output.channel_mut(ch).copy_from_slice(input.channel(ch));
                }
            } else {
                node.instance
                    .lock()
                    .process(ctx)
                    .map_err(|e| Error::PluginProcess {
                        instance: node.instance_id(),
                        message: e.to_string(),
                    })?;
            }

            if ctx.events_out.position() > 0 {
                on_plugin_output(node, &mut ctx.events_out);
                ctx.events_out.clear();
            }

            if idx + 1 < node_count {
                ctx.advance_chain();
            }
        }

        Ok(())
    }
}

impl Default for Track {
    fn default() -> Self {
        Self::new()
    }
}
