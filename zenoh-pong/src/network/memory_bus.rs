//! In-process broadcast bus for tests and single-process setups

use std::sync::{Arc, Mutex};

use rand::Rng;

use super::bus::Transport;
use super::stats::BusStats;
use crate::protocol::Frame;
use crate::types::NodeId;

/// Inbound queue depth of each endpoint; frames beyond it are lost
pub const MEMORY_BUS_QUEUE: usize = 256;

/// Decides whether a frame is lost on its way to `receiver`
pub type DropFilter = Arc<dyn Fn(&NodeId, &Frame) -> bool + Send + Sync>;

#[derive(Default)]
struct HubInner {
    endpoints: Vec<(NodeId, flume::Sender<Frame>)>,
    loss_rate: f64,
    drop_filter: Option<DropFilter>,
}

/// Shared medium that connects [`MemoryBus`] endpoints
///
/// Every frame sent by one endpoint is offered to all others, never back
/// to the sender. Loss can be injected at random or through a filter.
#[derive(Clone, Default)]
pub struct MemoryBusHub {
    inner: Arc<Mutex<HubInner>>,
}

impl std::fmt::Debug for MemoryBusHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let endpoints = self
            .inner
            .lock()
            .map(|inner| inner.endpoints.len())
            .unwrap_or_default();
        f.debug_struct("MemoryBusHub")
            .field("endpoints", &endpoints)
            .finish()
    }
}

impl MemoryBusHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a new endpoint to the medium
    pub fn attach(&self, node_id: NodeId, stats: Arc<BusStats>) -> MemoryBus {
        let (tx, rx) = flume::bounded(MEMORY_BUS_QUEUE);
        if let Ok(mut inner) = self.inner.lock() {
            inner.endpoints.push((node_id.clone(), tx));
        }
        MemoryBus {
            node_id,
            hub: self.clone(),
            rx,
            stats,
        }
    }

    /// Probability (0.0 - 1.0) that any single delivery is lost
    pub fn set_loss_rate(&self, rate: f64) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.loss_rate = rate.clamp(0.0, 1.0);
        }
    }

    /// Drop every delivery for which `filter(receiver, frame)` is true
    pub fn set_drop_filter<F>(&self, filter: F)
    where
        F: Fn(&NodeId, &Frame) -> bool + Send + Sync + 'static,
    {
        if let Ok(mut inner) = self.inner.lock() {
            inner.drop_filter = Some(Arc::new(filter));
        }
    }

    pub fn clear_drop_filter(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.drop_filter = None;
        }
    }

    fn broadcast(&self, sender: &NodeId, frame: &Frame) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        let loss_rate = inner.loss_rate;
        let drop_filter = inner.drop_filter.clone();
        let mut rng = rand::rng();

        inner.endpoints.retain(|(receiver, tx)| {
            if receiver == sender {
                return true;
            }
            let lost = drop_filter
                .as_ref()
                .is_some_and(|filter| filter(receiver, frame))
                || (loss_rate > 0.0 && rng.random_bool(loss_rate));
            if lost {
                return true;
            }
            match tx.try_send(*frame) {
                Ok(()) | Err(flume::TrySendError::Full(_)) => true,
                // Endpoint dropped its receiver
                Err(flume::TrySendError::Disconnected(_)) => false,
            }
        });
        true
    }
}

/// One node's connection to a [`MemoryBusHub`]
pub struct MemoryBus {
    node_id: NodeId,
    hub: MemoryBusHub,
    rx: flume::Receiver<Frame>,
    stats: Arc<BusStats>,
}

impl std::fmt::Debug for MemoryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBus")
            .field("node_id", &self.node_id)
            .field("pending", &self.rx.len())
            .finish()
    }
}

impl MemoryBus {
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Frames waiting in the inbound queue
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Transport for MemoryBus {
    fn send(&mut self, frame: &Frame) -> bool {
        if self.hub.broadcast(&self.node_id, frame) {
            self.stats.record_sent(frame.len());
            true
        } else {
            self.stats.record_send_failure();
            false
        }
    }

    fn try_receive(&mut self) -> Option<Frame> {
        let frame = self.rx.try_recv().ok()?;
        self.stats.record_received(frame.len());
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> NodeId {
        NodeId::from_name(name.to_string()).unwrap()
    }

    fn frame(id: u16) -> Frame {
        Frame::new(id, &[id as u8]).unwrap()
    }

    #[test]
    fn test_broadcast_skips_sender() {
        let hub = MemoryBusHub::new();
        let stats = Arc::new(BusStats::new());
        let mut a = hub.attach(node("a"), stats.clone());
        let mut b = hub.attach(node("b"), stats.clone());
        let mut c = hub.attach(node("c"), stats.clone());

        assert!(a.send(&frame(26)));

        assert_eq!(a.try_receive(), None);
        assert_eq!(b.try_receive(), Some(frame(26)));
        assert_eq!(c.try_receive(), Some(frame(26)));
        assert_eq!(b.try_receive(), None);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_sent, 1);
        assert_eq!(snapshot.frames_received, 2);
    }

    #[test]
    fn test_drop_filter_and_full_loss() {
        let hub = MemoryBusHub::new();
        let stats = Arc::new(BusStats::new());
        let mut a = hub.attach(node("a"), stats.clone());
        let mut b = hub.attach(node("b"), stats.clone());

        hub.set_drop_filter(|receiver, frame| receiver.as_str() == "b" && frame.id() == 56);
        a.send(&frame(56));
        a.send(&frame(57));
        assert_eq!(b.try_receive(), Some(frame(57)));
        assert_eq!(b.try_receive(), None);

        hub.clear_drop_filter();
        hub.set_loss_rate(1.0);
        a.send(&frame(56));
        assert_eq!(b.pending(), 0);
    }

    #[test]
    fn test_queue_overflow_loses_frames() {
        let hub = MemoryBusHub::new();
        let stats = Arc::new(BusStats::new());
        let mut a = hub.attach(node("a"), stats.clone());
        let b = hub.attach(node("b"), stats);

        for _ in 0..MEMORY_BUS_QUEUE + 10 {
            assert!(a.send(&frame(26)));
        }
        assert_eq!(b.pending(), MEMORY_BUS_QUEUE);
    }

    #[test]
    fn test_dropped_endpoint_is_detached() {
        let hub = MemoryBusHub::new();
        let stats = Arc::new(BusStats::new());
        let mut a = hub.attach(node("a"), stats.clone());
        let b = hub.attach(node("b"), stats);
        drop(b);

        assert!(a.send(&frame(26)));
        assert!(format!("{:?}", hub).contains("endpoints: 1"));
    }
}
