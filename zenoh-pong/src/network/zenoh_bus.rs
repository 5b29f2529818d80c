//! Broadcast bus carried over Zenoh pub/sub

use std::sync::Arc;
use std::time::Duration;

use zenoh::handlers::FifoChannelHandler;
use zenoh::liveliness::LivelinessToken;
use zenoh::pubsub::{Publisher, Subscriber};
use zenoh::sample::Sample;
use zenoh::Wait;

use super::bus::Transport;
use super::keyexpr::{BusKeyexpr, NodeKeyexpr};
use super::stats::BusStats;
use crate::error::{PongError, Result};
use crate::protocol::Frame;
use crate::types::NodeId;

/// How long to wait for a live node using the same name
const NAME_CHECK_TIMEOUT: Duration = Duration::from_millis(500);

/// A node's endpoint on a Zenoh-backed bus
///
/// Each node publishes its frames on `<prefix>/bus/<node_id>` and listens
/// on `<prefix>/bus/*`. Its own frames come back through the wildcard
/// subscription and are discarded by sender name. A liveliness token on
/// `<prefix>/node/<node_id>` keeps names unique while the node runs.
pub struct ZenohBus {
    node_id: NodeId,
    publisher: Publisher<'static>,
    subscriber: Subscriber<FifoChannelHandler<Sample>>,
    _token: LivelinessToken,
    stats: Arc<BusStats>,
}

impl std::fmt::Debug for ZenohBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZenohBus")
            .field("node_id", &self.node_id)
            .field("publisher", &self.publisher.key_expr())
            .field("subscriber", &self.subscriber.key_expr())
            .finish()
    }
}

impl ZenohBus {
    /// Join the bus under `prefix`
    ///
    /// Fails with [`PongError::NodeNameConflict`] when another live node
    /// already uses `node_id`, and with [`PongError::TransportUnavailable`]
    /// when the publisher or subscriber cannot be declared.
    pub async fn declare(
        session: &zenoh::Session,
        prefix: &str,
        node_id: NodeId,
        stats: Arc<BusStats>,
    ) -> Result<Self> {
        let node_keyexpr = NodeKeyexpr::new(prefix, node_id.clone()).to_keyexpr()?;

        let replies = session
            .liveliness()
            .get(&node_keyexpr)
            .timeout(NAME_CHECK_TIMEOUT)
            .await?;
        while let Ok(reply) = replies.recv_async().await {
            if reply.result().is_ok() {
                return Err(PongError::NodeNameConflict(format!(
                    "node '{}' is already alive on '{}'",
                    node_id, prefix
                )));
            }
        }

        let token = session.liveliness().declare_token(node_keyexpr).await?;

        let publish_keyexpr = BusKeyexpr::new(prefix, Some(node_id.clone())).to_keyexpr()?;
        let publisher = session
            .declare_publisher(publish_keyexpr)
            .await
            .map_err(|e| PongError::TransportUnavailable(format!("publisher: {}", e)))?;

        let listen_keyexpr = BusKeyexpr::new(prefix, None).to_keyexpr()?;
        let subscriber = session
            .declare_subscriber(listen_keyexpr)
            .await
            .map_err(|e| PongError::TransportUnavailable(format!("subscriber: {}", e)))?;

        tracing::info!("Node {} joined bus {}/bus", node_id, prefix);

        Ok(Self {
            node_id,
            publisher,
            subscriber,
            _token: token,
            stats,
        })
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Frame carried by a sample from another node, `None` for own echoes
    /// and undecodable payloads
    fn accept(&self, sample: &Sample) -> Option<Frame> {
        match BusKeyexpr::try_from(sample.key_expr()) {
            Ok(keyexpr) if keyexpr.sender() == Some(&self.node_id) => return None,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Ignoring sample on {}: {}", sample.key_expr(), e);
                return None;
            }
        }

        match zenoh_ext::z_deserialize::<Frame>(sample.payload()) {
            Ok(frame) => Some(frame),
            Err(e) => {
                self.stats.record_decode_drop();
                tracing::debug!("Undecodable frame from {}: {}", sample.key_expr(), e);
                None
            }
        }
    }
}

impl Transport for ZenohBus {
    fn send(&mut self, frame: &Frame) -> bool {
        match self.publisher.put(zenoh_ext::z_serialize(frame)).wait() {
            Ok(()) => {
                self.stats.record_sent(frame.len());
                true
            }
            Err(e) => {
                self.stats.record_send_failure();
                tracing::warn!("Failed to publish {:?}: {}", frame, e);
                false
            }
        }
    }

    fn try_receive(&mut self) -> Option<Frame> {
        loop {
            let sample = match self.subscriber.try_recv() {
                Ok(Some(sample)) => sample,
                Ok(None) => return None,
                Err(e) => {
                    tracing::warn!("Bus subscriber closed: {}", e);
                    return None;
                }
            };
            if let Some(frame) = self.accept(&sample) {
                self.stats.record_received(frame.len());
                return Some(frame);
            }
        }
    }
}
