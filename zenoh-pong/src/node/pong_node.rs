/// Node runner - drives a session controller at a fixed tick rate
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior};

use super::session::SessionController;
use super::{InputSource, RenderSink};
use crate::config::NodeConfig;
use crate::error::Result;
use crate::network::{BusStats, BusStatsSnapshot, Transport};
use crate::types::{NodeId, NodeRole, PublishableState, SessionPhase};

/// Commands that can be sent to the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCommand {
    /// Forget role and match, wait for a new role
    ResetSession,
    /// Stop the node's run loop
    Stop,
}

/// Outcome of one [`PongNode::step`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// A tick ran without role or phase change
    Tick(PublishableState),
    /// The node obtained, lost or changed its role
    RoleChanged(NodeRole),
    /// The session entered another phase
    PhaseChanged(SessionPhase),
    /// The node was stopped
    Stop,
}

/// A pong player on a shared bus
///
/// Owns the transport, the local input source and the render sink, and runs
/// one controller tick per `tick_interval_ms`. Commands from other tasks
/// arrive through [`PongNode::sender`].
pub struct PongNode<T, I, R> {
    id: NodeId,
    controller: SessionController<T>,
    input: I,
    render: R,
    interval: Interval,
    command_tx: flume::Sender<NodeCommand>,
    command_rx: flume::Receiver<NodeCommand>,
    stats: Arc<BusStats>,
    stopped: bool,
}

impl<T, I, R> std::fmt::Debug for PongNode<T, I, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PongNode")
            .field("id", &self.id)
            .field("controller", &self.controller)
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl<T, I, R> PongNode<T, I, R>
where
    T: Transport,
    I: InputSource,
    R: RenderSink,
{
    /// Create a node over an already opened transport
    ///
    /// Must be called within a tokio runtime. Use
    /// [`SessionExt::declare_pong_node`](super::session_ext::SessionExt::declare_pong_node)
    /// to run over Zenoh.
    pub fn new(
        config: NodeConfig,
        transport: T,
        input: I,
        render: R,
        stats: Arc<BusStats>,
    ) -> Result<Self> {
        let id = config.node_id.clone();
        let period = Duration::from_millis(config.tick_interval_ms);
        let controller = SessionController::new(config, transport, stats.clone())?;

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let (command_tx, command_rx) = flume::unbounded();

        tracing::info!("Node '{}' ready, ticking every {:?}", id, period);

        Ok(Self {
            id,
            controller,
            input,
            render,
            interval,
            command_tx,
            command_rx,
            stats,
            stopped: false,
        })
    }

    /// Get node ID
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Get a sender for sending commands to this node
    pub fn sender(&self) -> flume::Sender<NodeCommand> {
        self.command_tx.clone()
    }

    /// Current render view without advancing the session
    pub fn state(&self) -> PublishableState {
        self.controller.view()
    }

    pub fn controller(&self) -> &SessionController<T> {
        &self.controller
    }

    /// Get current bus statistics
    pub fn stats(&self) -> BusStatsSnapshot {
        self.stats.snapshot()
    }

    /// Wait for the next tick or command and process it
    ///
    /// Returns when either:
    /// - A tick ran (Tick, or RoleChanged / PhaseChanged when it caused one)
    /// - A ResetSession command was processed (PhaseChanged to WaitingForRole)
    /// - A Stop command was received or the command channel closed (Stop)
    pub async fn step(&mut self) -> Result<StepResult> {
        if self.stopped {
            return Ok(StepResult::Stop);
        }

        // The node keeps a sender, so the channel only closes with the node
        tokio::select! {
            _ = self.interval.tick() => {
                let report = self.controller.tick(&mut self.input, &mut self.render);
                if let Some(role) = report.role_changed {
                    tracing::info!("Node '{}' is now {}", self.id, role);
                    return Ok(StepResult::RoleChanged(role));
                }
                if let Some(phase) = report.phase_changed {
                    tracing::debug!("Node '{}' phase: {}", self.id, phase);
                    return Ok(StepResult::PhaseChanged(phase));
                }
                Ok(StepResult::Tick(self.controller.view()))
            }
            result = self.command_rx.recv_async() => match result {
                Ok(NodeCommand::ResetSession) => {
                    self.controller.reset_session();
                    Ok(StepResult::PhaseChanged(self.controller.phase()))
                }
                Ok(NodeCommand::Stop) | Err(_) => {
                    tracing::info!("Node '{}' received Stop command, exiting", self.id);
                    self.stopped = true;
                    Ok(StepResult::Stop)
                }
            }
        }
    }

    /// Step until stopped
    pub async fn run(&mut self) -> Result<()> {
        while self.step().await? != StepResult::Stop {}
        tracing::info!("Node '{}' stopped. {}", self.id, self.stats());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{MemoryBus, MemoryBusHub};
    use crate::node::InputSample;
    use crate::types::Intent;

    struct Hold(Intent);

    impl InputSource for Hold {
        fn poll(&mut self) -> InputSample {
            InputSample::moving(self.0)
        }
    }

    fn node(
        hub: &MemoryBusHub,
        name: &str,
        intent: Intent,
    ) -> PongNode<MemoryBus, Hold, flume::Sender<PublishableState>> {
        let node_id = NodeId::from_name(name.to_string()).unwrap();
        let stats = Arc::new(BusStats::new());
        let config = NodeConfig::new()
            .with_node_id(node_id.clone())
            .with_tick_interval_ms(1);
        let (render_tx, _render_rx) = flume::bounded(1);
        PongNode::new(
            config,
            hub.attach(node_id, stats.clone()),
            Hold(intent),
            render_tx,
            stats,
        )
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_step_reports_role_then_ticks() {
        let hub = MemoryBusHub::new();
        let mut node = node(&hub, "runner", Intent::MoveUp);

        assert_eq!(
            node.step().await.unwrap(),
            StepResult::RoleChanged(NodeRole::Authority)
        );
        match node.step().await.unwrap() {
            StepResult::Tick(state) => assert_eq!(state.role, NodeRole::Authority),
            other => panic!("Expected Tick, got {:?}", other),
        }
        assert!(node.stats().frames_sent > 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_reset_session_command() {
        let hub = MemoryBusHub::new();
        let mut node = node(&hub, "runner", Intent::MoveUp);
        node.step().await.unwrap();

        node.sender().send(NodeCommand::ResetSession).unwrap();
        let mut result = node.step().await.unwrap();
        // A tick may be ready before the command
        while result != StepResult::PhaseChanged(SessionPhase::WaitingForRole) {
            assert!(!matches!(result, StepResult::Stop));
            result = node.step().await.unwrap();
        }
        assert_eq!(node.state().role, NodeRole::Unassigned);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_stop_command_ends_run() {
        let hub = MemoryBusHub::new();
        let mut node = node(&hub, "runner", Intent::Still);
        let sender = node.sender();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = sender.send(NodeCommand::Stop);
        });
        node.run().await.unwrap();

        assert_eq!(node.step().await.unwrap(), StepResult::Stop);
        assert_eq!(node.state().phase, SessionPhase::WaitingForRole);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_two_nodes_over_memory_bus() {
        let hub = MemoryBusHub::new();
        let mut authority = node(&hub, "right", Intent::MoveDown);
        let mut replica = node(&hub, "left", Intent::Still);

        for _ in 0..20 {
            authority.step().await.unwrap();
            replica.step().await.unwrap();
        }
        assert_eq!(authority.state().role, NodeRole::Authority);
        assert_eq!(replica.state().role, NodeRole::Replica);
        assert_eq!(replica.state().phase, SessionPhase::Playing);
    }
}
