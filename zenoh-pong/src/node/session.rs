//! Session controller: the per-tick state machine of one node
//!
//! ```text
//! WaitingForRole ──claim──▶ Playing ◀──serve── Paused
//!                              │  └──point──▶ Paused
//!                              ▼
//!                           GameOver ──restart──▶ Resetting ──ack──▶ Playing
//! ```
//!
//! Every tick the controller polls the input source, drains the bus, runs the
//! part of the protocol that belongs to its role, flushes pending control
//! frames and hands the resulting view to the render sink. Nothing in a tick
//! blocks and no per-frame error leaves it.

use std::mem::discriminant;
use std::sync::Arc;

use super::arbiter::{ClaimResponse, RoleArbiter};
use super::input_relay::InputRelay;
use super::physics::PhysicsEngine;
use super::redundant::RedundantSender;
use super::replication::{StatePublisher, StateSubscriber};
use super::{InputSample, InputSource, RenderSink};
use crate::config::NodeConfig;
use crate::error::Result;
use crate::network::{BusStats, Transport};
use crate::protocol::{DecodeError, Message};
use crate::types::{BusId, Intent, NodeId, NodeRole, PublishableState, SessionPhase, Side, Snapshot};

/// Mutable game state of a node, owned by its controller
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: SessionPhase,
    /// Ground truth on the authority, last replicated values on a replica
    pub snapshot: Snapshot,
    /// Intent relayed by the replica, applied to its paddle by the authority
    pub peer_intent: Intent,
    engine: Option<PhysicsEngine>,
}

impl SessionState {
    fn new(initial: Snapshot) -> Self {
        Self {
            phase: SessionPhase::WaitingForRole,
            snapshot: initial,
            peer_intent: Intent::Still,
            engine: None,
        }
    }
}

/// Transitions that happened during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub role_changed: Option<NodeRole>,
    /// New phase when the phase kind changed; serve countdown steps are not reported
    pub phase_changed: Option<SessionPhase>,
}

impl TickReport {
    pub fn is_quiet(&self) -> bool {
        self.role_changed.is_none() && self.phase_changed.is_none()
    }
}

pub struct SessionController<T> {
    node_id: NodeId,
    config: NodeConfig,
    transport: T,
    stats: Arc<BusStats>,
    state: SessionState,
    arbiter: RoleArbiter,
    relay: InputRelay,
    publisher: StatePublisher,
    subscriber: StateSubscriber,
    redundant: RedundantSender,
    tick: u64,
    last_beacon_tick: u64,
    last_peer_tick: u64,
    silence_warned: bool,
}

impl<T> std::fmt::Debug for SessionController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("node_id", &self.node_id)
            .field("role", &self.arbiter.role())
            .field("phase", &self.state.phase)
            .field("tick", &self.tick)
            .finish()
    }
}

impl<T: Transport> SessionController<T> {
    /// Create a controller for a validated configuration
    pub fn new(config: NodeConfig, transport: T, stats: Arc<BusStats>) -> Result<Self> {
        config.validate()?;
        let ids = config.frame_ids;
        Ok(Self {
            node_id: config.node_id.clone(),
            state: SessionState::new(config.game.initial_snapshot()),
            arbiter: RoleArbiter::new(config.bus_id, config.role_policy),
            relay: InputRelay::new(ids),
            publisher: StatePublisher::new(ids),
            subscriber: StateSubscriber,
            redundant: RedundantSender::new(config.redundancy),
            tick: 0,
            last_beacon_tick: 0,
            last_peer_tick: 0,
            silence_warned: false,
            config,
            transport,
            stats,
        })
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn role(&self) -> NodeRole {
        self.arbiter.role()
    }

    pub fn bus_id(&self) -> BusId {
        self.arbiter.bus_id()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Ticks run so far
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Side this node plays, `None` until it has a role
    pub fn local_side(&self) -> Option<Side> {
        let authority_side = self.config.game.authority_side;
        match self.arbiter.role() {
            NodeRole::Unassigned => None,
            NodeRole::Authority => Some(authority_side),
            NodeRole::Replica => Some(authority_side.opposite()),
        }
    }

    /// Render view of the current state
    pub fn view(&self) -> PublishableState {
        PublishableState {
            role: self.arbiter.role(),
            phase: self.state.phase,
            local_side: self.local_side(),
            authority_side: self.config.game.authority_side,
            snapshot: self.state.snapshot,
            winning_score: self.config.game.winning_score,
            screen_width: self.config.game.screen_width,
        }
    }

    /// Run one tick of the control loop
    pub fn tick<I, R>(&mut self, input: &mut I, render: &mut R) -> TickReport
    where
        I: InputSource + ?Sized,
        R: RenderSink + ?Sized,
    {
        self.tick += 1;
        let role_before = self.arbiter.role();
        let phase_before = self.state.phase;

        let sample = input.poll();
        self.drain();

        if self.arbiter.role() == NodeRole::Unassigned
            && self.arbiter.attempt_claim(sample.intent) == NodeRole::Authority
        {
            self.become_authority();
        }

        let match_ended = self.advance(sample, phase_before);
        self.publish(match_ended);
        self.beacon();
        self.redundant.flush(self.tick, &mut self.transport);
        self.check_peer_silence();

        render.present(&self.view());

        let role = self.arbiter.role();
        let phase = self.state.phase;
        TickReport {
            role_changed: (role != role_before).then_some(role),
            phase_changed: (discriminant(&phase) != discriminant(&phase_before)).then_some(phase),
        }
    }

    /// Forget role and match; the node starts over waiting for a role
    pub fn reset_session(&mut self) {
        tracing::info!("Node '{}' resetting session", self.node_id);
        self.arbiter.reset();
        self.state = SessionState::new(self.config.game.initial_snapshot());
        self.relay.reset();
        self.publisher.reset();
        self.redundant.clear();
        self.silence_warned = false;
    }

    fn drain(&mut self) {
        for _ in 0..self.config.max_frames_per_tick {
            let Some(frame) = self.transport.try_receive() else {
                return;
            };
            match Message::decode(&frame, &self.config.frame_ids) {
                Ok(message) => {
                    self.last_peer_tick = self.tick;
                    self.silence_warned = false;
                    self.handle(message);
                }
                // Other groups share the bus
                Err(DecodeError::UnknownIdentifier(id)) => {
                    tracing::trace!("Node '{}' ignoring frame id {:#x}", self.node_id, id);
                }
                Err(e) => {
                    self.stats.record_decode_drop();
                    tracing::debug!("Node '{}' dropped frame: {}", self.node_id, e);
                }
            }
        }
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::RoleClaim { bus_id } => self.on_claim(bus_id),
            Message::InputIntent(intent) => {
                if self.arbiter.role() == NodeRole::Authority {
                    self.state.peer_intent = intent;
                }
            }
            Message::PaddlePosition { .. } | Message::BallState { .. } | Message::Score(_) => {
                self.on_state(&message)
            }
            Message::ResetRequest => self.on_reset_request(),
            Message::ResetAcknowledge => self.on_reset_acknowledge(),
        }
    }

    fn on_claim(&mut self, remote: BusId) {
        let response = self.arbiter.on_claim(remote);
        match response {
            ClaimResponse::BecameReplica => {
                tracing::info!(
                    "Node '{}' heard claim from {}, playing as replica",
                    self.node_id,
                    remote
                );
                self.become_replica();
            }
            ClaimResponse::Demoted => {
                tracing::info!(
                    "Node '{}' lost authority to {} (own id {}), playing as replica",
                    self.node_id,
                    remote,
                    self.arbiter.bus_id()
                );
                self.become_replica();
            }
            ClaimResponse::Reassert => {
                tracing::debug!(
                    "Node '{}' outranks claim from {}, re-asserting",
                    self.node_id,
                    remote
                );
            }
            ClaimResponse::Conflict => {
                tracing::warn!(
                    "Node '{}' heard a claim with its own bus id {}; configure distinct ids",
                    self.node_id,
                    remote
                );
            }
            ClaimResponse::Ignored => {}
        }

        // A forced authority can be settled by a claim before its first tick
        if self.arbiter.role() == NodeRole::Authority && self.state.engine.is_none() {
            self.become_authority();
        } else if response == ClaimResponse::Reassert {
            self.send_claim();
        }
    }

    fn on_state(&mut self, message: &Message) {
        if self.arbiter.role() != NodeRole::Replica || !self.state.phase.is_in_play() {
            return;
        }

        let previous = self.state.snapshot.score;
        self.subscriber.apply(&mut self.state.snapshot, message);
        let score = self.state.snapshot.score;
        if score == previous {
            return;
        }

        let game = &self.config.game;
        if score.reached(game.winning_score) {
            tracing::info!("Node '{}' game over at {}", self.node_id, score);
            self.state.phase = SessionPhase::GameOver;
        } else if game.serve_pause_ticks > 0 {
            self.state.phase = SessionPhase::Paused {
                remaining_ticks: game.serve_pause_ticks,
            };
        }
    }

    fn on_reset_request(&mut self) {
        let role = self.arbiter.role();
        if role == NodeRole::Authority && self.state.phase == SessionPhase::GameOver {
            tracing::info!("Node '{}' restarting match on peer request", self.node_id);
            self.restart_match();
        } else {
            tracing::debug!(
                "Node '{}' ignoring reset request while {}",
                self.node_id,
                self.state.phase
            );
        }
    }

    fn on_reset_acknowledge(&mut self) {
        let waiting = matches!(
            self.state.phase,
            SessionPhase::Resetting | SessionPhase::GameOver
        );
        if self.arbiter.role() == NodeRole::Replica && waiting {
            tracing::info!("Node '{}' match restarted by authority", self.node_id);
            self.state.snapshot = self.config.game.initial_snapshot();
            self.state.phase = SessionPhase::Playing;
            self.relay.reset();
        }
    }

    /// Role-specific work of the current phase; true when the match ended
    /// this tick
    fn advance(&mut self, sample: InputSample, phase_before: SessionPhase) -> bool {
        let role = self.arbiter.role();
        match self.state.phase {
            SessionPhase::WaitingForRole | SessionPhase::Resetting => {}
            SessionPhase::Playing => match role {
                NodeRole::Authority => return self.simulate(sample.intent),
                NodeRole::Replica => self.relay_input(sample.intent),
                NodeRole::Unassigned => {}
            },
            SessionPhase::Paused { remaining_ticks } => {
                if role == NodeRole::Replica {
                    self.relay_input(sample.intent);
                }
                // The tick that scored does not count toward the pause
                if matches!(phase_before, SessionPhase::Paused { .. }) {
                    self.state.phase = if remaining_ticks <= 1 {
                        SessionPhase::Playing
                    } else {
                        SessionPhase::Paused {
                            remaining_ticks: remaining_ticks - 1,
                        }
                    };
                }
            }
            SessionPhase::GameOver if sample.restart => match role {
                NodeRole::Authority => {
                    tracing::info!("Node '{}' restarting match", self.node_id);
                    self.restart_match();
                }
                NodeRole::Replica => {
                    tracing::info!("Node '{}' requesting a new match", self.node_id);
                    self.enqueue(Message::ResetRequest);
                    self.state.phase = SessionPhase::Resetting;
                }
                NodeRole::Unassigned => {}
            },
            SessionPhase::GameOver => {}
        }
        false
    }

    fn simulate(&mut self, local_intent: Intent) -> bool {
        let Some(engine) = self.state.engine.as_mut() else {
            return false;
        };
        let local_side = self.config.game.authority_side;
        engine.set_intent(local_side, local_intent);
        engine.set_intent(local_side.opposite(), self.state.peer_intent);

        let (snapshot, event) = engine.step();
        self.state.snapshot = snapshot;

        let Some(event) = event else {
            return false;
        };
        tracing::info!(
            "Node '{}' point for {:?}, score {}",
            self.node_id,
            event.scorer,
            event.score
        );
        if event.game_over {
            tracing::info!("Node '{}' game over at {}", self.node_id, event.score);
            self.state.phase = SessionPhase::GameOver;
            return true;
        }
        let pause = self.config.game.serve_pause_ticks;
        if pause > 0 {
            self.state.phase = SessionPhase::Paused {
                remaining_ticks: pause,
            };
        }
        false
    }

    fn relay_input(&mut self, intent: Intent) {
        if let Some(frame) = self.relay.observe(intent) {
            if !self.transport.send(&frame) {
                tracing::debug!("Node '{}' failed to relay input", self.node_id);
            }
        }
    }

    /// Authority side of the reset handshake
    fn restart_match(&mut self) {
        if let Some(engine) = self.state.engine.as_mut() {
            engine.reset();
            self.state.snapshot = engine.snapshot();
        }
        self.state.peer_intent = Intent::Still;
        self.state.phase = SessionPhase::Playing;
        self.publisher.reset();
        self.send(Message::ResetAcknowledge);
    }

    fn become_authority(&mut self) {
        let engine = PhysicsEngine::new(self.config.game.clone());
        self.state.snapshot = engine.snapshot();
        self.state.engine = Some(engine);
        self.state.peer_intent = Intent::Still;
        self.state.phase = SessionPhase::Playing;
        self.publisher.reset();
        self.last_peer_tick = self.tick;

        self.enqueue(Message::RoleClaim {
            bus_id: self.arbiter.bus_id(),
        });
        self.last_beacon_tick = self.tick;

        tracing::info!(
            "Node '{}' claimed authority with id {}, playing {:?}",
            self.node_id,
            self.arbiter.bus_id(),
            self.config.game.authority_side
        );
    }

    fn become_replica(&mut self) {
        self.state.engine = None;
        // A finished match stays over until the reset handshake
        if self.state.phase != SessionPhase::GameOver {
            self.state.snapshot = self.config.game.initial_snapshot();
            self.state.phase = SessionPhase::Playing;
        }
        self.relay.reset();
        // A demoted authority stops repeating its claim
        self.redundant.clear();
        self.last_peer_tick = self.tick;
    }

    fn publish(&mut self, match_ended: bool) {
        if self.arbiter.role() != NodeRole::Authority {
            return;
        }
        // The final score still goes out on the tick the match ends
        if !self.state.phase.is_in_play() && !match_ended {
            return;
        }
        for frame in self.publisher.publish(&self.state.snapshot) {
            if !self.transport.send(&frame) {
                tracing::debug!("Node '{}' failed to publish {:?}", self.node_id, frame);
            }
        }
    }

    fn beacon(&mut self) {
        let period = u64::from(self.config.claim_beacon_ticks);
        if self.arbiter.role() == NodeRole::Authority
            && period > 0
            && self.tick - self.last_beacon_tick >= period
        {
            self.send_claim();
        }
    }

    fn check_peer_silence(&mut self) {
        let limit = u64::from(self.config.peer_silence_warn_ticks);
        if self.arbiter.role() == NodeRole::Unassigned || limit == 0 || self.silence_warned {
            return;
        }
        if self.tick - self.last_peer_tick >= limit {
            tracing::warn!(
                "Node '{}' has not heard from any peer for {} ticks",
                self.node_id,
                limit
            );
            self.silence_warned = true;
        }
    }

    fn send_claim(&mut self) {
        self.send(Message::RoleClaim {
            bus_id: self.arbiter.bus_id(),
        });
        self.last_beacon_tick = self.tick;
    }

    /// Send once, now
    fn send(&mut self, message: Message) {
        match message.encode(&self.config.frame_ids) {
            Ok(frame) => {
                if !self.transport.send(&frame) {
                    tracing::warn!("Node '{}' failed to send {:?}", self.node_id, message);
                }
            }
            Err(e) => tracing::error!("Node '{}' cannot encode {:?}: {}", self.node_id, message, e),
        }
    }

    /// Send redundantly, starting this tick
    fn enqueue(&mut self, message: Message) {
        match message.encode(&self.config.frame_ids) {
            Ok(frame) => self.redundant.enqueue(frame),
            Err(e) => tracing::error!("Node '{}' cannot encode {:?}: {}", self.node_id, message, e),
        }
    }
}
