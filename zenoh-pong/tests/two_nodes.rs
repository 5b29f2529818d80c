//! Two controllers playing over an in-memory bus

use std::sync::Arc;

use zenoh_pong::{
    BusId, BusStats, GameConfig, InputSample, InputSource, Intent, MemoryBus, MemoryBusHub,
    NodeConfig, NodeId, NodeRole, PublishableState, RenderSink, Score, SessionController,
    SessionPhase, Side,
};

struct Controls(InputSample);

impl InputSource for Controls {
    fn poll(&mut self) -> InputSample {
        self.0
    }
}

/// Keeps every presented view
#[derive(Default)]
struct Frames(Vec<PublishableState>);

impl RenderSink for Frames {
    fn present(&mut self, state: &PublishableState) {
        self.0.push(state.clone());
    }
}

fn controller(
    hub: &MemoryBusHub,
    name: &str,
    bus_id: u8,
    game: GameConfig,
) -> SessionController<MemoryBus> {
    let node_id = NodeId::from_name(name.to_string()).unwrap();
    let stats = Arc::new(BusStats::new());
    let config = NodeConfig::new()
        .with_node_id(node_id.clone())
        .with_bus_id(BusId(bus_id))
        .with_game(game);
    SessionController::new(config, hub.attach(node_id, stats.clone()), stats).unwrap()
}

fn intent(intent: Intent) -> Controls {
    Controls(InputSample::moving(intent))
}

#[test]
fn lossless_replica_renders_authority_state() {
    let hub = MemoryBusHub::new();
    let mut right = controller(&hub, "right", 1, GameConfig::default());
    let mut left = controller(&hub, "left", 2, GameConfig::default());
    let mut right_input = intent(Intent::MoveDown);
    let mut left_input = intent(Intent::Still);
    let mut right_frames = Frames::default();
    let mut left_frames = Frames::default();

    right.tick(&mut right_input, &mut right_frames);
    left.tick(&mut left_input, &mut left_frames);

    for tick in 0..600 {
        // The replica player wiggles its paddle
        left_input = intent(match (tick / 25) % 3 {
            0 => Intent::MoveUp,
            1 => Intent::Still,
            _ => Intent::MoveDown,
        });
        right.tick(&mut right_input, &mut right_frames);
        left.tick(&mut left_input, &mut left_frames);

        assert_eq!(
            left.snapshot(),
            right.snapshot(),
            "diverged at tick {}",
            tick
        );
        assert_eq!(left.phase(), right.phase(), "phase diverged at tick {}", tick);
    }

    let last = left_frames.0.last().unwrap();
    assert_eq!(last.role, NodeRole::Replica);
    assert_eq!(last.local_side, Some(Side::Left));
    assert_eq!(right_frames.0.len(), 601);
}

#[test]
fn replica_matches_authority_while_ball_overhangs_edge() {
    // Steps of 5 carry the ball to x = -1 before it counts as out
    let game = GameConfig {
        paddle_start: 0,
        ball_velocity: [-5, 0],
        ..GameConfig::default()
    };
    let hub = MemoryBusHub::new();
    let mut right = controller(&hub, "right", 1, game.clone());
    let mut left = controller(&hub, "left", 2, game);
    let mut right_input = intent(Intent::MoveUp);
    let mut left_input = intent(Intent::Still);
    let mut right_frames = Frames::default();
    let mut left_frames = Frames::default();

    right.tick(&mut right_input, &mut right_frames);
    left.tick(&mut left_input, &mut left_frames);
    right_input = intent(Intent::Still);

    for tick in 0..20 {
        right.tick(&mut right_input, &mut right_frames);
        left.tick(&mut left_input, &mut left_frames);
        assert_eq!(left.snapshot(), right.snapshot(), "diverged at tick {}", tick);
    }

    // The replica rendered the ball at the edge, exactly as the authority did
    let at_edge = |frames: &Frames| frames.0.iter().any(|view| view.snapshot.ball == (0, 32));
    assert!(at_edge(&right_frames));
    assert!(at_edge(&left_frames));
    assert_eq!(left.snapshot().score, Score::new(1, 0));
}

#[test]
fn replica_catches_up_after_lossy_period() {
    let hub = MemoryBusHub::new();
    let mut right = controller(&hub, "right", 1, GameConfig::default());
    let mut left = controller(&hub, "left", 2, GameConfig::default());
    let mut right_input = intent(Intent::MoveUp);
    let mut left_input = intent(Intent::Still);

    hub.set_loss_rate(0.3);
    for _ in 0..1000 {
        right.tick(&mut right_input, &mut ());
        left.tick(&mut left_input, &mut ());
    }
    // Redundant claims and beacons get the role through
    assert_eq!(left.role(), NodeRole::Replica);

    hub.set_loss_rate(0.0);
    right.tick(&mut right_input, &mut ());
    left.tick(&mut left_input, &mut ());

    // One lossless tick refreshes paddles and ball; the score may still lag
    let (replica, authority) = (left.snapshot(), right.snapshot());
    assert_eq!(replica.left_paddle, authority.left_paddle);
    assert_eq!(replica.right_paddle, authority.right_paddle);
    assert_eq!(replica.ball, authority.ball);
}

#[test]
fn late_joiner_learns_role_from_beacon() {
    let hub = MemoryBusHub::new();
    let mut right = controller(&hub, "right", 1, GameConfig::default());
    let mut right_input = intent(Intent::MoveUp);
    for _ in 0..10 {
        right.tick(&mut right_input, &mut ());
    }

    let mut left = controller(&hub, "left", 2, GameConfig::default());
    let mut left_input = intent(Intent::Still);
    for _ in 0..200 {
        right.tick(&mut right_input, &mut ());
        left.tick(&mut left_input, &mut ());
    }
    assert_eq!(left.role(), NodeRole::Replica);
}

#[test]
fn full_match_and_restart() {
    let game = GameConfig {
        paddle_start: 0,
        ball_velocity: [4, 0],
        winning_score: 3,
        serve_pause_ticks: 5,
        ..GameConfig::default()
    };
    let hub = MemoryBusHub::new();
    let mut right = controller(&hub, "right", 1, game.clone());
    let mut left = controller(&hub, "left", 2, game);
    let mut right_input = intent(Intent::MoveUp);
    let mut left_input = intent(Intent::Still);

    for _ in 0..200 {
        right.tick(&mut right_input, &mut ());
        left.tick(&mut left_input, &mut ());
        if left.phase() == SessionPhase::GameOver {
            break;
        }
    }
    assert_eq!(right.phase(), SessionPhase::GameOver);
    assert_eq!(left.snapshot().score, Score::new(0, 3));

    // Restart from the replica side, with the first request copy lost
    hub.set_loss_rate(0.0);
    let mut restart = Controls(InputSample::restart());
    let request = right.config().frame_ids.reset_request;
    let dropped = std::sync::atomic::AtomicBool::new(false);
    hub.set_drop_filter(move |_, frame| {
        frame.id() == request && !dropped.swap(true, std::sync::atomic::Ordering::Relaxed)
    });

    left.tick(&mut restart, &mut ());
    for _ in 0..5 {
        right.tick(&mut right_input, &mut ());
        left.tick(&mut left_input, &mut ());
    }

    assert_eq!(right.phase(), SessionPhase::Playing);
    assert_eq!(left.phase(), SessionPhase::Playing);
    assert_eq!(left.snapshot(), right.snapshot());
    assert_eq!(left.role(), NodeRole::Replica);
}
