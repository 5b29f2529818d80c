mod input;
mod term_render;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use console::{Key, Term};
use zenoh_pong::{BusId, GameConfig, NodeCommand, RolePolicy, SessionExt};

use crate::input::{KeyEvent, KeyboardInput};
use crate::term_render::{AnsiTermStyle, TermRender};

/// z_pong - Two-player Pong over Zenoh
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Node name
    #[arg(short, long)]
    name: Option<String>,

    /// Key expression prefix
    #[arg(short, long)]
    prefix: Option<String>,

    /// Path to Zenoh config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to a JSON file with game rules
    #[arg(short, long)]
    game: Option<PathBuf>,

    /// Become authority without waiting for input
    #[arg(long, conflicts_with = "replica")]
    authority: bool,

    /// Never claim authority
    #[arg(long)]
    replica: bool,

    /// Frame identifier group
    #[arg(long)]
    group: Option<u16>,

    /// Tie-break identifier (random when omitted)
    #[arg(short, long)]
    bus_id: Option<u8>,

    /// Tick period in milliseconds
    #[arg(short, long, default_value_t = 10)]
    tick_ms: u64,

    /// Draw the field mirrored when playing the left side
    #[arg(short, long)]
    mirror: bool,

    /// How long a direction key stays held after its last press, in milliseconds
    #[arg(long, default_value_t = 120)]
    latch_ms: u64,
}

#[tokio::main(flavor = "multi_thread", worker_threads = 1)]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // The field is drawn on stdout
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let game = match &args.game {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read game file {}", path.display()))?;
            serde_json::from_str::<GameConfig>(&text).context("Failed to parse game file")?
        }
        None => GameConfig::default(),
    };

    let zenoh_config = match &args.config {
        Some(path) => zenoh::Config::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config file: {}", e))?,
        None => zenoh::Config::default(),
    };

    let session = zenoh::open(zenoh_config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open zenoh session: {}", e))?;

    let policy = if args.authority {
        RolePolicy::ForceAuthority
    } else if args.replica {
        RolePolicy::ForceReplica
    } else {
        RolePolicy::FirstMover
    };

    let (key_tx, key_rx) = flume::unbounded();
    let input = KeyboardInput::new(key_rx, Duration::from_millis(args.latch_ms));
    let render = TermRender::new(Term::stdout(), AnsiTermStyle, &game, args.mirror);

    let mut builder = session
        .declare_pong_node(input, render)
        .game(game)
        .role_policy(policy)
        .tick_interval_ms(args.tick_ms);
    if let Some(name) = args.name.clone() {
        builder = builder.name(name)?;
    }
    if let Some(prefix) = args.prefix.clone() {
        builder = builder.prefix(prefix);
    }
    if let Some(group) = args.group {
        builder = builder.group(group)?;
    }
    if let Some(bus_id) = args.bus_id {
        builder = builder.bus_id(BusId(bus_id));
    }
    let mut node = builder.await?;

    let term = Term::stdout();
    term.clear_screen()?;
    eprintln!("=== z_pong ===");
    eprintln!("Node ID: {}", node.id());
    eprintln!("Controls: ↑/w ↓/s move, r restart, q quit");

    let node_sender = node.sender();
    let keyboard_task = tokio::task::spawn_blocking(move || {
        let input_term = Term::stdout();
        loop {
            let key = match input_term.read_key() {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!("Keyboard unavailable: {}", e);
                    break;
                }
            };
            if matches!(key, Key::Char('q') | Key::Char('Q')) {
                let _ = node_sender.send(NodeCommand::Stop);
                break;
            }
            if let Some(event) = KeyEvent::from_key(&key)
                && key_tx.send(event).is_err()
            {
                break;
            }
        }
    });

    node.run().await?;

    keyboard_task.abort();
    let _ = keyboard_task.await;

    term.show_cursor()?;
    println!("{}", node.stats());
    Ok(())
}
