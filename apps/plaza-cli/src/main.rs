use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec3;
use plaza_collision::{CircularBounds, RoomGeometry};
use plaza_common::{
    DismountDirection, PlayerId, Portal, PortalTarget, RoomId, SeatDescriptor, SeatKind, SimConfig,
};
use plaza_input::{Action, InputFrame};
use plaza_kernel::{Collaborators, SimEvent, SimulationContext};
use plaza_net::{Outbound, RecordingSink};
use plaza_persist::{FileStore, KeyValueStore, MemoryStore, ResumeRecord};
use plaza_rooms::{AllowAll, RoomData};
use plaza_tools::SimInspector;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "plaza-cli", about = "CLI tool for the plaza avatar simulation")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and default tuning
    Info,
    /// Validate a YAML config and print the effective values
    Config {
        /// Config file; defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run a scripted walk through a demo plaza
    Demo {
        /// Frames for the final walk toward the arcade door
        #[arg(short, long, default_value = "120")]
        frames: usize,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Persist the resume record under this directory
        #[arg(short, long)]
        store: Option<PathBuf>,
    },
    /// Print the resume record kept in a store directory
    Resume {
        #[arg(short, long)]
        store: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Info => {
            let config = SimConfig::default();
            println!("plaza-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "physics: gravity={} walk={} jump={} max_dt={}",
                config.physics.gravity,
                config.physics.walk_speed,
                config.physics.jump_velocity,
                config.physics.max_dt
            );
            println!(
                "network: publish={}Hz scan_every={} frames",
                config.network.publish_rate_hz, config.interaction.scan_interval_frames
            );
        }
        Commands::Config { config } => {
            let config = load_config(config.as_ref())?;
            print!("{}", config.to_yaml()?);
        }
        Commands::Demo {
            frames,
            config,
            store,
        } => {
            let config = load_config(config.as_ref())?;
            match store {
                Some(dir) => {
                    let mut store = FileStore::open(&dir)
                        .with_context(|| format!("opening store at {}", dir.display()))?;
                    run_demo(config, frames, &mut store);
                }
                None => run_demo(config, frames, &mut MemoryStore::new()),
            }
        }
        Commands::Resume { store } => {
            let store = FileStore::open(&store)
                .with_context(|| format!("opening store at {}", store.display()))?;
            store.verify_integrity()?;
            match ResumeRecord::load(&store)? {
                Some(record) => println!(
                    "Resume: room={} pos=({:.2}, {:.2}, {:.2}) t={:.2}",
                    record.room, record.x, record.y, record.z, record.timestamp
                ),
                None => println!("No resume record"),
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SimConfig> {
    let config = match path {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SimConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn demo_plaza() -> RoomData {
    RoomData::new(RoomId::new("plaza"))
        .with_geometry(RoomGeometry::Circular(CircularBounds { radius: 18.0 }))
        .with_seat(SeatDescriptor {
            id: "fountain-bench".into(),
            kind: SeatKind::Seat,
            anchor_position: Vec3::new(0.0, 0.0, 6.0),
            anchor_yaw: 0.0,
            seat_height: 0.5,
            snap_points: vec![Vec3::new(-0.8, 0.0, 0.0), Vec3::new(0.8, 0.0, 0.0)],
            bidirectional: false,
            platform_height: 0.0,
            dismount_direction: DismountDirection::Forward,
            interact_radius: 1.5,
            y_band: None,
        })
        .with_portal(Portal {
            id: "arcade-door".into(),
            world_position: Vec3::new(0.0, 0.0, 14.0),
            radius: 1.5,
            target: PortalTarget::Room(RoomId::new("arcade")),
            exit_spawn_offset: Vec3::new(0.0, 0.0, -2.5),
            auto_enter: true,
        })
}

/// Walk to the bench, sit, stand, then walk through the arcade door.
fn run_demo(config: SimConfig, frames: usize, store: &mut dyn KeyValueStore) {
    let _span = tracing::info_span!("demo", frames).entered();
    let mut sink = RecordingSink::new();
    let mut allow = AllowAll;
    let mut ctx = SimulationContext::new(config, PlayerId::new());
    ctx.load_room(demo_plaza());

    let dt = 1.0 / 60.0;
    let script = [
        (InputFrame::forward(), 55, Action::Interact),
        (InputFrame::idle(), 30, Action::Stand),
        (InputFrame::forward(), frames, Action::Noop),
    ];
    for (leg, (input, frames, action)) in script.into_iter().enumerate() {
        let mut io = Collaborators {
            network: &mut sink,
            entitlement: &mut allow,
            store: &mut *store,
        };
        for _ in 0..frames {
            ctx.step(&input, dt, &mut io);
            if ctx.session().is_none() {
                break;
            }
        }
        ctx.handle_action(action, &mut io);
        println!("leg {leg}: {}", SimInspector::summary(&ctx));
        for event in ctx.drain_events() {
            match event {
                SimEvent::RoomHandoff(handoff) => {
                    println!("  handoff -> {}", handoff.to);
                    ctx.load_room(RoomData::new(handoff.to));
                }
                other => println!("  {other:?}"),
            }
        }
    }

    let positions = sink
        .sent
        .iter()
        .filter(|m| matches!(m, Outbound::Position { .. }))
        .count();
    println!(
        "Sent: {} messages ({} position, {} emote)",
        sink.sent.len(),
        positions,
        sink.emotes().len()
    );
}
