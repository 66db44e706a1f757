//! Zonewire standalone runner
//!
//! Loads the master configuration, opens the MIDI/OSC endpoints for every
//! surface, and drives the engine from a periodic tick plus the hardware
//! event queue. Without a DAW to embed in, host state is served by the
//! built-in mock host, which is enough to exercise surfaces, zones and
//! feedback against real hardware.

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zonewire::config::{Config, SurfaceProtocol};
use zonewire::engine::{Engine, InputEvent, OutMessage};
use zonewire::host::MockHost;
use zonewire::osc::{self, OscEndpoint};
use zonewire::ports::MidiPortPool;

/// Bind MIDI/OSC control surfaces to mixer, transport and plugin actions via
/// declarative zone files.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the master configuration file
    #[arg(short, long, default_value = "zonewire.ini")]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Dispatch tick interval in milliseconds
    #[arg(long, default_value = "30")]
    tick_ms: u64,

    /// Number of mock host tracks to serve
    #[arg(long, default_value = "32")]
    tracks: usize,

    /// List available MIDI ports and exit
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    if args.list_ports {
        list_ports()?;
        return Ok(());
    }

    info!("loading configuration from {}", args.config.display());
    let config = Config::load(&args.config)?;
    let base_dir = args
        .config
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut engine = Engine::new(Box::new(MockHost::with_tracks(args.tracks)));
    engine.load_config(&config, &base_dir)?;

    run(engine, &config, args.tick_ms).await
}

async fn run(mut engine: Engine, config: &Config, tick_ms: u64) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<InputEvent>();
    let mut ports = MidiPortPool::new();
    let mut osc_out: HashMap<String, OscEndpoint> = HashMap::new();

    // Open every surface's I/O. Input callbacks and OSC listeners only ever
    // push into the dispatch queue; the engine runs on this task alone.
    for page in &config.pages {
        for surface in &page.surfaces {
            match &surface.protocol {
                SurfaceProtocol::Midi => {
                    let queue = tx.clone();
                    let port = surface.in_port;
                    ports
                        .open_input(port, move |bytes| {
                            let _ = queue.send(InputEvent::Midi {
                                port,
                                bytes: bytes.to_vec(),
                            });
                        })
                        .with_context(|| format!("surface '{}' input", surface.name))?;
                    ports
                        .open_output(surface.out_port)
                        .with_context(|| format!("surface '{}' output", surface.name))?;
                }
                SurfaceProtocol::Osc { remote_ip } => {
                    let endpoint = OscEndpoint::new(remote_ip, surface.out_port)
                        .with_context(|| format!("surface '{}' OSC endpoint", surface.name))?;
                    osc_out.insert(surface.name.clone(), endpoint);

                    let (osc_tx, mut osc_rx) = mpsc::unbounded_channel();
                    let name = surface.name.clone();
                    let port = surface.in_port;
                    tokio::spawn(async move {
                        if let Err(e) = osc::run_listener(name, port, osc_tx).await {
                            warn!("OSC listener on port {} stopped: {}", port, e);
                        }
                    });

                    let queue = tx.clone();
                    tokio::spawn(async move {
                        while let Some(event) = osc_rx.recv().await {
                            let _ = queue.send(InputEvent::Osc {
                                surface: event.surface,
                                address: event.address,
                                value: event.value,
                            });
                        }
                    });
                }
            }
        }
    }

    info!("dispatch loop running (tick {} ms)", tick_ms);
    let started = Instant::now();
    let mut interval = tokio::time::interval(Duration::from_millis(tick_ms.max(1)));

    loop {
        let now_ms = started.elapsed().as_millis() as u64;
        tokio::select! {
            Some(event) = rx.recv() => {
                engine.handle_event(event, now_ms);
            }
            _ = interval.tick() => {
                engine.tick(now_ms);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }

        for out in engine.take_outbound() {
            match out.message {
                OutMessage::Midi(bytes) => ports.send(out.out_port, &bytes),
                OutMessage::OscFloat(address, value) => {
                    if let Some(endpoint) = osc_out.get(&out.surface) {
                        endpoint.send_float(&address, value);
                    }
                }
                OutMessage::OscString(address, value) => {
                    if let Some(endpoint) = osc_out.get(&out.surface) {
                        endpoint.send_string(&address, value.as_str());
                    }
                }
            }
        }
    }

    ports.shutdown();
    Ok(())
}

fn list_ports() -> Result<()> {
    println!("MIDI inputs:");
    for (index, name) in MidiPortPool::list_inputs()? {
        println!("  {:>3}  {}", index, name);
    }
    println!("MIDI outputs:");
    for (index, name) in MidiPortPool::list_outputs()? {
        println!("  {:>3}  {}", index, name);
    }
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    Ok(())
}
