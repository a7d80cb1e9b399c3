use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{Level, info};

use moused::{
    config::Config,
    device::DeviceDescription,
    event_model::PointerAction,
    pipeline::{
        DevicePipeline,
        event_loop::{self, DeviceId, DeviceMessage, EventLoop, PointerSink},
    },
    quirks::{QuirksStore, loader},
    replay,
};

/// 回放结束后再等多久, 让挂起的定时器到期
const REPLAY_LINGER: Duration = Duration::from_secs(1);
const REPLAY_DEVICE: DeviceId = 0;

#[derive(Parser)]
#[command(author, version, about = "Pointing device daemon core", long_about = None)]
struct Cli {
    /// Log verbosity: -v info, -vv debug, -vvv trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the quirks that apply to a device
    ListQuirks {
        /// Directory of *.quirks files
        #[arg(short, long)]
        quirks: PathBuf,
        /// Device description (TOML)
        #[arg(short, long)]
        device: PathBuf,
    },
    /// Run a recorded event trace through a device pipeline
    Replay {
        #[arg(short, long)]
        quirks: PathBuf,
        #[arg(short, long)]
        device: PathBuf,
        /// Daemon config (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Event trace, one `<ms> <type> <code> <value>` per line
        trace: PathBuf,
    },
}

struct StdoutSink;

impl PointerSink for StdoutSink {
    fn deliver(&mut self, device: DeviceId, action: PointerAction) {
        let clicks: Vec<String> = action
            .button_events
            .iter()
            .map(|e| {
                let state = if e.pressed { "down" } else { "up" };
                format!("{}:{state}x{}", e.button, e.clicks)
            })
            .collect();
        println!(
            "{:>8.3} dev={device} dx={} dy={} dz={} dw={} buttons={:#x} [{}]",
            action.time.as_secs_f64(),
            action.dx,
            action.dy,
            action.dz,
            action.dw,
            action.buttons.bits(),
            clicks.join(" ")
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::ListQuirks { quirks, device } => list_quirks(&quirks, &device),
        Commands::Replay {
            quirks,
            device,
            config,
            trace,
        } => run_replay(&quirks, &device, config.as_deref(), &trace),
    }
}

fn load_device(path: &Path) -> Result<DeviceDescription> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading device description {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing device description {}", path.display()))
}

fn load_quirks(dir: &Path) -> Result<QuirksStore> {
    let store = loader::load_dir(dir)
        .with_context(|| format!("loading quirks from {}", dir.display()))?;
    info!(sections = store.len(), "quirks database ready");
    Ok(store)
}

fn list_quirks(quirks: &Path, device: &Path) -> Result<()> {
    let store = load_quirks(quirks)?;
    let description = load_device(device)?;
    match store.fetch(&description.identity) {
        Some(set) => {
            for property in set.iter() {
                println!("{}={}", property.quirk, property.value);
            }
        }
        None => println!("no quirks for {}", description.identity.name),
    }
    Ok(())
}

fn run_replay(quirks: &Path, device: &Path, config: Option<&Path>, trace: &Path) -> Result<()> {
    let store = load_quirks(quirks)?;
    let description = load_device(device)?;
    let config = match config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let text =
        fs::read_to_string(trace).with_context(|| format!("reading trace {}", trace.display()))?;
    let events = replay::parse_trace(&text)
        .with_context(|| format!("parsing trace {}", trace.display()))?;

    let Some(pipeline) = DevicePipeline::open(&description, &store, &config) else {
        bail!("{} is ignored by quirks", description.identity.name);
    };

    // 暂停的时钟让录制里的时间戳和定时器在同一条时间线上, 回放不用真的等
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .context("building runtime")?;
    runtime.block_on(async move {
        let epoch = tokio::time::Instant::now();
        let (sender, receiver) = event_loop::channel(256);
        let event_loop = tokio::spawn(EventLoop::new(receiver, StdoutSink, epoch).run());
        sender
            .send((REPLAY_DEVICE, DeviceMessage::Attach(Box::new(pipeline))))
            .await
            .context("event loop stopped")?;
        replay::feed(sender, REPLAY_DEVICE, epoch, events, REPLAY_LINGER)
            .await
            .context("event loop stopped")?;
        event_loop.await.context("event loop panicked")?;
        Ok::<(), anyhow::Error>(())
    })
}
