//! Hushtone CLI: play or render ambient textures and alarm tones.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use hushtone_engine::catalog::{self, SoundCategory, SoundDefinition, Synthesis};
use hushtone_engine::{cpal_backend, EngineConfig, OfflineBackend, SoundEngine};
use tracing_subscriber::EnvFilter;

/// Render length when `render` gets no duration.
const DEFAULT_RENDER_MS: u32 = 5_000;

#[derive(Parser, Debug)]
#[command(name = "hushtone", version, about = "Synthesized ambient textures and alarm tones")]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Command,
}

/// Engine settings shared by every subcommand. Flags override the config file.
#[derive(Args, Debug, Default)]
struct OutputArgs {
    /// TOML engine configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output device name (substring match)
    #[arg(long, global = true)]
    device: Option<String>,

    /// Sample rate in Hz
    #[arg(long, global = true)]
    sample_rate: Option<u32>,

    /// Output channel count
    #[arg(long, global = true)]
    channels: Option<u16>,

    /// Master gain in [0, 1]
    #[arg(long, global = true)]
    gain: Option<f32>,

    /// Seed for texture noise
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the built-in sounds
    Sounds,

    /// List audio output devices
    Devices,

    /// Play an ambient texture until done or Ctrl+C
    Ambient {
        /// Sound id (see `hushtone sounds`)
        id: String,
        /// Loop until stopped (ignored with --duration-ms)
        #[arg(long = "loop")]
        looping: bool,
        /// Stop automatically after this many milliseconds
        #[arg(long)]
        duration_ms: Option<u32>,
    },

    /// Play an alarm tone until done or Ctrl+C
    Alarm {
        /// Sound id (see `hushtone sounds`)
        id: String,
        /// Fade out and stop after this many milliseconds
        #[arg(long)]
        duration_ms: Option<u32>,
    },

    /// Render a sound to a 32-bit float WAV file
    Render {
        /// Sound id (see `hushtone sounds`)
        id: String,
        /// Output WAV path
        #[arg(short, long)]
        out: PathBuf,
        /// Length of the render
        #[arg(long, default_value_t = DEFAULT_RENDER_MS)]
        duration_ms: u32,
    },
}

fn load_config(args: &OutputArgs) -> anyhow::Result<EngineConfig> {
    let mut cfg = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if args.device.is_some() { cfg.device.clone_from(&args.device); }
    if args.sample_rate.is_some() { cfg.sample_rate = args.sample_rate; }
    if args.channels.is_some() { cfg.channels = args.channels; }
    if let Some(g) = args.gain { cfg.master_gain = g; }
    if args.seed.is_some() { cfg.seed = args.seed; }
    cfg.validate()?;
    Ok(cfg)
}

fn list_sounds() {
    for def in catalog::all() {
        let detail = match &def.synthesis {
            Synthesis::Texture { kind } => format!("texture {kind}"),
            Synthesis::Tone { frequency_hz } => format!("tone {frequency_hz} Hz"),
        };
        println!("{:<8} {:<12} {:<12} {}", def.category(), def.id, def.label, detail);
    }
}

fn list_devices() -> anyhow::Result<()> {
    println!("Available output devices:");
    for name in cpal_backend::list_output_devices()? {
        println!("- {name}");
    }
    Ok(())
}

fn start(engine: &mut SoundEngine, def: &SoundDefinition, looping: bool, duration_ms: Option<u32>) -> anyhow::Result<()> {
    match def.category() {
        SoundCategory::Ambient => engine.play_ambient(def, looping, duration_ms)?,
        SoundCategory::Alarm => engine.play_alarm_tone(def, duration_ms)?,
    }
    Ok(())
}

fn play(cfg: EngineConfig, id: &str, looping: bool, duration_ms: Option<u32>) -> anyhow::Result<()> {
    let def = catalog::lookup(id)?;
    let mut engine = SoundEngine::realtime(cfg)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || r.store(false, Ordering::SeqCst)).context("installing Ctrl+C handler")?;

    start(&mut engine, def, looping, duration_ms)?;
    println!(
        "Playing {} ({}) at {} Hz. Press Ctrl+C to stop...",
        def.label,
        def.id,
        engine.sample_rate().unwrap_or_default()
    );

    while running.load(Ordering::SeqCst) && engine.is_playing() {
        std::thread::sleep(Duration::from_millis(50));
    }
    engine.stop();
    tracing::info!(frames = engine.frames_rendered(), "playback finished");
    Ok(())
}

fn render(cfg: EngineConfig, id: &str, out: &Path, duration_ms: u32) -> anyhow::Result<()> {
    if duration_ms == 0 {
        bail!("--duration-ms must be positive");
    }
    let def = catalog::lookup(id)?;
    let sample_rate = cfg.sample_rate.unwrap_or(48_000);
    let channels = cfg.channels.unwrap_or(2);
    let backend = OfflineBackend::new(sample_rate, channels);
    let tap = backend.tap();
    let mut engine = SoundEngine::new(cfg, Box::new(backend))?;

    start(&mut engine, def, false, Some(duration_ms))?;
    let samples = tap.render_ms(duration_ms);

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(out, spec).with_context(|| format!("creating {}", out.display()))?;
    for s in &samples {
        writer.write_sample(*s)?;
    }
    writer.finalize()?;
    tracing::info!(path = %out.display(), frames = samples.len() / usize::from(channels), "rendered");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Sounds => {
            list_sounds();
            Ok(())
        }
        Command::Devices => list_devices(),
        Command::Ambient { id, looping, duration_ms } => play(load_config(&cli.output)?, &id, looping, duration_ms),
        Command::Alarm { id, duration_ms } => play(load_config(&cli.output)?, &id, false, duration_ms),
        Command::Render { id, out, duration_ms } => render(load_config(&cli.output)?, &id, &out, duration_ms),
    }
}
