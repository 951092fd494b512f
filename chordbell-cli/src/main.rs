//! Chordbell CLI: real-time player and offline renderer for the chord synth.

mod pattern;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use chordbell_engine::{Block, ChordEngine, RemovalPolicy, SynthConfig, Waveform};
use clap::{Args, Parser, Subcommand};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing_subscriber::EnvFilter;

use crate::pattern::NotePattern;

#[derive(Parser)]
#[command(name = "chordbell")]
#[command(author, version, about = "Chord-stamping decaying synth", long_about = None)]
struct Cli {
    /// TOML synth configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured waveform (sine, sawtooth, triangle, square)
    #[arg(long, global = true)]
    waveform: Option<Waveform>,

    /// Remove voices on Note-Off and once they decay
    #[arg(long, global = true)]
    release: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List output devices
    Devices,

    /// Play a random note pattern through an output device
    Play(PlayArgs),

    /// Render a pattern offline and print level statistics
    Render(RenderArgs),

    /// Print the resolved configuration as TOML
    ShowConfig,
}

#[derive(Args)]
struct PatternArgs {
    /// Notes per minute
    #[arg(long, default_value_t = 90.0)]
    bpm: f32,

    /// Seed for the note pattern
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

#[derive(Args)]
struct PlayArgs {
    /// Output device name (default device if omitted)
    #[arg(long)]
    device: Option<String>,

    #[arg(long)]
    sample_rate: Option<u32>,

    #[arg(long)]
    channels: Option<u16>,

    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<u64>,

    /// Output gain applied after the synth
    #[arg(long, default_value_t = 0.5)]
    gain: f32,

    #[command(flatten)]
    pattern: PatternArgs,
}

#[derive(Args)]
struct RenderArgs {
    #[arg(long, default_value_t = 4.0)]
    seconds: f32,

    #[arg(long, default_value_t = 48_000)]
    sample_rate: u32,

    #[arg(long, default_value_t = 2)]
    channels: usize,

    /// Frames per block
    #[arg(long, default_value_t = 512)]
    block: usize,

    #[command(flatten)]
    pattern: PatternArgs,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Devices => list_output_devices(),
        Commands::Play(args) => play(&config, &args),
        Commands::Render(args) => render(&config, &args),
        Commands::ShowConfig => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<SynthConfig> {
    let mut config = match &cli.config {
        Some(path) => SynthConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => SynthConfig::default(),
    };
    if let Some(w) = cli.waveform {
        config.waveform = w;
    }
    if cli.release {
        config.removal = RemovalPolicy::ALL;
    }
    config.validate()?;
    Ok(config)
}

// ---------------------------------- Devices --------------------------------------

fn list_output_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    println!("Available output devices:");
    for dev in host.output_devices()? {
        println!("- {}", dev.name()?);
    }
    Ok(())
}

fn pick_device(name: Option<&str>) -> anyhow::Result<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for d in host.output_devices()? {
            if d.name()? == name {
                return Ok(d);
            }
        }
        bail!("requested device not found: {name}");
    }
    host.default_output_device().ok_or_else(|| anyhow!("no default output device"))
}

fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> anyhow::Result<cpal::SupportedStreamConfig> {
    if req_sr.is_none() && req_ch.is_none() {
        return Ok(device.default_output_config()?);
    }

    // closest range: sample rate first, then channel count
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs()? {
        let ch = range.channels();
        let (lo, hi) = (range.min_sample_rate().0, range.max_sample_rate().0);

        let ch_pen = req_ch.map_or(0, |c| u64::from(ch.abs_diff(c)));
        let sr_pen = req_sr.map_or(0, |sr| {
            if (lo..=hi).contains(&sr) { 0 } else { u64::from(lo.abs_diff(sr).min(hi.abs_diff(sr))) }
        });

        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or_else(|| anyhow!("no supported output configs"))?;
    let pick_sr = match req_sr {
        Some(sr) => cpal::SampleRate(sr.clamp(range.min_sample_rate().0, range.max_sample_rate().0)),
        None => range.max_sample_rate(),
    };
    Ok(range.with_sample_rate(pick_sr))
}

// ----------------------------------- Play ----------------------------------------

fn play(config: &SynthConfig, args: &PlayArgs) -> anyhow::Result<()> {
    let device = pick_device(args.device.as_deref())?;
    let sup_cfg = choose_config(&device, args.sample_rate, args.channels)?;
    let sample_format = sup_cfg.sample_format();
    let cfg = sup_cfg.config();

    let engine = ChordEngine::with_config(config)?;
    let pattern = NotePattern::new(args.pattern.seed, args.pattern.bpm, cfg.sample_rate.0);

    tracing::info!(
        device = %device.name()?,
        sample_rate = cfg.sample_rate.0,
        channels = cfg.channels,
        ?sample_format,
        waveform = %config.waveform,
        "starting playback"
    );

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg, engine, pattern, args.gain)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &cfg, engine, pattern, args.gain)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg, engine, pattern, args.gain)?,
        other => bail!("unsupported device sample format: {other:?}"),
    };
    stream.play()?;

    match args.duration {
        Some(d) => std::thread::sleep(Duration::from_secs(d)),
        None => {
            println!("Press Ctrl+C to stop…");
            loop {
                std::thread::sleep(Duration::from_millis(500));
            }
        }
    }
    Ok(())
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut engine: ChordEngine,
    mut pattern: NotePattern,
    gain: f32,
) -> anyhow::Result<cpal::Stream>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let sr = cfg.sample_rate.0 as f32;
    let channels = usize::from(cfg.channels).max(1);
    // channel-major scratch; cpal hands over interleaved frames
    let mut scratch = vec![0.0f32; 4096 * channels];

    let meter_interval = (cfg.sample_rate.0 as usize).max(1);
    let mut meter_count = 0usize;
    let mut meter_peak = 0.0f32;

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            let frames = output.len() / channels;
            let len = frames * channels;
            if scratch.len() < len {
                scratch.resize(len, 0.0);
            }
            let midi = pattern.next_block(frames);
            let mut block = Block::new(&mut scratch[..len], channels, sr, midi);
            if let Err(e) = engine.render(&mut block) {
                tracing::error!(error = %e, "render failed");
                output.fill(T::EQUILIBRIUM);
                return;
            }

            for (f, frame) in output.chunks_exact_mut(channels).enumerate() {
                for (c, out) in frame.iter_mut().enumerate() {
                    let s = (scratch[c * frames + f] * gain).clamp(-1.0, 1.0);
                    *out = T::from_sample(s);
                }
                meter_peak = meter_peak.max((scratch[f] * gain).abs());
            }

            meter_count += frames;
            if meter_count >= meter_interval {
                tracing::debug!(peak = meter_peak, voices = engine.generator().voices().len(), "meter");
                meter_peak = 0.0;
                meter_count = 0;
            }
        },
        |e| tracing::error!(error = %e, "stream error"),
        None,
    )?;

    Ok(stream)
}

// ---------------------------------- Render ---------------------------------------

/// Running level statistics over the first channel.
#[derive(Default)]
struct Levels {
    peak: f32,
    sum_sq: f64,
    samples: u64,
    over: u64,
}

impl Levels {
    fn add(&mut self, samples: &[f32]) {
        for &s in samples {
            let a = s.abs();
            self.peak = self.peak.max(a);
            self.sum_sq += f64::from(s) * f64::from(s);
            if a > 1.0 {
                self.over += 1;
            }
        }
        self.samples += samples.len() as u64;
    }

    fn rms(&self) -> f64 {
        if self.samples == 0 { 0.0 } else { (self.sum_sq / self.samples as f64).sqrt() }
    }
}

fn render(config: &SynthConfig, args: &RenderArgs) -> anyhow::Result<()> {
    if args.block == 0 {
        bail!("--block must be at least 1");
    }
    if !(args.seconds.is_finite() && args.seconds >= 0.0) {
        bail!("--seconds must be a non-negative number");
    }

    let mut engine = ChordEngine::with_config(config)?;
    let mut pattern = NotePattern::new(args.pattern.seed, args.pattern.bpm, args.sample_rate);
    let total = (f64::from(args.seconds) * f64::from(args.sample_rate)) as usize;
    let mut buf = vec![0.0f32; args.block * args.channels];
    let mut levels = Levels::default();
    let mut blocks = 0u64;
    let mut max_voices = 0usize;

    let mut rendered = 0;
    while rendered < total {
        let frames = args.block.min(total - rendered);
        let midi = pattern.next_block(frames);
        let audio = &mut buf[..frames * args.channels];
        let mut block = Block::new(audio, args.channels, args.sample_rate as f32, midi);
        engine.render(&mut block)?;
        levels.add(&buf[..frames]);
        max_voices = max_voices.max(engine.generator().voices().len());
        rendered += frames;
        blocks += 1;
    }

    println!("waveform     {}", config.waveform);
    println!("chord        {:?}", config.chord_offsets);
    println!("frames       {} ({} blocks of {})", engine.time(), blocks, args.block);
    println!("peak         {:.4}", levels.peak);
    println!("rms          {:.4}", levels.rms());
    println!("over 0 dBFS  {}", levels.over);
    println!("max voices   {max_voices}");
    println!("final state  {:?}", engine.state());

    let _ = engine.shutdown();
    Ok(())
}
