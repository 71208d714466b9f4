//! Render one note of the demo instrument to a WAV file.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use hound::{SampleFormat, WavSpec, WavWriter};
use sfvoice_synth::Synth;

use super::common::load_settings;
use crate::demo::{self, DemoEnvelope, Waveform};

/// Render a note to WAV.
#[derive(Args)]
pub struct RenderArgs {
    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Engine configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// MIDI key
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u8).range(0..=127))]
    pub key: u8,

    /// MIDI velocity
    #[arg(long, default_value = "100", value_parser = clap::value_parser!(u8).range(1..=127))]
    pub velocity: u8,

    /// Seconds the key is held
    #[arg(long, default_value = "1.0")]
    pub hold: f32,

    /// Seconds rendered after the key is released
    #[arg(long, default_value = "1.0")]
    pub tail: f32,

    /// Wavetable shape
    #[arg(long, value_enum, default_value = "saw")]
    pub waveform: Waveform,

    /// Attack time in seconds
    #[arg(long, default_value = "0.01")]
    pub attack: f32,

    /// Decay time in seconds
    #[arg(long, default_value = "0.3")]
    pub decay: f32,

    /// Sustain level (0-1)
    #[arg(long, default_value = "0.7")]
    pub sustain: f32,

    /// Release time in seconds
    #[arg(long, default_value = "0.5")]
    pub release: f32,

    /// Filter cutoff in Hz
    #[arg(long, default_value = "6000.0")]
    pub cutoff: f32,
}

/// Run the render command.
pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    if args.hold < 0.0 || args.tail < 0.0 {
        anyhow::bail!("--hold and --tail must be non-negative");
    }

    let settings = load_settings(args.config.as_deref())?;
    let env = DemoEnvelope {
        attack: args.attack,
        decay: args.decay,
        sustain: args.sustain.clamp(0.0, 1.0),
        release: args.release,
    };

    let mut synth = Synth::new(settings)?;
    synth.set_channel_preset(0, Some(demo::preset(args.waveform, env, args.cutoff)))?;
    let started = synth.note_on(0, args.key, args.velocity, None)?;
    tracing::info!(key = args.key, velocity = args.velocity, voices = started, "note on");

    let rate = settings.sample_rate;
    let block = settings.buffer_size;
    let hold_blocks = (args.hold * rate / block as f32).ceil() as usize;
    let total_blocks = hold_blocks + (args.tail * rate / block as f32).ceil() as usize;

    let spec = WavSpec {
        channels: 2,
        sample_rate: rate as u32,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&args.output, spec)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let (mut left, mut right) = (vec![0.0f32; block], vec![0.0f32; block]);
    let mut peak = 0.0f32;
    for n in 0..total_blocks {
        if n == hold_blocks {
            synth.note_off(0, args.key)?;
        }
        synth.render_block(&mut left, &mut right, None, None)?;
        for (l, r) in left.iter().zip(&right) {
            writer.write_sample(*l)?;
            writer.write_sample(*r)?;
            peak = peak.max(l.abs()).max(r.abs());
        }
    }
    writer.finalize()?;

    tracing::info!(
        frames = total_blocks * block,
        peak,
        active = synth.active_voice_count(),
        "rendered"
    );
    println!(
        "Wrote {} ({:.2}s, peak {:.3})",
        args.output.display(),
        (total_blocks * block) as f32 / rate,
        peak
    );
    Ok(())
}
