//! Print the resolved generators of each voice a note starts.

use std::path::PathBuf;

use clap::Args;
use sfvoice_synth::Synth;

use super::common::load_settings;
use crate::demo::{self, DemoEnvelope, Waveform};

/// Inspect the voices of a note.
#[derive(Args)]
pub struct InspectArgs {
    /// Engine configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// MIDI key
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u8).range(0..=127))]
    pub key: u8,

    /// MIDI velocity
    #[arg(long, default_value = "100", value_parser = clap::value_parser!(u8).range(1..=127))]
    pub velocity: u8,

    /// List every generator, not only those set by a zone or a modulator
    #[arg(long)]
    pub all: bool,
}

/// Run the inspect command.
pub fn run(args: InspectArgs) -> anyhow::Result<()> {
    let settings = load_settings(args.config.as_deref())?;
    let mut synth = Synth::new(settings)?;
    synth.set_channel_preset(
        0,
        Some(demo::preset(Waveform::default(), DemoEnvelope::default(), 6000.0)),
    )?;
    synth.note_on(0, args.key, args.velocity, None)?;

    for voice in synth.voices().iter().filter(|v| v.is_playing()) {
        let sample = voice.sample().map_or("-", |s| s.name.as_str());
        println!(
            "Voice {} key {} vel {} sample '{}' pitch {:.1} cents",
            voice.id(),
            voice.key(),
            voice.note().velocity,
            sample,
            voice.pitch()
        );
        println!("  {:<24} {:>10} {:>10} {:>10}", "generator", "base", "mod", "value");
        for (ty, g) in voice.generators().iter() {
            if args.all || g.is_set() || g.modulation != 0.0 {
                println!(
                    "  {:<24} {:>10.1} {:>10.1} {:>10.1}",
                    ty.name(),
                    g.base,
                    g.modulation,
                    g.value()
                );
            }
        }
    }
    Ok(())
}
