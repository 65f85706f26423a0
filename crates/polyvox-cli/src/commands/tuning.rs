//! Print an equal-temperament tuning table.

use clap::Args;
use polyvox_core::{midi_to_freq, note_name, sanitize_reference};
use std::io::Write;

/// Print note numbers, names and frequencies for a reference pitch.
#[derive(Args)]
pub struct TuningArgs {
    /// A4 reference in Hz (400-480)
    #[arg(long, default_value = "440.0")]
    pub reference: f32,

    /// First MIDI note
    #[arg(long, default_value = "21")]
    pub from: u8,

    /// Last MIDI note
    #[arg(long, default_value = "108")]
    pub to: u8,
}

/// Run the tuning command.
pub fn run(args: TuningArgs) -> anyhow::Result<()> {
    if args.from > 127 || args.to > 127 {
        anyhow::bail!("notes must be in 0-127 (got {}..{})", args.from, args.to);
    }
    if args.from > args.to {
        anyhow::bail!("--from ({}) is above --to ({})", args.from, args.to);
    }

    let reference = sanitize_reference(args.reference);
    if reference != args.reference {
        tracing::warn!(requested = args.reference, applied = reference, "reference clamped");
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_table(&mut out, reference, args.from, args.to)?;
    out.flush()?;
    Ok(())
}

fn write_table(out: &mut impl Write, reference: f32, from: u8, to: u8) -> std::io::Result<()> {
    writeln!(out, "A4 = {reference:.2} Hz")?;
    writeln!(out, "{:>4}  {:<4}  {:>10}", "note", "name", "freq (Hz)")?;
    for note in from..=to {
        let (name, octave) = note_name(note);
        let label = format!("{name}{octave}");
        writeln!(
            out,
            "{note:>4}  {label:<4}  {:>10.2}",
            midi_to_freq(note, reference)
        )?;
    }
    Ok(())
}
