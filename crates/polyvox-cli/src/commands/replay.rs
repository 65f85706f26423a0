//! Replay a note script through a voice allocator.

use clap::Args;
use polyvox_alloc::{AllocatorConfig, VoiceAllocator, VoiceEvent, VoiceEventKind, VoiceState};
use polyvox_core::note_name;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::common::{CliAllocationMode, CliStealMode, format_event};
use crate::error::ScriptError;
use crate::script::{Command, ScriptLine, parse_script};

/// Drive an allocator from a script and print every emitted event.
#[derive(Args)]
pub struct ReplayArgs {
    /// Script file (reads stdin when omitted)
    #[arg(value_name = "SCRIPT")]
    pub script: Option<PathBuf>,

    /// Usable voice slots (1-32)
    #[arg(long, default_value = "32")]
    pub voices: usize,

    /// Voices stacked per note (1-8)
    #[arg(long, default_value = "1")]
    pub unison: usize,

    /// Unison detune spread (0.0-1.0)
    #[arg(long, default_value = "0.0")]
    pub detune: f32,

    /// Idle selection and stealing policy
    #[arg(long, value_enum, default_value = "oldest")]
    pub mode: CliAllocationMode,

    /// How stolen voices are treated
    #[arg(long, value_enum, default_value = "hard")]
    pub steal: CliStealMode,

    /// A4 reference in Hz (400-480)
    #[arg(long, default_value = "440.0")]
    pub tuning: f32,

    /// Pitch bend in semitones
    #[arg(long, default_value = "0.0", allow_negative_numbers = true)]
    pub bend: f32,

    /// Finish every release immediately (zero-length release tails)
    #[arg(long)]
    pub auto_finish: bool,
}

impl ReplayArgs {
    fn config(&self) -> AllocatorConfig {
        AllocatorConfig {
            voice_count: self.voices,
            unison_count: self.unison,
            unison_detune: self.detune,
            pitch_bend: self.bend,
            tuning_reference: self.tuning,
            allocation_mode: self.mode.into(),
            steal_mode: self.steal.into(),
        }
    }
}

/// Totals reported after a replay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub commands: usize,
    pub events: usize,
}

/// Run the replay command.
pub fn run(args: ReplayArgs) -> anyhow::Result<()> {
    let text = read_script(args.script.as_deref())?;
    let script = parse_script(&text)
        .inspect_err(|e| tracing::warn!(line = ?e.line(), "script rejected"))?;

    let config = args.config();
    let mut alloc = VoiceAllocator::with_config(config);
    if alloc.config() != config {
        tracing::warn!(requested = ?config, applied = ?alloc.config(), "configuration clamped");
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = replay(&mut alloc, &script, args.auto_finish, &mut out)?;
    out.flush()?;

    tracing::info!(
        commands = summary.commands,
        events = summary.events,
        active = alloc.active_voice_count(),
        "replay finished"
    );
    Ok(())
}

fn read_script(path: Option<&Path>) -> Result<String, ScriptError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| ScriptError::read_file(path, e)),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(ScriptError::ReadStdin)?;
            Ok(text)
        }
    }
}

/// Apply every script line to `alloc`, writing events and status reports to `out`.
pub fn replay(
    alloc: &mut VoiceAllocator,
    script: &[ScriptLine],
    auto_finish: bool,
    out: &mut impl Write,
) -> std::io::Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for entry in script {
        tracing::debug!(line = entry.line, command = ?entry.command, "apply");

        let events: Vec<VoiceEvent> = match entry.command {
            Command::NoteOn { note, velocity } => alloc.note_on(note, velocity).to_vec(),
            Command::NoteOff { note } => alloc.note_off(note).to_vec(),
            Command::Finished { voice } => alloc.voice_finished(voice).to_vec(),
            Command::Voices(count) => alloc.set_voice_count(count).to_vec(),
            Command::Unison(count) => alloc.set_unison_count(count).to_vec(),
            Command::AllOff => alloc.all_notes_off().to_vec(),
            Command::Mode(mode) => {
                alloc.set_allocation_mode(mode.into());
                Vec::new()
            }
            Command::Steal(mode) => {
                alloc.set_steal_mode(mode.into());
                Vec::new()
            }
            Command::Detune(amount) => {
                alloc.set_unison_detune(amount);
                Vec::new()
            }
            Command::Bend(semitones) => {
                alloc.set_pitch_bend(semitones);
                Vec::new()
            }
            Command::Tuning(hz) => {
                alloc.set_tuning_reference(hz);
                Vec::new()
            }
            Command::Reset => {
                alloc.reset();
                Vec::new()
            }
            Command::Status => {
                write_status(alloc, out)?;
                Vec::new()
            }
        };

        for event in &events {
            writeln!(out, "{}", format_event(event))?;
        }

        if auto_finish {
            for event in events.iter().filter(|e| e.kind == VoiceEventKind::NoteOff) {
                alloc.voice_finished(event.voice);
            }
        }

        summary.commands += 1;
        summary.events += events.len();
    }

    Ok(summary)
}

/// Print every non-idle voice followed by the totals.
fn write_status(alloc: &VoiceAllocator, out: &mut impl Write) -> std::io::Result<()> {
    for (index, slot) in alloc.slots().iter().enumerate() {
        let state = match slot.state() {
            VoiceState::Idle => continue,
            VoiceState::Active => "active",
            VoiceState::Releasing => "releasing",
        };
        let note = slot.note().unwrap_or_default();
        let (name, octave) = note_name(note);
        writeln!(
            out,
            "voice {index}: {state} note={note} ({name}{octave}) vel={} freq={:.2} unison={}",
            slot.velocity(),
            slot.frequency(),
            slot.unison_position()
        )?;
    }
    writeln!(
        out,
        "active={}/{} polyphony={}",
        alloc.active_voice_count(),
        alloc.voice_count(),
        alloc.polyphony()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_text(alloc: &mut VoiceAllocator, text: &str, auto_finish: bool) -> String {
        let script = parse_script(text).unwrap();
        let mut out = Vec::new();
        replay(alloc, &script, auto_finish, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn small(voices: usize) -> VoiceAllocator {
        VoiceAllocator::with_config(AllocatorConfig {
            voice_count: voices,
            ..Default::default()
        })
    }

    #[test]
    fn prints_events_in_order() {
        let mut alloc = small(2);
        let out = run_text(&mut alloc, "on 60 100\non 64 100\non 67 90\n", false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "note-on voice=0 note=60 vel=100 freq=261.63",
                "note-on voice=1 note=64 vel=100 freq=329.63",
                "steal voice=0 note=60 vel=100 freq=261.63",
                "note-on voice=0 note=67 vel=90 freq=392.00",
            ]
        );
    }

    #[test]
    fn auto_finish_frees_released_voices() {
        let mut alloc = small(1);
        let out = run_text(&mut alloc, "on 60 100\noff 60\non 62 100\n", true);
        assert!(!out.contains("steal"), "got:\n{out}");
        assert_eq!(alloc.voice_note(0), Some(62));
    }

    #[test]
    fn status_lists_sounding_voices() {
        let mut alloc = small(4);
        let out = run_text(&mut alloc, "on 69 100\non 60 80\noff 60\nstatus\n", false);
        assert!(out.contains("voice 0: active note=69 (A4) vel=100 freq=440.00"), "got:\n{out}");
        assert!(out.contains("voice 1: releasing note=60 (C4)"), "got:\n{out}");
        assert!(out.contains("active=2/4 polyphony=4"), "got:\n{out}");
    }

    #[test]
    fn summary_counts_commands_and_events() {
        let mut alloc = small(4);
        let script = parse_script("unison 2\non 60 100\nmode round-robin\nalloff\n").unwrap();
        let mut out = Vec::new();
        let summary = replay(&mut alloc, &script, false, &mut out).unwrap();
        assert_eq!(
            summary,
            ReplaySummary {
                commands: 4,
                events: 4,
            }
        );
    }

    #[test]
    fn config_from_args() {
        let args = ReplayArgs {
            script: None,
            voices: 8,
            unison: 2,
            detune: 0.5,
            mode: CliAllocationMode::HighestNote,
            steal: CliStealMode::Soft,
            tuning: 442.0,
            bend: -1.0,
            auto_finish: false,
        };
        let config = args.config();
        assert_eq!(config.voice_count, 8);
        assert_eq!(config.unison_count, 2);
        assert_eq!(config.allocation_mode, polyvox_alloc::AllocationMode::HighestNote);
        assert_eq!(config.steal_mode, polyvox_alloc::StealMode::Soft);
        assert_eq!(config.pitch_bend, -1.0);
    }
}
