//! Shared CLI helpers used across multiple commands.

use clap::ValueEnum;
use polyvox_alloc::{AllocationMode, StealMode, VoiceEvent, VoiceEventKind};

/// Allocation modes for CLI
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CliAllocationMode {
    RoundRobin,
    #[default]
    Oldest,
    LowestVelocity,
    HighestNote,
}

impl From<CliAllocationMode> for AllocationMode {
    fn from(m: CliAllocationMode) -> Self {
        match m {
            CliAllocationMode::RoundRobin => AllocationMode::RoundRobin,
            CliAllocationMode::Oldest => AllocationMode::Oldest,
            CliAllocationMode::LowestVelocity => AllocationMode::LowestVelocity,
            CliAllocationMode::HighestNote => AllocationMode::HighestNote,
        }
    }
}

/// Steal modes for CLI
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CliStealMode {
    #[default]
    Hard,
    Soft,
}

impl From<CliStealMode> for StealMode {
    fn from(m: CliStealMode) -> Self {
        match m {
            CliStealMode::Hard => StealMode::Hard,
            CliStealMode::Soft => StealMode::Soft,
        }
    }
}

/// Render an event as `<kind> voice=<i> note=<n> vel=<v> freq=<hz>`.
pub fn format_event(event: &VoiceEvent) -> String {
    let kind = match event.kind {
        VoiceEventKind::NoteOn => "note-on",
        VoiceEventKind::NoteOff => "note-off",
        VoiceEventKind::Steal => "steal",
    };
    format!(
        "{kind} voice={} note={} vel={} freq={:.2}",
        event.voice, event.note, event.velocity, event.frequency
    )
}
