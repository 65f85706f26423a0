//! Allocator configuration and its validation rules.
//!
//! The same clamping rules apply whether a value arrives through
//! [`AllocatorConfig`] at construction or through a setter at runtime:
//! finite out-of-range numbers are clamped, NaN/Inf floats are ignored,
//! except the tuning reference which falls back to 440 Hz.

use polyvox_core::{DEFAULT_REFERENCE_HZ, MAX_UNISON, sanitize_reference};

use crate::voice::{AllocationMode, MAX_VOICES, StealMode};

/// Largest pitch bend, in semitones, in either direction.
pub const MAX_PITCH_BEND_SEMITONES: f32 = 48.0;

/// Initial configuration for a [`VoiceAllocator`](crate::VoiceAllocator).
///
/// ## Parameters
/// - `voice_count`: Usable voice slots (`unison_count` to 32, default 32)
/// - `unison_count`: Voices stacked per note (1 to 8, at most `voice_count`, default 1)
/// - `unison_detune`: Detune spread (0.0 to 1.0, default 0.0); 1.0 puts the
///   outer unison voices ±50 cents from center
/// - `pitch_bend`: Global bend in semitones (-48.0 to 48.0, default 0.0)
/// - `tuning_reference`: A4 in Hz (400.0 to 480.0, default 440.0)
/// - `allocation_mode`: default [`AllocationMode::Oldest`]
/// - `steal_mode`: default [`StealMode::Hard`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AllocatorConfig {
    /// Usable voice slots
    pub voice_count: usize,
    /// Voices stacked per note
    pub unison_count: usize,
    /// Unison detune spread, 0.0 to 1.0
    pub unison_detune: f32,
    /// Pitch bend in semitones
    pub pitch_bend: f32,
    /// A4 reference in Hz
    pub tuning_reference: f32,
    /// Idle selection and stealing policy
    pub allocation_mode: AllocationMode,
    /// Stolen-voice behavior
    pub steal_mode: StealMode,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            voice_count: MAX_VOICES,
            unison_count: 1,
            unison_detune: 0.0,
            pitch_bend: 0.0,
            tuning_reference: DEFAULT_REFERENCE_HZ,
            allocation_mode: AllocationMode::Oldest,
            steal_mode: StealMode::Hard,
        }
    }
}

impl AllocatorConfig {
    /// Return a copy with every field inside its valid range.
    ///
    /// NaN/Inf detune and bend fall back to the defaults since there is no
    /// previous value to keep.
    pub fn sanitized(self) -> Self {
        let voice_count = self.voice_count.clamp(1, MAX_VOICES);
        Self {
            voice_count,
            unison_count: clamp_unison(self.unison_count, voice_count),
            unison_detune: clamp_detune(self.unison_detune).unwrap_or(0.0),
            pitch_bend: clamp_pitch_bend(self.pitch_bend).unwrap_or(0.0),
            tuning_reference: sanitize_reference(self.tuning_reference),
            ..self
        }
    }

    /// Effective polyphony: how many notes can sound at once.
    pub fn polyphony(&self) -> usize {
        self.voice_count / self.unison_count.max(1)
    }
}

#[inline]
pub(crate) fn clamp_unison(count: usize, voice_count: usize) -> usize {
    count.clamp(1, MAX_UNISON.min(voice_count).max(1))
}

#[inline]
pub(crate) fn clamp_voice_count(count: usize, unison_count: usize) -> usize {
    count.clamp(unison_count.max(1), MAX_VOICES)
}

#[inline]
pub(crate) fn clamp_detune(amount: f32) -> Option<f32> {
    amount.is_finite().then(|| amount.clamp(0.0, 1.0))
}

#[inline]
pub(crate) fn clamp_pitch_bend(semitones: f32) -> Option<f32> {
    semitones
        .is_finite()
        .then(|| semitones.clamp(-MAX_PITCH_BEND_SEMITONES, MAX_PITCH_BEND_SEMITONES))
}
