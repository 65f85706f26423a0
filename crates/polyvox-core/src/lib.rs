//! Polyvox Core - pitch primitives shared by the polyvox crates
//!
//! This crate holds the small, pure functions a voice allocator needs to turn
//! MIDI note numbers into oscillator frequencies. Everything here is
//! allocation-free and usable from a real-time audio thread.
//!
//! # Tuning
//!
//! 12-tone equal temperament against a configurable reference pitch:
//!
//! - [`midi_to_freq`] / [`freq_to_midi`] - Note number ↔ frequency
//! - [`semitones_to_ratio`] / [`cents_to_ratio`] - Interval ↔ frequency ratio
//! - [`sanitize_reference`] - Clamp a user supplied A4 reference
//!
//! ```rust
//! use polyvox_core::{midi_to_freq, semitones_to_ratio};
//!
//! let a4 = midi_to_freq(69, 440.0);
//! assert!((a4 - 440.0).abs() < 1e-3);
//!
//! // Bend up a whole tone
//! let bent = a4 * semitones_to_ratio(2.0);
//! assert!((bent - 493.88).abs() < 0.01);
//! ```
//!
//! # Unison
//!
//! - [`detune_cents`] - Symmetric detune offsets for stacked voices
//!
//! # no_std Support
//!
//! Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! polyvox-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod tuning;
pub mod unison;

pub use tuning::{
    DEFAULT_REFERENCE_HZ, MAX_REFERENCE_HZ, MIN_REFERENCE_HZ, cents_to_ratio, freq_to_midi,
    midi_to_freq, note_name, sanitize_reference, semitones_to_ratio,
};
pub use unison::{MAX_UNISON, detune_cents};
