//! Polyvox Alloc - polyphonic voice allocation for real-time synthesizers
//!
//! This crate decides which of a fixed pool of voice slots plays which note.
//! It never touches audio: every call returns a short list of
//! [`VoiceEvent`]s that the caller applies to its own oscillators and
//! envelopes.
//!
//! # Core Components
//!
//! - [`VoiceAllocator`] - The allocator itself (up to [`MAX_VOICES`] slots)
//! - [`AllocatorConfig`] - Construction-time configuration
//! - [`VoiceEvent`] / [`VoiceEventKind`] - Instructions for the caller
//! - [`VoiceMonitor`] - Lock-free read-only view for UI threads
//! - [`AllocationMode`] / [`StealMode`] - Policy selectors
//!
//! # Real-Time Contract
//!
//! After construction no method allocates, locks or blocks, and every loop is
//! bounded by the slot table size. Mutations come from a single thread; any
//! number of [`VoiceMonitor`]s may read concurrently.
//!
//! # Example
//!
//! ```rust
//! use polyvox_alloc::{AllocatorConfig, StealMode, VoiceAllocator, VoiceEventKind};
//!
//! let mut alloc = VoiceAllocator::with_config(AllocatorConfig {
//!     voice_count: 8,
//!     unison_count: 2,
//!     unison_detune: 0.3,
//!     steal_mode: StealMode::Soft,
//!     ..Default::default()
//! });
//!
//! // One note, two detuned voices
//! let events = alloc.note_on(60, 100);
//! assert_eq!(events.len(), 2);
//! assert!(events.iter().all(|e| e.kind == VoiceEventKind::NoteOn));
//!
//! // Both voices release together
//! let voices: Vec<usize> = alloc.note_off(60).iter().map(|e| e.voice).collect();
//! assert_eq!(voices.len(), 2);
//!
//! // The caller reports the end of each release tail
//! for voice in voices {
//!     alloc.voice_finished(voice);
//! }
//! assert_eq!(alloc.active_voice_count(), 0);
//! ```
//!
//! # Feature Flags
//!
//! - `std` (default) - Enables `std` in `polyvox-core`
//! - `tracing` - Emits `tracing` events on steals and configuration changes

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod allocator;
pub mod config;
pub mod event;
pub mod monitor;
pub mod voice;

pub use allocator::VoiceAllocator;
pub use config::{AllocatorConfig, MAX_PITCH_BEND_SEMITONES};
pub use event::{MAX_EVENTS, VoiceEvent, VoiceEventKind};
pub use monitor::VoiceMonitor;
pub use voice::{AllocationMode, MAX_VOICES, StealMode, VoiceSlot, VoiceState};

pub use polyvox_core::MAX_UNISON;
