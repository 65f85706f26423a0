//! Lock-free view of the voice table for observer threads.
//!
//! The allocator publishes each slot's state and note into a pair of atomic
//! words after every transition. A [`VoiceMonitor`] reads those words from
//! any thread without locking.
//!
//! # Consistency
//!
//! Every field is an independent `Relaxed` atomic. A reader never sees a torn
//! value, but two reads may straddle a mutation: the state of slot 3 and the
//! note of slot 3 can come from different calls, and
//! [`VoiceMonitor::active_voice_count`] is a sum of individual loads rather
//! than a snapshot. This is intended for meters and displays only.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicI8, AtomicU8, Ordering};

use crate::voice::{MAX_VOICES, VoiceState};

const NO_NOTE: i8 = -1;

/// Atomic state/note words shared between the allocator and its monitors.
#[derive(Debug)]
pub(crate) struct SharedStatus {
    states: [AtomicU8; MAX_VOICES],
    notes: [AtomicI8; MAX_VOICES],
}

impl SharedStatus {
    pub(crate) fn new() -> Self {
        Self {
            states: core::array::from_fn(|_| AtomicU8::new(VoiceState::Idle as u8)),
            notes: core::array::from_fn(|_| AtomicI8::new(NO_NOTE)),
        }
    }

    /// Publish one slot. Called only by the owning allocator.
    #[inline]
    pub(crate) fn publish(&self, index: usize, state: VoiceState, note: Option<u8>) {
        let raw_note = note.map_or(NO_NOTE, |n| n.min(127) as i8);
        self.notes[index].store(raw_note, Ordering::Relaxed);
        self.states[index].store(state as u8, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn state(&self, index: usize) -> VoiceState {
        self.states
            .get(index)
            .map_or(VoiceState::Idle, |s| VoiceState::from_raw(s.load(Ordering::Relaxed)))
    }

    #[inline]
    pub(crate) fn note(&self, index: usize) -> Option<u8> {
        let raw = self.notes.get(index)?.load(Ordering::Relaxed);
        u8::try_from(raw).ok()
    }

    pub(crate) fn active_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| s.load(Ordering::Relaxed) != VoiceState::Idle as u8)
            .count()
    }
}

/// Read-only, thread-safe handle onto an allocator's voice table.
///
/// Obtain one with [`VoiceAllocator::monitor`](crate::VoiceAllocator::monitor)
/// and move it to a UI or metering thread. All methods are wait-free and
/// never allocate.
///
/// ```rust
/// use polyvox_alloc::{VoiceAllocator, VoiceState};
///
/// let mut alloc = VoiceAllocator::new();
/// let monitor = alloc.monitor();
///
/// alloc.note_on(60, 100);
///
/// let handle = std::thread::spawn(move || monitor.active_voice_count());
/// assert_eq!(handle.join().unwrap(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct VoiceMonitor {
    status: Arc<SharedStatus>,
}

impl VoiceMonitor {
    pub(crate) fn new(status: Arc<SharedStatus>) -> Self {
        Self { status }
    }

    /// Note held by voice `index`, `None` when idle or out of range.
    #[inline]
    pub fn voice_note(&self, index: usize) -> Option<u8> {
        self.status.note(index)
    }

    /// State of voice `index`; out-of-range indices report `Idle`.
    #[inline]
    pub fn voice_state(&self, index: usize) -> VoiceState {
        self.status.state(index)
    }

    /// True when voice `index` is not idle.
    #[inline]
    pub fn is_voice_active(&self, index: usize) -> bool {
        self.status.state(index) != VoiceState::Idle
    }

    /// Number of non-idle voices (active or releasing).
    pub fn active_voice_count(&self) -> usize {
        self.status.active_count()
    }
}
