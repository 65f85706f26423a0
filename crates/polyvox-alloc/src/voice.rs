//! Voice slot state and the allocation/stealing selectors.

/// Hard upper bound on the number of voice slots.
pub const MAX_VOICES: usize = 32;

/// Lifecycle state of a single voice slot.
///
/// `Idle → Active → Releasing → Idle`, plus `Releasing → Active` and
/// `Active → Active` when the same note is retriggered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VoiceState {
    /// Free for allocation
    #[default]
    Idle = 0,
    /// Gate held, note sounding
    Active = 1,
    /// Gate released, waiting for the caller to report the end of the release tail
    Releasing = 2,
}

impl VoiceState {
    /// Decode a state previously stored with `as u8`.
    ///
    /// Unknown values decode to `Idle`.
    #[inline]
    pub(crate) fn from_raw(raw: u8) -> Self {
        match raw {
            1 => VoiceState::Active,
            2 => VoiceState::Releasing,
            _ => VoiceState::Idle,
        }
    }
}

/// How idle voices are picked and which voice is stolen when none are free.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AllocationMode {
    /// Cycle a persistent cursor through the voices in index order
    RoundRobin,
    /// Steal the voice that was triggered longest ago (default)
    #[default]
    Oldest,
    /// Steal the quietest-played voice, oldest first on ties
    LowestVelocity,
    /// Steal the highest-pitched voice, oldest first on ties
    HighestNote,
}

/// What a stolen voice is told before it is reassigned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StealMode {
    /// Silence the old note immediately (`Steal` event), then start the new one
    #[default]
    Hard,
    /// Release the old note (`NoteOff` carrying the old note), then start the new one;
    /// the caller crossfades the two
    Soft,
}

/// One entry of the allocator's fixed voice table.
///
/// A slot's identity is its index in the table. Slots are never created or
/// destroyed after construction, only reassigned.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VoiceSlot {
    pub(crate) state: VoiceState,
    pub(crate) note: u8,
    pub(crate) velocity: u8,
    pub(crate) frequency: f32,
    pub(crate) timestamp: u64,
    /// Position inside the unison group (0 when unison is off)
    pub(crate) unison_position: u8,
}

impl VoiceSlot {
    /// Current lifecycle state.
    pub fn state(&self) -> VoiceState {
        self.state
    }

    /// Note held by this slot, `None` while idle.
    pub fn note(&self) -> Option<u8> {
        (!self.is_idle()).then_some(self.note)
    }

    /// Velocity of the current note (0 while idle).
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Frequency in Hz including tuning, pitch bend and unison detune (0.0 while idle).
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Allocation counter value of the last (re)trigger.
    ///
    /// Only meaningful relative to other slots' timestamps.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Position of this slot inside its unison group.
    pub fn unison_position(&self) -> usize {
        self.unison_position as usize
    }

    /// True when the slot is free.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.state == VoiceState::Idle
    }

    /// Return to `Idle`. The timestamp is kept for least-recently-used idle
    /// selection.
    pub(crate) fn clear(&mut self) {
        self.state = VoiceState::Idle;
        self.note = 0;
        self.velocity = 0;
        self.frequency = 0.0;
        self.unison_position = 0;
    }
}
