//! Polyphonic voice allocator with unison groups and two stealing behaviors.
//!
//! The allocator owns a fixed table of [`MAX_VOICES`] slots and answers every
//! mutating call with a short list of [`VoiceEvent`]s describing what the
//! caller's real voices must do. Nothing here allocates after construction,
//! locks, or loops over anything but the fixed slot table.
//!
//! ## Note-on order of precedence
//!
//! 1. Retrigger: a full group already holding the note is restarted in place
//!    (`Steal` + `NoteOn` per slot).
//! 2. Idle: if at least `unison_count` in-range slots are idle, they are
//!    assigned according to the [`AllocationMode`].
//! 3. Steal: idle and releasing slots are reused before any active group is
//!    touched. Within a class the mode comparator decides, then the oldest
//!    timestamp, then the lowest index.
//!
//! ## Unison groups
//!
//! All slots of one group share the trigger timestamp. The timestamp is
//! therefore both the age and the identity of a group.

use alloc::sync::Arc;

use polyvox_core::{
    MAX_UNISON, cents_to_ratio, detune_cents, midi_to_freq, sanitize_reference, semitones_to_ratio,
};

use crate::config::{
    AllocatorConfig, clamp_detune, clamp_pitch_bend, clamp_unison, clamp_voice_count,
};
use crate::event::{EventBuffer, VoiceEvent, VoiceEventKind};
use crate::monitor::{SharedStatus, VoiceMonitor};
use crate::voice::{AllocationMode, MAX_VOICES, StealMode, VoiceSlot, VoiceState};

/// Slot indices picked for one note, one per unison position.
type Group = [usize; MAX_UNISON];

/// Ranking of a steal candidate. The smallest key is stolen first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct VictimKey {
    /// 0 idle, 1 releasing, 2 active
    class: u8,
    /// Mode comparator, lower is stolen first
    metric: u32,
    timestamp: u64,
    index: usize,
}

/// Polyphonic voice allocator.
///
/// Maps note-on/note-off events onto up to [`MAX_VOICES`] voice slots and
/// reports the resulting instructions as [`VoiceEvent`]s. The returned slice
/// borrows the allocator's internal buffer, so it must be consumed before the
/// next mutating call.
///
/// # Example
///
/// ```rust
/// use polyvox_alloc::{AllocationMode, VoiceAllocator, VoiceEventKind};
///
/// let mut alloc = VoiceAllocator::new();
/// alloc.set_voice_count(2);
/// alloc.set_allocation_mode(AllocationMode::Oldest);
///
/// alloc.note_on(60, 100);
/// alloc.note_on(64, 100);
///
/// // Pool exhausted: the oldest note (60, voice 0) is stolen
/// let events = alloc.note_on(67, 100);
/// assert_eq!(events[0].kind, VoiceEventKind::Steal);
/// assert_eq!(events[0].voice, 0);
/// assert_eq!(events[1].kind, VoiceEventKind::NoteOn);
/// assert_eq!(events[1].note, 67);
/// ```
#[derive(Debug)]
pub struct VoiceAllocator {
    slots: [VoiceSlot; MAX_VOICES],
    events: EventBuffer,
    status: Arc<SharedStatus>,

    voice_count: usize,
    unison_count: usize,
    unison_detune: f32,
    pitch_bend: f32,
    tuning_reference: f32,
    allocation_mode: AllocationMode,
    steal_mode: StealMode,

    /// Global trigger counter
    timestamp_counter: u64,
    /// Round-robin cursor
    round_robin_idx: usize,
}

impl Default for VoiceAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceAllocator {
    /// Create an allocator with the default configuration (32 voices, no unison).
    pub fn new() -> Self {
        Self::with_config(AllocatorConfig::default())
    }

    /// Create an allocator from `config`, clamping out-of-range fields.
    pub fn with_config(config: AllocatorConfig) -> Self {
        let config = config.sanitized();
        Self {
            slots: [VoiceSlot::default(); MAX_VOICES],
            events: EventBuffer::new(),
            status: Arc::new(SharedStatus::new()),
            voice_count: config.voice_count,
            unison_count: config.unison_count,
            unison_detune: config.unison_detune,
            pitch_bend: config.pitch_bend,
            tuning_reference: config.tuning_reference,
            allocation_mode: config.allocation_mode,
            steal_mode: config.steal_mode,
            timestamp_counter: 0,
            round_robin_idx: 0,
        }
    }

    /// Handle onto the voice table that other threads can query.
    pub fn monitor(&self) -> VoiceMonitor {
        VoiceMonitor::new(Arc::clone(&self.status))
    }

    // ------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------

    /// Start `note` at `velocity`.
    ///
    /// Velocity 0 is treated as a note-off. Values above 127 are clamped.
    pub fn note_on(&mut self, note: u8, velocity: u8) -> &[VoiceEvent] {
        self.events.clear();
        let note = note.min(127);
        let velocity = velocity.min(127);

        if velocity == 0 {
            self.release_note(note);
            return self.events.as_slice();
        }

        let count = self.unison_count;
        let mut group: Group = [0; MAX_UNISON];

        if self.find_retrigger_group(note, &mut group) {
            self.retrigger(&group[..count], note, velocity);
        } else if self.collect_idle(&mut group) {
            let timestamp = self.next_timestamp();
            for (position, &index) in group[..count].iter().enumerate() {
                self.activate(index, note, velocity, position, timestamp);
                self.emit(VoiceEventKind::NoteOn, index);
            }
        } else {
            let found = self.select_victims(&mut group);
            if found == count {
                self.steal(&group[..found], note, velocity);
            }
        }

        self.events.as_slice()
    }

    /// Release every active slot playing `note`.
    ///
    /// Returns one `NoteOff` per released slot, or nothing if the note is not
    /// currently held.
    pub fn note_off(&mut self, note: u8) -> &[VoiceEvent] {
        self.events.clear();
        self.release_note(note.min(127));
        self.events.as_slice()
    }

    /// Report that the release tail of voice `index` has finished.
    ///
    /// Only a releasing slot returns to idle; any other call is ignored.
    /// Never produces events.
    pub fn voice_finished(&mut self, index: usize) -> &[VoiceEvent] {
        self.events.clear();
        if self
            .slots
            .get(index)
            .is_some_and(|s| s.state == VoiceState::Releasing)
        {
            self.make_idle(index);
        }
        self.events.as_slice()
    }

    /// Release every active slot.
    pub fn all_notes_off(&mut self) -> &[VoiceEvent] {
        self.events.clear();
        for index in 0..MAX_VOICES {
            if self.slots[index].state == VoiceState::Active {
                self.release(index);
            }
        }
        self.events.as_slice()
    }

    /// Force every slot back to idle without emitting events.
    ///
    /// Clears the trigger counter and round-robin cursor. Configuration is kept.
    /// Never produces events; [`events`](Self::events) is empty afterwards.
    pub fn reset(&mut self) {
        self.events.clear();
        for index in 0..MAX_VOICES {
            self.slots[index] = VoiceSlot::default();
            self.status.publish(index, VoiceState::Idle, None);
        }
        self.timestamp_counter = 0;
        self.round_robin_idx = 0;
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Set the idle-selection and stealing policy.
    ///
    /// Never produces events; [`events`](Self::events) is empty afterwards.
    pub fn set_allocation_mode(&mut self, mode: AllocationMode) {
        self.events.clear();
        self.allocation_mode = mode;
    }

    /// Set how stolen voices are treated.
    ///
    /// Never produces events; [`events`](Self::events) is empty afterwards.
    pub fn set_steal_mode(&mut self, mode: StealMode) {
        self.events.clear();
        self.steal_mode = mode;
    }

    /// Set the number of usable voices.
    ///
    /// Range: `unison_count` to [`MAX_VOICES`]. Shrinking releases every
    /// active group with a member at or above the new count and returns the
    /// resulting `NoteOff`s. Growing makes the new slots available at once.
    pub fn set_voice_count(&mut self, count: usize) -> &[VoiceEvent] {
        self.events.clear();
        let count = clamp_voice_count(count, self.unison_count);

        for index in count..self.voice_count {
            if self.slots[index].state != VoiceState::Active {
                continue;
            }
            let timestamp = self.slots[index].timestamp;
            for member in 0..MAX_VOICES {
                let slot = &self.slots[member];
                if slot.state == VoiceState::Active && slot.timestamp == timestamp {
                    self.release(member);
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            from = self.voice_count,
            to = count,
            released = self.events.as_slice().len(),
            "voice count changed"
        );

        self.voice_count = count;
        if self.round_robin_idx >= count {
            self.round_robin_idx = 0;
        }
        self.events.as_slice()
    }

    /// Set the number of voices stacked on each note.
    ///
    /// Range: 1 to `min(8, voice_count)`. Changing the count silences every
    /// sounding slot (`Steal` event) and returns it to idle, since existing
    /// groups no longer have the right size.
    pub fn set_unison_count(&mut self, count: usize) -> &[VoiceEvent] {
        self.events.clear();
        let count = clamp_unison(count, self.voice_count);
        if count == self.unison_count {
            return self.events.as_slice();
        }

        for index in 0..MAX_VOICES {
            if !self.slots[index].is_idle() {
                self.emit(VoiceEventKind::Steal, index);
                self.make_idle(index);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(from = self.unison_count, to = count, "unison count changed");

        self.unison_count = count;
        self.events.as_slice()
    }

    /// Set unison detune spread (0.0 to 1.0). NaN/Inf are ignored.
    ///
    /// Frequencies of sounding voices are updated in place. Never produces
    /// events; [`events`](Self::events) is empty afterwards.
    pub fn set_unison_detune(&mut self, amount: f32) {
        self.events.clear();
        if let Some(amount) = clamp_detune(amount) {
            self.unison_detune = amount;
            self.retune();
        }
    }

    /// Set pitch bend in semitones (-48.0 to 48.0). NaN/Inf are ignored.
    ///
    /// Frequencies of sounding voices are updated in place. Never produces
    /// events; [`events`](Self::events) is empty afterwards.
    pub fn set_pitch_bend(&mut self, semitones: f32) {
        self.events.clear();
        if let Some(semitones) = clamp_pitch_bend(semitones) {
            self.pitch_bend = semitones;
            self.retune();
        }
    }

    /// Set the A4 reference (400.0 to 480.0 Hz). NaN/Inf reset it to 440 Hz.
    ///
    /// Frequencies of sounding voices are updated in place. Never produces
    /// events; [`events`](Self::events) is empty afterwards.
    pub fn set_tuning_reference(&mut self, hz: f32) {
        self.events.clear();
        self.tuning_reference = sanitize_reference(hz);
        self.retune();
    }

    /// Current allocation mode.
    pub fn allocation_mode(&self) -> AllocationMode {
        self.allocation_mode
    }

    /// Current steal mode.
    pub fn steal_mode(&self) -> StealMode {
        self.steal_mode
    }

    /// Number of usable voices.
    pub fn voice_count(&self) -> usize {
        self.voice_count
    }

    /// Voices stacked per note.
    pub fn unison_count(&self) -> usize {
        self.unison_count
    }

    /// Notes that can sound at once (`voice_count / unison_count`).
    pub fn polyphony(&self) -> usize {
        self.voice_count / self.unison_count
    }

    /// Unison detune spread.
    pub fn unison_detune(&self) -> f32 {
        self.unison_detune
    }

    /// Pitch bend in semitones.
    pub fn pitch_bend(&self) -> f32 {
        self.pitch_bend
    }

    /// A4 reference in Hz.
    pub fn tuning_reference(&self) -> f32 {
        self.tuning_reference
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> AllocatorConfig {
        AllocatorConfig {
            voice_count: self.voice_count,
            unison_count: self.unison_count,
            unison_detune: self.unison_detune,
            pitch_bend: self.pitch_bend,
            tuning_reference: self.tuning_reference,
            allocation_mode: self.allocation_mode,
            steal_mode: self.steal_mode,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Note held by voice `index`, `None` when idle or out of range.
    pub fn voice_note(&self, index: usize) -> Option<u8> {
        self.status.note(index)
    }

    /// State of voice `index`; out-of-range indices report `Idle`.
    pub fn voice_state(&self, index: usize) -> VoiceState {
        self.status.state(index)
    }

    /// True when voice `index` is not idle.
    pub fn is_voice_active(&self, index: usize) -> bool {
        self.voice_state(index) != VoiceState::Idle
    }

    /// Number of non-idle voices (active or releasing).
    pub fn active_voice_count(&self) -> usize {
        self.status.active_count()
    }

    /// Frequency of voice `index`, `None` when idle or out of range.
    pub fn voice_frequency(&self, index: usize) -> Option<f32> {
        self.slots
            .get(index)
            .filter(|s| !s.is_idle())
            .map(VoiceSlot::frequency)
    }

    /// Velocity of voice `index`, `None` when idle or out of range.
    pub fn voice_velocity(&self, index: usize) -> Option<u8> {
        self.slots
            .get(index)
            .filter(|s| !s.is_idle())
            .map(VoiceSlot::velocity)
    }

    /// The whole slot table, including slots beyond `voice_count`.
    pub fn slots(&self) -> &[VoiceSlot] {
        &self.slots
    }

    /// Events produced by the most recent mutating call.
    pub fn events(&self) -> &[VoiceEvent] {
        self.events.as_slice()
    }

    // ------------------------------------------------------------------
    // Slot transitions
    // ------------------------------------------------------------------

    fn next_timestamp(&mut self) -> u64 {
        self.timestamp_counter += 1;
        self.timestamp_counter
    }

    fn frequency_for(&self, note: u8, position: usize) -> f32 {
        let detune = detune_cents(position, self.unison_count, self.unison_detune);
        midi_to_freq(note, self.tuning_reference)
            * semitones_to_ratio(self.pitch_bend)
            * cents_to_ratio(detune)
    }

    fn activate(&mut self, index: usize, note: u8, velocity: u8, position: usize, timestamp: u64) {
        let frequency = self.frequency_for(note, position);
        let slot = &mut self.slots[index];
        slot.state = VoiceState::Active;
        slot.note = note;
        slot.velocity = velocity;
        slot.frequency = frequency;
        slot.timestamp = timestamp;
        slot.unison_position = position as u8;
        self.status.publish(index, VoiceState::Active, Some(note));
    }

    fn release(&mut self, index: usize) {
        self.slots[index].state = VoiceState::Releasing;
        self.status
            .publish(index, VoiceState::Releasing, Some(self.slots[index].note));
        self.emit(VoiceEventKind::NoteOff, index);
    }

    fn make_idle(&mut self, index: usize) {
        self.slots[index].clear();
        self.status.publish(index, VoiceState::Idle, None);
    }

    /// Push an event describing slot `index` as it is right now.
    fn emit(&mut self, kind: VoiceEventKind, index: usize) {
        let slot = self.slots[index];
        self.events.push(VoiceEvent {
            kind,
            voice: index,
            note: slot.note,
            velocity: slot.velocity,
            frequency: slot.frequency,
        });
    }

    fn release_note(&mut self, note: u8) {
        for index in 0..MAX_VOICES {
            let slot = &self.slots[index];
            if slot.state == VoiceState::Active && slot.note == note {
                self.release(index);
            }
        }
    }

    fn retune(&mut self) {
        for index in 0..MAX_VOICES {
            let slot = self.slots[index];
            if !slot.is_idle() {
                self.slots[index].frequency =
                    self.frequency_for(slot.note, slot.unison_position as usize);
            }
        }
    }

    fn retrigger(&mut self, group: &[usize], note: u8, velocity: u8) {
        let timestamp = self.next_timestamp();
        for &index in group {
            self.emit(VoiceEventKind::Steal, index);
            let position = self.slots[index].unison_position as usize;
            self.activate(index, note, velocity, position, timestamp);
            self.emit(VoiceEventKind::NoteOn, index);
        }
    }

    fn steal(&mut self, victims: &[usize], note: u8, velocity: u8) {
        let timestamp = self.next_timestamp();
        let kind = match self.steal_mode {
            StealMode::Hard => VoiceEventKind::Steal,
            StealMode::Soft => VoiceEventKind::NoteOff,
        };

        for (position, &index) in victims.iter().enumerate() {
            if !self.slots[index].is_idle() {
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    voice = index,
                    old_note = self.slots[index].note,
                    new_note = note,
                    "voice stolen"
                );
                self.emit(kind, index);
            }
            self.activate(index, note, velocity, position, timestamp);
            self.emit(VoiceEventKind::NoteOn, index);
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Collect the non-idle slots triggered at `timestamp`.
    ///
    /// Returns `None` if any member lies beyond `voice_count`, since such a
    /// group can be neither retriggered nor stolen as a whole.
    fn collect_group(&self, timestamp: u64, out: &mut Group) -> Option<usize> {
        let mut count = 0;
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.is_idle() || slot.timestamp != timestamp {
                continue;
            }
            if index >= self.voice_count || count == MAX_UNISON {
                return None;
            }
            out[count] = index;
            count += 1;
        }
        Some(count)
    }

    /// Find the newest complete group holding `note`.
    fn find_retrigger_group(&self, note: u8, out: &mut Group) -> bool {
        let mut best: Option<u64> = None;
        let mut scratch: Group = [0; MAX_UNISON];

        // Releasing slots left above voice_count by a shrink are not revived;
        // reusing them would exceed the current capacity.
        for slot in &self.slots[..self.voice_count] {
            if slot.is_idle() || slot.note != note {
                continue;
            }
            if best.is_some_and(|ts| ts >= slot.timestamp) {
                continue;
            }
            if self.collect_group(slot.timestamp, &mut scratch) == Some(self.unison_count) {
                best = Some(slot.timestamp);
                *out = scratch;
            }
        }
        best.is_some()
    }

    /// Pick `unison_count` idle slots, or return false if there are not enough.
    fn collect_idle(&mut self, out: &mut Group) -> bool {
        let count = self.unison_count;
        let available = self.slots[..self.voice_count]
            .iter()
            .filter(|s| s.is_idle())
            .count();
        if available < count {
            return false;
        }

        if self.allocation_mode == AllocationMode::RoundRobin {
            let mut found = 0;
            for step in 0..self.voice_count {
                let index = (self.round_robin_idx + step) % self.voice_count;
                if self.slots[index].is_idle() {
                    out[found] = index;
                    found += 1;
                    if found == count {
                        self.round_robin_idx = (index + 1) % self.voice_count;
                        break;
                    }
                }
            }
            return found == count;
        }

        // Least recently triggered first, lowest index on ties
        let mut taken = 0u32;
        for position in 0..count {
            let pick = self.slots[..self.voice_count]
                .iter()
                .enumerate()
                .filter(|(i, s)| s.is_idle() && taken & (1 << *i) == 0)
                .min_by_key(|(i, s)| (s.timestamp, *i))
                .map(|(i, _)| i);
            let Some(index) = pick else {
                return false;
            };
            taken |= 1 << index;
            out[position] = index;
        }
        true
    }

    fn cursor_distance(&self, index: usize) -> usize {
        (index + self.voice_count - self.round_robin_idx) % self.voice_count
    }

    fn victim_key(&self, members: &[usize]) -> VictimKey {
        let lead = self.slots[members[0]];
        let class = match lead.state {
            VoiceState::Idle => 0,
            VoiceState::Releasing => 1,
            VoiceState::Active => 2,
        };
        let metric = match self.allocation_mode {
            AllocationMode::RoundRobin => members
                .iter()
                .map(|&i| self.cursor_distance(i))
                .min()
                .unwrap_or(0) as u32,
            AllocationMode::Oldest => 0,
            AllocationMode::LowestVelocity => u32::from(lead.velocity),
            AllocationMode::HighestNote => u32::from(127u8.saturating_sub(lead.note)),
        };
        VictimKey {
            class,
            metric,
            timestamp: lead.timestamp,
            index: members.iter().copied().min().unwrap_or(members[0]),
        }
    }

    /// Choose the slots to steal for a new note. Returns how many were found.
    ///
    /// Idle and releasing slots are used whenever there are enough of them;
    /// only otherwise is a whole active group taken.
    fn select_victims(&mut self, out: &mut Group) -> usize {
        let count = self.unison_count;
        let pool = self.slots[..self.voice_count]
            .iter()
            .filter(|s| s.state != VoiceState::Active)
            .count();

        let found = if pool >= count {
            self.select_from_pool(out)
        } else {
            self.select_active_group(out)
        };

        if self.allocation_mode == AllocationMode::RoundRobin {
            if let Some(nearest) = out[..found]
                .iter()
                .copied()
                .min_by_key(|&i| self.cursor_distance(i))
            {
                self.round_robin_idx = (nearest + 1) % self.voice_count;
            }
        }
        found
    }

    /// Fill `out` from idle slots and releasing groups, best ranked first.
    ///
    /// A releasing group is taken as a unit; only the last one picked may
    /// be cut short.
    fn select_from_pool(&self, out: &mut Group) -> usize {
        let count = self.unison_count;
        let mut taken = 0u32;
        let mut found = 0;

        while found < count {
            let lead = (0..self.voice_count)
                .filter(|&i| taken & (1 << i) == 0 && self.slots[i].state != VoiceState::Active)
                .min_by_key(|&i| self.victim_key(&[i]));
            let Some(lead) = lead else {
                break;
            };

            let lead_slot = self.slots[lead];
            for index in 0..self.voice_count {
                if found == count {
                    break;
                }
                let slot = &self.slots[index];
                let same_unit = index == lead
                    || (lead_slot.state == VoiceState::Releasing
                        && slot.state == VoiceState::Releasing
                        && slot.timestamp == lead_slot.timestamp);
                if same_unit && taken & (1 << index) == 0 {
                    taken |= 1 << index;
                    out[found] = index;
                    found += 1;
                }
            }
        }
        found
    }

    /// Fill `out` with the best complete active group.
    fn select_active_group(&self, out: &mut Group) -> usize {
        let count = self.unison_count;
        let mut best: Option<(VictimKey, u64)> = None;
        let mut scratch: Group = [0; MAX_UNISON];

        for (index, slot) in self.slots[..self.voice_count].iter().enumerate() {
            if slot.state != VoiceState::Active {
                continue;
            }
            // Visit each group once, through its lowest-index member
            if self.slots[..index]
                .iter()
                .any(|s| s.state == VoiceState::Active && s.timestamp == slot.timestamp)
            {
                continue;
            }
            if self.collect_group(slot.timestamp, &mut scratch) != Some(count) {
                continue;
            }
            let key = self.victim_key(&scratch[..count]);
            if best.is_none_or(|(current, _)| key < current) {
                best = Some((key, slot.timestamp));
            }
        }

        best.and_then(|(_, timestamp)| self.collect_group(timestamp, out))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use alloc::{vec, vec::Vec};

    use super::*;

    fn alloc_with(voices: usize, mode: AllocationMode) -> VoiceAllocator {
        VoiceAllocator::with_config(AllocatorConfig {
            voice_count: voices,
            allocation_mode: mode,
            ..Default::default()
        })
    }

    #[test]
    fn test_basic_allocation() {
        let mut alloc = alloc_with(4, AllocationMode::Oldest);

        let events = alloc.note_on(60, 100);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, VoiceEventKind::NoteOn);
        assert_eq!(events[0].voice, 0);
        assert_eq!(alloc.active_voice_count(), 1);

        let events = alloc.note_on(64, 90);
        assert_eq!(events[0].voice, 1);
        assert_eq!(events[0].velocity, 90);
        assert_eq!(alloc.active_voice_count(), 2);
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let mut alloc = alloc_with(4, AllocationMode::Oldest);
        alloc.note_on(60, 100);
        alloc.note_on(62, 100);
        alloc.note_on(60, 100); // retrigger bumps too
        let ts: Vec<u64> = alloc.slots()[..2].iter().map(VoiceSlot::timestamp).collect();
        assert!(ts[0] > ts[1], "retriggered slot is newest: {ts:?}");
    }

    #[test]
    fn test_release_and_finish() {
        let mut alloc = VoiceAllocator::new();
        alloc.note_on(60, 100);

        let events = alloc.note_off(60);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, VoiceEventKind::NoteOff);
        assert_eq!(alloc.voice_state(0), VoiceState::Releasing);

        // Voice still counts until the caller reports the tail finished
        assert_eq!(alloc.active_voice_count(), 1);

        assert!(alloc.voice_finished(0).is_empty());
        assert_eq!(alloc.voice_state(0), VoiceState::Idle);
        assert_eq!(alloc.voice_note(0), None);
    }

    #[test]
    fn test_voice_finished_ignores_non_releasing() {
        let mut alloc = VoiceAllocator::new();
        alloc.note_on(60, 100);

        alloc.voice_finished(0);
        assert_eq!(alloc.voice_state(0), VoiceState::Active);

        alloc.voice_finished(5);
        alloc.voice_finished(MAX_VOICES + 3);
        assert_eq!(alloc.active_voice_count(), 1);
    }

    #[test]
    fn test_round_robin_cursor_persists() {
        let mut alloc = alloc_with(4, AllocationMode::RoundRobin);

        alloc.note_on(60, 100);
        alloc.note_off(60);
        alloc.voice_finished(0);

        // Slot 0 is idle again but the cursor has moved on
        let events = alloc.note_on(62, 100);
        assert_eq!(events[0].voice, 1);
    }

    #[test]
    fn test_round_robin_steal_cycles() {
        let mut alloc = alloc_with(3, AllocationMode::RoundRobin);
        for note in [60, 62, 64] {
            alloc.note_on(note, 100);
        }

        let stolen: Vec<usize> = [70, 71, 72, 73]
            .iter()
            .map(|&n| alloc.note_on(n, 100)[0].voice)
            .collect();
        assert_eq!(stolen, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_oldest_idle_prefers_least_recently_used() {
        let mut alloc = alloc_with(3, AllocationMode::Oldest);
        alloc.note_on(60, 100); // voice 0
        alloc.note_on(62, 100); // voice 1
        alloc.note_off(60);
        alloc.note_off(62);
        alloc.voice_finished(1);
        alloc.voice_finished(0);

        // Voice 2 has never been used, then voice 0 is older than voice 1
        assert_eq!(alloc.note_on(64, 100)[0].voice, 2);
        assert_eq!(alloc.note_on(65, 100)[0].voice, 0);
        assert_eq!(alloc.note_on(67, 100)[0].voice, 1);
    }

    #[test]
    fn test_highest_note_steal() {
        let mut alloc = alloc_with(3, AllocationMode::HighestNote);
        alloc.note_on(60, 100);
        alloc.note_on(72, 100);
        alloc.note_on(65, 100);

        let events = alloc.note_on(50, 100);
        assert_eq!(events[0].kind, VoiceEventKind::Steal);
        assert_eq!(events[0].note, 72);
        assert_eq!(events[1].voice, 1);
    }

    #[test]
    fn test_highest_note_steals_whole_group() {
        let mut alloc = alloc_with(4, AllocationMode::HighestNote);
        alloc.set_unison_count(2);
        alloc.note_on(60, 100);
        alloc.note_on(72, 100);

        let events = alloc.note_on(40, 100);
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| e.kind != VoiceEventKind::Steal || e.note == 72));
    }

    #[test]
    fn test_soft_steal_reports_old_note() {
        let mut alloc = alloc_with(1, AllocationMode::Oldest);
        alloc.set_steal_mode(StealMode::Soft);
        alloc.note_on(60, 80);

        let events = alloc.note_on(67, 110);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, VoiceEventKind::NoteOff);
        assert_eq!(events[0].note, 60);
        assert_eq!(events[0].velocity, 80);
        assert_eq!(events[1].kind, VoiceEventKind::NoteOn);
        assert_eq!(events[1].note, 67);

        assert_eq!(alloc.voice_note(0), Some(67));
        assert_eq!(alloc.voice_state(0), VoiceState::Active);

        // The new note gates normally
        assert_eq!(alloc.note_off(67).len(), 1);
    }

    #[test]
    fn test_velocity_zero_releases() {
        let mut alloc = VoiceAllocator::new();
        alloc.note_on(60, 100);
        let events = alloc.note_on(60, 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, VoiceEventKind::NoteOff);
    }

    #[test]
    fn test_note_and_velocity_clamped() {
        let mut alloc = VoiceAllocator::new();
        let events = alloc.note_on(200, 255);
        assert_eq!(events[0].note, 127);
        assert_eq!(events[0].velocity, 127);
    }

    #[test]
    fn test_unison_group_frequencies() {
        let mut alloc = VoiceAllocator::new();
        alloc.set_unison_count(3);
        alloc.set_unison_detune(1.0);

        let events = alloc.note_on(69, 100);
        assert_eq!(events.len(), 3);
        let expected = [-50.0f32, 0.0, 50.0];
        for (event, cents) in events.iter().zip(expected) {
            let want = 440.0 * cents_to_ratio(cents);
            assert!((event.frequency - want).abs() < 0.01, "{} vs {want}", event.frequency);
        }
    }

    #[test]
    fn test_pitch_bend_retunes_in_place() {
        let mut alloc = VoiceAllocator::new();
        alloc.note_on(69, 100);
        alloc.set_pitch_bend(12.0);
        let freq = alloc.voice_frequency(0).unwrap();
        assert!((freq - 880.0).abs() < 0.05, "got {freq}");

        alloc.set_pitch_bend(f32::NAN);
        assert_eq!(alloc.pitch_bend(), 12.0);
    }

    #[test]
    fn test_tuning_reference_nan_resets() {
        let mut alloc = VoiceAllocator::new();
        alloc.set_tuning_reference(432.0);
        assert_eq!(alloc.tuning_reference(), 432.0);
        alloc.set_tuning_reference(f32::NAN);
        assert_eq!(alloc.tuning_reference(), 440.0);
    }

    #[test]
    fn test_unison_change_silences_everything() {
        let mut alloc = alloc_with(8, AllocationMode::Oldest);
        alloc.note_on(60, 100);
        alloc.note_on(64, 100);
        alloc.note_off(64);

        let events = alloc.set_unison_count(2);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == VoiceEventKind::Steal));
        assert_eq!(alloc.active_voice_count(), 0);

        // Same value again is a no-op
        assert!(alloc.set_unison_count(2).is_empty());
    }

    #[test]
    fn test_voice_count_floor_is_unison_count() {
        let mut alloc = VoiceAllocator::new();
        alloc.set_unison_count(4);
        alloc.set_voice_count(2);
        assert_eq!(alloc.voice_count(), 4);
        assert_eq!(alloc.polyphony(), 1);
    }

    #[test]
    fn test_shrink_releases_straddling_group() {
        let mut alloc = alloc_with(4, AllocationMode::Oldest);
        alloc.set_unison_count(2);
        alloc.note_on(60, 100); // 0, 1
        alloc.note_on(62, 100); // 2, 3

        let events = alloc.set_voice_count(3);
        let released: Vec<usize> = events.iter().map(|e| e.voice).collect();
        assert_eq!(released, vec![2, 3]);
        assert_eq!(alloc.voice_state(0), VoiceState::Active);
    }

    #[test]
    fn test_partial_releasing_group_pooled_with_idle() {
        let mut alloc = alloc_with(4, AllocationMode::Oldest);
        alloc.set_unison_count(2);
        alloc.note_on(60, 100); // 0, 1
        alloc.note_on(62, 100); // 2, 3
        alloc.note_off(60);
        alloc.voice_finished(0); // voice 1 is still releasing

        // One idle plus one releasing slot beats stealing the active group
        let events = alloc.note_on(64, 100);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, VoiceEventKind::NoteOn);
        assert_eq!(events[0].voice, 0);
        assert_eq!(events[1].kind, VoiceEventKind::Steal);
        assert_eq!(events[1].voice, 1);
        assert_eq!(alloc.voice_note(2), Some(62));
        assert_eq!(alloc.voice_note(3), Some(62));
    }

    #[test]
    fn test_releasing_leftovers_after_shrink_are_stolen() {
        let mut alloc = alloc_with(4, AllocationMode::Oldest);
        alloc.set_unison_count(2);
        alloc.note_on(60, 100); // 0, 1
        alloc.note_on(62, 100); // 2, 3
        alloc.note_off(60);
        alloc.set_voice_count(3); // releases 2 and 3

        // In range: 0, 1 releasing (older) and 2 releasing; 3 is out of range
        let events = alloc.note_on(64, 100);
        let on: Vec<usize> = events
            .iter()
            .filter(|e| e.kind == VoiceEventKind::NoteOn)
            .map(|e| e.voice)
            .collect();
        assert_eq!(on, vec![0, 1]);
        assert!(events.iter().all(|e| e.voice < 3));
    }

    #[test]
    fn test_reset_is_silent() {
        let mut alloc = VoiceAllocator::new();
        alloc.note_on(60, 100);
        alloc.note_on(64, 100);
        alloc.reset();
        assert!(alloc.events().is_empty());
        assert_eq!(alloc.active_voice_count(), 0);
        assert!(alloc.slots().iter().all(|s| s.timestamp() == 0));
    }

    #[test]
    fn test_silent_mutators_leave_no_events() {
        let mut alloc = VoiceAllocator::new();
        alloc.note_on(60, 100);
        assert_eq!(alloc.events().len(), 1);

        let calls: [fn(&mut VoiceAllocator); 6] = [
            |a| a.set_allocation_mode(AllocationMode::HighestNote),
            |a| a.set_steal_mode(StealMode::Soft),
            |a| a.set_unison_detune(0.5),
            |a| a.set_pitch_bend(2.0),
            |a| a.set_tuning_reference(442.0),
            |a| a.reset(),
        ];
        for call in calls {
            alloc.note_on(64, 100);
            assert!(!alloc.events().is_empty());
            call(&mut alloc);
            assert!(alloc.events().is_empty());
        }
    }

    #[test]
    fn test_retrigger_skips_releasing_slot_beyond_voice_count() {
        let mut alloc = alloc_with(4, AllocationMode::Oldest);
        alloc.note_on(60, 100);
        alloc.note_on(62, 100);
        alloc.note_on(64, 100);
        alloc.note_on(67, 100); // voice 3
        alloc.set_voice_count(3); // releases voice 3

        // Voice 3 still holds 67 but is out of range: a fresh voice is stolen
        let events = alloc.note_on(67, 100);
        assert!(events.iter().all(|e| e.voice < 3));
        assert_eq!(alloc.voice_state(3), VoiceState::Releasing);
    }

    #[test]
    fn test_all_notes_off() {
        let mut alloc = VoiceAllocator::new();
        alloc.note_on(60, 100);
        alloc.note_on(64, 100);
        alloc.note_on(67, 100);
        alloc.note_off(64);

        let events = alloc.all_notes_off();
        assert_eq!(events.len(), 2);
        assert_eq!(alloc.all_notes_off().len(), 0);
    }
}
