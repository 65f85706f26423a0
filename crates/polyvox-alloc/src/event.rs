//! Instructions emitted by the allocator for the caller's voice pool.

/// Capacity of the per-call event buffer.
pub const MAX_EVENTS: usize = 64;

/// Kind of instruction carried by a [`VoiceEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoiceEventKind {
    /// Start (or restart) the note on the voice
    NoteOn,
    /// Enter the release stage of the note on the voice
    NoteOff,
    /// Silence the voice immediately
    Steal,
}

/// A single instruction for the voice at `voice`.
///
/// Plain value, valid until the next mutating call on the allocator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceEvent {
    /// What the caller should do
    pub kind: VoiceEventKind,
    /// Voice slot index
    pub voice: usize,
    /// MIDI note the instruction refers to
    pub note: u8,
    /// MIDI velocity (0-127)
    pub velocity: u8,
    /// Target frequency in Hz
    pub frequency: f32,
}

impl VoiceEvent {
    const EMPTY: Self = Self {
        kind: VoiceEventKind::NoteOff,
        voice: 0,
        note: 0,
        velocity: 0,
        frequency: 0.0,
    };
}

/// Fixed-capacity event storage reused by every call.
#[derive(Debug, Clone)]
pub(crate) struct EventBuffer {
    events: [VoiceEvent; MAX_EVENTS],
    len: usize,
}

impl EventBuffer {
    pub(crate) const fn new() -> Self {
        Self {
            events: [VoiceEvent::EMPTY; MAX_EVENTS],
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }

    /// Append an event. Every operation emits at most `2 * MAX_VOICES`
    /// events, so the buffer never fills in practice.
    #[inline]
    pub(crate) fn push(&mut self, event: VoiceEvent) {
        debug_assert!(self.len < MAX_EVENTS, "event buffer overflow");
        if let Some(slot) = self.events.get_mut(self.len) {
            *slot = event;
            self.len += 1;
        }
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[VoiceEvent] {
        &self.events[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(voice: usize) -> VoiceEvent {
        VoiceEvent {
            kind: VoiceEventKind::NoteOn,
            voice,
            note: 60,
            velocity: 100,
            frequency: 261.63,
        }
    }

    #[test]
    fn test_push_and_clear() {
        let mut buf = EventBuffer::new();
        assert!(buf.as_slice().is_empty());

        buf.push(event(0));
        buf.push(event(1));
        assert_eq!(buf.as_slice().len(), 2);
        assert_eq!(buf.as_slice()[1].voice, 1);

        buf.clear();
        assert!(buf.as_slice().is_empty());
    }

    #[test]
    fn test_fills_to_capacity() {
        let mut buf = EventBuffer::new();
        for i in 0..MAX_EVENTS {
            buf.push(event(i));
        }
        assert_eq!(buf.as_slice().len(), MAX_EVENTS);
    }
}
