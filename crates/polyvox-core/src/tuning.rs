//! 12-tone equal temperament pitch conversions.
//!
//! All functions take the A4 reference explicitly so that a host can retune
//! without any global state. MIDI note 69 is always A4.

/// Standard concert pitch for A4.
pub const DEFAULT_REFERENCE_HZ: f32 = 440.0;

/// Lowest accepted A4 reference.
pub const MIN_REFERENCE_HZ: f32 = 400.0;

/// Highest accepted A4 reference.
pub const MAX_REFERENCE_HZ: f32 = 480.0;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Convert a MIDI note number to frequency in Hz.
///
/// The exponent is evaluated in `f64` and narrowed at the end, which keeps the
/// result within 0.01 Hz of the exact value across the whole 0-127 range.
///
/// # Example
/// ```rust
/// use polyvox_core::midi_to_freq;
///
/// assert!((midi_to_freq(69, 440.0) - 440.0).abs() < 0.01);
/// assert!((midi_to_freq(60, 440.0) - 261.63).abs() < 0.01);
/// assert!((midi_to_freq(69, 442.0) - 442.0).abs() < 0.01);
/// ```
#[inline]
pub fn midi_to_freq(note: u8, reference_hz: f32) -> f32 {
    let exponent = (f64::from(note) - 69.0) / 12.0;
    (f64::from(reference_hz) * libm::pow(2.0, exponent)) as f32
}

/// Convert a frequency in Hz to a (fractional) MIDI note number.
#[inline]
pub fn freq_to_midi(freq: f32, reference_hz: f32) -> f32 {
    69.0 + 12.0 * libm::log2f(freq / reference_hz)
}

/// Convert an interval in semitones to a frequency ratio.
///
/// 12 semitones = one octave = ratio 2.0.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    libm::powf(2.0, semitones / 12.0)
}

/// Convert cents to frequency ratio.
///
/// 100 cents = 1 semitone.
#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    libm::powf(2.0, cents / 1200.0)
}

/// Bring an A4 reference into the supported range.
///
/// Finite values are clamped to [`MIN_REFERENCE_HZ`]..=[`MAX_REFERENCE_HZ`].
/// NaN and infinities fall back to [`DEFAULT_REFERENCE_HZ`].
#[inline]
pub fn sanitize_reference(hz: f32) -> f32 {
    if hz.is_finite() {
        hz.clamp(MIN_REFERENCE_HZ, MAX_REFERENCE_HZ)
    } else {
        DEFAULT_REFERENCE_HZ
    }
}

/// Pitch class name and octave for a MIDI note (60 = `("C", 4)`).
pub fn note_name(note: u8) -> (&'static str, i8) {
    let octave = (note / 12) as i8 - 1;
    (NOTE_NAMES[(note % 12) as usize], octave)
}
