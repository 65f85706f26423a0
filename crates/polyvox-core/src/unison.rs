//! Unison detune distribution.
//!
//! For `count` stacked voices with detune amount `a` (0.0 to 1.0), the voice
//! at position `i` is offset by
//!
//! ```text
//! cents = a * 50 * (2*i - (count-1)) / (count-1)
//! ```
//!
//! At full detune the outer voices sit ±50 cents (a quarter tone) from the
//! center pitch. An odd count places one voice exactly on the center; an even
//! count produces symmetric pairs only.

/// Maximum number of voices stacked on one note.
pub const MAX_UNISON: usize = 8;

/// Maximum spread (in cents) of the outermost unison voice at full detune.
const MAX_SPREAD_CENTS: f32 = 50.0;

/// Detune offset in cents for unison position `position` of `count`.
///
/// Returns 0.0 when `count <= 1`.
///
/// # Example
/// ```rust
/// use polyvox_core::detune_cents;
///
/// assert_eq!(detune_cents(0, 3, 1.0), -50.0);
/// assert_eq!(detune_cents(1, 3, 1.0), 0.0);
/// assert_eq!(detune_cents(2, 3, 1.0), 50.0);
/// ```
#[inline]
pub fn detune_cents(position: usize, count: usize, amount: f32) -> f32 {
    if count <= 1 {
        return 0.0;
    }
    let span = (count - 1) as f32;
    let offset = 2.0 * position as f32 - span;
    amount * MAX_SPREAD_CENTS * offset / span
}
