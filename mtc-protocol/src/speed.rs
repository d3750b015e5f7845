//! Speed mapping
//!
//! Channel controllers work in signed percent; the hub wants an unsigned
//! raw magnitude with the direction sent separately.

/// Largest raw speed an SBrick channel accepts
pub const MAX_RAW_SPEED: u8 = 254;

/// Map a signed percentage to a raw magnitude in `0..=max_raw`
///
/// Linear and truncating. The sign is dropped; magnitudes above 100% are
/// treated as 100%.
pub fn percent_to_raw(percent: i16, max_raw: u8) -> u8 {
    let magnitude = u32::from(percent.unsigned_abs().min(100));
    // magnitude <= 100, so the quotient never exceeds max_raw
    (magnitude * u32::from(max_raw) / 100) as u8
}
