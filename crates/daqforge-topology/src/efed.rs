//! eFED slice/slot derivation from FED-id offsets.
//!
//! eFED emulator crates are organized in 8-id windows. The slice is the
//! window index capped at 3; the slot wraps inside the crate with a fixed
//! three-branch formula. Offsets past the third window stay in the last
//! branch (real inventories keep offsets below 24).

use daqforge_core::EfedPosition;

/// Ids per eFED window.
pub const WINDOW: u32 = 8;

/// Highest slice index.
pub const MAX_SLICE: u32 = 3;

/// Derive the eFED position for a FED-id offset from the configured base.
pub fn position(fed_offset: u32) -> EfedPosition {
    let slice = (fed_offset / WINDOW).min(MAX_SLICE) as u8;
    let n = fed_offset;
    let slot = match n / WINDOW {
        0 => 2 * (n + 1),
        1 => 2 * (n + 1) - 16,
        _ => 2 * (n + 1) - 32,
    } as u8;
    EfedPosition { slice, slot }
}

/// Whether an offset falls past the last full window.
pub fn overflows(fed_offset: u32) -> bool {
    fed_offset / WINDOW > MAX_SLICE
}
