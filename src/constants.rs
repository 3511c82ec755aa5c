//! Compile-time tuning constants.
//!
//! The C source this protocol is derived from probes these at build time
//! with a throwaway program that writes them into a generated header
//! (`memsizes.c`, `pagesize.c`). Rust has no equivalent build step here:
//! these are fixed defaults, overridable by forking the crate or, for
//! callers who need host-specific tuning, by wrapping [`crate::Slot`] at
//! a different alignment.

use static_assertions::const_assert;

/// Padding unit for per-cursor cache lines. 64 bytes covers the common
/// x86_64 and aarch64 case; cores with 128-byte lines (some POWER/ARM
/// parts) merely lose some false-sharing protection, not correctness.
pub const CACHE_LINE_SIZE: usize = 64;

/// Alignment hint for the ring buffer's header region.
pub const PAGE_SIZE: usize = 4096;

const_assert!(CACHE_LINE_SIZE.is_power_of_two());
const_assert!(PAGE_SIZE.is_power_of_two());
const_assert!(PAGE_SIZE >= CACHE_LINE_SIZE);
