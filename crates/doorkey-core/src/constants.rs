//! Core constants for the doorkey terminal.
//!
//! This module collects the wire-level, storage-level and timing constants
//! shared by every crate in the workspace. Timing values are expressed in
//! ticks of the cooperative scheduler; with the default 100 ms tick the fail
//! display lasts 30 seconds and the revocation server is polled once a minute.
//!
//! # Usage
//!
//! ```
//! use doorkey_core::constants::*;
//!
//! assert_eq!(SLOT_SIZE, 1 + ADDRESS_LEN);
//! assert_eq!(DEFAULT_STORE_SIZE / SLOT_SIZE, 113);
//! assert_eq!(REVOCATION_PREAMBLE, b"REV");
//! ```

// ============================================================================
// Token Addresses
// ============================================================================

/// Length of a token address read from the contact bus, in bytes.
///
/// The last byte is the CRC-8 of the preceding seven.
pub const ADDRESS_LEN: usize = 8;

/// Number of address bytes covered by the bus checksum.
pub const ADDRESS_CRC_SPAN: usize = ADDRESS_LEN - 1;

// ============================================================================
// Persisted Layout
// ============================================================================

/// Size of one credential slot: a status byte followed by the address.
pub const SLOT_SIZE: usize = 1 + ADDRESS_LEN;

/// Default size of the non-volatile store in bytes (1 KiB EEPROM).
pub const DEFAULT_STORE_SIZE: usize = 1024;

/// Status byte of a free slot.
pub const STATUS_EMPTY: u8 = 0x00;

/// Status bit marking a slot as occupied.
pub const STATUS_IN_USE_BIT: u8 = 0x01;

/// Status bit granting administrator privilege. Only meaningful together
/// with [`STATUS_IN_USE_BIT`].
pub const STATUS_ADMIN_BIT: u8 = 0x02;

// ============================================================================
// Revocation Hashing
// ============================================================================

/// Length of a SHA-256 digest in bytes.
pub const HASH_LEN: usize = 32;

/// Length of a hex-encoded digest as sent in logging requests.
pub const HASH_HEX_LEN: usize = HASH_LEN * 2;

/// Literal bytes that open the revocation poll response body.
pub const REVOCATION_PREAMBLE: &[u8; 3] = b"REV";

/// Marker following the preamble when no revocation is pending.
pub const NOTHING_PENDING_MARKER: u8 = b'0';

/// Resource polled for a pending revocation hash.
pub const REVOCATION_POLL_PATH: &str = "/revoked.php?action=gethash";

/// Resource used to report an applied revocation (hash appended).
pub const REVOCATION_LOG_PATH: &str = "/revoked.php?action=log&hash=";

/// Resource used to report a door opening (hash appended).
pub const ACCESS_LOG_PATH: &str = "/logkey.php?key=";

// ============================================================================
// Timing (ticks)
// ============================================================================

/// Default length of one scheduler tick in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 100;

/// Window for the administrator scan after an operator button press.
pub const SCAN_ADMIN_TICKS: u32 = 100;

/// Window for the subject scan once the administrator was verified.
pub const SCAN_SUBJECT_TICKS: u32 = 100;

/// Duration of the fail and deny displays.
pub const FAIL_TICKS: u32 = 300;

/// Duration of the confirm display.
pub const CONFIRM_TICKS: u32 = 50;

/// How long the strike is held open.
pub const OPEN_TICKS: u32 = 5;

/// Steady phase of the idle indicator pattern.
pub const IDLE_STEADY_TICKS: u32 = 18;

/// Each short phase of the idle double blink.
pub const IDLE_BLINK_TICKS: u32 = 2;

/// Blink period while waiting for scans and while confirming.
pub const SLOW_BLINK_PERIOD: u32 = 10;

/// Blink period of the fail and deny displays.
pub const FAST_BLINK_PERIOD: u32 = 4;

// ============================================================================
// Server Communication
// ============================================================================

/// Default revocation poll interval (60 s at the default tick).
pub const DEFAULT_POLL_INTERVAL_TICKS: u32 = 600;

/// Connection attempts per exchange before the cycle is abandoned.
pub const DEFAULT_CONNECT_ATTEMPTS: u8 = 3;

/// Ticks a single exchange step may stay pending before it times out.
pub const DEFAULT_STEP_TIMEOUT_TICKS: u32 = 50;

/// Maximum bytes read from the socket in a single tick.
pub const RECV_BUDGET_PER_TICK: usize = 512;

/// Maximum number of queued logging requests.
pub const MAX_PENDING_REPORTS: usize = 16;

/// Default HTTP port of the revocation/log server.
pub const DEFAULT_SERVER_PORT: u16 = 80;
