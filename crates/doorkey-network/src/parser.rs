//! Incremental parser for revocation poll responses.
//!
//! The response body carries the literal preamble `REV` followed by either
//! the marker `'0'` (nothing pending) or the 32 raw bytes of the hash to
//! revoke. Everything before the preamble, HTTP headers included, is
//! skipped. Bytes may arrive split at any position across reads.
//!
//! ```text
//! ┌──────────────────┐ "REV" ┌──────────────┐ '0'   ┌────────────────┐
//! │ SeekingPreamble  │──────>│ AwaitingHash │──────>│ NothingPending │
//! └──────────────────┘       └──────────────┘       └────────────────┘
//!                                   │ 32 bytes
//!                                   v
//!                             ┌────────────┐
//!                             │ HashReady  │
//!                             └────────────┘
//! ```

use doorkey_core::KeyHash;
use doorkey_core::constants::{HASH_LEN, NOTHING_PENDING_MARKER, REVOCATION_PREAMBLE};

/// Parser state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Scanning for the preamble; holds how many of its bytes matched.
    SeekingPreamble(usize),

    /// Preamble seen; collecting hash bytes.
    AwaitingHash,

    /// Server reported no pending revocation.
    NothingPending,

    /// A full hash was captured.
    HashReady,
}

/// Final interpretation of a poll response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResponse {
    /// No revocation is pending.
    NothingPending,

    /// Hash of the credential to revoke.
    Revoke(KeyHash),

    /// Response ended before a complete answer; `received` hash bytes were
    /// captured after the preamble, if it was seen at all.
    Malformed { preamble: bool, received: usize },
}

/// Stateful revocation response parser.
///
/// # Example
///
/// ```
/// use doorkey_network::{PollResponse, RevocationParser};
///
/// let mut parser = RevocationParser::new();
/// parser.feed(b"HTTP/1.0 200 OK\r\n\r\nRE");
/// assert_eq!(parser.result(), None);
///
/// parser.feed(b"V0");
/// assert_eq!(parser.result(), Some(PollResponse::NothingPending));
/// ```
#[derive(Debug, Clone)]
pub struct RevocationParser {
    state: ParserState,
    hash: [u8; HASH_LEN],
    received: usize,
}

impl RevocationParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::SeekingPreamble(0),
            hash: [0; HASH_LEN],
            received: 0,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Consume bytes, returning how many were used.
    ///
    /// Once a result is available the remaining input is left unconsumed.
    pub fn feed(&mut self, data: &[u8]) -> usize {
        for (i, &byte) in data.iter().enumerate() {
            match self.state {
                ParserState::SeekingPreamble(matched) => {
                    self.state = ParserState::SeekingPreamble(Self::advance_preamble(matched, byte));
                    if self.state == ParserState::SeekingPreamble(REVOCATION_PREAMBLE.len()) {
                        self.state = ParserState::AwaitingHash;
                    }
                }
                ParserState::AwaitingHash => {
                    if self.received == 0 && byte == NOTHING_PENDING_MARKER {
                        self.state = ParserState::NothingPending;
                        return i + 1;
                    }
                    self.hash[self.received] = byte;
                    self.received += 1;
                    if self.received == HASH_LEN {
                        self.state = ParserState::HashReady;
                        return i + 1;
                    }
                }
                ParserState::NothingPending | ParserState::HashReady => return i,
            }
        }
        data.len()
    }

    fn advance_preamble(matched: usize, byte: u8) -> usize {
        if byte == REVOCATION_PREAMBLE[matched] {
            matched + 1
        } else if byte == REVOCATION_PREAMBLE[0] {
            1
        } else {
            0
        }
    }

    /// Result, once the response is conclusive.
    pub fn result(&self) -> Option<PollResponse> {
        match self.state {
            ParserState::NothingPending => Some(PollResponse::NothingPending),
            ParserState::HashReady => Some(PollResponse::Revoke(KeyHash::new(self.hash))),
            _ => None,
        }
    }

    /// Interpret the response after the stream ended.
    pub fn finish(&self) -> PollResponse {
        self.result().unwrap_or(PollResponse::Malformed {
            preamble: self.state == ParserState::AwaitingHash,
            received: self.received,
        })
    }
}

impl Default for RevocationParser {
    fn default() -> Self {
        Self::new()
    }
}
