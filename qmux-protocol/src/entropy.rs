//! Entropy Accumulator
//!
//! Single-byte running parity checksum over packet entropy flags. The legacy
//! acknowledgment mechanism cross-checks a peer-declared entropy byte against
//! one computed locally over the same packet-number range, catching reordering
//! and corruption bugs in the ack bookkeeping.

use crate::types::PacketNumber;

/// Running XOR-parity accumulator over packet entropy flags
///
/// Each packet with its entropy flag set toggles bit `packet_number % 8`.
/// XOR is self-inverse, so adding the same contribution twice cancels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntropyAccumulator(u8);

impl EntropyAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        EntropyAccumulator(0)
    }

    /// Add the contribution of one packet's entropy flag
    pub fn add(&mut self, packet_number: PacketNumber, entropy_flag: bool) {
        if entropy_flag {
            self.0 ^= 1 << packet_number.entropy_bit_position();
        }
    }

    /// Retract a previously counted contribution
    pub fn subtract(&mut self, packet_number: PacketNumber, entropy_flag: bool) {
        self.add(packet_number, entropy_flag);
    }

    /// Get the current entropy byte
    pub fn get(&self) -> u8 {
        self.0
    }
}
