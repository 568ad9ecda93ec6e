//! Protocol Identifiers and Constants
//!
//! Packet numbers are 64-bit, strictly monotonic identifiers assigned at send
//! time; they never wrap. Stream IDs multiplex independent byte pipes over one
//! connection, with a handful of reserved values for protocol-internal use.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// Byte counts for flow-control accounting
pub type ByteCount = u64;

/// Maximum size of an outgoing packet (bytes)
pub const MAX_PACKET_SIZE: ByteCount = 1452;

/// Number of missing reports before a packet is presumed lost
pub const RETRANSMISSION_THRESHOLD: u8 = 3;

/// Maximum number of sent packets tracked before the connection is considered broken
pub const MAX_TRACKED_SENT_PACKETS: usize = 2000;

/// Monotonically increasing packet number
///
/// Unlike wrap-around sequence spaces, packet numbers are 64-bit and strictly
/// increasing for the lifetime of a connection, so plain integer ordering is
/// correct everywhere.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PacketNumber(u64);

impl PacketNumber {
    /// Create a new packet number
    #[inline]
    pub fn new(value: u64) -> Self {
        PacketNumber(value)
    }

    /// Get the raw packet number value
    #[inline]
    pub fn as_raw(self) -> u64 {
        self.0
    }

    /// Get the next packet number
    #[inline]
    pub fn next(self) -> Self {
        PacketNumber(self.0 + 1)
    }

    /// Bit position this packet number contributes to the entropy byte
    #[inline]
    pub fn entropy_bit_position(self) -> u8 {
        (self.0 % 8) as u8
    }
}

impl fmt::Debug for PacketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PacketNumber({})", self.0)
    }
}

impl fmt::Display for PacketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PacketNumber {
    fn from(value: u64) -> Self {
        PacketNumber(value)
    }
}

impl From<PacketNumber> for u64 {
    fn from(pn: PacketNumber) -> u64 {
        pn.0
    }
}

impl Add<u64> for PacketNumber {
    type Output = PacketNumber;

    fn add(self, rhs: u64) -> PacketNumber {
        PacketNumber(self.0 + rhs)
    }
}

impl AddAssign<u64> for PacketNumber {
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

impl Sub for PacketNumber {
    type Output = u64;

    /// Distance between two packet numbers; caller guarantees `self >= rhs`
    fn sub(self, rhs: PacketNumber) -> u64 {
        self.0 - rhs.0
    }
}

/// Stream identifier
///
/// ID 0 is reserved as the connection-level flow-control key. IDs 1 and 3
/// carry protocol-internal streams and are excluded from connection-level
/// byte accounting.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct StreamId(u32);

impl StreamId {
    /// Pseudo stream ID keying the connection-level flow-control ceiling
    pub const CONNECTION: StreamId = StreamId(0);

    /// Create a new stream ID
    #[inline]
    pub fn new(value: u32) -> Self {
        StreamId(value)
    }

    /// Get the raw stream ID value
    #[inline]
    pub fn as_raw(self) -> u32 {
        self.0
    }

    /// Whether this stream is excluded from connection-level flow control
    ///
    /// Streams 1 and 3 are protocol-internal and never count against the
    /// connection-level byte budget.
    #[inline]
    pub fn is_flow_control_exempt(self) -> bool {
        self.0 == 1 || self.0 == 3
    }
}

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamId({})", self.0)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for StreamId {
    fn from(value: u32) -> Self {
        StreamId(value)
    }
}

impl From<StreamId> for u32 {
    fn from(id: StreamId) -> u32 {
        id.0
    }
}
