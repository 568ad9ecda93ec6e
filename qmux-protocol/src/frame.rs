//! Frame Values
//!
//! In-process representations of the frames this core consumes and produces.
//! Wire encoding and decoding live in the packet-composition layer; here the
//! frames are plain structured values.

use crate::types::{ByteCount, PacketNumber, StreamId};
use bytes::Bytes;
use std::time::Duration;

/// A chunk of application data belonging to one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFrame {
    /// Owning stream
    pub stream_id: StreamId,
    /// Byte offset of the first payload byte within the stream
    pub offset: ByteCount,
    /// Payload bytes
    pub data: Bytes,
    /// End-of-stream marker
    pub fin: bool,
    /// Whether the frame carries an explicit length field on the wire
    pub data_len_present: bool,
}

impl StreamFrame {
    /// Create a new stream frame
    pub fn new(stream_id: StreamId, offset: ByteCount, data: Bytes, fin: bool) -> Self {
        StreamFrame {
            stream_id,
            offset,
            data,
            fin,
            data_len_present: false,
        }
    }

    /// Payload length in bytes
    #[inline]
    pub fn data_len(&self) -> ByteCount {
        self.data.len() as ByteCount
    }

    /// Header overhead when this frame is written to a packet
    ///
    /// Type byte, stream ID, offset, plus the explicit length field when
    /// `data_len_present` is set.
    pub fn min_length(&self) -> ByteCount {
        let mut len: ByteCount = 1 + 4 + 8;
        if self.data_len_present {
            len += 2;
        }
        len
    }

    /// Byte offset one past the last payload byte
    #[inline]
    pub fn end_offset(&self) -> ByteCount {
        self.offset + self.data_len()
    }

    /// Split off the first `n` bytes as a separate frame
    ///
    /// The returned frame never carries the end-of-stream marker; `self` is
    /// rewritten in place to hold the remainder at an advanced offset.
    /// Caller guarantees `n < self.data_len()`.
    pub fn split_off(&mut self, n: ByteCount) -> StreamFrame {
        debug_assert!(n < self.data_len());

        let head = self.data.split_to(n as usize);
        let frame = StreamFrame {
            stream_id: self.stream_id,
            offset: self.offset,
            data: head,
            fin: false,
            data_len_present: self.data_len_present,
        };
        self.offset += n;
        frame
    }
}

/// Closed interval of acknowledged packet numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckRange {
    /// First packet number in the range
    pub first: PacketNumber,
    /// Last packet number in the range (inclusive)
    pub last: PacketNumber,
}

impl AckRange {
    /// Create a new ack range
    pub fn new(first: PacketNumber, last: PacketNumber) -> Self {
        AckRange { first, last }
    }

    /// Check if this range covers a packet number
    pub fn contains(&self, pn: PacketNumber) -> bool {
        pn >= self.first && pn <= self.last
    }
}

/// Acknowledgment frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckFrame {
    /// Highest packet number observed
    pub largest_observed: PacketNumber,
    /// Entropy byte over the acknowledged set (legacy mechanism)
    pub entropy: u8,
    /// Acknowledged ranges, ordered from the largest start to the smallest
    pub ack_ranges: Vec<AckRange>,
    /// Time the largest observed packet sat unacknowledged
    pub delay: Duration,
}

impl AckFrame {
    /// Check if a packet number is covered by any range
    pub fn acks_packet(&self, pn: PacketNumber) -> bool {
        self.ack_ranges.iter().any(|r| r.contains(pn))
    }
}

/// Stop-waiting frame: the peer should not expect acks below this number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopWaitingFrame {
    /// Least packet number still awaiting acknowledgment
    pub least_unacked: PacketNumber,
}

/// Flow-control window update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowUpdateFrame {
    /// Stream the update applies to (0 = connection level)
    pub stream_id: StreamId,
    /// New highest allowed byte offset
    pub byte_offset: ByteCount,
}

/// Any frame that can be carried in a packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Stream data
    Stream(StreamFrame),
    /// Acknowledgment
    Ack(AckFrame),
    /// Stop-waiting signal
    StopWaiting(StopWaitingFrame),
    /// Flow-control window update
    WindowUpdate(WindowUpdateFrame),
    /// Keep-alive probe
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(offset: ByteCount, data: &'static [u8], fin: bool) -> StreamFrame {
        StreamFrame::new(StreamId::new(5), offset, Bytes::from_static(data), fin)
    }

    #[test]
    fn test_data_len() {
        let f = frame(0, b"hello", false);
        assert_eq!(f.data_len(), 5);
        assert_eq!(f.end_offset(), 5);
    }

    #[test]
    fn test_min_length_with_length_field() {
        let mut f = frame(0, b"hello", false);
        let without = f.min_length();
        f.data_len_present = true;
        assert_eq!(f.min_length(), without + 2);
    }

    #[test]
    fn test_split_off() {
        let mut f = frame(100, b"abcdefgh", true);
        let head = f.split_off(3);

        assert_eq!(head.offset, 100);
        assert_eq!(&head.data[..], b"abc");
        assert!(!head.fin);

        assert_eq!(f.offset, 103);
        assert_eq!(&f.data[..], b"defgh");
        assert!(f.fin);
    }

    #[test]
    fn test_ack_range_contains() {
        let r = AckRange::new(PacketNumber::new(4), PacketNumber::new(6));
        assert!(r.contains(PacketNumber::new(4)));
        assert!(r.contains(PacketNumber::new(6)));
        assert!(!r.contains(PacketNumber::new(7)));
        assert!(!r.contains(PacketNumber::new(3)));
    }

    #[test]
    fn test_ack_frame_acks_packet() {
        let ack = AckFrame {
            largest_observed: PacketNumber::new(10),
            entropy: 0,
            ack_ranges: vec![
                AckRange::new(PacketNumber::new(8), PacketNumber::new(10)),
                AckRange::new(PacketNumber::new(1), PacketNumber::new(2)),
            ],
            delay: Duration::ZERO,
        };
        assert!(ack.acks_packet(PacketNumber::new(9)));
        assert!(ack.acks_packet(PacketNumber::new(1)));
        assert!(!ack.acks_packet(PacketNumber::new(5)));
    }
}
