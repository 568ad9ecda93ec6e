//! Sent-Packet Records
//!
//! Snapshot of one transmitted packet's frames, kept so retransmission can
//! re-extract the payload without re-deriving it from the wire encoding.

use crate::frame::{Frame, StreamFrame};
use crate::types::{ByteCount, PacketNumber};
use std::time::Instant;

/// Record of one transmitted packet
///
/// The frame list is immutable once created; only the ack-processing metadata
/// (missing reports, retransmitted flag) changes afterwards.
#[derive(Debug, Clone)]
pub struct SentPacket {
    /// Packet number assigned at send time
    pub packet_number: PacketNumber,
    /// Frames carried by the packet, in order
    pub frames: Vec<Frame>,
    /// Entropy flag the packet was sent with
    pub entropy_bit: bool,
    /// Encoded length of the packet in bytes
    pub length: ByteCount,
    /// Times an ack has reported this packet missing
    pub missing_reports: u8,
    /// Whether this packet has ever been retransmitted
    pub retransmitted: bool,
    /// Time the packet was sent
    pub send_time: Instant,
}

impl SentPacket {
    /// Create a record for a freshly sent packet
    pub fn new(
        packet_number: PacketNumber,
        frames: Vec<Frame>,
        entropy_bit: bool,
        length: ByteCount,
    ) -> Self {
        SentPacket {
            packet_number,
            frames,
            entropy_bit,
            length,
            missing_reports: 0,
            retransmitted: false,
            send_time: Instant::now(),
        }
    }

    /// Stream frames to re-queue for retransmission
    ///
    /// These go back into the stream frame queue as priority pushes, where
    /// they may be split to fit the next packet.
    pub fn stream_frames_for_retransmission(&self) -> Vec<StreamFrame> {
        self.frames
            .iter()
            .filter_map(|frame| match frame {
                Frame::Stream(sf) => Some(sf.clone()),
                _ => None,
            })
            .collect()
    }

    /// Control frames to retransmit verbatim
    ///
    /// Stream frames are handled separately, and ack / stop-waiting frames are
    /// regenerated fresh from current state rather than replayed.
    pub fn control_frames_for_retransmission(&self) -> Vec<Frame> {
        self.frames
            .iter()
            .filter(|frame| {
                !matches!(
                    frame,
                    Frame::Stream(_) | Frame::Ack(_) | Frame::StopWaiting(_)
                )
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{AckFrame, StopWaitingFrame, WindowUpdateFrame};
    use crate::types::StreamId;
    use bytes::Bytes;
    use std::time::Duration;

    fn stream_frame(id: u32) -> StreamFrame {
        StreamFrame::new(StreamId::new(id), 0, Bytes::from_static(b"data"), false)
    }

    fn sample_packet() -> SentPacket {
        SentPacket::new(
            PacketNumber::new(1),
            vec![
                Frame::Stream(stream_frame(5)),
                Frame::Ack(AckFrame {
                    largest_observed: PacketNumber::new(3),
                    entropy: 0,
                    ack_ranges: vec![],
                    delay: Duration::ZERO,
                }),
                Frame::StopWaiting(StopWaitingFrame {
                    least_unacked: PacketNumber::new(1),
                }),
                Frame::WindowUpdate(WindowUpdateFrame {
                    stream_id: StreamId::new(5),
                    byte_offset: 4096,
                }),
                Frame::Stream(stream_frame(7)),
                Frame::Ping,
            ],
            false,
            100,
        )
    }

    #[test]
    fn test_stream_frames_view() {
        let packet = sample_packet();
        let streams = packet.stream_frames_for_retransmission();
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].stream_id, StreamId::new(5));
        assert_eq!(streams[1].stream_id, StreamId::new(7));
    }

    #[test]
    fn test_control_frames_view_omits_ack_and_stop_waiting() {
        let packet = sample_packet();
        let control = packet.control_frames_for_retransmission();
        assert_eq!(control.len(), 2);
        assert!(matches!(control[0], Frame::WindowUpdate(_)));
        assert!(matches!(control[1], Frame::Ping));
    }

    #[test]
    fn test_new_packet_starts_clean() {
        let packet = sample_packet();
        assert_eq!(packet.missing_reports, 0);
        assert!(!packet.retransmitted);
    }
}
