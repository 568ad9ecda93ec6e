//! Ack-Handling Contracts
//!
//! Behavioral interfaces the connection drives: one for the sent-packet side,
//! one for the received-packet side, one for stop-waiting watermarks. Each has
//! exactly one production implementation; the traits exist so the connection
//! and tests can substitute doubles at these seams.

use crate::frame::{AckFrame, StopWaitingFrame};
use crate::packet::SentPacket;
use crate::types::{ByteCount, PacketNumber};
use std::time::Instant;
use thiserror::Error;

/// Ack-handling errors
///
/// All variants except the malformed-ack family indicate broken internal
/// bookkeeping; every variant is connection-fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AckError {
    #[error("sent packet number {0} is not larger than the previous one")]
    NonMonotonicPacketNumber(PacketNumber),

    #[error("ack ranges are not sorted in descending order")]
    UnsortedAckRanges,

    #[error("ack ranges overlap or touch")]
    OverlappingAckRanges,

    #[error("ack references packet number {0}, which was never sent")]
    AckForUnsentPacket(PacketNumber),

    #[error("too many tracked sent packets")]
    TooManyTrackedPackets,

    #[error("internal consistency error in ack bookkeeping")]
    InternalConsistency,
}

/// Handles acks received for outgoing packets
pub trait SentPacketHandler {
    /// Register a newly sent packet
    ///
    /// Fails with [`AckError::NonMonotonicPacketNumber`] if the packet number
    /// is not strictly greater than all previously registered ones.
    fn sent_packet(&mut self, packet: SentPacket) -> Result<(), AckError>;

    /// Apply a peer acknowledgment
    ///
    /// Every covered packet leaves the outstanding set; every older,
    /// still-outstanding, uncovered packet gets a missing report.
    fn received_ack(&mut self, ack: &AckFrame) -> Result<(), AckError>;

    /// Whether a packet is presumed lost and waiting for retransmission
    fn probably_has_packet_for_retransmission(&mut self) -> bool;

    /// Remove and return a packet presumed lost, marking it retransmitted
    ///
    /// `None` means nothing is available, which is normal.
    fn dequeue_packet_for_retransmission(&mut self) -> Option<SentPacket>;

    /// Total bytes of outstanding, unacknowledged packets
    fn bytes_in_flight(&self) -> ByteCount;

    /// Largest packet number the peer has acknowledged
    fn largest_observed(&self) -> Option<PacketNumber>;

    /// Whether the externally supplied congestion window permits sending
    fn congestion_allows_sending(&self) -> bool;

    /// Surface any latched bookkeeping error
    fn check_for_error(&self) -> Result<(), AckError>;

    /// Time the oldest outstanding packet hits its retransmission timeout
    fn time_of_first_rto(&self) -> Option<Instant>;
}

/// Handles acks that need to be sent for incoming packets
pub trait ReceivedPacketHandler {
    /// Record the arrival of a packet
    fn received_packet(&mut self, pn: PacketNumber, entropy_bit: bool) -> Result<(), AckError>;

    /// Trim tracked history below the peer's least-unacked number
    fn received_stop_waiting(&mut self, frame: &StopWaitingFrame) -> Result<(), AckError>;

    /// Materialize the current intervals into an outgoing ack frame
    ///
    /// An empty history yields `Ok(None)`. `dequeue` clears the ack-dirty
    /// bookkeeping flag; the frame is returned either way.
    fn get_ack_frame(&mut self, dequeue: bool) -> Result<Option<AckFrame>, AckError>;
}

/// Manages stop-waiting watermarks for sent packets
pub trait StopWaitingManager {
    /// Raise the candidate least-unacked watermark for a retransmitted packet
    fn register_packet_for_retransmission(&mut self, packet: &SentPacket);

    /// Build the frame carrying the current watermark, if it advanced
    fn get_stop_waiting_frame(&self) -> Option<StopWaitingFrame>;

    /// Note that a stop-waiting frame was sent in the given packet
    fn sent_stop_waiting_with_packet(&mut self, pn: PacketNumber);

    /// Note that the given packet (and the stop-waiting it carried) was acked
    fn received_ack_for_packet_number(&mut self, pn: PacketNumber);
}
