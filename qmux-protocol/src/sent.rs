//! Sent-Packet Tracking
//!
//! Concrete implementations of [`SentPacketHandler`] and
//! [`StopWaitingManager`]. Outstanding packets live in an ordered map keyed by
//! packet number; acks remove them, missing reports escalate them into the
//! retransmission queue. Congestion window and RTO values are fed in by the
//! external congestion controller, never computed here.

use crate::frame::{AckFrame, StopWaitingFrame};
use crate::handler::{AckError, SentPacketHandler, StopWaitingManager};
use crate::packet::SentPacket;
use crate::types::{
    ByteCount, PacketNumber, MAX_PACKET_SIZE, MAX_TRACKED_SENT_PACKETS, RETRANSMISSION_THRESHOLD,
};
use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

/// Congestion window assumed until the controller supplies one
const DEFAULT_CONGESTION_WINDOW: ByteCount = 32 * MAX_PACKET_SIZE;

/// Retransmission timeout assumed until the controller supplies one
const DEFAULT_RTO: Duration = Duration::from_millis(500);

/// Tracks outstanding sent packets and processes peer acks
pub struct SentPacketTracker {
    /// Outstanding packets, ordered by packet number
    outstanding: BTreeMap<PacketNumber, SentPacket>,
    /// Packets presumed lost, waiting to be retransmitted
    retransmission_queue: VecDeque<SentPacket>,
    /// Highest packet number registered so far
    largest_sent: Option<PacketNumber>,
    /// Largest packet number the peer has acknowledged
    largest_observed: Option<PacketNumber>,
    /// Total bytes of outstanding packets
    bytes_in_flight: ByteCount,
    /// Congestion window, fed by the external controller
    congestion_window: ByteCount,
    /// Retransmission timeout, fed by the external RTT estimator
    rto: Duration,
}

impl SentPacketTracker {
    /// Create a new tracker
    pub fn new() -> Self {
        SentPacketTracker {
            outstanding: BTreeMap::new(),
            retransmission_queue: VecDeque::new(),
            largest_sent: None,
            largest_observed: None,
            bytes_in_flight: 0,
            congestion_window: DEFAULT_CONGESTION_WINDOW,
            rto: DEFAULT_RTO,
        }
    }

    /// Update the congestion window from the external controller
    pub fn update_congestion_window(&mut self, window: ByteCount) {
        self.congestion_window = window;
    }

    /// Update the retransmission timeout from the external RTT estimator
    pub fn update_rto(&mut self, rto: Duration) {
        self.rto = rto;
    }

    /// Number of packets currently tracked (outstanding + queued)
    pub fn tracked_packet_count(&self) -> usize {
        self.outstanding.len() + self.retransmission_queue.len()
    }

    /// Validate the structure of an incoming ack frame
    fn validate_ack(&self, ack: &AckFrame) -> Result<(), AckError> {
        if let Some(largest_sent) = self.largest_sent {
            if ack.largest_observed > largest_sent {
                return Err(AckError::AckForUnsentPacket(ack.largest_observed));
            }
        } else {
            return Err(AckError::AckForUnsentPacket(ack.largest_observed));
        }

        for window in ack.ack_ranges.windows(2) {
            let (higher, lower) = (window[0], window[1]);
            if lower.first >= higher.first {
                return Err(AckError::UnsortedAckRanges);
            }
            if lower.last >= higher.first {
                return Err(AckError::OverlappingAckRanges);
            }
        }
        for range in &ack.ack_ranges {
            if range.first > range.last {
                return Err(AckError::UnsortedAckRanges);
            }
        }

        Ok(())
    }

    /// Move packets whose RTO has elapsed into the retransmission queue
    fn maybe_queue_rto_retransmissions(&mut self) {
        let now = Instant::now();
        loop {
            let expired = match self.outstanding.iter().next() {
                Some((&pn, packet)) if now >= packet.send_time + self.rto => pn,
                _ => return,
            };
            self.queue_for_retransmission(expired);
        }
    }

    /// Remove an outstanding packet and queue it for retransmission
    fn queue_for_retransmission(&mut self, pn: PacketNumber) {
        if let Some(packet) = self.outstanding.remove(&pn) {
            self.bytes_in_flight -= packet.length;
            tracing::debug!(packet_number = pn.as_raw(), "queueing packet for retransmission");
            self.retransmission_queue.push_back(packet);
        }
    }
}

impl Default for SentPacketTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SentPacketHandler for SentPacketTracker {
    fn sent_packet(&mut self, packet: SentPacket) -> Result<(), AckError> {
        if let Some(largest) = self.largest_sent {
            if packet.packet_number <= largest {
                return Err(AckError::NonMonotonicPacketNumber(packet.packet_number));
            }
        }

        self.largest_sent = Some(packet.packet_number);
        self.bytes_in_flight += packet.length;
        self.outstanding.insert(packet.packet_number, packet);
        Ok(())
    }

    fn received_ack(&mut self, ack: &AckFrame) -> Result<(), AckError> {
        self.validate_ack(ack)?;

        // duplicate or reordered ack, nothing new to learn
        if let Some(largest) = self.largest_observed {
            if ack.largest_observed <= largest {
                return Ok(());
            }
        }
        self.largest_observed = Some(ack.largest_observed);

        let covered: Vec<PacketNumber> = self
            .outstanding
            .range(..=ack.largest_observed)
            .map(|(&pn, _)| pn)
            .collect();

        let mut lost = Vec::new();
        for pn in covered {
            if ack.acks_packet(pn) {
                if let Some(packet) = self.outstanding.remove(&pn) {
                    self.bytes_in_flight -= packet.length;
                }
            } else {
                let packet = self
                    .outstanding
                    .get_mut(&pn)
                    .ok_or(AckError::InternalConsistency)?;
                packet.missing_reports += 1;
                if packet.missing_reports >= RETRANSMISSION_THRESHOLD {
                    lost.push(pn);
                }
            }
        }

        for pn in lost {
            self.queue_for_retransmission(pn);
        }

        Ok(())
    }

    fn probably_has_packet_for_retransmission(&mut self) -> bool {
        self.maybe_queue_rto_retransmissions();
        !self.retransmission_queue.is_empty()
    }

    fn dequeue_packet_for_retransmission(&mut self) -> Option<SentPacket> {
        let mut packet = self.retransmission_queue.pop_front()?;
        packet.retransmitted = true;
        Some(packet)
    }

    fn bytes_in_flight(&self) -> ByteCount {
        self.bytes_in_flight
    }

    fn largest_observed(&self) -> Option<PacketNumber> {
        self.largest_observed
    }

    fn congestion_allows_sending(&self) -> bool {
        self.bytes_in_flight < self.congestion_window
    }

    fn check_for_error(&self) -> Result<(), AckError> {
        if self.tracked_packet_count() > MAX_TRACKED_SENT_PACKETS {
            return Err(AckError::TooManyTrackedPackets);
        }
        Ok(())
    }

    fn time_of_first_rto(&self) -> Option<Instant> {
        self.outstanding
            .values()
            .next()
            .map(|packet| packet.send_time + self.rto)
    }
}

/// Tracks the least-unacked watermark carried in stop-waiting frames
pub struct StopWaitingTracker {
    /// Candidate watermark, raised when packets enter retransmission
    candidate: Option<PacketNumber>,
    /// Watermark the peer is known to have received
    confirmed: Option<PacketNumber>,
    /// Packets that carried a stop-waiting frame, with the watermark they carried
    sent: VecDeque<(PacketNumber, PacketNumber)>,
}

impl StopWaitingTracker {
    /// Create a new tracker
    pub fn new() -> Self {
        StopWaitingTracker {
            candidate: None,
            confirmed: None,
            sent: VecDeque::new(),
        }
    }
}

impl Default for StopWaitingTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StopWaitingManager for StopWaitingTracker {
    fn register_packet_for_retransmission(&mut self, packet: &SentPacket) {
        let least_unacked = packet.packet_number.next();
        if self.candidate.map_or(true, |c| least_unacked > c) {
            self.candidate = Some(least_unacked);
        }
    }

    fn get_stop_waiting_frame(&self) -> Option<StopWaitingFrame> {
        let candidate = self.candidate?;
        if let Some(confirmed) = self.confirmed {
            if candidate <= confirmed {
                return None;
            }
        }
        Some(StopWaitingFrame {
            least_unacked: candidate,
        })
    }

    fn sent_stop_waiting_with_packet(&mut self, pn: PacketNumber) {
        if let Some(candidate) = self.candidate {
            self.sent.push_back((pn, candidate));
        }
    }

    fn received_ack_for_packet_number(&mut self, pn: PacketNumber) {
        while let Some(&(sent_in, watermark)) = self.sent.front() {
            if sent_in > pn {
                break;
            }
            if self.confirmed.map_or(true, |c| watermark > c) {
                self.confirmed = Some(watermark);
            }
            self.sent.pop_front();
        }
    }
}
