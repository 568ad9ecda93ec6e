//! Ack Frame Generation for Received Packets
//!
//! Concrete [`ReceivedPacketHandler`]: composes the received-packet history
//! with the legacy entropy accumulator and tracks whether the next outgoing
//! ack would carry anything new.

use crate::entropy::EntropyAccumulator;
use crate::frame::{AckFrame, StopWaitingFrame};
use crate::handler::{AckError, ReceivedPacketHandler};
use crate::history::ReceivedPacketHistory;
use crate::types::PacketNumber;
use std::time::{Duration, Instant};

/// Tracks received packets and materializes outgoing ack frames
pub struct ReceivedPacketTracker {
    /// Interval set of everything received
    history: ReceivedPacketHistory,
    /// Legacy entropy byte over the received set
    entropy: EntropyAccumulator,
    /// Arrival time of the current largest observed packet
    largest_observed_at: Option<Instant>,
    /// Whether the ack state changed since the last dequeued frame
    ack_dirty: bool,
}

impl ReceivedPacketTracker {
    /// Create a new tracker
    pub fn new() -> Self {
        ReceivedPacketTracker {
            history: ReceivedPacketHistory::new(),
            entropy: EntropyAccumulator::new(),
            largest_observed_at: None,
            ack_dirty: false,
        }
    }

    /// Whether a newly generated ack would carry unseen information
    pub fn ack_dirty(&self) -> bool {
        self.ack_dirty
    }
}

impl Default for ReceivedPacketTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceivedPacketHandler for ReceivedPacketTracker {
    fn received_packet(&mut self, pn: PacketNumber, entropy_bit: bool) -> Result<(), AckError> {
        // a duplicate must not toggle its entropy contribution a second time
        if self.history.contains(pn) {
            return Ok(());
        }

        let was_largest = self.history.largest_observed().map_or(true, |l| pn > l);
        self.history.received_packet(pn);
        self.entropy.add(pn, entropy_bit);
        if was_largest {
            self.largest_observed_at = Some(Instant::now());
        }
        self.ack_dirty = true;
        Ok(())
    }

    fn received_stop_waiting(&mut self, frame: &StopWaitingFrame) -> Result<(), AckError> {
        self.history.delete_below(frame.least_unacked);
        Ok(())
    }

    fn get_ack_frame(&mut self, dequeue: bool) -> Result<Option<AckFrame>, AckError> {
        let largest_observed = match self.history.largest_observed() {
            Some(pn) => pn,
            None => return Ok(None),
        };

        let ack_ranges = self.history.ack_ranges();
        // the first range must top out at the largest observed packet
        match ack_ranges.first() {
            Some(range) if range.last == largest_observed => {}
            _ => return Err(AckError::InternalConsistency),
        }

        if dequeue {
            self.ack_dirty = false;
        }

        let delay = self
            .largest_observed_at
            .map_or(Duration::ZERO, |at| at.elapsed());

        Ok(Some(AckFrame {
            largest_observed,
            entropy: self.entropy.get(),
            ack_ranges,
            delay,
        }))
    }
}
