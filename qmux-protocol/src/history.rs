//! Received-Packet History
//!
//! Compact interval representation of the set of received packet numbers.
//! The set is kept as sorted, pairwise disjoint, non-adjacent closed intervals
//! so that acknowledgment ranges fall straight out of the structure. Insertion
//! cost is proportional to the number of gaps, which stays small in the
//! expected case of few losses.

use crate::frame::AckRange;
use crate::types::PacketNumber;

/// Closed range of received packet numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketInterval {
    /// First packet number in the interval
    pub start: PacketNumber,
    /// Last packet number in the interval (inclusive)
    pub end: PacketNumber,
}

impl PacketInterval {
    /// Create a new interval
    pub fn new(start: PacketNumber, end: PacketNumber) -> Self {
        PacketInterval { start, end }
    }

    /// Create a single-packet interval
    pub fn single(pn: PacketNumber) -> Self {
        PacketInterval { start: pn, end: pn }
    }

    /// Check if this interval covers a packet number
    pub fn contains(&self, pn: PacketNumber) -> bool {
        pn >= self.start && pn <= self.end
    }

    /// Number of packets in the interval
    pub fn len(&self) -> u64 {
        (self.end - self.start) + 1
    }
}

/// History of received packet numbers as disjoint intervals
///
/// Invariant: intervals are sorted ascending by start, pairwise disjoint and
/// non-adjacent (a closed gap always merges its neighbors).
#[derive(Debug, Clone, Default)]
pub struct ReceivedPacketHistory {
    intervals: Vec<PacketInterval>,
}

impl ReceivedPacketHistory {
    /// Create an empty history
    pub fn new() -> Self {
        ReceivedPacketHistory {
            intervals: Vec::new(),
        }
    }

    /// Record the arrival of a packet
    ///
    /// Duplicates are no-ops. A packet adjacent to an existing interval
    /// extends it in place, merging with the neighbor if that closes the gap;
    /// otherwise a new singleton interval is inserted at its sorted position.
    pub fn received_packet(&mut self, pn: PacketNumber) {
        for i in 0..self.intervals.len() {
            let interval = self.intervals[i];

            if interval.contains(pn) {
                return;
            }

            // extend this interval at the end?
            if pn == interval.end.next() {
                self.intervals[i].end = pn;
                // did that close the gap to the next interval?
                if i + 1 < self.intervals.len() && self.intervals[i + 1].start == pn.next() {
                    self.intervals[i].end = self.intervals[i + 1].end;
                    self.intervals.remove(i + 1);
                }
                return;
            }

            // extend this interval at the front?
            if pn.next() == interval.start {
                self.intervals[i].start = pn;
                return;
            }

            if pn < interval.start {
                self.intervals.insert(i, PacketInterval::single(pn));
                return;
            }
        }

        self.intervals.push(PacketInterval::single(pn));
    }

    /// Drop history below a packet number
    ///
    /// Intervals entirely below `pn` are removed; an interval straddling `pn`
    /// is truncated so its start becomes `pn`. Idempotent.
    pub fn delete_below(&mut self, pn: PacketNumber) {
        self.intervals.retain(|interval| interval.end >= pn);

        if let Some(first) = self.intervals.first_mut() {
            if first.start < pn {
                first.start = pn;
            }
        }
    }

    /// Check if a packet number has been recorded
    pub fn contains(&self, pn: PacketNumber) -> bool {
        self.intervals.iter().any(|interval| interval.contains(pn))
    }

    /// Highest packet number received, if any
    pub fn largest_observed(&self) -> Option<PacketNumber> {
        self.intervals.last().map(|interval| interval.end)
    }

    /// Materialize acknowledgment ranges, most recent interval first
    ///
    /// Returns an empty vec for an empty history. Ordering matches the
    /// on-wire convention of newest range first.
    pub fn ack_ranges(&self) -> Vec<AckRange> {
        self.intervals
            .iter()
            .rev()
            .map(|interval| AckRange::new(interval.start, interval.end))
            .collect()
    }

    /// Number of tracked intervals
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    /// Intervals in ascending order (for inspection)
    pub fn intervals(&self) -> &[PacketInterval] {
        &self.intervals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pn(n: u64) -> PacketNumber {
        PacketNumber::new(n)
    }

    fn interval(start: u64, end: u64) -> PacketInterval {
        PacketInterval::new(pn(start), pn(end))
    }

    #[test]
    fn test_adds_first_packet() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(4));
        assert_eq!(hist.intervals(), &[interval(4, 4)]);
    }

    #[test]
    fn test_ignores_duplicates() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(4));
        hist.received_packet(pn(4));
        assert_eq!(hist.intervals(), &[interval(4, 4)]);
    }

    #[test]
    fn test_consecutive_packets_extend_range() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(4));
        hist.received_packet(pn(5));
        hist.received_packet(pn(6));
        assert_eq!(hist.intervals(), &[interval(4, 6)]);
    }

    #[test]
    fn test_duplicate_inside_existing_range() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(4));
        hist.received_packet(pn(5));
        hist.received_packet(pn(6));
        hist.received_packet(pn(5));
        assert_eq!(hist.intervals(), &[interval(4, 6)]);
    }

    #[test]
    fn test_extends_range_at_front() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(4));
        hist.received_packet(pn(3));
        assert_eq!(hist.intervals(), &[interval(3, 4)]);
    }

    #[test]
    fn test_lost_packet_creates_new_range() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(4));
        hist.received_packet(pn(6));
        assert_eq!(hist.intervals(), &[interval(4, 4), interval(6, 6)]);
    }

    #[test]
    fn test_new_range_between_two_ranges() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(4));
        hist.received_packet(pn(10));
        hist.received_packet(pn(7));
        assert_eq!(
            hist.intervals(),
            &[interval(4, 4), interval(7, 7), interval(10, 10)]
        );
    }

    #[test]
    fn test_belated_packet_creates_range_in_front() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(6));
        hist.received_packet(pn(4));
        assert_eq!(hist.intervals(), &[interval(4, 4), interval(6, 6)]);
    }

    #[test]
    fn test_extends_previous_range_at_end() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(4));
        hist.received_packet(pn(7));
        hist.received_packet(pn(5));
        assert_eq!(hist.intervals(), &[interval(4, 5), interval(7, 7)]);
    }

    #[test]
    fn test_extends_later_range_at_front() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(4));
        hist.received_packet(pn(7));
        hist.received_packet(pn(6));
        assert_eq!(hist.intervals(), &[interval(4, 4), interval(6, 7)]);
    }

    #[test]
    fn test_closes_a_gap() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(6));
        hist.received_packet(pn(4));
        assert_eq!(hist.interval_count(), 2);
        hist.received_packet(pn(5));
        assert_eq!(hist.intervals(), &[interval(4, 6)]);
    }

    #[test]
    fn test_closes_a_gap_in_the_middle() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(1));
        hist.received_packet(pn(10));
        hist.received_packet(pn(4));
        hist.received_packet(pn(6));
        assert_eq!(hist.interval_count(), 4);
        hist.received_packet(pn(5));
        assert_eq!(
            hist.intervals(),
            &[interval(1, 1), interval(4, 6), interval(10, 10)]
        );
    }

    #[test]
    fn test_delete_below_empty_history() {
        let mut hist = ReceivedPacketHistory::new();
        hist.delete_below(pn(5));
        assert_eq!(hist.interval_count(), 0);
    }

    #[test]
    fn test_delete_below_removes_range() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(4));
        hist.received_packet(pn(5));
        hist.received_packet(pn(10));
        hist.delete_below(pn(6));
        assert_eq!(hist.intervals(), &[interval(10, 10)]);
    }

    #[test]
    fn test_delete_below_removes_multiple_ranges() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(1));
        hist.received_packet(pn(5));
        hist.received_packet(pn(10));
        hist.delete_below(pn(8));
        assert_eq!(hist.intervals(), &[interval(10, 10)]);
    }

    #[test]
    fn test_delete_below_truncates_straddling_range() {
        let mut hist = ReceivedPacketHistory::new();
        for n in 3..=6 {
            hist.received_packet(pn(n));
        }
        hist.delete_below(pn(4));
        assert_eq!(hist.intervals(), &[interval(4, 6)]);
    }

    #[test]
    fn test_delete_below_keeps_singleton_at_boundary() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(4));
        hist.received_packet(pn(5));
        hist.received_packet(pn(10));
        hist.delete_below(pn(5));
        assert_eq!(hist.intervals(), &[interval(5, 5), interval(10, 10)]);
    }

    #[test]
    fn test_delete_below_exact_singleton() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(4));
        hist.delete_below(pn(4));
        assert_eq!(hist.intervals(), &[interval(4, 4)]);
    }

    #[test]
    fn test_delete_below_is_idempotent() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(4));
        hist.received_packet(pn(5));
        hist.received_packet(pn(10));
        hist.delete_below(pn(6));
        let once = hist.intervals().to_vec();
        hist.delete_below(pn(6));
        assert_eq!(hist.intervals(), &once[..]);
    }

    #[test]
    fn test_ack_ranges_empty() {
        let hist = ReceivedPacketHistory::new();
        assert!(hist.ack_ranges().is_empty());
    }

    #[test]
    fn test_single_ack_range() {
        let mut hist = ReceivedPacketHistory::new();
        hist.received_packet(pn(4));
        hist.received_packet(pn(5));
        let ranges = hist.ack_ranges();
        assert_eq!(ranges, vec![AckRange::new(pn(4), pn(5))]);
    }

    #[test]
    fn test_multiple_ack_ranges_newest_first() {
        let mut hist = ReceivedPacketHistory::new();
        for n in [4, 5, 6, 1, 11, 10, 2] {
            hist.received_packet(pn(n));
        }
        let ranges = hist.ack_ranges();
        assert_eq!(
            ranges,
            vec![
                AckRange::new(pn(10), pn(11)),
                AckRange::new(pn(4), pn(6)),
                AckRange::new(pn(1), pn(2)),
            ]
        );
    }

    #[test]
    fn test_delete_below_after_merging_intervals() {
        let mut hist = ReceivedPacketHistory::new();
        for n in [1, 10, 4, 6] {
            hist.received_packet(pn(n));
        }
        assert_eq!(
            hist.intervals(),
            &[interval(1, 1), interval(4, 4), interval(6, 6), interval(10, 10)]
        );
        hist.delete_below(pn(8));
        assert_eq!(hist.intervals(), &[interval(10, 10)]);
    }
}
