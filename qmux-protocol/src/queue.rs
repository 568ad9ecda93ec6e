//! Stream Frame Queue
//!
//! Buffers outbound stream-data frames and picks, on demand, the next frame
//! or fragment to place into an outgoing packet. Retransmission-bound frames
//! take absolute priority; fresh data is scheduled round-robin across active
//! streams under per-stream and connection-level flow-control ceilings.
//!
//! Two locking domains: one for queue contents, one for the flow-control
//! windows. `pop` takes both, queue first; `update_window` takes only the
//! window lock so window updates never wait behind queue scans.

use crate::frame::StreamFrame;
use crate::types::{ByteCount, StreamId};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Stream frame queue errors
///
/// Both variants are connection-fatal; an empty or flow-control-blocked queue
/// is reported as `Ok(None)` from [`StreamFrameQueue::pop`], never as an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("stream {0} is in the active list but missing from the frame map")]
    InternalConsistency(StreamId),

    #[error("stream {stream_id} offset {offset} exceeds its flow-control ceiling {ceiling}")]
    FlowControlViolation {
        stream_id: StreamId,
        offset: ByteCount,
        ceiling: ByteCount,
    },
}

/// Queue contents, guarded by the queue lock
#[derive(Default)]
struct QueueState {
    /// Retransmission-bound frames; tombstoned entries stay in place
    prio_frames: VecDeque<Option<StreamFrame>>,
    /// Per-stream FIFOs of fresh frames
    frames: HashMap<StreamId, VecDeque<StreamFrame>>,
    /// Streams with pending data; tombstoned slots are compacted lazily
    active_streams: Vec<Option<StreamId>>,
    /// Rotating read position into the active-stream list
    cursor: usize,
    /// Number of live queued frames
    len: usize,
    /// Total payload bytes of live queued frames
    byte_len: ByteCount,
}

/// Flow-control state, guarded by the window lock
#[derive(Default)]
struct WindowState {
    /// Highest allowed byte offset per stream; key 0 is the connection level
    ceilings: HashMap<StreamId, ByteCount>,
    /// Connection-level bytes delivered (exempt streams excluded)
    bytes_sent: ByteCount,
}

/// Where the selected frame came from
enum Source {
    Prio,
    Stream(StreamId),
}

/// Outbound stream-frame scheduler
///
/// All methods take `&self`; producer and consumer call paths are serialized
/// internally. No method blocks: `pop` either returns a frame immediately or
/// reports that nothing is sendable.
pub struct StreamFrameQueue {
    queue: Mutex<QueueState>,
    windows: Mutex<WindowState>,
}

impl StreamFrameQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        StreamFrameQueue {
            queue: Mutex::new(QueueState::default()),
            windows: Mutex::new(WindowState::default()),
        }
    }

    /// Queue a frame for sending
    ///
    /// Priority pushes go to the retransmission FIFO and bypass flow control
    /// on the way out. Every queued frame carries an explicit length field,
    /// since a packet may hold more than one frame.
    pub fn push(&self, mut frame: StreamFrame, prio: bool) {
        let mut q = self.queue.lock();

        frame.data_len_present = true;
        let data_len = frame.data_len();

        if prio {
            q.prio_frames.push_back(Some(frame));
        } else {
            let stream_id = frame.stream_id;
            let stream_existed = q.frames.contains_key(&stream_id);
            q.frames.entry(stream_id).or_default().push_back(frame);
            if !stream_existed {
                q.active_streams.push(Some(stream_id));
            }
        }

        q.byte_len += data_len;
        q.len += 1;
    }

    /// Number of queued frames
    pub fn len(&self) -> usize {
        self.queue.lock().len
    }

    /// Whether the queue holds no frames
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total queued payload bytes
    pub fn byte_len(&self) -> ByteCount {
        self.queue.lock().byte_len
    }

    /// Raise a flow-control ceiling
    ///
    /// `stream_id` 0 updates the connection-level ceiling. Ceilings only move
    /// up; an offset at or below the current ceiling is a no-op.
    pub fn update_window(&self, stream_id: StreamId, offset: ByteCount) {
        let mut w = self.windows.lock();

        let ceiling = w.ceilings.entry(stream_id).or_insert(0);
        if offset > *ceiling {
            *ceiling = offset;
        }
    }

    /// Dequeue the next frame that fits into `max_length` bytes
    ///
    /// Retransmission frames go first and are exempt from flow-control
    /// capping. Fresh frames are chosen by rotating through the active
    /// streams, capped by the lesser of the stream's and the connection's
    /// remaining window; an oversized frame is split and its remainder stays
    /// queued. `Ok(None)` means nothing is sendable right now.
    pub fn pop(&self, max_length: ByteCount) -> Result<Option<StreamFrame>, QueueError> {
        let mut q = self.queue.lock();
        let mut w = self.windows.lock();

        // discard tombstones at the front of the retransmission FIFO
        while matches!(q.prio_frames.front(), Some(None)) {
            let _ = q.prio_frames.pop_front();
        }

        let (source, cap) = if q.prio_frames.front().is_some() {
            // retransmitted bytes were already counted against flow control
            (Source::Prio, ByteCount::MAX)
        } else {
            match Self::next_sendable_stream(&mut q, &w)? {
                Some(found) => found,
                None => return Ok(None),
            }
        };

        let frame = match &source {
            Source::Prio => match q.prio_frames.front_mut() {
                Some(Some(frame)) => frame,
                _ => return Ok(None),
            },
            Source::Stream(stream_id) => q
                .frames
                .get_mut(stream_id)
                .and_then(VecDeque::front_mut)
                .ok_or(QueueError::InternalConsistency(*stream_id))?,
        };

        // does anything fit into the remaining packet space?
        let budget = max_length.saturating_sub(frame.min_length()).min(cap);
        if budget == 0 {
            return Ok(None);
        }

        let is_prio = matches!(source, Source::Prio);
        let popped = if frame.data_len() > budget {
            // split: emit the first `budget` bytes, leave the rest queued
            frame.split_off(budget)
        } else {
            let whole = match source {
                Source::Prio => match q.prio_frames.pop_front().flatten() {
                    Some(frame) => frame,
                    None => return Ok(None),
                },
                Source::Stream(stream_id) => q
                    .frames
                    .get_mut(&stream_id)
                    .and_then(VecDeque::pop_front)
                    .ok_or(QueueError::InternalConsistency(stream_id))?,
            };
            q.len -= 1;
            whole
        };

        q.byte_len -= popped.data_len();
        if !is_prio && !popped.stream_id.is_flow_control_exempt() {
            w.bytes_sent += popped.data_len();
        }

        Ok(Some(popped))
    }

    /// Rotate through the active streams once, looking for a sendable frame
    ///
    /// Returns the stream and its flow-control cap. A stream without window,
    /// with an exhausted window, or with an empty FIFO is skipped; exhausting
    /// the rotation yields `None`.
    fn next_sendable_stream(
        q: &mut QueueState,
        w: &WindowState,
    ) -> Result<Option<(Source, ByteCount)>, QueueError> {
        if q.len == 0 || q.active_streams.is_empty() {
            return Ok(None);
        }

        for _ in 0..q.active_streams.len() {
            let slot = q.active_streams[q.cursor];
            q.cursor = (q.cursor + 1) % q.active_streams.len();

            let stream_id = match slot {
                Some(id) => id,
                None => continue,
            };

            let fifo = q
                .frames
                .get(&stream_id)
                .ok_or(QueueError::InternalConsistency(stream_id))?;
            let frame = match fifo.front() {
                Some(frame) => frame,
                None => continue,
            };

            let cap = Self::flow_control_cap(w, stream_id, frame.offset)?;
            if cap > 0 {
                return Ok(Some((Source::Stream(stream_id), cap)));
            }
            tracing::trace!(stream_id = stream_id.as_raw(), "stream is flow control blocked");
        }

        Ok(None)
    }

    /// Sendable byte cap for a stream at the given offset
    ///
    /// Lesser of the stream's remaining window and the connection's remaining
    /// window; exempt streams skip the connection budget. A stream with no
    /// ceiling yet has a zero cap. An offset already beyond the stream's own
    /// ceiling is a flow-control violation.
    fn flow_control_cap(
        w: &WindowState,
        stream_id: StreamId,
        offset: ByteCount,
    ) -> Result<ByteCount, QueueError> {
        let ceiling = match w.ceilings.get(&stream_id) {
            Some(&ceiling) => ceiling,
            None => return Ok(0),
        };
        if offset > ceiling {
            return Err(QueueError::FlowControlViolation {
                stream_id,
                offset,
                ceiling,
            });
        }
        let stream_remaining = ceiling - offset;

        if stream_id.is_flow_control_exempt() {
            return Ok(stream_remaining);
        }

        let connection_ceiling = w
            .ceilings
            .get(&StreamId::CONNECTION)
            .copied()
            .unwrap_or(0);
        let connection_remaining = connection_ceiling.saturating_sub(w.bytes_sent);

        Ok(stream_remaining.min(connection_remaining))
    }

    /// Drop every trace of a stream
    ///
    /// Retransmission-FIFO entries are tombstoned so positions stay stable;
    /// the stream's FIFO, ceiling, and active-list slot are removed, and the
    /// active list is compacted with the cursor adjusted so the rotation
    /// neither skips nor repeats the next live stream.
    pub fn remove_stream(&self, stream_id: StreamId) {
        let mut q = self.queue.lock();
        let mut w = self.windows.lock();

        let mut dropped_bytes: ByteCount = 0;
        let mut dropped_frames = 0usize;

        for slot in q.prio_frames.iter_mut() {
            if slot.as_ref().map_or(false, |f| f.stream_id == stream_id) {
                if let Some(frame) = slot.take() {
                    dropped_bytes += frame.data_len();
                    dropped_frames += 1;
                }
            }
        }

        if let Some(fifo) = q.frames.remove(&stream_id) {
            for frame in &fifo {
                dropped_bytes += frame.data_len();
                dropped_frames += 1;
            }
        }

        q.byte_len -= dropped_bytes;
        q.len -= dropped_frames;

        w.ceilings.remove(&stream_id);

        for slot in q.active_streams.iter_mut() {
            if *slot == Some(stream_id) {
                *slot = None;
            }
        }
        Self::compact_active_streams(&mut q);

        tracing::debug!(
            stream_id = stream_id.as_raw(),
            dropped_frames,
            "removed stream from frame queue"
        );
    }

    /// Drop tombstoned active-list slots, keeping the cursor on the same
    /// next live stream
    fn compact_active_streams(q: &mut QueueState) {
        let removed_before_cursor = q.active_streams[..q.cursor]
            .iter()
            .filter(|slot| slot.is_none())
            .count();
        q.cursor -= removed_before_cursor;

        q.active_streams.retain(Option::is_some);

        if q.active_streams.is_empty() {
            q.cursor = 0;
        } else {
            q.cursor %= q.active_streams.len();
        }
    }
}

impl Default for StreamFrameQueue {
    fn default() -> Self {
        Self::new()
    }
}
