//! QMux Protocol Core
//!
//! Reliability and flow-control engine for a multiplexed, packet-based
//! transport connection: received-packet interval tracking, ack and
//! stop-waiting generation, retransmission bookkeeping, and fair scheduling
//! of outbound stream data under flow-control budgets. Wire codecs,
//! congestion algorithms, crypto, and the socket layer live outside this
//! crate and drive it through the handler contracts.

pub mod ack;
pub mod entropy;
pub mod frame;
pub mod handler;
pub mod history;
pub mod packet;
pub mod queue;
pub mod sent;
pub mod types;

pub use ack::ReceivedPacketTracker;
pub use entropy::EntropyAccumulator;
pub use frame::{AckFrame, AckRange, Frame, StopWaitingFrame, StreamFrame, WindowUpdateFrame};
pub use handler::{AckError, ReceivedPacketHandler, SentPacketHandler, StopWaitingManager};
pub use history::{PacketInterval, ReceivedPacketHistory};
pub use packet::SentPacket;
pub use queue::{QueueError, StreamFrameQueue};
pub use sent::{SentPacketTracker, StopWaitingTracker};
pub use types::{ByteCount, PacketNumber, StreamId, MAX_PACKET_SIZE};
