//! The seam between the encoding core and a concrete pulse peripheral.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::encoder::FrameEncoder;
use crate::priority::Priority;
use crate::timing::RESOLUTION_HZ;

/// Opaque identifier of an allocated transmission channel.
pub type ChannelId = u32;

/// Symbols per channel memory block without DMA.
pub const MEM_BLOCK_SYMBOLS_DEFAULT: usize = 48;
/// Symbols per channel memory block with DMA.
pub const MEM_BLOCK_SYMBOLS_DMA: usize = 1024;
/// Minimum symbol space handed to the encoder per callback.
pub const ENCODER_MIN_CHUNK_SIZE: usize = 64;
/// Transactions the channel may queue in the background.
pub const TRANS_QUEUE_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The requested interrupt priority clashes with one already in use.
    #[error("interrupt priority conflict")]
    PriorityConflict,
    #[error("no free transmission channel")]
    NoFreeChannel,
    #[error("out of memory")]
    NoMemory,
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Hardware(String),
}

/// Per-strip channel settings handed to [`ChannelProvider::create_channel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelConfig {
    pub pin: u8,
    pub resolution_hz: u32,
    pub mem_block_symbols: usize,
    pub trans_queue_depth: usize,
    pub priority: Priority,
    pub with_dma: bool,
    pub invert_out: bool,
}

impl ChannelConfig {
    pub fn new(pin: u8, priority: Priority, with_dma: bool) -> Self {
        Self {
            pin,
            resolution_hz: RESOLUTION_HZ,
            mem_block_symbols: if with_dma {
                MEM_BLOCK_SYMBOLS_DMA
            } else {
                MEM_BLOCK_SYMBOLS_DEFAULT
            },
            trans_queue_depth: TRANS_QUEUE_DEPTH,
            priority,
            with_dma,
            invert_out: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EncoderConfig {
    pub min_chunk_size: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            min_chunk_size: ENCODER_MIN_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransmitConfig {
    /// 0 sends the frame once.
    pub loop_count: u32,
    /// Line level after the last symbol.
    pub eot_level: bool,
    pub queue_nonblocking: bool,
}

/// An allocated transmission channel.
///
/// Dropping a channel without passing it to
/// [`ChannelProvider::delete_channel`] must not touch the hardware: that path
/// is taken when the pin has been reclaimed by another peripheral.
pub trait TxChannel {
    fn id(&self) -> ChannelId;

    fn enable(&mut self) -> Result<(), ChannelError>;

    fn disable(&mut self) -> Result<(), ChannelError>;

    /// Start sending a frame. The channel pulls symbols from `frame` (through
    /// [`FrameEncoder::fill`] or [`FrameEncoder::symbols`]) until it reports
    /// done.
    fn transmit(
        &mut self,
        frame: &mut FrameEncoder<'_>,
        config: &TransmitConfig,
    ) -> Result<(), ChannelError>;

    /// Block until every queued transmission has left the pin, or `timeout`.
    fn wait_done(&mut self, timeout: Duration) -> Result<(), ChannelError>;
}

/// Allocates and releases transmission channels.
pub trait ChannelProvider {
    type Channel: TxChannel;

    fn create_channel(&mut self, config: &ChannelConfig) -> Result<Self::Channel, ChannelError>;

    fn delete_channel(&mut self, channel: Self::Channel) -> Result<(), ChannelError>;
}
