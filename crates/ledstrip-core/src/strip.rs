//! Strip descriptor and transmission lifecycle.
//!
//! `Uninstalled → Initialized → Installed → (Transmitting ⇄ Idle) → Freed`,
//! with `Invalidated` reachable from any installed state when the pin is
//! reclaimed from outside.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use smart_leds::{SmartLedsWrite, RGB8};

use crate::color::{ChannelOrder, Color};
use crate::encoder::FrameEncoder;
use crate::error::{Error, Result};
use crate::hal::{
    ChannelConfig, ChannelError, ChannelProvider, EncoderConfig, TransmitConfig, TxChannel,
};
use crate::pixels::PixelBuffer;
use crate::priority::{Priority, PriorityPool, SlotStatus, FALLBACK_ORDER};
use crate::registry::{InstanceRegistry, Validity};
use crate::timing::{Chipset, ChipsetTiming};

pub const DEFAULT_BRIGHTNESS: u8 = 255;

/// Lower bound on the flush wait.
pub const MIN_FLUSH_TIMEOUT: Duration = Duration::from_millis(300);
/// The flush wait is at least this many times the frame's wire time.
const FLUSH_TIMEOUT_FACTOR: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StripState {
    Uninstalled,
    Initialized,
    Installed,
    Transmitting,
    Idle,
    Invalidated,
    Freed,
}

impl fmt::Display for StripState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StripState::Uninstalled => "uninstalled",
            StripState::Initialized => "initialized",
            StripState::Installed => "installed",
            StripState::Transmitting => "transmitting",
            StripState::Idle => "idle",
            StripState::Invalidated => "invalidated",
            StripState::Freed => "freed",
        };
        f.write_str(s)
    }
}

/// Optional install-time settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    pub priority: Priority,
    pub use_dma: bool,
    /// Overrides the length-derived flush timeout.
    pub flush_timeout: Option<Duration>,
}

/// Hardware-wide state every strip draws from.
#[derive(Debug, Default)]
pub struct StripContext {
    pub priorities: PriorityPool,
    pub registry: InstanceRegistry,
}

impl StripContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide context used by [`LedStrip::new`].
    pub fn global() -> Arc<StripContext> {
        static GLOBAL: OnceLock<Arc<StripContext>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(StripContext::new())))
    }
}

/// Diagnostic snapshot of a strip, serializable for debug output.
#[derive(Debug, Clone, Serialize)]
pub struct StripReport {
    pub chipset: Chipset,
    pub state: StripState,
    pub rgbw: bool,
    pub auto_white: bool,
    pub pixel_count: usize,
    pub pin: u8,
    pub brightness_target: u8,
    pub brightness_active: u8,
    pub buffer_bytes: Option<usize>,
    pub channel_order: ChannelOrder,
    pub custom_order: bool,
    pub channel: Option<ChannelConfig>,
    pub encoder: Option<EncoderConfig>,
    pub transmit: TransmitConfig,
    pub timing: ChipsetTiming,
    pub flush_timeout_ms: u64,
    pub priorities: Vec<SlotStatus>,
    pub active_channels: u8,
}

/// Encoder binding created at install: which pulse table and chunk size the
/// channel's encoder callback uses.
#[derive(Debug, Clone, Copy)]
struct EncoderBinding {
    config: EncoderConfig,
    timing: &'static ChipsetTiming,
}

/// One physical LED strip.
pub struct LedStrip<P: ChannelProvider> {
    provider: P,
    context: Arc<StripContext>,

    chipset: Chipset,
    rgbw: bool,
    auto_white: bool,
    pixel_count: usize,
    pin: u8,
    custom_order: Option<ChannelOrder>,
    brightness_target: u8,
    brightness_active: u8,
    options: InstallOptions,

    channel_config: Option<ChannelConfig>,
    encoder_config: EncoderConfig,
    transmit_config: TransmitConfig,

    buffer: Option<PixelBuffer>,
    channel: Option<P::Channel>,
    priority: Option<Priority>,
    encoder: Option<EncoderBinding>,
    encode_position: usize,
    validity: Arc<Validity>,
    state: StripState,
}

impl<P: ChannelProvider> LedStrip<P> {
    /// A strip drawing from the process-wide priority pool and registry.
    pub fn new(provider: P, chipset: Chipset, rgbw: bool) -> Self {
        Self::with_context(provider, chipset, rgbw, StripContext::global())
    }

    pub fn with_context(
        provider: P,
        chipset: Chipset,
        rgbw: bool,
        context: Arc<StripContext>,
    ) -> Self {
        Self {
            provider,
            context,
            chipset,
            rgbw,
            auto_white: false,
            pixel_count: 0,
            pin: 0,
            custom_order: None,
            brightness_target: DEFAULT_BRIGHTNESS,
            brightness_active: DEFAULT_BRIGHTNESS,
            options: InstallOptions::default(),
            channel_config: None,
            encoder_config: EncoderConfig::default(),
            transmit_config: TransmitConfig::default(),
            buffer: None,
            channel: None,
            priority: None,
            encoder: None,
            encode_position: 0,
            validity: Arc::new(Validity::cleared(0)),
            state: StripState::Uninstalled,
        }
    }

    /// Construct from a numeric chipset index, rejecting unknown values.
    pub fn from_index(provider: P, chipset: usize, rgbw: bool) -> Result<Self> {
        Ok(Self::new(provider, Chipset::from_index(chipset)?, rgbw))
    }

    // -- Lifecycle --

    /// Record pin, length and options and build the channel, encoder and
    /// transmit configuration. Allocates nothing.
    pub fn initialize(
        &mut self,
        pin: u8,
        pixel_count: usize,
        auto_white: bool,
        options: InstallOptions,
    ) -> Result<()> {
        if matches!(self.state, StripState::Installed | StripState::Idle)
            && !self.validity.is_valid()
        {
            self.release_after_reclaim();
        }
        match self.state {
            StripState::Uninstalled
            | StripState::Initialized
            | StripState::Invalidated
            | StripState::Freed => {}
            other => return Err(Error::InvalidState(other)),
        }
        if pixel_count == 0 {
            debug!("Invalid arguments: pixel_count is 0");
            return Err(Error::InvalidArgument("pixel_count must be at least 1"));
        }

        self.pin = pin;
        self.pixel_count = pixel_count;
        self.auto_white = auto_white;
        self.options = options;
        self.channel_config = Some(ChannelConfig::new(pin, options.priority, options.use_dma));
        self.encoder_config = EncoderConfig::default();
        self.transmit_config = TransmitConfig::default();
        self.encode_position = 0;
        self.state = StripState::Initialized;

        debug!(
            "Strip configured: {} x{} on GPIO {}, priority {}, DMA {}",
            self.chipset,
            pixel_count,
            pin,
            options.priority,
            if options.use_dma { "on" } else { "off" }
        );
        Ok(())
    }

    /// Allocate the buffer, acquire a channel and priority, bind the encoder
    /// and enable the channel. Any failure releases everything acquired so far.
    pub fn install(&mut self) -> Result<()> {
        if self.state != StripState::Initialized {
            return Err(Error::InvalidState(self.state));
        }
        let mut config = self
            .channel_config
            .clone()
            .ok_or(Error::InvalidState(self.state))?;

        let buffer = PixelBuffer::allocate(self.pixel_count, self.rgbw, self.auto_white)
            .inspect_err(|e| debug!("Failed to allocate LED buffer: {e}"))?;
        debug!("LED buffer allocated ({} bytes)", buffer.len());

        // On error `buffer` drops here, before returning.
        let (mut channel, priority) = self.acquire_channel(&mut config)?;

        let encoder = EncoderBinding {
            config: self.encoder_config,
            timing: self.chipset.timing(),
        };

        if let Err(e) = channel.enable() {
            debug!("Failed to enable TX channel: {e}");
            self.release_channel(channel, priority);
            return Err(e.into());
        }

        let validity = Arc::new(Validity::new(self.pin));
        if let Err(e) = self
            .context
            .registry
            .register(channel.id(), Arc::clone(&validity))
        {
            if let Err(disable_err) = channel.disable() {
                warn!("Failed to disable TX channel: {disable_err}");
            }
            self.release_channel(channel, priority);
            return Err(e);
        }

        self.channel_config = Some(config);
        self.buffer = Some(buffer);
        self.channel = Some(channel);
        self.priority = Some(priority);
        self.encoder = Some(encoder);
        self.encode_position = 0;
        self.validity = validity;
        self.state = StripState::Installed;

        info!(
            "LED strip installed: {} x{} on GPIO {} (priority {})",
            self.chipset, self.pixel_count, self.pin, priority
        );
        Ok(())
    }

    /// `initialize` then `install` with default options.
    pub fn begin(&mut self, pin: u8, pixel_count: usize, auto_white: bool) -> Result<()> {
        self.begin_with(pin, pixel_count, auto_white, InstallOptions::default())
    }

    pub fn begin_with(
        &mut self,
        pin: u8,
        pixel_count: usize,
        auto_white: bool,
        options: InstallOptions,
    ) -> Result<()> {
        self.initialize(pin, pixel_count, auto_white, options)?;
        self.install()
    }

    /// Claim a priority slot and create a channel, walking the fallback order
    /// when channel creation fails. Holds no slot on error.
    fn acquire_channel(&mut self, config: &mut ChannelConfig) -> Result<(P::Channel, Priority)> {
        let requested = config.priority;
        let Some(first) = self.context.priorities.acquire(requested) else {
            warn!(
                "No interrupt priorities available. Active channels: {}",
                self.context.priorities.active_channels()
            );
            return Err(Error::ResourceExhausted);
        };
        if first != requested {
            debug!("Requested priority {requested} not available, using {first} instead");
        }

        let mut last_err = ChannelError::NoFreeChannel;
        let mut tried = Vec::with_capacity(FALLBACK_ORDER.len());
        for priority in std::iter::once(first).chain(FALLBACK_ORDER) {
            if tried.contains(&priority) {
                continue;
            }
            tried.push(priority);
            if priority != first && !self.context.priorities.mark_used(priority) {
                continue;
            }

            config.priority = priority;
            match self.provider.create_channel(config) {
                Ok(channel) => {
                    debug!("TX channel {} created with priority {priority}", channel.id());
                    return Ok((channel, priority));
                }
                Err(e) => {
                    debug!("Channel creation with priority {priority} failed: {e}");
                    self.context.priorities.mark_free(priority);
                    last_err = e;
                }
            }
        }

        warn!("Failed to create TX channel: {last_err}");
        Err(last_err.into())
    }

    fn release_channel(&mut self, channel: P::Channel, priority: Priority) {
        if let Err(e) = self.provider.delete_channel(channel) {
            warn!("Failed to delete TX channel: {e}");
        }
        self.context.priorities.mark_free(priority);
    }

    /// Push the whole buffer out and wait, bounded, for it to leave the pin.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_valid()?;

        let timeout = self.flush_timeout();
        let brightness = self.brightness_target;
        let (Some(channel), Some(buffer), Some(encoder)) =
            (self.channel.as_mut(), self.buffer.as_ref(), self.encoder)
        else {
            return Err(Error::InvalidState(self.state));
        };

        self.state = StripState::Transmitting;
        let mut frame = FrameEncoder::new(
            buffer.as_bytes(),
            &mut self.encode_position,
            brightness,
            encoder.timing,
        );
        let result = channel
            .transmit(&mut frame, &self.transmit_config)
            .and_then(|()| channel.wait_done(timeout));
        // A frame cut short must not leave the next one starting mid-buffer.
        self.encode_position = 0;
        self.state = StripState::Idle;

        match result {
            Ok(()) => {
                self.brightness_active = brightness;
                Ok(())
            }
            Err(ChannelError::Timeout(waited)) => {
                warn!("Timed out after {waited:?} waiting for TX to finish");
                Err(ChannelError::Timeout(waited).into())
            }
            Err(e) => {
                debug!("Transmission failed: {e}");
                Err(Error::HardwareTransmitFailure(e.to_string()))
            }
        }
    }

    /// Alias for [`flush`](Self::flush).
    pub fn show(&mut self) -> Result<()> {
        self.flush()
    }

    /// Release the channel, priority slot, encoder binding and buffer.
    ///
    /// Waits for any transmission in flight first. On a strip whose pin was
    /// reclaimed, the hardware is left alone, only bookkeeping is released,
    /// and `InvalidState(Invalidated)` is returned, the same as any other
    /// operation after reclamation.
    pub fn free(&mut self) -> Result<()> {
        if self.buffer.is_none() {
            debug!("Attempting to free a strip that is not installed");
            return Err(Error::InvalidState(self.state));
        }

        if !self.validity.invalidate() {
            self.release_after_reclaim();
            return Err(Error::InvalidState(self.state));
        }

        let timeout = self.flush_timeout();
        let mut first_err: Option<Error> = None;
        if let Some(mut channel) = self.channel.take() {
            if let Err(e) = channel.wait_done(timeout) {
                warn!("Fail on wait for TX to finish: {e}");
                first_err.get_or_insert(e.into());
            }
            if let Err(e) = channel.disable() {
                warn!("Fail on disable TX channel: {e}");
                first_err.get_or_insert(e.into());
            }
            self.context
                .registry
                .unregister_owned(channel.id(), &self.validity);
            if let Err(e) = self.provider.delete_channel(channel) {
                warn!("Fail on delete TX channel: {e}");
                first_err.get_or_insert(e.into());
            }
        }
        if let Some(priority) = self.priority.take() {
            self.context.priorities.mark_free(priority);
        }
        self.encoder = None;
        self.buffer = None;
        self.encode_position = 0;
        self.state = StripState::Freed;
        info!("LED strip on GPIO {} freed", self.pin);

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Mark the strip invalid because its pin now belongs to someone else.
    /// Safe to call from any context; the hardware is not touched.
    pub fn invalidate(&self) -> bool {
        let won = self.validity.invalidate();
        if won {
            warn!("LED strip on GPIO {} invalidated", self.pin);
        }
        won
    }

    /// Shared validity flag, for wiring into an external ownership manager.
    pub fn validity(&self) -> Arc<Validity> {
        Arc::clone(&self.validity)
    }

    /// Drop everything owned after an external reclamation, without touching
    /// the channel hardware.
    fn release_after_reclaim(&mut self) {
        if let Some(channel) = self.channel.take() {
            self.context
                .registry
                .unregister_owned(channel.id(), &self.validity);
            drop(channel);
        }
        if let Some(priority) = self.priority.take() {
            self.context.priorities.mark_free(priority);
        }
        self.encoder = None;
        self.buffer = None;
        self.encode_position = 0;
        self.state = StripState::Invalidated;
        debug!("Released resources of reclaimed strip on GPIO {}", self.pin);
    }

    fn ensure_valid(&mut self) -> Result<()> {
        match self.state {
            StripState::Installed | StripState::Idle => {
                if self.validity.is_valid() {
                    Ok(())
                } else {
                    self.release_after_reclaim();
                    Err(Error::InvalidState(self.state))
                }
            }
            other => Err(Error::InvalidState(other)),
        }
    }

    fn flush_if(&mut self, flush_now: bool) -> Result<()> {
        if flush_now {
            self.flush()
        } else {
            Ok(())
        }
    }

    // -- Pixels --

    fn buffer_mut(&mut self) -> Result<(&mut PixelBuffer, ChannelOrder)> {
        self.ensure_valid()?;
        let order = self.channel_order();
        let state = self.state;
        let buffer = self.buffer.as_mut().ok_or(Error::InvalidState(state))?;
        Ok((buffer, order))
    }

    pub fn set_pixel(&mut self, index: usize, color: impl Into<Color>, flush_now: bool) -> Result<()> {
        let (buffer, order) = self.buffer_mut()?;
        buffer.set(index, color.into(), order)?;
        self.flush_if(flush_now)
    }

    /// Set a pixel with an explicit white level (RGBW strips).
    pub fn set_pixel_rgbw(
        &mut self,
        index: usize,
        color: impl Into<Color>,
        white: u8,
        flush_now: bool,
    ) -> Result<()> {
        let (buffer, order) = self.buffer_mut()?;
        buffer.set_rgbw(index, color.into(), white, order)?;
        self.flush_if(flush_now)
    }

    pub fn set_pixels(&mut self, start: usize, colors: &[Color], flush_now: bool) -> Result<()> {
        let (buffer, order) = self.buffer_mut()?;
        buffer.set_range(start, colors, order)?;
        self.flush_if(flush_now)
    }

    /// Like [`set_pixels`](Self::set_pixels) with `0xRRGGBB` codes.
    pub fn set_pixel_codes(&mut self, start: usize, codes: &[u32], flush_now: bool) -> Result<()> {
        let colors: Vec<Color> = codes.iter().map(|&c| Color::from_code(c)).collect();
        self.set_pixels(start, &colors, flush_now)
    }

    pub fn fill_range(
        &mut self,
        start: usize,
        len: usize,
        color: impl Into<Color>,
        flush_now: bool,
    ) -> Result<()> {
        let (buffer, order) = self.buffer_mut()?;
        buffer.fill_range(start, len, color.into(), order)?;
        self.flush_if(flush_now)
    }

    pub fn fill(&mut self, color: impl Into<Color>, flush_now: bool) -> Result<()> {
        let (buffer, order) = self.buffer_mut()?;
        buffer.fill(color.into(), order);
        self.flush_if(flush_now)
    }

    /// Fill each pixel with `f(index)`.
    pub fn fill_with<F>(&mut self, f: F, flush_now: bool) -> Result<()>
    where
        F: FnMut(usize) -> Color,
    {
        let (buffer, order) = self.buffer_mut()?;
        buffer.fill_with(f, order);
        self.flush_if(flush_now)
    }

    pub fn clear(&mut self, flush_now: bool) -> Result<()> {
        let (buffer, _) = self.buffer_mut()?;
        buffer.clear();
        self.flush_if(flush_now)
    }

    /// Read a pixel back. Out of range or uninstalled reads return black.
    pub fn get_pixel(&self, index: usize) -> Color {
        if !self.validity.is_valid() {
            return Color::BLACK;
        }
        self.buffer
            .as_ref()
            .and_then(|b| b.get(index, self.channel_order()))
            .unwrap_or(Color::BLACK)
    }

    // -- Brightness --

    /// Set the brightness applied from the next transmission on.
    pub fn set_brightness(&mut self, value: u8, flush_now: bool) -> Result<()> {
        self.ensure_valid()?;
        self.brightness_target = value;
        self.flush_if(flush_now)
    }

    /// Brightness of the last completed transmission.
    pub fn brightness(&self) -> u8 {
        self.brightness_active
    }

    pub fn target_brightness(&self) -> u8 {
        self.brightness_target
    }

    // -- Channel order --

    /// Override the byte order for this strip. Bytes already in the buffer are
    /// not rearranged.
    pub fn set_channel_order(&mut self, order: ChannelOrder) {
        debug!("Setting custom color order for GPIO {}: {order}", self.pin);
        self.custom_order = Some(order);
    }

    /// Override the byte order by numeric index. An unknown index falls back
    /// to RGB and is reported as an error.
    pub fn set_channel_order_index(&mut self, index: u8) -> Result<()> {
        match ChannelOrder::from_index(index) {
            Ok(order) => {
                self.set_channel_order(order);
                Ok(())
            }
            Err(e) => {
                debug!("Invalid color order specifier {index}. RGB order set.");
                self.custom_order = Some(ChannelOrder::Rgb);
                Err(e)
            }
        }
    }

    /// Go back to the chipset's default byte order.
    pub fn reset_channel_order(&mut self) {
        debug!(
            "Setting the color order for GPIO {} to its default: {}",
            self.pin,
            self.chipset.default_order()
        );
        self.custom_order = None;
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.custom_order
            .unwrap_or_else(|| self.chipset.default_order())
    }

    // -- Introspection --

    pub fn state(&self) -> StripState {
        self.state
    }

    pub fn is_valid(&self) -> bool {
        self.validity.is_valid()
    }

    pub fn chipset(&self) -> Chipset {
        self.chipset
    }

    pub fn is_rgbw(&self) -> bool {
        self.rgbw
    }

    pub fn auto_white(&self) -> bool {
        self.auto_white
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }

    pub fn channel(&self) -> Option<&P::Channel> {
        self.channel.as_ref()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn context(&self) -> &Arc<StripContext> {
        &self.context
    }

    /// Raw transmit bytes, in channel order and before brightness scaling.
    pub fn buffer(&self) -> Option<&[u8]> {
        self.buffer.as_ref().map(PixelBuffer::as_bytes)
    }

    pub fn encode_position(&self) -> usize {
        self.encode_position
    }

    /// Explicit override, else four frame times, but never under
    /// [`MIN_FLUSH_TIMEOUT`].
    pub fn flush_timeout(&self) -> Duration {
        if let Some(t) = self.options.flush_timeout {
            return t;
        }
        let bytes = self.pixel_count.saturating_mul(if self.rgbw { 4 } else { 3 });
        let frame = self.chipset.timing().frame_duration(bytes);
        frame
            .saturating_mul(FLUSH_TIMEOUT_FACTOR)
            .max(MIN_FLUSH_TIMEOUT)
    }

    pub fn report(&self) -> StripReport {
        StripReport {
            chipset: self.chipset,
            state: self.state,
            rgbw: self.rgbw,
            auto_white: self.auto_white,
            pixel_count: self.pixel_count,
            pin: self.pin,
            brightness_target: self.brightness_target,
            brightness_active: self.brightness_active,
            buffer_bytes: self.buffer.as_ref().map(PixelBuffer::len),
            channel_order: self.channel_order(),
            custom_order: self.custom_order.is_some(),
            channel: self.channel_config.clone(),
            encoder: self.encoder.map(|e| e.config),
            transmit: self.transmit_config,
            timing: *self.chipset.timing(),
            flush_timeout_ms: u64::try_from(self.flush_timeout().as_millis()).unwrap_or(u64::MAX),
            priorities: self.context.priorities.snapshot().to_vec(),
            active_channels: self.context.priorities.active_channels(),
        }
    }

    /// [`report`](Self::report) rendered as pretty JSON.
    pub fn report_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.report())?)
    }
}

impl<P: ChannelProvider> Drop for LedStrip<P> {
    fn drop(&mut self) {
        if self.buffer.is_none() {
            return;
        }
        if self.validity.is_valid() {
            if let Err(e) = self.free() {
                warn!("Error freeing LED strip on drop: {e}");
            }
        } else {
            self.release_after_reclaim();
        }
    }
}

impl<P: ChannelProvider> fmt::Debug for LedStrip<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedStrip")
            .field("chipset", &self.chipset)
            .field("state", &self.state)
            .field("pin", &self.pin)
            .field("pixel_count", &self.pixel_count)
            .field("rgbw", &self.rgbw)
            .finish_non_exhaustive()
    }
}

/// Writes pixels from index 0 and flushes.
impl<P: ChannelProvider> SmartLedsWrite for LedStrip<P> {
    type Error = Error;
    type Color = RGB8;

    fn write<T, I>(&mut self, iterator: T) -> Result<()>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        let colors: Vec<Color> = iterator
            .into_iter()
            .map(|c| {
                let rgb: RGB8 = c.into();
                Color::from(rgb)
            })
            .collect();
        if !colors.is_empty() {
            self.set_pixels(0, &colors, false)?;
        }
        self.flush()
    }
}
