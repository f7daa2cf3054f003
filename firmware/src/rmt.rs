use std::mem;
use std::time::Duration;

use esp_idf_svc::hal::delay::TickType;
use esp_idf_svc::hal::rmt::config::TransmitConfig as RmtConfig;
use esp_idf_svc::hal::rmt::{PinState, Pulse, PulseTicks, Symbol as RmtSymbol, TxRmtDriver};
use esp_idf_svc::sys::{esp_err_t, rmt_wait_tx_done, EspError, ESP_ERR_NO_MEM, ESP_ERR_TIMEOUT};
use ledstrip_core::encoder::FrameEncoder;
use ledstrip_core::hal::{
    ChannelConfig, ChannelError, ChannelId, ChannelProvider, TransmitConfig, TxChannel,
};
use ledstrip_core::timing::{ChipsetTiming, Symbol, RESOLUTION_HZ};
use log::debug;

/// 80 MHz APB clock divided down to the 10 MHz symbol resolution.
const APB_HZ: u32 = 80_000_000;
const CLOCK_DIVIDER: u8 = (APB_HZ / RESOLUTION_HZ) as u8;

/// Symbols per RMT memory block on the legacy driver.
const SYMBOLS_PER_MEM_BLOCK: usize = 64;

/// RMT settings for a strip channel. Larger strips get more memory blocks so
/// the refill interrupt fires less often.
pub fn transmit_config(mem_block_symbols: usize) -> RmtConfig {
    let blocks = mem_block_symbols.div_ceil(SYMBOLS_PER_MEM_BLOCK).clamp(1, 8);
    RmtConfig::new()
        .clock_divider(CLOCK_DIVIDER)
        .mem_block_num(blocks as u8)
        .idle(Some(PinState::Low))
}

fn map_err(e: EspError) -> ChannelError {
    if e.code() == ESP_ERR_NO_MEM as esp_err_t {
        ChannelError::NoMemory
    } else {
        ChannelError::Hardware(e.to_string())
    }
}

fn pulse(level: bool, ticks: u16) -> Result<Pulse, EspError> {
    let state = if level { PinState::High } else { PinState::Low };
    Ok(Pulse::new(state, PulseTicks::new(ticks)?))
}

fn rmt_symbol(s: &Symbol) -> Result<RmtSymbol, EspError> {
    Ok(RmtSymbol::new(
        pulse(s.level0, s.duration0)?,
        pulse(s.level1, s.duration1)?,
    ))
}

/// The three RMT items a chipset ever needs, converted once per frame.
struct Items {
    bit0: RmtSymbol,
    bit1: RmtSymbol,
    reset: RmtSymbol,
}

impl Items {
    fn new(timing: &ChipsetTiming) -> Result<Self, EspError> {
        Ok(Self {
            bit0: rmt_symbol(&timing.bit0)?,
            bit1: rmt_symbol(&timing.bit1)?,
            reset: rmt_symbol(&timing.reset)?,
        })
    }
}

/// Hands out the one RMT driver prepared for a strip's pin.
pub struct RmtProvider {
    pin: u8,
    driver: Option<TxRmtDriver<'static>>,
}

impl RmtProvider {
    pub fn new(pin: u8, driver: TxRmtDriver<'static>) -> Self {
        Self {
            pin,
            driver: Some(driver),
        }
    }
}

impl ChannelProvider for RmtProvider {
    type Channel = RmtChannel;

    fn create_channel(&mut self, config: &ChannelConfig) -> Result<RmtChannel, ChannelError> {
        if config.pin != self.pin {
            debug!("No RMT driver prepared for GPIO {}", config.pin);
            return Err(ChannelError::NoFreeChannel);
        }
        let driver = self.driver.take().ok_or(ChannelError::NoFreeChannel)?;
        debug!(
            "RMT channel {} on GPIO {} (interrupt priority {} left to the driver default)",
            driver.channel(),
            config.pin,
            config.priority
        );
        Ok(RmtChannel {
            driver: Some(driver),
        })
    }

    fn delete_channel(&mut self, mut channel: RmtChannel) -> Result<(), ChannelError> {
        let Some(mut driver) = channel.driver.take() else {
            return Ok(());
        };
        let stopped = driver.stop().map_err(map_err);
        self.driver = Some(driver);
        stopped
    }
}

pub struct RmtChannel {
    driver: Option<TxRmtDriver<'static>>,
}

impl RmtChannel {
    fn driver(&mut self) -> Result<&mut TxRmtDriver<'static>, ChannelError> {
        self.driver
            .as_mut()
            .ok_or_else(|| ChannelError::Hardware("channel already released".into()))
    }
}

impl TxChannel for RmtChannel {
    fn id(&self) -> ChannelId {
        self.driver.as_ref().map_or(ChannelId::MAX, |d| d.channel())
    }

    fn enable(&mut self) -> Result<(), ChannelError> {
        // The legacy driver is ready as soon as it is installed.
        self.driver().map(|_| ())
    }

    fn disable(&mut self) -> Result<(), ChannelError> {
        self.driver()?.stop().map_err(map_err)
    }

    fn transmit(
        &mut self,
        frame: &mut FrameEncoder<'_>,
        _config: &TransmitConfig,
    ) -> Result<(), ChannelError> {
        let timing = frame.timing();
        let items = Items::new(timing).map_err(map_err)?;
        // The driver keeps reading after start_iter returns, so it gets an
        // owned copy of the frame.
        let symbols: Vec<RmtSymbol> = frame
            .symbols()
            .map(|s| {
                if s == timing.bit1 {
                    items.bit1
                } else if s == timing.bit0 {
                    items.bit0
                } else {
                    items.reset
                }
            })
            .collect();
        self.driver()?
            .start_iter(symbols.into_iter())
            .map_err(map_err)
    }

    fn wait_done(&mut self, timeout: Duration) -> Result<(), ChannelError> {
        let channel = self.driver()?.channel();
        let ticks = TickType::from(timeout).ticks();
        // SAFETY: `channel` belongs to the driver this value owns, so the
        // legacy RMT driver is installed on it.
        let err = unsafe { rmt_wait_tx_done(channel, ticks) };
        if err == ESP_ERR_TIMEOUT as esp_err_t {
            return Err(ChannelError::Timeout(timeout));
        }
        EspError::convert(err).map_err(map_err)
    }
}

impl Drop for RmtChannel {
    fn drop(&mut self) {
        // Only reached without delete_channel when the pin was handed to
        // another peripheral, which now owns the RMT hardware.
        if let Some(driver) = self.driver.take() {
            mem::forget(driver);
        }
    }
}
