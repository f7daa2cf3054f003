use std::thread;
use std::time::Duration;

use esp_idf_svc::hal::gpio::AnyOutputPin;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::hal::rmt::TxRmtDriver;
use ledstrip_core::hal::ChannelConfig;
use ledstrip_core::{Color, Config, LedStrip};
use log::{error, info, warn};
use smart_leds::hsv::{hsv2rgb, Hsv};
use smart_leds::SmartLedsWrite;

mod rmt;

const STRIPS_TOML: &str = include_str!("../strips.toml");
const STEP: Duration = Duration::from_millis(1000);

fn main() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("LED strip firmware booting...");

    if let Err(e) = run() {
        error!("LED strip demo stopped: {e}");
    }

    loop {
        thread::sleep(Duration::from_secs(5));
    }
}

fn random_color() -> Color {
    // SAFETY: esp_random only reads the hardware RNG register and may be
    // called from any task.
    Color::from_code(unsafe { esp_idf_svc::sys::esp_random() })
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let peripherals = Peripherals::take()?;
    let config = Config::from_toml(STRIPS_TOML)?;
    let Some(strip_config) = config.strips.first() else {
        warn!("No strips configured");
        return Ok(());
    };
    if config.strips.len() > 1 {
        warn!(
            "{} strips configured, only the first is driven",
            config.strips.len()
        );
    }

    let channel = ChannelConfig::new(
        strip_config.data_pin,
        strip_config.priority,
        strip_config.use_dma,
    );
    // SAFETY: the pin number comes from the strip configuration and nothing
    // else in this firmware claims it.
    let pin = unsafe { AnyOutputPin::new(i32::from(strip_config.data_pin)) };
    let driver = TxRmtDriver::new(
        peripherals.rmt.channel0,
        pin,
        &rmt::transmit_config(channel.mem_block_symbols),
    )?;

    let provider = rmt::RmtProvider::new(strip_config.data_pin, driver);
    let mut strip = LedStrip::from_config(provider, strip_config)?;
    info!("Strip ready:\n{}", strip.report_json()?);

    let pixel_count = strip.pixel_count();
    let mut hue: u8 = 0;
    loop {
        for color in [Color::RED, Color::GREEN, Color::BLUE] {
            strip.fill(color, true)?;
            thread::sleep(STEP);
        }

        strip.fill_with(|_| random_color(), true)?;
        thread::sleep(STEP);

        let spread = (256 / pixel_count.max(1)).max(1);
        let rainbow = (0..pixel_count).map(|i| {
            hsv2rgb(Hsv {
                hue: hue.wrapping_add((i * spread) as u8),
                sat: 255,
                val: 255,
            })
        });
        strip.write(rainbow)?;
        hue = hue.wrapping_add(16);
        thread::sleep(STEP);
    }
}
