use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::ChannelOrder;
use crate::error::{Error, Result};
use crate::hal::ChannelProvider;
use crate::priority::Priority;
use crate::strip::{InstallOptions, LedStrip, StripContext, DEFAULT_BRIGHTNESS};
use crate::timing::Chipset;

/// A set of strips, written as `[[strip]]` tables in TOML.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default, rename = "strip")]
    pub strips: Vec<StripConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StripConfig {
    #[serde(default)]
    pub chipset: Chipset,
    #[serde(default)]
    pub rgbw: bool,
    #[serde(default)]
    pub auto_white: bool,
    pub pixel_count: usize,
    #[serde(default = "default_data_pin")]
    pub data_pin: u8,
    #[serde(default = "default_brightness")]
    pub brightness: u8,
    #[serde(default)]
    pub color_order: Option<ChannelOrder>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub use_dma: bool,
    #[serde(default)]
    pub flush_timeout_ms: Option<u64>,
}

fn default_data_pin() -> u8 {
    2
}
fn default_brightness() -> u8 {
    DEFAULT_BRIGHTNESS
}

const FLUSH_TIMEOUT_MS_MIN: u64 = 10;
const FLUSH_TIMEOUT_MS_MAX: u64 = 60_000;

impl StripConfig {
    pub fn new(pixel_count: usize) -> Self {
        Self {
            chipset: Chipset::default(),
            rgbw: false,
            auto_white: false,
            pixel_count,
            data_pin: default_data_pin(),
            brightness: default_brightness(),
            color_order: None,
            priority: Priority::default(),
            use_dma: false,
            flush_timeout_ms: None,
        }
    }

    pub fn options(&self) -> InstallOptions {
        InstallOptions {
            priority: self.priority,
            use_dma: self.use_dma,
            flush_timeout: self.flush_timeout_ms.map(Duration::from_millis),
        }
    }

    fn validate(&mut self) -> Result<()> {
        if self.pixel_count == 0 {
            return Err(Error::InvalidArgument("pixel_count must be at least 1"));
        }
        self.flush_timeout_ms = self
            .flush_timeout_ms
            .map(|ms| ms.clamp(FLUSH_TIMEOUT_MS_MIN, FLUSH_TIMEOUT_MS_MAX));
        Ok(())
    }
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let mut config: Config = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn num_leds(&self) -> usize {
        self.strips.iter().map(|s| s.pixel_count).sum()
    }

    fn validate(&mut self) -> Result<()> {
        self.strips.iter_mut().try_for_each(StripConfig::validate)
    }
}

impl<P: ChannelProvider> LedStrip<P> {
    /// Build and install a strip from its configuration, on the process-wide
    /// context.
    pub fn from_config(provider: P, config: &StripConfig) -> Result<Self> {
        Self::from_config_in(provider, config, StripContext::global())
    }

    pub fn from_config_in(
        provider: P,
        config: &StripConfig,
        context: std::sync::Arc<StripContext>,
    ) -> Result<Self> {
        let mut strip = Self::with_context(provider, config.chipset, config.rgbw, context);
        if let Some(order) = config.color_order {
            strip.set_channel_order(order);
        }
        strip.begin_with(
            config.data_pin,
            config.pixel_count,
            config.auto_white,
            config.options(),
        )?;
        strip.set_brightness(config.brightness, false)?;
        Ok(strip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in() {
        let config = Config::from_toml(
            r#"
            [[strip]]
            pixel_count = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.strips, vec![StripConfig::new(30)]);
        let strip = &config.strips[0];
        assert_eq!(strip.data_pin, 2);
        assert_eq!(strip.brightness, 255);
        assert_eq!(strip.options(), InstallOptions::default());
    }

    #[test]
    fn full_toml() {
        let config = Config::from_toml(
            r#"
            [[strip]]
            chipset = "sk6812"
            rgbw = true
            auto_white = true
            pixel_count = 60
            data_pin = 18
            brightness = 40
            color_order = "bgr"
            priority = "medium"
            use_dma = true
            flush_timeout_ms = 5

            [[strip]]
            chipset = "apa106"
            pixel_count = 8
            flush_timeout_ms = 120000
            "#,
        )
        .unwrap();
        assert_eq!(config.strips.len(), 2);
        assert_eq!(config.num_leds(), 68);

        let a = &config.strips[0];
        assert_eq!(a.chipset, Chipset::Sk6812);
        assert!(a.rgbw && a.auto_white && a.use_dma);
        assert_eq!(a.color_order, Some(ChannelOrder::Bgr));
        assert_eq!(a.priority, Priority::Medium);
        assert_eq!(a.flush_timeout_ms, Some(10));
        assert_eq!(
            a.options().flush_timeout,
            Some(Duration::from_millis(10))
        );

        assert_eq!(config.strips[1].flush_timeout_ms, Some(60_000));
    }

    #[test]
    fn json_matches_toml() {
        let config = Config::from_json(
            r#"{"strip": [{"chipset": "ws2812_rgb", "pixel_count": 3, "priority": "low"}]}"#,
        )
        .unwrap();
        let strip = &config.strips[0];
        assert_eq!(strip.chipset, Chipset::Ws2812Rgb);
        assert_eq!(strip.priority, Priority::Low);
    }

    #[test]
    fn rejects_zero_pixels() {
        let err = Config::from_toml("[[strip]]\npixel_count = 0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn parse_errors_are_typed() {
        assert!(matches!(
            Config::from_toml("[[strip]]\nchipset = \"ws2811\"\npixel_count = 1\n"),
            Err(Error::ConfigParse(_))
        ));
        assert!(matches!(Config::from_json("{"), Err(Error::JsonParse(_))));
    }

    #[test]
    fn empty_config_has_no_strips() {
        let config = Config::from_toml("").unwrap();
        assert!(config.strips.is_empty());
        assert_eq!(config.num_leds(), 0);
    }
}
