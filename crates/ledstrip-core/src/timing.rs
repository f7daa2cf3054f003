use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::ChannelOrder;
use crate::error::{Error, Result};

/// Pulse generator resolution: 10 MHz, so one tick is 0.1 µs.
pub const RESOLUTION_HZ: u32 = 10_000_000;

const NS_PER_TICK: u32 = 1_000_000_000 / RESOLUTION_HZ;

/// Convert nanoseconds to ticks, rounding to the nearest tick (halves round up).
pub const fn ns_to_ticks(ns: u32) -> u16 {
    ((ns + NS_PER_TICK / 2) / NS_PER_TICK) as u16
}

/// One pulse symbol: two (level, duration) halves, durations in ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub level0: bool,
    pub duration0: u16,
    pub level1: bool,
    pub duration1: u16,
}

impl Symbol {
    /// A data bit: high for `high_ns`, then low for `low_ns`.
    pub const fn bit(high_ns: u32, low_ns: u32) -> Self {
        Self {
            level0: true,
            duration0: ns_to_ticks(high_ns),
            level1: false,
            duration1: ns_to_ticks(low_ns),
        }
    }

    /// The reset/latch gap: the line held low for `total_ns`, split over both halves.
    pub const fn latch(total_ns: u32) -> Self {
        Self {
            level0: false,
            duration0: ns_to_ticks(total_ns / 2),
            level1: false,
            duration1: ns_to_ticks(total_ns / 2),
        }
    }

    pub const fn ticks(&self) -> u32 {
        self.duration0 as u32 + self.duration1 as u32
    }
}

/// LED protocol variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Chipset {
    #[default]
    Ws2812 = 0,
    /// WS2812 timings on parts that expect RGB byte order.
    Ws2812Rgb = 1,
    Sk6812 = 2,
    Apa106 = 3,
    Sm16703 = 4,
}

/// Pulse shapes and default byte order for one chipset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChipsetTiming {
    pub bit0: Symbol,
    pub bit1: Symbol,
    pub reset: Symbol,
    pub order: ChannelOrder,
}

impl ChipsetTiming {
    #[inline]
    pub const fn bit(&self, set: bool) -> Symbol {
        if set {
            self.bit1
        } else {
            self.bit0
        }
    }

    /// The longer of the two bit periods, in ticks.
    pub const fn bit_period_ticks(&self) -> u32 {
        let zero = self.bit0.ticks();
        let one = self.bit1.ticks();
        if zero > one {
            zero
        } else {
            one
        }
    }

    /// Worst-case wire time for a frame of `bytes` data bytes plus the latch.
    /// Saturates instead of overflowing for absurd lengths.
    pub fn frame_duration(&self, bytes: usize) -> Duration {
        let bits = u64::try_from(bytes).unwrap_or(u64::MAX).saturating_mul(8);
        let ticks = bits
            .saturating_mul(u64::from(self.bit_period_ticks()))
            .saturating_add(u64::from(self.reset.ticks()));
        Duration::from_nanos(ticks.saturating_mul(u64::from(NS_PER_TICK)))
    }
}

// Datasheet values in nanoseconds.
const WS2812_BIT0: Symbol = Symbol::bit(300, 900);
const WS2812_BIT1: Symbol = Symbol::bit(900, 300);
const WS2812_RESET: Symbol = Symbol::latch(50_000);

const SK6812_BIT0: Symbol = Symbol::bit(320, 900);
const SK6812_BIT1: Symbol = Symbol::bit(640, 400);
const SK6812_RESET: Symbol = Symbol::latch(90_000);

const APA106_BIT0: Symbol = Symbol::bit(350, 1360);
const APA106_BIT1: Symbol = Symbol::bit(1360, 350);
const APA106_RESET: Symbol = Symbol::latch(50_000);

const SM16703_BIT0: Symbol = Symbol::bit(300, 900);
const SM16703_BIT1: Symbol = Symbol::bit(900, 300);
const SM16703_RESET: Symbol = Symbol::latch(210_000);

/// Indexed by `Chipset as usize`.
static TIMINGS: [ChipsetTiming; Chipset::ALL.len()] = [
    ChipsetTiming {
        bit0: WS2812_BIT0,
        bit1: WS2812_BIT1,
        reset: WS2812_RESET,
        order: ChannelOrder::Grb,
    },
    ChipsetTiming {
        bit0: WS2812_BIT0,
        bit1: WS2812_BIT1,
        reset: WS2812_RESET,
        order: ChannelOrder::Rgb,
    },
    ChipsetTiming {
        bit0: SK6812_BIT0,
        bit1: SK6812_BIT1,
        reset: SK6812_RESET,
        order: ChannelOrder::Grb,
    },
    ChipsetTiming {
        bit0: APA106_BIT0,
        bit1: APA106_BIT1,
        reset: APA106_RESET,
        order: ChannelOrder::Rgb,
    },
    ChipsetTiming {
        bit0: SM16703_BIT0,
        bit1: SM16703_BIT1,
        reset: SM16703_RESET,
        order: ChannelOrder::Rgb,
    },
];

impl Chipset {
    pub const ALL: [Chipset; 5] = [
        Chipset::Ws2812,
        Chipset::Ws2812Rgb,
        Chipset::Sk6812,
        Chipset::Apa106,
        Chipset::Sm16703,
    ];

    /// Look up a chipset by its numeric index. Out-of-range indices are rejected.
    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(Error::InvalidArgument("chipset index out of range"))
    }

    pub fn timing(self) -> &'static ChipsetTiming {
        &TIMINGS[self as usize]
    }

    pub fn default_order(self) -> ChannelOrder {
        self.timing().order
    }

    pub fn name(self) -> &'static str {
        match self {
            Chipset::Ws2812 => "ws2812",
            Chipset::Ws2812Rgb => "ws2812_rgb",
            Chipset::Sk6812 => "sk6812",
            Chipset::Apa106 => "apa106",
            Chipset::Sm16703 => "sm16703",
        }
    }
}

impl fmt::Display for Chipset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
