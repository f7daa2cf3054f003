use std::fmt;

use serde::{Deserialize, Serialize};
use smart_leds::RGB8;

use crate::error::{Error, Result};

/// RGB color representation, compatible with smart-leds RGB8.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);
    pub const YELLOW: Color = Color::new(255, 255, 0);
    pub const CYAN: Color = Color::new(0, 255, 255);
    pub const MAGENTA: Color = Color::new(255, 0, 255);
    pub const ORANGE: Color = Color::new(255, 165, 0);
    pub const PURPLE: Color = Color::new(128, 0, 128);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a color from a 24-bit `0xRRGGBB` code. The top byte is ignored.
    pub const fn from_code(code: u32) -> Self {
        Self {
            r: (code >> 16) as u8,
            g: (code >> 8) as u8,
            b: code as u8,
        }
    }

    pub const fn to_code(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub const fn is_zero(self) -> bool {
        (self.r | self.g | self.b) == 0
    }

    /// Approximate light output, 0.21R + 0.72G + 0.07B in 8-bit fixed point.
    pub const fn luma(self) -> u8 {
        // Weights sum to 255 after scaling, so this cannot overflow.
        scale8(self.r, 54) + scale8(self.g, 183) + scale8(self.b, 18)
    }
}

impl From<RGB8> for Color {
    fn from(c: RGB8) -> Self {
        Self::new(c.r, c.g, c.b)
    }
}

impl From<Color> for RGB8 {
    fn from(c: Color) -> Self {
        RGB8 {
            r: c.r,
            g: c.g,
            b: c.b,
        }
    }
}

impl From<u32> for Color {
    fn from(code: u32) -> Self {
        Self::from_code(code)
    }
}

/// `i * (scale + 1) / 256`.
#[inline]
pub const fn scale8(i: u8, scale: u8) -> u8 {
    ((i as u16 * (1 + scale as u16)) >> 8) as u8
}

/// Like [`scale8`], but only zero when `i` or `scale` is zero, so dim pixels
/// never switch off entirely.
#[inline]
pub const fn scale8_video(i: u8, scale: u8) -> u8 {
    let scaled = ((i as u16 * scale as u16) >> 8) as u8;
    if i != 0 && scale != 0 {
        scaled + 1
    } else {
        scaled
    }
}

/// Byte order of the red, green and blue channels in the transmit buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb = 0,
    Rbg = 1,
    Grb = 2,
    Gbr = 3,
    Brg = 4,
    Bgr = 5,
}

impl ChannelOrder {
    pub const ALL: [ChannelOrder; 6] = [
        ChannelOrder::Rgb,
        ChannelOrder::Rbg,
        ChannelOrder::Grb,
        ChannelOrder::Gbr,
        ChannelOrder::Brg,
        ChannelOrder::Bgr,
    ];

    pub fn from_index(index: u8) -> Result<Self> {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .ok_or(Error::InvalidArgument("channel order out of range"))
    }

    /// Buffer offsets of the (red, green, blue) bytes within a pixel.
    const fn offsets(self) -> (usize, usize, usize) {
        match self {
            ChannelOrder::Rgb => (0, 1, 2),
            ChannelOrder::Rbg => (0, 2, 1),
            ChannelOrder::Grb => (1, 0, 2),
            ChannelOrder::Gbr => (2, 0, 1),
            ChannelOrder::Brg => (1, 2, 0),
            ChannelOrder::Bgr => (2, 1, 0),
        }
    }

    /// Lay a color out into the first three bytes of `pixel`.
    pub fn write(self, color: Color, pixel: &mut [u8]) {
        let (r, g, b) = self.offsets();
        pixel[r] = color.r;
        pixel[g] = color.g;
        pixel[b] = color.b;
    }

    /// Read a color back out of the first three bytes of `pixel`.
    pub fn read(self, pixel: &[u8]) -> Color {
        let (r, g, b) = self.offsets();
        Color::new(pixel[r], pixel[g], pixel[b])
    }

    pub fn name(self) -> &'static str {
        match self {
            ChannelOrder::Rgb => "rgb",
            ChannelOrder::Rbg => "rbg",
            ChannelOrder::Grb => "grb",
            ChannelOrder::Gbr => "gbr",
            ChannelOrder::Brg => "brg",
            ChannelOrder::Bgr => "bgr",
        }
    }
}

impl fmt::Display for ChannelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
