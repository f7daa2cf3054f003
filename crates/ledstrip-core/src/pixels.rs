use crate::color::{ChannelOrder, Color};
use crate::error::{Error, Result};

/// Raw transmit bytes for a strip: 3 (RGB) or 4 (RGBW) bytes per pixel, laid
/// out in the channel order passed to each call.
#[derive(Debug)]
pub struct PixelBuffer {
    bytes: Vec<u8>,
    bytes_per_pixel: usize,
    auto_white: bool,
}

impl PixelBuffer {
    /// Allocate a zeroed buffer. Fails with `OutOfMemory` instead of aborting
    /// when the allocator cannot satisfy the request.
    pub fn allocate(pixel_count: usize, rgbw: bool, auto_white: bool) -> Result<Self> {
        if pixel_count == 0 {
            return Err(Error::InvalidArgument("pixel_count must be at least 1"));
        }
        let bytes_per_pixel = if rgbw { 4 } else { 3 };
        let len = pixel_count
            .checked_mul(bytes_per_pixel)
            .ok_or(Error::OutOfMemory("pixel buffer"))?;

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| Error::OutOfMemory("pixel buffer"))?;
        bytes.resize(len, 0);

        Ok(Self {
            bytes,
            bytes_per_pixel,
            auto_white,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.bytes.len() / self.bytes_per_pixel
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_pixel
    }

    pub fn is_rgbw(&self) -> bool {
        self.bytes_per_pixel == 4
    }

    pub fn auto_white(&self) -> bool {
        self.auto_white
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.pixel_count() {
            return Err(Error::OutOfRange {
                index,
                len: self.pixel_count(),
            });
        }
        Ok(())
    }

    fn check_range(&self, start: usize, len: usize) -> Result<()> {
        if len == 0 {
            return Err(Error::InvalidArgument("pixel range is empty"));
        }
        match start.checked_add(len) {
            Some(end) if end <= self.pixel_count() => Ok(()),
            _ => Err(Error::OutOfRange {
                index: start.saturating_add(len - 1),
                len: self.pixel_count(),
            }),
        }
    }

    fn write(&mut self, index: usize, color: Color, white: Option<u8>, order: ChannelOrder) {
        let bpp = self.bytes_per_pixel;
        let auto_white = self.auto_white;
        let pixel = &mut self.bytes[index * bpp..(index + 1) * bpp];
        order.write(color, pixel);
        if bpp == 4 {
            pixel[3] = match white {
                Some(w) => w,
                None if auto_white => color.luma(),
                None => 0,
            };
        }
    }

    /// Set one pixel. On RGBW strips the white byte is the color's luma when
    /// auto-white is on, otherwise 0.
    pub fn set(&mut self, index: usize, color: Color, order: ChannelOrder) -> Result<()> {
        self.check_index(index)?;
        self.write(index, color, None, order);
        Ok(())
    }

    /// Set one pixel with an explicit white level. Ignored on RGB strips.
    pub fn set_rgbw(
        &mut self,
        index: usize,
        color: Color,
        white: u8,
        order: ChannelOrder,
    ) -> Result<()> {
        self.check_index(index)?;
        self.write(index, color, Some(white), order);
        Ok(())
    }

    /// Read one pixel back, or `None` when out of range.
    pub fn get(&self, index: usize, order: ChannelOrder) -> Option<Color> {
        self.check_index(index).ok()?;
        let bpp = self.bytes_per_pixel;
        Some(order.read(&self.bytes[index * bpp..(index + 1) * bpp]))
    }

    /// White byte of an RGBW pixel.
    pub fn white(&self, index: usize) -> Option<u8> {
        if !self.is_rgbw() || index >= self.pixel_count() {
            return None;
        }
        Some(self.bytes[index * 4 + 3])
    }

    /// Write `colors` starting at `start`. The whole range is bounds-checked
    /// first, so a failing call leaves the buffer untouched.
    pub fn set_range(&mut self, start: usize, colors: &[Color], order: ChannelOrder) -> Result<()> {
        self.check_range(start, colors.len())?;
        for (offset, &color) in colors.iter().enumerate() {
            self.write(start + offset, color, None, order);
        }
        Ok(())
    }

    pub fn fill_range(
        &mut self,
        start: usize,
        len: usize,
        color: Color,
        order: ChannelOrder,
    ) -> Result<()> {
        self.check_range(start, len)?;
        for index in start..start + len {
            self.write(index, color, None, order);
        }
        Ok(())
    }

    pub fn fill(&mut self, color: Color, order: ChannelOrder) {
        for index in 0..self.pixel_count() {
            self.write(index, color, None, order);
        }
    }

    pub fn fill_with<F>(&mut self, mut f: F, order: ChannelOrder)
    where
        F: FnMut(usize) -> Color,
    {
        for index in 0..self.pixel_count() {
            self.write(index, f(index), None, order);
        }
    }

    /// Zero every byte, white channel included.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }
}
