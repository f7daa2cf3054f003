//! Pull-based conversion of pixel bytes into pulse symbols.
//!
//! The transmission peripheral asks for more symbols whenever its queue has
//! room. Each request is answered by [`encode_step`], a pure function of the
//! buffer, the cursor and the brightness, so it can run in an interrupt
//! context: no allocation, no locks, no shared state beyond the cursor.

use crate::color::scale8_video;
use crate::timing::{ChipsetTiming, Symbol};

/// Symbols produced per data byte, one per bit.
pub const SYMBOLS_PER_BYTE: usize = 8;

/// Outcome of one encoder invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Symbols written to the output slice.
    pub written: usize,
    /// Cursor to pass to the next invocation.
    pub position: usize,
    /// Set on the invocation that emitted the reset symbol.
    pub done: bool,
}

/// Encode at most one unit of work into `out`.
///
/// - fewer than 8 free slots: nothing is written, the caller retries later
/// - `position < buffer.len()`: the byte at `position` is brightness-scaled
///   and written as 8 symbols, most significant bit first
/// - otherwise: the reset symbol is written, the cursor returns to 0 and
///   `done` is set
pub fn encode_step(
    buffer: &[u8],
    position: usize,
    brightness: u8,
    timing: &ChipsetTiming,
    out: &mut [Symbol],
) -> Step {
    if out.len() < SYMBOLS_PER_BYTE {
        return Step {
            written: 0,
            position,
            done: false,
        };
    }

    match buffer.get(position) {
        Some(&byte) => {
            let value = scale8_video(byte, brightness);
            for (bit, slot) in out[..SYMBOLS_PER_BYTE].iter_mut().enumerate() {
                *slot = timing.bit(value & (0x80 >> bit) != 0);
            }
            Step {
                written: SYMBOLS_PER_BYTE,
                position: position + 1,
                done: false,
            }
        }
        None => {
            out[0] = timing.reset;
            Step {
                written: 1,
                position: 0,
                done: true,
            }
        }
    }
}

/// Total symbols in a frame of `bytes` data bytes.
pub const fn frame_symbols(bytes: usize) -> usize {
    bytes * SYMBOLS_PER_BYTE + 1
}

/// One in-flight transmission of a pixel buffer.
///
/// Brightness is captured when the frame is created, so a concurrent
/// brightness change cannot tear a frame.
#[derive(Debug)]
pub struct FrameEncoder<'a> {
    buffer: &'a [u8],
    position: &'a mut usize,
    brightness: u8,
    timing: &'static ChipsetTiming,
    emitted: usize,
    done: bool,
}

impl<'a> FrameEncoder<'a> {
    pub fn new(
        buffer: &'a [u8],
        position: &'a mut usize,
        brightness: u8,
        timing: &'static ChipsetTiming,
    ) -> Self {
        Self {
            buffer,
            position,
            brightness,
            timing,
            emitted: 0,
            done: false,
        }
    }

    /// Encoder callback: fill `out` with as many symbols as the next step
    /// produces. Returns 0 when `out` is too small or the frame is finished.
    pub fn fill(&mut self, out: &mut [Symbol]) -> usize {
        if self.done {
            return 0;
        }
        let step = encode_step(self.buffer, *self.position, self.brightness, self.timing, out);
        *self.position = step.position;
        self.done = step.done;
        self.emitted += step.written;
        step.written
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn position(&self) -> usize {
        *self.position
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn timing(&self) -> &'static ChipsetTiming {
        self.timing
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn total_symbols(&self) -> usize {
        frame_symbols(self.buffer.len())
    }

    /// Symbol-at-a-time view for drivers that consume an iterator.
    pub fn symbols(&mut self) -> Symbols<'_, 'a> {
        Symbols {
            frame: self,
            pending: [Symbol::default(); SYMBOLS_PER_BYTE],
            len: 0,
            next: 0,
        }
    }
}

/// Iterator over the remaining symbols of a frame, ending after the reset.
pub struct Symbols<'f, 'a> {
    frame: &'f mut FrameEncoder<'a>,
    pending: [Symbol; SYMBOLS_PER_BYTE],
    len: usize,
    next: usize,
}

impl Iterator for Symbols<'_, '_> {
    type Item = Symbol;

    fn next(&mut self) -> Option<Symbol> {
        if self.next == self.len {
            self.len = self.frame.fill(&mut self.pending);
            self.next = 0;
            if self.len == 0 {
                return None;
            }
        }
        let symbol = self.pending[self.next];
        self.next += 1;
        Some(symbol)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let buffered = self.len - self.next;
        let rest = if self.frame.is_done() {
            0
        } else {
            frame_symbols(self.frame.buffer.len() - self.frame.position())
        };
        (buffered + rest, Some(buffered + rest))
    }
}

impl std::iter::FusedIterator for Symbols<'_, '_> {}
