//! Driver core for WS2812-family addressable LED strips on a pulse-train
//! peripheral.
//!
//! Hardware access goes through [`hal::ChannelProvider`]; everything else
//! (timing, pixel storage, symbol encoding, priority arbitration and the
//! strip lifecycle) is plain Rust and runs on the host.

pub mod color;
pub mod config;
pub mod encoder;
pub mod error;
pub mod hal;
pub mod pixels;
pub mod priority;
pub mod registry;
pub mod strip;
pub mod timing;

pub use color::{ChannelOrder, Color};
pub use config::{Config, StripConfig};
pub use error::{Error, Result};
pub use priority::Priority;
pub use strip::{InstallOptions, LedStrip, StripContext, StripState};
pub use timing::Chipset;
