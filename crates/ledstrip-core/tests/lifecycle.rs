use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use ledstrip_core::encoder::FrameEncoder;
use ledstrip_core::hal::{
    ChannelConfig, ChannelError, ChannelId, ChannelProvider, TransmitConfig, TxChannel,
    MEM_BLOCK_SYMBOLS_DMA,
};
use ledstrip_core::registry::{Validity, MAX_INSTANCES};
use ledstrip_core::timing::Symbol;
use ledstrip_core::{
    ChannelOrder, Chipset, Color, Error, InstallOptions, LedStrip, Priority, StripConfig,
    StripContext, StripState,
};
use smart_leds::{SmartLedsWrite, RGB8};

#[derive(Debug, Default)]
struct MockState {
    next_id: ChannelId,
    created: Vec<ChannelConfig>,
    deleted: Vec<ChannelId>,
    dropped: usize,
    enabled: usize,
    disabled: usize,
    create_errors: VecDeque<ChannelError>,
    fail_enable: bool,
    wait_error: Option<ChannelError>,
    waits: Vec<Duration>,
    frames: Vec<Vec<Symbol>>,
}

#[derive(Clone, Default)]
struct MockProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

struct MockChannel {
    id: ChannelId,
    state: Arc<Mutex<MockState>>,
}

impl TxChannel for MockChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn enable(&mut self) -> Result<(), ChannelError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_enable {
            return Err(ChannelError::Hardware("enable failed".into()));
        }
        state.enabled += 1;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), ChannelError> {
        self.state.lock().unwrap().disabled += 1;
        Ok(())
    }

    fn transmit(
        &mut self,
        frame: &mut FrameEncoder<'_>,
        _config: &TransmitConfig,
    ) -> Result<(), ChannelError> {
        // Pull in uneven chunks, the way a peripheral drains its memory block.
        let mut symbols = Vec::new();
        let mut out = [Symbol::default(); 20];
        for size in [7, 20, 8, 13].into_iter().cycle() {
            let n = frame.fill(&mut out[..size]);
            symbols.extend_from_slice(&out[..n]);
            if frame.is_done() {
                break;
            }
        }
        self.state.lock().unwrap().frames.push(symbols);
        Ok(())
    }

    fn wait_done(&mut self, timeout: Duration) -> Result<(), ChannelError> {
        let mut state = self.state.lock().unwrap();
        state.waits.push(timeout);
        match state.wait_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.dropped += 1;
        }
    }
}

impl ChannelProvider for MockProvider {
    type Channel = MockChannel;

    fn create_channel(&mut self, config: &ChannelConfig) -> Result<MockChannel, ChannelError> {
        let mut state = self.state();
        state.created.push(config.clone());
        if let Some(e) = state.create_errors.pop_front() {
            return Err(e);
        }
        state.next_id += 1;
        Ok(MockChannel {
            id: state.next_id,
            state: Arc::clone(&self.state),
        })
    }

    fn delete_channel(&mut self, channel: MockChannel) -> Result<(), ChannelError> {
        self.state().deleted.push(channel.id);
        Ok(())
    }
}

fn setup(chipset: Chipset, rgbw: bool) -> (LedStrip<MockProvider>, MockProvider, Arc<StripContext>) {
    let provider = MockProvider::default();
    let context = Arc::new(StripContext::new());
    let strip = LedStrip::with_context(provider.clone(), chipset, rgbw, Arc::clone(&context));
    (strip, provider, context)
}

fn decode(symbols: &[Symbol], chipset: Chipset) -> Vec<u8> {
    let timing = chipset.timing();
    symbols
        .chunks(8)
        .map(|bits| {
            bits.iter()
                .fold(0u8, |acc, s| (acc << 1) | u8::from(*s == timing.bit1))
        })
        .collect()
}

#[test]
fn half_brightness_red_frame() {
    let (mut strip, provider, _) = setup(Chipset::Ws2812Rgb, false);
    strip.begin(5, 3, false).unwrap();
    assert_eq!(strip.state(), StripState::Installed);

    strip.set_brightness(128, false).unwrap();
    assert_eq!(strip.brightness(), 255);
    assert_eq!(strip.target_brightness(), 128);

    strip.fill(Color::RED, true).unwrap();
    assert_eq!(strip.state(), StripState::Idle);
    assert_eq!(strip.brightness(), 128);
    assert_eq!(strip.encode_position(), 0);

    let state = provider.state();
    assert_eq!(state.enabled, 1);
    let frame = &state.frames[0];
    assert_eq!(frame.len(), 73);
    assert_eq!(frame[72], Chipset::Ws2812Rgb.timing().reset);
    assert_eq!(
        decode(&frame[..72], Chipset::Ws2812Rgb),
        vec![128, 0, 0, 128, 0, 0, 128, 0, 0]
    );
    // The buffer keeps full-scale values.
    drop(state);
    assert_eq!(strip.buffer().unwrap(), &[255, 0, 0, 255, 0, 0, 255, 0, 0]);
}

#[test]
fn repeated_flushes_are_identical() {
    let (mut strip, provider, _) = setup(Chipset::Sm16703, false);
    strip.begin(4, 5, false).unwrap();
    strip.set_pixel_codes(0, &[0x123456, 0xABCDEF], false).unwrap();
    strip.flush().unwrap();
    strip.show().unwrap();
    let state = provider.state();
    assert_eq!(state.frames.len(), 2);
    assert_eq!(state.frames[0], state.frames[1]);
    assert_eq!(state.frames[0].len(), 5 * 3 * 8 + 1);
}

#[test]
fn rgbw_auto_white_is_exact_white() {
    let (mut strip, provider, _) = setup(Chipset::Sk6812, true);
    strip.begin(2, 2, true).unwrap();
    strip.set_pixel(0, Color::WHITE, true).unwrap();
    assert_eq!(&strip.buffer().unwrap()[..4], &[255, 255, 255, 255]);
    assert_eq!(provider.state().frames[0].len(), 2 * 4 * 8 + 1);

    strip.set_pixel_rgbw(1, Color::BLACK, 40, false).unwrap();
    assert_eq!(&strip.buffer().unwrap()[4..], &[0, 0, 0, 40]);
}

#[test]
fn clear_blanks_every_pixel() {
    let (mut strip, _, _) = setup(Chipset::Sk6812, true);
    strip.begin(2, 4, true).unwrap();
    strip.fill(Color::ORANGE, false).unwrap();
    strip.clear(false).unwrap();
    for i in 0..4 {
        assert_eq!(strip.get_pixel(i), Color::BLACK);
    }
    assert!(strip.buffer().unwrap().iter().all(|&b| b == 0));
}

#[test]
fn failed_install_leaks_nothing() {
    let (mut strip, provider, context) = setup(Chipset::Ws2812, false);
    provider
        .state()
        .create_errors
        .extend(std::iter::repeat(ChannelError::NoMemory).take(4));

    let err = strip.begin(5, 10, false).unwrap_err();
    assert!(matches!(err, Error::OutOfMemory(_)));
    assert!(strip.buffer().is_none());
    assert_eq!(strip.state(), StripState::Initialized);
    assert_eq!(context.priorities.active_channels(), 0);
    assert_eq!(context.registry.active_count(), 0);
    assert_eq!(provider.state().created.len(), 4);

    strip.install().unwrap();
    assert_eq!(strip.buffer().unwrap().len(), 30);
    assert_eq!(context.priorities.active_channels(), 1);
}

#[test]
fn enable_failure_releases_channel() {
    let (mut strip, provider, context) = setup(Chipset::Ws2812, false);
    provider.state().fail_enable = true;
    let err = strip.begin(5, 10, false).unwrap_err();
    assert!(matches!(err, Error::HardwareTransmitFailure(_)));
    assert!(strip.buffer().is_none());
    assert_eq!(provider.state().deleted, vec![1]);
    assert_eq!(context.priorities.active_channels(), 0);
}

#[test]
fn channel_failure_falls_back_to_other_priority() {
    let (mut strip, provider, context) = setup(Chipset::Ws2812, false);
    provider
        .state()
        .create_errors
        .push_back(ChannelError::PriorityConflict);

    let options = InstallOptions {
        priority: Priority::High,
        ..InstallOptions::default()
    };
    strip.begin_with(5, 1, false, options).unwrap();
    assert_eq!(strip.priority(), Some(Priority::Default));
    let tried: Vec<Priority> = provider.state().created.iter().map(|c| c.priority).collect();
    assert_eq!(tried, vec![Priority::High, Priority::Default]);
    assert!(context.priorities.is_available(Priority::High));
    assert_eq!(context.priorities.active_channels(), 1);
}

#[test]
fn priority_exhaustion_and_recovery() {
    let provider = MockProvider::default();
    let context = Arc::new(StripContext::new());
    let mut strips: Vec<_> = (0..4)
        .map(|pin| {
            let mut s = LedStrip::with_context(
                provider.clone(),
                Chipset::Ws2812,
                false,
                Arc::clone(&context),
            );
            s.begin(pin, 1, false).unwrap();
            s
        })
        .collect();
    let mut got: Vec<Priority> = strips.iter().filter_map(LedStrip::priority).collect();
    got.sort_by_key(|p| p.level());
    assert_eq!(
        got,
        vec![Priority::Default, Priority::High, Priority::Medium, Priority::Low]
    );

    let mut extra =
        LedStrip::with_context(provider.clone(), Chipset::Ws2812, false, Arc::clone(&context));
    assert!(matches!(
        extra.begin(9, 1, false),
        Err(Error::ResourceExhausted)
    ));
    assert!(extra.buffer().is_none());

    let freed = strips[2].priority().unwrap();
    strips[2].free().unwrap();
    extra.install().unwrap();
    assert_eq!(extra.priority(), Some(freed));
    assert_eq!(context.priorities.active_channels(), 4);
}

#[test]
fn dma_selects_large_memory_block() {
    let (mut strip, provider, _) = setup(Chipset::Apa106, false);
    let options = InstallOptions {
        use_dma: true,
        ..InstallOptions::default()
    };
    strip.begin_with(13, 8, false, options).unwrap();
    let state = provider.state();
    assert_eq!(state.created[0].mem_block_symbols, MEM_BLOCK_SYMBOLS_DMA);
    assert_eq!(state.created[0].pin, 13);
    assert!(state.created[0].with_dma);
}

#[test]
fn operations_before_install_fail() {
    let (mut strip, _, _) = setup(Chipset::Ws2812, false);
    assert!(matches!(
        strip.set_pixel(0, Color::RED, false),
        Err(Error::InvalidState(StripState::Uninstalled))
    ));
    assert!(matches!(strip.flush(), Err(Error::InvalidState(_))));
    assert!(matches!(strip.free(), Err(Error::InvalidState(_))));
    assert!(matches!(strip.install(), Err(Error::InvalidState(_))));
    assert!(matches!(
        strip.begin(5, 0, false),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(strip.get_pixel(0), Color::BLACK);
}

#[test]
fn out_of_range_write_leaves_buffer_alone() {
    let (mut strip, provider, _) = setup(Chipset::Ws2812, false);
    strip.begin(5, 3, false).unwrap();
    strip.fill(Color::BLUE, false).unwrap();
    let before = strip.buffer().unwrap().to_vec();

    assert!(matches!(
        strip.set_pixel(3, Color::RED, true),
        Err(Error::OutOfRange { index: 3, len: 3 })
    ));
    assert!(matches!(
        strip.set_pixels(2, &[Color::RED, Color::RED], true),
        Err(Error::OutOfRange { .. })
    ));
    assert!(matches!(
        strip.fill_range(1, 3, Color::RED, true),
        Err(Error::OutOfRange { .. })
    ));
    assert_eq!(strip.buffer().unwrap(), before.as_slice());
    assert!(provider.state().frames.is_empty());
    assert_eq!(strip.get_pixel(99), Color::BLACK);
}

#[test]
fn channel_order_is_per_strip() {
    let provider = MockProvider::default();
    let context = Arc::new(StripContext::new());
    let mut a = LedStrip::with_context(provider.clone(), Chipset::Ws2812, false, Arc::clone(&context));
    let mut b = LedStrip::with_context(provider.clone(), Chipset::Ws2812, false, Arc::clone(&context));
    a.begin(1, 1, false).unwrap();
    b.begin(2, 1, false).unwrap();

    b.set_channel_order(ChannelOrder::Bgr);
    a.set_pixel(0, Color::RED, false).unwrap();
    b.set_pixel(0, Color::RED, false).unwrap();
    assert_eq!(a.buffer().unwrap(), &[0, 255, 0]);
    assert_eq!(b.buffer().unwrap(), &[0, 0, 255]);
    assert_eq!(a.get_pixel(0), Color::RED);
    assert_eq!(b.get_pixel(0), Color::RED);

    b.reset_channel_order();
    assert_eq!(b.channel_order(), ChannelOrder::Grb);

    assert!(b.set_channel_order_index(9).is_err());
    assert_eq!(b.channel_order(), ChannelOrder::Rgb);
    b.set_channel_order_index(3).unwrap();
    assert_eq!(b.channel_order(), ChannelOrder::Gbr);
}

#[test]
fn forced_reclaim_leaves_hardware_alone() {
    let (mut strip, provider, context) = setup(Chipset::Ws2812, false);
    strip.begin(5, 4, false).unwrap();
    let id = strip.channel().unwrap().id;

    assert!(context.registry.on_channel_reclaimed(id));
    assert!(!strip.is_valid());
    assert!(matches!(
        strip.set_pixel(0, Color::RED, false),
        Err(Error::InvalidState(StripState::Invalidated))
    ));
    assert!(matches!(strip.flush(), Err(Error::InvalidState(_))));
    assert_eq!(strip.get_pixel(0), Color::BLACK);

    let state = provider.state();
    assert!(state.deleted.is_empty());
    assert_eq!(state.disabled, 0);
    assert_eq!(state.dropped, 1);
    assert!(state.frames.is_empty());
    drop(state);

    assert_eq!(context.priorities.active_channels(), 0);
    assert!(matches!(strip.free(), Err(Error::InvalidState(_))));
}

#[test]
fn invalidate_then_free_skips_hardware() {
    let (mut strip, provider, context) = setup(Chipset::Ws2812, false);
    strip.begin(5, 4, false).unwrap();
    assert!(strip.invalidate());
    assert!(!strip.invalidate());
    assert!(matches!(
        strip.free(),
        Err(Error::InvalidState(StripState::Invalidated))
    ));
    assert!(provider.state().deleted.is_empty());
    assert_eq!(strip.state(), StripState::Invalidated);
    assert_eq!(context.priorities.active_channels(), 0);
    assert_eq!(context.registry.active_count(), 0);

    // Same answer when another operation noticed the reclamation first.
    let (mut other, provider, context) = setup(Chipset::Ws2812, false);
    other.begin(6, 4, false).unwrap();
    assert!(other.invalidate());
    assert!(other.clear(false).is_err());
    assert!(matches!(
        other.free(),
        Err(Error::InvalidState(StripState::Invalidated))
    ));
    assert!(provider.state().deleted.is_empty());
    assert_eq!(context.priorities.active_channels(), 0);
}

#[test]
fn reinitialize_after_reclaim() {
    let (mut strip, provider, context) = setup(Chipset::Ws2812, false);
    strip.begin(5, 4, false).unwrap();
    let id = strip.channel().unwrap().id;
    assert!(context.registry.on_channel_reclaimed(id));

    strip.begin(7, 2, false).unwrap();
    assert_eq!(strip.state(), StripState::Installed);
    assert!(strip.is_valid());
    assert_eq!(strip.buffer().unwrap().len(), 6);
    assert_eq!(context.priorities.active_channels(), 1);
    assert_eq!(context.registry.active_count(), 1);
    let state = provider.state();
    assert!(state.deleted.is_empty());
    assert_eq!(state.created.len(), 2);
}

#[test]
fn drop_after_reclaim_releases_bookkeeping_only() {
    let (mut strip, provider, context) = setup(Chipset::Ws2812, false);
    strip.begin(5, 4, false).unwrap();
    assert!(strip.invalidate());
    drop(strip);
    let state = provider.state();
    assert!(state.deleted.is_empty());
    assert_eq!(state.disabled, 0);
    assert_eq!(state.dropped, 1);
    assert_eq!(context.priorities.active_channels(), 0);
    assert_eq!(context.registry.active_count(), 0);
}

#[test]
fn full_registry_rolls_back_install() {
    let (mut strip, provider, context) = setup(Chipset::Ws2812, false);
    for ch in 0..MAX_INSTANCES as ChannelId {
        context
            .registry
            .register(1000 + ch, Arc::new(Validity::new(0)))
            .unwrap();
    }

    assert!(matches!(
        strip.begin(5, 4, false),
        Err(Error::ResourceExhausted)
    ));
    assert!(strip.buffer().is_none());
    assert_eq!(strip.state(), StripState::Initialized);
    assert_eq!(context.priorities.active_channels(), 0);
    assert_eq!(context.registry.active_count(), MAX_INSTANCES);
    {
        let state = provider.state();
        assert_eq!(state.enabled, 1);
        assert_eq!(state.disabled, 1);
        assert_eq!(state.deleted, vec![1]);
    }

    context.registry.unregister(1000);
    strip.install().unwrap();
    assert_eq!(context.registry.active_count(), MAX_INSTANCES);
}

#[test]
fn huge_strip_reports_without_overflow() {
    let (mut strip, _, _) = setup(Chipset::Ws2812, false);
    assert!(matches!(
        strip.begin(5, 10_000_000_000_000_000, false),
        Err(Error::OutOfMemory(_))
    ));
    assert!(strip.flush_timeout() > Duration::from_secs(3600));
    let report = strip.report();
    assert_eq!(report.buffer_bytes, None);
    assert!(report.flush_timeout_ms > 3_600_000);
    assert!(strip.report_json().is_ok());
}

#[test]
fn free_then_reclaim_is_a_no_op() {
    let (mut strip, provider, context) = setup(Chipset::Ws2812, false);
    strip.begin(5, 4, false).unwrap();
    let id = strip.channel().unwrap().id;
    strip.free().unwrap();
    assert!(!context.registry.on_channel_reclaimed(id));
    let state = provider.state();
    assert_eq!(state.deleted, vec![id]);
    assert_eq!(state.disabled, 1);
}

#[test]
fn free_racing_reclaim_settles_once() {
    for _ in 0..50 {
        let (mut strip, provider, context) = setup(Chipset::Ws2812, false);
        strip.begin(5, 4, false).unwrap();
        let id = strip.channel().unwrap().id;

        let reclaimer = {
            let context = Arc::clone(&context);
            thread::spawn(move || context.registry.on_channel_reclaimed(id))
        };
        let freed = strip.free();
        reclaimer.join().unwrap();

        let deleted = provider.state().deleted.len();
        match strip.state() {
            StripState::Freed => {
                assert!(freed.is_ok());
                assert_eq!(deleted, 1);
            }
            StripState::Invalidated => {
                assert!(matches!(
                    freed,
                    Err(Error::InvalidState(StripState::Invalidated))
                ));
                assert_eq!(deleted, 0);
            }
            other => panic!("unexpected state {other}"),
        }
        assert_eq!(context.priorities.active_channels(), 0);
        assert_eq!(context.registry.active_count(), 0);
        assert!(strip.buffer().is_none());
    }
}

#[test]
fn double_free_is_an_error() {
    let (mut strip, provider, context) = setup(Chipset::Ws2812, false);
    strip.begin(5, 4, false).unwrap();
    strip.free().unwrap();
    assert_eq!(strip.state(), StripState::Freed);
    assert!(matches!(
        strip.free(),
        Err(Error::InvalidState(StripState::Freed))
    ));
    assert_eq!(provider.state().deleted.len(), 1);
    assert_eq!(context.priorities.active_channels(), 0);

    strip.begin(5, 2, false).unwrap();
    assert_eq!(strip.buffer().unwrap().len(), 6);
}

#[test]
fn drop_frees_installed_strip() {
    let (mut strip, provider, context) = setup(Chipset::Ws2812, false);
    strip.begin(5, 4, false).unwrap();
    drop(strip);
    assert_eq!(provider.state().deleted.len(), 1);
    assert_eq!(context.priorities.active_channels(), 0);
    assert_eq!(context.registry.active_count(), 0);
}

#[test]
fn flush_waits_are_bounded() {
    let (mut strip, provider, _) = setup(Chipset::Ws2812, false);
    strip.begin(5, 3, false).unwrap();
    strip.flush().unwrap();
    assert_eq!(provider.state().waits, vec![Duration::from_millis(300)]);

    // 10k pixels take ~300 ms on the wire, so the wait grows with length.
    let (mut long, provider, _) = setup(Chipset::Ws2812, false);
    long.begin(5, 10_000, false).unwrap();
    long.flush().unwrap();
    assert!(provider.state().waits[0] > Duration::from_secs(1));

    let (mut custom, provider, _) = setup(Chipset::Ws2812, false);
    let options = InstallOptions {
        flush_timeout: Some(Duration::from_millis(50)),
        ..InstallOptions::default()
    };
    custom.begin_with(5, 3, false, options).unwrap();
    custom.flush().unwrap();
    assert_eq!(provider.state().waits, vec![Duration::from_millis(50)]);
}

#[test]
fn flush_timeout_keeps_old_brightness() {
    let (mut strip, provider, _) = setup(Chipset::Ws2812, false);
    strip.begin(5, 3, false).unwrap();
    provider.state().wait_error = Some(ChannelError::Timeout(Duration::from_millis(300)));

    strip.set_brightness(10, false).unwrap();
    assert!(matches!(
        strip.flush(),
        Err(Error::Timeout { waited_ms: 300 })
    ));
    assert_eq!(strip.brightness(), 255);
    assert_eq!(strip.encode_position(), 0);

    provider.state().wait_error = Some(ChannelError::Hardware("bus fault".into()));
    assert!(matches!(
        strip.flush(),
        Err(Error::HardwareTransmitFailure(_))
    ));

    provider.state().wait_error = None;
    strip.flush().unwrap();
    assert_eq!(strip.brightness(), 10);
}

#[test]
fn smart_leds_write_flushes() {
    let (mut strip, provider, _) = setup(Chipset::Ws2812Rgb, false);
    strip.begin(5, 2, false).unwrap();
    strip
        .write([RGB8::new(1, 2, 3), RGB8::new(4, 5, 6)])
        .unwrap();
    assert_eq!(strip.buffer().unwrap(), &[1, 2, 3, 4, 5, 6]);
    assert_eq!(provider.state().frames.len(), 1);
}

#[test]
fn fill_with_generator() {
    let (mut strip, _, _) = setup(Chipset::Ws2812Rgb, false);
    strip.begin(5, 3, false).unwrap();
    strip
        .fill_with(|i| Color::new(i as u8, 0, 0), false)
        .unwrap();
    assert_eq!(strip.buffer().unwrap(), &[0, 0, 0, 1, 0, 0, 2, 0, 0]);
}

#[test]
fn from_config_installs_strip() {
    let mut config = StripConfig::new(6);
    config.chipset = Chipset::Sk6812;
    config.rgbw = true;
    config.brightness = 64;
    config.color_order = Some(ChannelOrder::Rgb);
    config.priority = Priority::Low;

    let provider = MockProvider::default();
    let context = Arc::new(StripContext::new());
    let strip = LedStrip::from_config_in(provider.clone(), &config, Arc::clone(&context)).unwrap();
    assert_eq!(strip.pixel_count(), 6);
    assert_eq!(strip.buffer().unwrap().len(), 24);
    assert_eq!(strip.target_brightness(), 64);
    assert_eq!(strip.channel_order(), ChannelOrder::Rgb);
    assert_eq!(strip.priority(), Some(Priority::Low));
    assert_eq!(provider.state().created[0].pin, 2);
}

#[test]
fn report_describes_strip() {
    let (mut strip, _, _) = setup(Chipset::Apa106, false);
    strip.begin(7, 10, false).unwrap();
    let report = strip.report();
    assert_eq!(report.state, StripState::Installed);
    assert_eq!(report.buffer_bytes, Some(30));
    assert_eq!(report.active_channels, 1);
    assert!(report.priorities[0].used);

    let json: serde_json::Value = serde_json::from_str(&strip.report_json().unwrap()).unwrap();
    assert_eq!(json["chipset"], "apa106");
    assert_eq!(json["channel_order"], "rgb");
    assert_eq!(json["channel"]["resolution_hz"], 10_000_000);
}

#[test]
fn chipset_from_index() {
    assert!(LedStrip::from_index(MockProvider::default(), 4, false).is_ok());
    assert!(matches!(
        LedStrip::from_index(MockProvider::default(), 5, false),
        Err(Error::InvalidArgument(_))
    ));
}
