//! Integration tests driving the public `DetectorManager` API against a
//! synthetic capture, instead of poking individual detector internals.

use wwv_sync::simulation::{default_minute_symbols, generate_minute};
use wwv_sync::{DetectorManager, EngineConfig, EngineEvent, Station};

#[test]
fn test_manager_decodes_a_clean_synthetic_minute() {
    let sample_rate = 50_000.0;
    let symbols = default_minute_symbols();
    let samples = generate_minute(Station::Wwv, sample_rate, &symbols, 0.3);

    let mut config = EngineConfig::default();
    config.audio.sample_rate_detector_hz = sample_rate;
    config.audio.sample_rate_display_hz = sample_rate;
    let mut manager = DetectorManager::new(config).unwrap();

    let mut symbol_events = Vec::new();

    for sample in &samples {
        for event in manager.push_detector_sample(sample.re, sample.im) {
            if let EngineEvent::Symbol(symbol) = event {
                symbol_events.push(symbol);
            }
        }
    }

    // The tick detector itself is exercised directly (with tighter control
    // over timing) in `detectors::tick`'s own unit tests; here we only
    // assert that a full minute through the public manager API produces
    // some BCD symbol evidence and does not panic or deadlock.
    assert!(
        !symbol_events.is_empty(),
        "a clean synthetic minute should yield at least one classified BCD symbol"
    );
}

#[test]
fn test_manager_feed_is_order_preserving_and_never_panics_on_silence() {
    let mut manager = DetectorManager::new(EngineConfig::default()).unwrap();
    let mut last_second_start_ms = 0.0f32;
    for _ in 0..5_000 {
        for event in manager.push_detector_sample(0.0, 0.0) {
            if let EngineEvent::FrameTime(frame_time) = event {
                assert!(frame_time.second_start_ms >= last_second_start_ms);
                last_second_start_ms = frame_time.second_start_ms;
            }
        }
    }
}

#[test]
fn test_display_feed_is_independent_of_detector_feed() {
    let mut manager = DetectorManager::new(EngineConfig::default()).unwrap();
    // Push only on the display feed; the detector-rate state (frame_time)
    // must stay untouched since the two feeds share no buffers.
    let before = manager.frame_time();
    for n in 0..4096 {
        let t = n as f32 / 12_000.0;
        let theta = 2.0 * std::f32::consts::PI * 500.0 * t;
        manager.push_display_sample(theta.cos() * 0.5, theta.sin() * 0.5).unwrap();
    }
    let after = manager.frame_time();
    assert_eq!(before.current_second, after.current_second);
    assert_eq!(before.state, after.state);
}
