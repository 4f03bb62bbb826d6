use servoscale_core::{CalibrationCfg, ControlCfg, ControllerState, DrivingState, PulseWidth, Tick};

fn feed(st: &mut ControllerState, widths: impl IntoIterator<Item = u16>) -> Vec<Tick> {
    widths
        .into_iter()
        .map(|w| st.advance(PulseWidth::from_us(w)))
        .collect()
}

#[test]
fn positive_bias_yields_negative_offset_at_sample_twenty() {
    let mut st = ControllerState::default();
    let ticks = feed(&mut st, [1_530; 20]);
    assert!(ticks[..19].iter().all(|t| t.state == DrivingState::Calibrating));
    assert_eq!(ticks[19].state, DrivingState::Idle);
    assert_eq!(ticks[19].calibrated, Some(-30));
    assert_eq!(st.offset(), -30);
    assert!(ticks[..19].iter().all(|t| t.calibrated.is_none()));
}

#[test]
fn negative_bias_yields_positive_offset() {
    let mut st = ControllerState::default();
    feed(&mut st, [1_488; 20]);
    assert_eq!(st.offset(), 12);
    // Biased stick now reads centered
    let t = st.advance(PulseWidth::from_us(1_488));
    assert_eq!(t.deviation, 0);
}

#[test]
fn offset_shifts_thresholds() {
    let mut st = ControllerState::default();
    feed(&mut st, [1_530; 20]);
    // Raw 1569 is only +39 after correction
    let t = st.advance(PulseWidth::from_us(1_569));
    assert_eq!(t.state, DrivingState::Idle);
    let t = st.advance(PulseWidth::from_us(1_570));
    assert_eq!(t.state, DrivingState::Forward);
    // Output is regenerated from the corrected deviation: 40 * 2 / 5
    assert_eq!(t.output.as_us(), 1_516);
}

#[test]
fn syncing_indicator_is_lit_until_done() {
    let mut st = ControllerState::default();
    let ticks = feed(&mut st, [1_500; 20]);
    assert!(ticks[..19].iter().all(|t| t.indicators.limited));
    assert!(!ticks[19].indicators.limited);
}

#[test]
fn out_of_window_signal_never_calibrates() {
    let mut st = ControllerState::default();
    let ticks = feed(&mut st, [2_100; 300]);
    assert!(ticks.iter().all(|t| t.state == DrivingState::Calibrating));
    // Raw width passes through while syncing
    assert!(ticks.iter().all(|t| t.output.as_us() == 2_100));
    assert_eq!(st.debounce(), 255);
}

#[test]
fn out_of_window_boot_samples_still_count_toward_settling() {
    let mut widths = vec![900u16; 5];
    widths.extend([1_530; 15]);
    let mut st = ControllerState::default();
    let ticks = feed(&mut st, widths);
    assert_eq!(ticks[19].state, DrivingState::Idle);
    assert_eq!(st.offset(), -30);
}

/// Rejected samples still consume calibration iterations while the divisor stays
/// fixed, so interleaved glitches shrink the measured offset. The original firmware
/// instead leaves its counter unchanged on a rejected sample.
#[test]
fn rejected_samples_still_consume_calibration_iterations() {
    let mut widths = vec![1_530u16; 10];
    widths.extend([2_600; 5]);
    widths.extend([1_530; 5]);
    let mut st = ControllerState::default();
    let ticks = feed(&mut st, widths);
    assert_eq!(ticks[19].state, DrivingState::Idle);
    // Only 5 of 10 accumulated samples contributed: -150 / 10
    assert_eq!(st.offset(), -15);
}

#[test]
fn rejected_sample_on_final_iteration_delays_completion() {
    let mut widths = vec![1_500u16; 19];
    widths.push(3_000);
    widths.push(1_500);
    let mut st = ControllerState::default();
    let ticks = feed(&mut st, widths);
    assert_eq!(ticks[19].state, DrivingState::Calibrating);
    assert_eq!(ticks[20].state, DrivingState::Idle);
}

#[test]
fn custom_calibration_lengths() {
    let cal = CalibrationCfg {
        window_us: 100,
        settle_samples: 2,
        samples: 4,
    };
    let mut st = ControllerState::new(ControlCfg::default(), cal);
    let ticks = feed(&mut st, [1_520; 6]);
    assert_eq!(ticks[5].state, DrivingState::Idle);
    assert_eq!(st.offset(), -20);
}

#[test]
fn longest_calibration_completes_on_a_centered_stick() {
    let cal = CalibrationCfg {
        window_us: 500,
        settle_samples: 246,
        samples: 10,
    };
    assert_eq!(cal.iterations(), 256);
    let mut st = ControllerState::new(ControlCfg::default(), cal);
    let ticks = feed(&mut st, [1_510; 256]);
    assert_eq!(ticks[254].state, DrivingState::Calibrating);
    assert_eq!(ticks[255].state, DrivingState::Idle);
    assert_eq!(st.offset(), -10);
}
