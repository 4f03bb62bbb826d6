use rstest::rstest;
use servoscale_core::{BrakeLight, ControllerState, DrivingState, PulseWidth, Tick};

use DrivingState::*;

fn feed(st: &mut ControllerState, widths: &[u16]) -> Vec<Tick> {
    widths
        .iter()
        .map(|&w| st.advance(PulseWidth::from_us(w)))
        .collect()
}

/// Controller that finished a centered calibration (offset 0) and sits in Idle.
fn calibrated() -> ControllerState {
    let mut st = ControllerState::default();
    feed(&mut st, &[1_500; 20]);
    assert_eq!(st.state(), Idle);
    assert_eq!(st.offset(), 0);
    st
}

fn states(ticks: &[Tick]) -> Vec<DrivingState> {
    ticks.iter().map(|t| t.state).collect()
}

#[rstest]
#[case(1_461)]
#[case(1_500)]
#[case(1_539)]
fn idle_holds_inside_margin(#[case] width: u16) {
    let mut st = calibrated();
    let ticks = feed(&mut st, &[width; 50]);
    assert!(ticks.iter().all(|t| t.state == Idle && t.transition.is_none()));
    assert!(ticks.iter().all(|t| t.output.as_us() == width));
}

#[rstest]
#[case(1_540, Forward)]
#[case(1_460, Reverse)]
fn idle_leaves_at_margin(#[case] width: u16, #[case] to: DrivingState) {
    let mut st = calibrated();
    let t = st.advance(PulseWidth::from_us(width));
    assert_eq!(t.state, to);
    assert_eq!(t.transition.map(|t| t.from), Some(Idle));
}

#[test]
fn forward_brakes_on_first_reverse_sample() {
    let mut st = calibrated();
    let ticks = feed(&mut st, &[1_600, 1_460]);
    assert_eq!(states(&ticks), vec![Forward, Braking]);
    // Braking is not attenuated
    assert_eq!(ticks[1].output.as_us(), 1_460);
    assert_eq!(ticks[1].indicators.brake, BrakeLight::High);
}

#[test]
fn forward_needs_four_centered_samples_to_stop() {
    let mut st = calibrated();
    let ticks = feed(&mut st, &[1_600, 1_500, 1_500, 1_500, 1_500]);
    assert_eq!(states(&ticks), vec![Forward, Forward, Forward, Forward, Stopped]);
}

#[test]
fn three_centered_then_off_center_keeps_forward() {
    let mut st = calibrated();
    let ticks = feed(&mut st, &[1_600, 1_500, 1_500, 1_500, 1_600]);
    assert!(states(&ticks).iter().all(|s| *s == Forward));
}

#[test]
fn stopped_cannot_reverse_without_braking() {
    let mut st = calibrated();
    feed(&mut st, &[1_600, 1_500, 1_500, 1_500, 1_500]);
    assert_eq!(st.state(), Stopped);
    let ticks = feed(&mut st, &[1_200, 1_500, 1_500, 1_500, 1_500, 1_200]);
    assert_eq!(
        states(&ticks),
        vec![Braking, Braking, Braking, Braking, Idle, Reverse]
    );
}

#[test]
fn stopped_resumes_forward() {
    let mut st = calibrated();
    feed(&mut st, &[1_600, 1_500, 1_500, 1_500, 1_500]);
    let t = st.advance(PulseWidth::from_us(1_700));
    assert_eq!(t.state, Forward);
}

#[rstest]
#[case(1_200, 1_300)]
#[case(1_350, 1_400)]
#[case(1_100, 1_234)]
fn reverse_output_is_two_thirds(#[case] width: u16, #[case] out: u16) {
    let mut st = calibrated();
    let ticks = feed(&mut st, &[width; 10]);
    assert!(ticks.iter().all(|t| t.state == Reverse));
    assert!(ticks.iter().all(|t| t.output.as_us() == out));
    assert!(ticks.iter().all(|t| t.indicators.limited));
    assert!(ticks.iter().all(|t| t.indicators.brake == BrakeLight::Low));
}

#[test]
fn reverse_returns_to_idle_after_debounce_or_forward_at_once() {
    let mut st = calibrated();
    let ticks = feed(&mut st, &[1_300, 1_500, 1_500, 1_500, 1_500]);
    assert_eq!(states(&ticks), vec![Reverse, Reverse, Reverse, Reverse, Idle]);
    assert_eq!(ticks[4].indicators.brake, BrakeLight::Released);

    let ticks = feed(&mut st, &[1_300, 1_800]);
    assert_eq!(states(&ticks), vec![Reverse, Forward]);
}

#[test]
fn forward_burst_then_limit() {
    let mut st = calibrated();
    let ticks = feed(&mut st, &[1_900; 16]);
    let out: Vec<u16> = ticks.iter().map(|t| t.output.as_us()).collect();
    assert!(out[..14].iter().all(|&w| w == 1_900), "{out:?}");
    assert_eq!(&out[14..], &[1_660, 1_660]);
    assert!(!ticks[13].indicators.limited);
    assert!(ticks[14].indicators.limited);
}

#[test]
fn part_throttle_is_always_limited() {
    let mut st = calibrated();
    let ticks = feed(&mut st, &[1_899; 5]);
    // 399 * 2 / 5 = 159
    assert!(ticks.iter().all(|t| t.output.as_us() == 1_659));
}

#[test]
fn no_burst_until_counter_drains() {
    let mut st = calibrated();
    feed(&mut st, &[1_900; 15]);
    // Brake then release: the counter decays by one per non-forward iteration
    feed(&mut st, &[1_200, 1_500, 1_500, 1_500, 1_500]);
    assert_eq!(st.state(), Idle);
    assert_eq!(st.burst(), 25);
    let t = st.advance(PulseWidth::from_us(1_900));
    assert_eq!(t.output.as_us(), 1_660);
}
