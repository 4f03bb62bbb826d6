#![no_main]
use libfuzzer_sys::{arbitrary, fuzz_target};
use servoscale_core::{CalibrationCfg, ControlCfg, ControllerState, PulseWidth, Ratio};

#[derive(Debug, arbitrary::Arbitrary)]
struct Input {
    margin_us: u16,
    max_burst: u8,
    exit_debounce: u8,
    forward: (i32, i32),
    reverse: (i32, i32),
    widths: Vec<u16>,
}

fuzz_target!(|input: Input| {
    // The builder rejects these; the raw state machine has no business seeing them.
    if input.margin_us == 0 || input.max_burst == 0 || input.forward.1 == 0 || input.reverse.1 == 0 {
        return;
    }
    let control = ControlCfg {
        margin_us: input.margin_us,
        max_burst: input.max_burst,
        exit_debounce: input.exit_debounce,
        forward_scale: Ratio::new(input.forward.0, input.forward.1),
        reverse_scale: Ratio::new(input.reverse.0, input.reverse.1),
        ..ControlCfg::default()
    };
    let mut state = ControllerState::new(control, CalibrationCfg::default());
    for w in input.widths {
        let tick = state.advance(PulseWidth::from_us(w));
        assert!(tick.burst.abs() <= 2 * i16::from(input.max_burst));
    }
});
