use servoscale_core::error::ServoError;
use servoscale_core::{DrivingState, Servoscale, Timeouts};
use servoscale_hardware::SimBoard;
use servoscale_hardware::error::HwError;
use servoscale_traits::{HalError, InputLine};

/// Input that reports low once, then fails with the given error.
struct FlakyInput {
    reads: u32,
    fail: fn() -> HalError,
}

impl InputLine for FlakyInput {
    fn read_input_line(&mut self) -> Result<bool, HalError> {
        self.reads += 1;
        if self.reads > 1 {
            Err((self.fail)())
        } else {
            Ok(false)
        }
    }
}

fn servo_with(fail: fn() -> HalError) -> Servoscale {
    let board = SimBoard::new([1_500u16]);
    Servoscale::builder()
        .with_input(FlakyInput { reads: 0, fail })
        .with_output(board.pulse_out)
        .with_clock(Box::new(board.clock))
        .build()
        .unwrap()
}

#[test]
fn untyped_hardware_errors_map_to_hardware() {
    let mut servo = servo_with(|| "line read failed".into());
    let err = servo.step().expect_err("expected hardware error");
    match err.downcast_ref::<ServoError>() {
        Some(ServoError::Hardware(msg)) => assert!(msg.contains("line read failed")),
        other => panic!("unexpected error variant: {other:?}"),
    }
    assert!(format!("{err:#}").contains("reading pulse input"));
}

#[test]
fn typed_gpio_errors_map_to_hardware_fault() {
    let mut servo = servo_with(|| Box::new(HwError::Gpio("pin 4: busy".into())));
    let err = servo.step().expect_err("expected hardware fault");
    assert!(matches!(
        err.downcast_ref::<ServoError>(),
        Some(ServoError::HardwareFault(m)) if m.contains("busy")
    ));
}

#[test]
fn silence_after_last_pulse_is_signal_lost() {
    let board = SimBoard::new([1_500u16; 3]);
    let mut servo = Servoscale::builder()
        .with_input(board.pulse_in)
        .with_output(board.pulse_out)
        .with_clock(Box::new(board.clock))
        .with_timeouts(Timeouts {
            signal_lost_ms: Some(100),
        })
        .build()
        .unwrap();

    for _ in 0..3 {
        servo.step().expect("scripted pulse");
    }
    let err = servo.step().expect_err("script exhausted");
    assert_eq!(
        err.downcast_ref::<ServoError>(),
        Some(&ServoError::SignalLost { waited_ms: 100 })
    );
    // State survives the error
    assert_eq!(servo.state(), DrivingState::Calibrating);
}
