//! Human-readable error descriptions, exit codes and structured JSON errors.

use servoscale_core::{BuildError, ServoError};

/// Exit code for a lost receiver signal.
pub const EXIT_SIGNAL_LOST: i32 = 3;
/// Exit code for unreadable or invalid configuration.
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for everything else.
pub const EXIT_OTHER: i32 = 1;

/// First error of type `T` anywhere in the report's chain.
fn find<T: std::error::Error + 'static>(err: &eyre::Report) -> Option<&T> {
    err.chain().find_map(|e| e.downcast_ref::<T>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = find::<BuildError>(err) {
        return match be {
            BuildError::MissingInput => {
                "What happened: No pulse input line was provided to the controller.\nLikely causes: The receiver pin failed to open or was not wired into the builder.\nHow to fix: Check [pins].pulse_in and that the GPIO opened successfully.".to_string()
            }
            BuildError::MissingOutput => {
                "What happened: No pulse output line was provided to the controller.\nLikely causes: The servo/ESC pin failed to open or was not wired into the builder.\nHow to fix: Check [pins].pulse_out and that the GPIO opened successfully.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(se) = find::<ServoError>(err) {
        return match se {
            ServoError::SignalLost { waited_ms } => format!(
                "What happened: No servo pulse arrived for {waited_ms} ms.\nLikely causes: Receiver unpowered or not bound to the transmitter, pulse_in on the wrong pin, or timeouts.signal_lost_ms set too low.\nHow to fix: Check the receiver and [pins].pulse_in; raise timeouts.signal_lost_ms or set it to 0 to wait forever."
            ),
            ServoError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: A missing [pins] section or an out-of-range value.\nHow to fix: Edit the config file, then rerun."
            ),
            ServoError::Hardware(msg) | ServoError::HardwareFault(msg) => format!(
                "What happened: GPIO access failed ({msg}).\nLikely causes: Wrong pin numbers, a pin already in use, or no permission to access GPIO.\nHow to fix: Check [pins] in the config and run as a user in the gpio group."
            ),
            ServoError::State(msg) => format!(
                "What happened: The controller reached an unexpected state ({msg}).\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug and report the log."
            ),
        };
    }

    if let Some(te) = find::<toml::de::Error>(err) {
        return format!(
            "What happened: The config file is not valid TOML for servoscale.\nLikely causes: A typo, a wrong value type, or a missing [pins] section.\nHow to fix: Fix the config file. Parser said: {}",
            te.message()
        );
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();
    if lower.contains("open gpio") {
        return "What happened: Failed to initialize GPIO pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process may access /dev/gpiomem.".to_string();
    }

    let cause = err
        .chain()
        .nth(1)
        .map(|src| format!(" Cause: {src}"))
        .unwrap_or_default();
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: signal lost 3, config 2, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(se) = find::<ServoError>(err) {
        return match se {
            ServoError::SignalLost { .. } => EXIT_SIGNAL_LOST,
            ServoError::Config(_) => EXIT_CONFIG,
            _ => EXIT_OTHER,
        };
    }
    if matches!(find::<BuildError>(err), Some(BuildError::InvalidConfig(_))) {
        return EXIT_CONFIG;
    }
    if find::<toml::de::Error>(err).is_some() {
        return EXIT_CONFIG;
    }
    EXIT_OTHER
}

/// Stable reason name used in JSON errors.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(se) = find::<ServoError>(err) {
        return match se {
            ServoError::SignalLost { .. } => "SignalLost",
            ServoError::Config(_) => "Config",
            ServoError::Hardware(_) => "Hardware",
            ServoError::HardwareFault(_) => "HardwareFault",
            ServoError::State(_) => "State",
        };
    }
    if find::<BuildError>(err).is_some() {
        return "Build";
    }
    if find::<toml::de::Error>(err).is_some() {
        return "Config";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    });
    if let Some(ServoError::SignalLost { waited_ms }) = find::<ServoError>(err) {
        obj["details"] = json!({ "waited_ms": waited_ms });
    }
    obj.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    fn signal_lost() -> eyre::Report {
        Err::<(), _>(eyre::Report::new(ServoError::SignalLost { waited_ms: 250 }))
            .wrap_err("reading pulse input")
            .unwrap_err()
    }

    #[test]
    fn signal_lost_survives_context() {
        let err = signal_lost();
        assert_eq!(exit_code_for_error(&err), EXIT_SIGNAL_LOST);
        assert!(humanize(&err).contains("No servo pulse arrived for 250 ms"));
    }

    #[test]
    fn config_errors_exit_with_two() {
        let err = eyre::Report::new(ServoError::Config("control.margin_us must be > 0".into()));
        assert_eq!(exit_code_for_error(&err), EXIT_CONFIG);
        let err = eyre::Report::new(BuildError::InvalidConfig("max_burst must be > 0"));
        assert_eq!(exit_code_for_error(&err), EXIT_CONFIG);
        let toml_err = servoscale_config::load_toml("[pins]\npulse_in = \"x\"\n").unwrap_err();
        assert_eq!(exit_code_for_error(&eyre::Report::new(toml_err)), EXIT_CONFIG);
    }

    #[test]
    fn other_errors_exit_with_one() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), EXIT_OTHER);
        assert!(humanize(&err).starts_with("Something went wrong."));
        let err = eyre::Report::new(ServoError::HardwareFault("pin 4 busy".into()));
        assert_eq!(exit_code_for_error(&err), EXIT_OTHER);
        assert!(humanize(&err).contains("GPIO access failed (pin 4 busy)"));
    }

    #[test]
    fn json_error_carries_reason_and_details() {
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&signal_lost())).unwrap();
        assert_eq!(v["reason"], "SignalLost");
        assert_eq!(v["exit_code"], 3);
        assert_eq!(v["details"]["waited_ms"], 250);
        assert!(v["message"].as_str().unwrap().starts_with("What happened"));
    }
}
