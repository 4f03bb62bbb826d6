#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = servoscale_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // Anything that validates must convert cleanly.
            let _ = servoscale_core::ControlCfg::from(&cfg);
            let _ = servoscale_core::CalibrationCfg::from(&cfg.calibration);
            let _ = servoscale_core::Timeouts::from(&cfg.timeouts);
        }
    }
});
