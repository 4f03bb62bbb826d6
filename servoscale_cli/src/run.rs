//! Command bodies: config mapping, board assembly, loop execution and result printing.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use servoscale_config::Config;
use servoscale_core::runner::{self, RunParams, RunSummary};
use servoscale_core::{PassthroughMode, RunnerCfg, Timeouts};

use crate::board::Board;
use crate::cli::RtArgs;
use crate::rt::setup_rt_once;

/// Options for `servoscale run`.
#[derive(Debug, Clone, Copy)]
pub struct RunOpts {
    pub max_iterations: Option<u64>,
    pub signal_timeout_ms: Option<u64>,
    pub rt: RtArgs,
    pub stats: bool,
    pub json: bool,
}

/// Effective signal timeout: the CLI flag overrides the config; 0 waits forever.
pub fn effective_timeouts(cfg: &Config, override_ms: Option<u64>) -> Timeouts {
    match override_ms {
        Some(0) => Timeouts { signal_lost_ms: None },
        Some(ms) => Timeouts { signal_lost_ms: Some(ms) },
        None => Timeouts::from(&cfg.timeouts),
    }
}

pub fn run_controller(cfg: &Config, opts: &RunOpts, shutdown: &Arc<AtomicBool>) -> eyre::Result<RunSummary> {
    let board = Board::open(cfg)?;
    let timeouts = effective_timeouts(cfg, opts.signal_timeout_ms);
    // A simulated receiver goes quiet after its script; without a timeout that would stall.
    let max_iterations = opts.max_iterations.or_else(|| {
        timeouts
            .signal_lost_ms
            .is_none()
            .then(|| board.default_iterations(None))
            .flatten()
    });
    let mut core = board.into_core(cfg, timeouts)?;

    setup_rt_once(&opts.rt);

    let params = RunParams {
        max_iterations,
        frame_hz: RunnerCfg::from(&cfg.runner).frame_hz,
    };
    let summary = runner::run(&mut core, &params, Some(shutdown.as_ref()))?;

    if opts.stats {
        print_stats(&summary, params.frame_hz);
    }
    if opts.json {
        println!("{}", summary_json(&summary));
    } else {
        println!(
            "servoscale stopped ({:?}) after {} frames: state {}, offset {}us",
            summary.stopped_by, summary.stats.iterations, summary.final_state, summary.offset
        );
    }
    Ok(summary)
}

pub fn run_passthrough(
    cfg: &Config,
    mode: PassthroughMode,
    max_iterations: Option<u64>,
    rt: &RtArgs,
    json: bool,
    shutdown: &Arc<AtomicBool>,
) -> eyre::Result<u64> {
    let board = Board::open(cfg)?;
    let timeouts = Timeouts::from(&cfg.timeouts);
    let max_iterations = match (max_iterations, mode, timeouts.signal_lost_ms) {
        (Some(n), _, _) => Some(n),
        // Level mirroring never blocks on the signal, so the timeout does not bound it.
        (None, PassthroughMode::Level, _) | (None, PassthroughMode::Pulse, None) => {
            board.default_iterations(Some(mode))
        }
        (None, PassthroughMode::Pulse, Some(_)) => None,
    };
    let mut core = board.into_core(cfg, timeouts)?;

    setup_rt_once(rt);

    let n = runner::run_passthrough(&mut core, mode, max_iterations, Some(shutdown.as_ref()))?;
    if json {
        println!("{}", serde_json::json!({ "mode": format!("{mode:?}"), "iterations": n }));
    } else {
        println!("passthrough ({mode:?}) stopped after {n} iterations");
    }
    Ok(n)
}

/// Open the pins and wait for one pulse on the receiver line.
pub fn self_check(cfg: &Config, timeout_ms: u64, json: bool) -> eyre::Result<()> {
    let mut board = Board::open(cfg)?;
    board.probe(Duration::from_millis(timeout_ms))?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "status": "ok", "pulse_in": cfg.pins.pulse_in, "backend": format!("{:?}", board.kind) })
        );
    } else {
        println!("self-check ok: pulse detected on pin {}", cfg.pins.pulse_in);
    }
    Ok(())
}

/// Validate config and open the pins; no signal required.
pub fn health(cfg: &Config, json: bool) -> eyre::Result<()> {
    let board = Board::open(cfg)?;
    let kind = board.kind;
    // Building the core runs the same validation as a real run.
    let _core = board.into_core(cfg, Timeouts::from(&cfg.timeouts))?;
    if json {
        println!("{}", serde_json::json!({ "status": "ok", "backend": format!("{kind:?}") }));
    } else {
        println!("ok");
    }
    Ok(())
}

/// One JSON line describing a finished run.
pub fn summary_json(s: &RunSummary) -> serde_json::Value {
    serde_json::json!({
        "stopped_by": format!("{:?}", s.stopped_by),
        "final_state": s.final_state.as_str(),
        "offset_us": s.offset,
        "iterations": s.stats.iterations,
        "transitions": s.stats.transitions,
        "missed_frames": s.stats.missed_frames,
        "min_period_us": s.stats.min_period_us,
        "mean_period_us": s.stats.mean_period_us(),
        "max_period_us": s.stats.max_period_us,
    })
}

/// Print loop timing stats to stderr.
fn print_stats(s: &RunSummary, frame_hz: u32) {
    let st = &s.stats;
    eprintln!("\n--- Servoscale Stats ---");
    eprintln!("Frames: {}", st.iterations);
    eprintln!("Frame period (us): {}", servoscale_core::util::period_us(frame_hz));
    eprintln!(
        "Iteration min/avg/max (us): {} / {} / {}",
        st.min_period_us,
        st.mean_period_us(),
        st.max_period_us
    );
    eprintln!("Missed frames (> 1.5 periods): {}", st.missed_frames);
    eprintln!("State transitions: {}", st.transitions);
    eprintln!("------------------------\n");
}
