//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "servoscale", version, about = "RC servo pulse rescaler")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/servoscale.toml")]
    pub config: PathBuf,

    /// Log as JSON lines and print machine-readable results
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

impl RtLock {
    #[inline]
    pub fn os_default() -> Self {
        if cfg!(target_os = "linux") {
            Self::Current
        } else {
            Self::None
        }
    }
}

/// Real-time knobs shared by the pulse-driving commands.
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct RtArgs {
    /// Enable real-time mode (SCHED_FIFO, affinity, mlockall)
    #[arg(
        long,
        action = ArgAction::SetTrue,
        long_help = "Enable real-time mode on supported OSes.\n\nPulse widths are timed by busy-waiting, so any preemption shows up as jitter on the regenerated pulse.\n\nLinux: Attempts SCHED_FIFO priority, pins to one CPU, and calls mlockall to keep the process resident. Requires CAP_SYS_NICE / CAP_IPC_LOCK or root.\n\nmacOS: Only mlockall is applied; SCHED_FIFO/affinity are unavailable."
    )]
    pub rt: bool,
    /// Real-time priority for SCHED_FIFO on Linux (1..=max); ignored elsewhere
    #[arg(long, value_name = "PRIO")]
    pub rt_prio: Option<i32>,
    /// Memory locking mode for --rt: none, current, or all
    #[arg(
        long,
        value_enum,
        value_name = "MODE",
        long_help = "Select memory locking mode when --rt is enabled.\n- none: do not lock memory.\n- current: mlockall(MCL_CURRENT).\n- all: mlockall(MCL_CURRENT|MCL_FUTURE).\nDefault: current on Linux, none on macOS."
    )]
    pub rt_lock: Option<RtLock>,
    /// CPU index to pin the process to when --rt is enabled (Linux only, default 0)
    #[arg(long, value_name = "CPU")]
    pub rt_cpu: Option<usize>,
}

/// Passthrough flavour.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum PassMode {
    /// Measure each pulse and re-emit it unchanged
    Pulse,
    /// Mirror the raw input level onto the output
    Level,
}

impl From<PassMode> for servoscale_core::PassthroughMode {
    fn from(m: PassMode) -> Self {
        match m {
            PassMode::Pulse => Self::Pulse,
            PassMode::Level => Self::Level,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Calibrate, then rescale pulses until stopped
    Run {
        /// Stop after this many frames (default: until Ctrl-C or signal loss)
        #[arg(long, value_name = "N")]
        max_iterations: Option<u64>,
        /// Override timeouts.signal_lost_ms (0 waits forever)
        #[arg(long, value_name = "MS")]
        signal_timeout_ms: Option<u64>,
        #[command(flatten)]
        rt: RtArgs,
        /// Print loop timing stats on exit
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
    },
    /// Copy the input to the output without rescaling
    Passthrough {
        #[arg(long, value_enum, default_value = "pulse")]
        mode: PassMode,
        /// Stop after this many pulses (pulse mode) or polls (level mode)
        #[arg(long, value_name = "N")]
        max_iterations: Option<u64>,
        #[command(flatten)]
        rt: RtArgs,
    },
    /// Open the pins and wait for one pulse on the input
    SelfCheck {
        /// How long to wait for a pulse
        #[arg(long, value_name = "MS", default_value_t = 1000)]
        timeout_ms: u64,
    },
    /// Validate config and open the pins without waiting for a signal
    Health,
}
