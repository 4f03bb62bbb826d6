mod board;
mod cli;
mod error_fmt;
mod rt;
mod run;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use servoscale_config::{Config, Logging};
use servoscale_core::ServoError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: could not install error hooks: {e}");
    }

    let code = match real_main(cli) {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            exit_code_for_error(&err)
        }
    };
    std::process::exit(code);
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    // Dropped on return so buffered file logs are flushed before exit.
    let _guard = init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    let result = dispatch(cli.cmd, cli.json, &cfg);
    if let Err(err) = &result {
        tracing::error!(error = %err, "servoscale failed");
    }
    result
}

fn dispatch(cmd: Commands, json: bool, cfg: &Config) -> eyre::Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler; stop with SIGKILL");
    }

    match cmd {
        Commands::Run {
            max_iterations,
            signal_timeout_ms,
            rt,
            stats,
        } => {
            let opts = run::RunOpts {
                max_iterations,
                signal_timeout_ms,
                rt,
                stats,
                json,
            };
            run::run_controller(cfg, &opts, &shutdown).map(|_| ())
        }
        Commands::Passthrough {
            mode,
            max_iterations,
            rt,
        } => run::run_passthrough(cfg, mode.into(), max_iterations, &rt, json, &shutdown).map(|_| ()),
        Commands::SelfCheck { timeout_ms } => run::self_check(cfg, timeout_ms, json),
        Commands::Health => run::health(cfg, json),
    }
}

/// Read, parse and validate the config file. Every failure here maps to the config exit code.
fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = fs::read_to_string(path)
        .map_err(|e| ServoError::Config(format!("cannot read {}: {e}", path.display())))?;
    let cfg = servoscale_config::load_toml(&text).wrap_err_with(|| format!("parse {}", path.display()))?;
    cfg.validate().map_err(|e| ServoError::Config(e.to_string()))?;
    Ok(cfg)
}

/// Console logs go to stderr (pretty or JSON); `[logging].file` adds a JSON-lines file sink.
fn init_tracing(json: bool, cli_level: Option<&str>, logging: &Logging) -> eyre::Result<Option<WorkerGuard>> {
    let level = cli_level.or(logging.level.as_deref()).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let (file_layer, guard) = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| ServoError::Config(format!("logging.file {file:?} has no file name")))?;
            let rotation = logging.rotation.as_deref().unwrap_or("never").to_ascii_lowercase();
            let appender = match rotation.as_str() {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().json().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let pretty = (!json).then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));
    let json_console = json.then(|| fmt::layer().json().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json_console)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(guard)
}

fn report_error(err: &eyre::Report) {
    if JSON_MODE.get().copied().unwrap_or(false) {
        println!("{}", format_error_json(err));
    } else {
        eprintln!("Error: {err}\n\n{}", humanize(err));
    }
}
