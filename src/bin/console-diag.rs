use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use edgesight_console::logging::{init_logging, Verbosity};
use edgesight_console::overlay::{ManualTimeSource, OverlayAnimator};
use edgesight_console::{ConsoleConfig, ConsoleHandle, SyntheticEventGenerator};

#[path = "console_diag/report.rs"]
mod report;
use report::ConsoleReport;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(Verbosity::from_flags(cli.verbose, cli.quiet));
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("console-diag error: {err:?}");
            ExitCode::from(1)
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "console-diag", about = "Operator console diagnostics CLI")]
struct Cli {
    /// Log at debug level.
    #[arg(long, short, global = true)]
    verbose: bool,
    /// Log errors only.
    #[arg(long, short, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn execute(self) -> Result<()> {
        match self.command {
            Command::Watch(args) => watch_command(args),
            Command::Synth(args) => synth_command(args),
            Command::Overlay(args) => overlay_command(args),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the console against the configured services and print a report.
    Watch(WatchArgs),
    /// Print synthetic events as JSON lines.
    Synth(SynthArgs),
    /// Sample the overlay timeline and print one frame per line.
    Overlay(OverlayArgs),
}

#[derive(Args, Debug, Clone)]
struct WatchArgs {
    /// JSON configuration file (defaults to assets/console_config.json).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the results adapter base URL.
    #[arg(long)]
    api_base: Option<String>,
    /// Start in forced offline mode.
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// How long to run before reporting (milliseconds).
    #[arg(long, default_value_t = 3_000)]
    watch_ms: u64,
    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Table)]
    format: ReportFormat,
}

#[derive(Args, Debug, Clone)]
struct SynthArgs {
    #[arg(long, default_value_t = 42)]
    seed: u32,
    #[arg(long, default_value_t = 10)]
    count: usize,
}

#[derive(Args, Debug, Clone)]
struct OverlayArgs {
    #[arg(long, default_value_t = 640.0)]
    width: f64,
    #[arg(long, default_value_t = 360.0)]
    height: f64,
    /// Frames per second to sample at.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// Timeline span to sample (seconds).
    #[arg(long, default_value_t = 5.0)]
    seconds: f64,
    #[arg(long, default_value_t = 2024)]
    seed: u64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum ReportFormat {
    Json,
    Table,
    Prometheus,
}

fn watch_command(args: WatchArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ConsoleConfig::load_from_file(path).with_env_overrides(),
        None => ConsoleConfig::load(),
    };
    if let Some(base) = args.api_base {
        config.endpoints.adapter = base;
    }
    if args.offline {
        config.synthetic.force_offline = true;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let view = runtime.block_on(async {
        let mut console = ConsoleHandle::builder(config)
            .spawn()
            .context("starting console")?;
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(args.watch_ms.max(100))) => {}
            _ = tokio::signal::ctrl_c() => {}
        }
        let view = console.view();
        console.dispose();
        anyhow::Ok(view)
    })?;

    let report = ConsoleReport::from_view(&view);
    match args.format {
        ReportFormat::Json => report.print_json()?,
        ReportFormat::Table => report.print_table(),
        ReportFormat::Prometheus => report.print_prometheus(),
    }
    Ok(())
}

fn synth_command(args: SynthArgs) -> Result<()> {
    for event in SyntheticEventGenerator::new(args.seed).take(args.count) {
        let line = serde_json::to_string(&event).context("serializing synthetic event")?;
        println!("{line}");
    }
    Ok(())
}

fn overlay_command(args: OverlayArgs) -> Result<()> {
    if args.fps == 0 {
        bail!("--fps must be at least 1");
    }
    let usable = |side: f64| side.is_finite() && side > 0.0;
    if !(usable(args.width) && usable(args.height)) {
        bail!("canvas dimensions must be positive");
    }
    if !args.seconds.is_finite() {
        bail!("--seconds must be a finite number");
    }

    let clock = std::sync::Arc::new(ManualTimeSource::new());
    let mut animator = OverlayAnimator::new(args.width, args.height, args.seed, clock);
    let frames = (args.seconds.max(0.0) * f64::from(args.fps)).ceil() as u64;
    for n in 0..=frames {
        let elapsed = Duration::from_secs_f64(n as f64 / f64::from(args.fps));
        let frame = animator.frame_at(elapsed);
        let line = serde_json::to_string(&frame).context("serializing overlay frame")?;
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay_args(seconds: f64) -> OverlayArgs {
        OverlayArgs {
            width: 640.0,
            height: 360.0,
            fps: 10,
            seconds,
            seed: 1,
        }
    }

    #[test]
    fn test_overlay_rejects_non_finite_seconds() {
        for seconds in [f64::INFINITY, f64::NAN] {
            let err = overlay_command(overlay_args(seconds)).unwrap_err();
            assert!(err.to_string().contains("--seconds"), "{err}");
        }
    }

    #[test]
    fn test_overlay_rejects_bad_canvas() {
        let mut args = overlay_args(1.0);
        args.width = f64::INFINITY;
        assert!(overlay_command(args).is_err());
    }

    #[test]
    fn test_overlay_accepts_short_span() {
        assert!(overlay_command(overlay_args(0.2)).is_ok());
    }
}
