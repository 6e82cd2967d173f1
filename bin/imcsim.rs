use clap::Parser;
use imcsim::config::{apply_cli_overrides, load_config_file, validate_config, AppConfig, Overrides};
use imcsim::simulator::log::init_log;
use imcsim::simulator::{run_app, Workload};
use std::path::PathBuf;

/// imcsim - memory-mapped NPU simulator with a ReRAM in-memory-compute engine
#[derive(Parser, Debug)]
#[command(name = "imcsim")]
#[command(version = "0.1.0")]
#[command(about = "Cycle-level simulator of an INT8 MAC array and a ReRAM crossbar behind one bus", long_about = None)]
struct Args {
  /// TOML config file (defaults are used when omitted)
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// JSON classification workload (built-in demo when omitted)
  #[arg(short, long, value_name = "FILE")]
  workload: Option<PathBuf>,

  /// Crossbar model: exact or nonlinear
  #[arg(short, long, value_name = "MODEL")]
  model: Option<String>,

  /// Enable step mode (interactive stepping)
  #[arg(short, long)]
  step: bool,

  /// Quiet mode (warnings only)
  #[arg(short, long)]
  quiet: bool,

  /// JSON-lines bus trace output
  #[arg(long, value_name = "FILE")]
  trace_file: Option<String>,

  /// JSON run report output
  #[arg(long, value_name = "FILE")]
  report: Option<String>,

  /// Stop a continuous run after this many ticks
  #[arg(long, value_name = "N")]
  max_ticks: Option<u64>,
}

fn main() -> imcsim::Result<()> {
  let args = Args::parse();

  let mut config = match &args.config {
    Some(path) => load_config_file(path)?,
    None => AppConfig::default(),
  };
  apply_cli_overrides(
    &mut config,
    &Overrides {
      quiet: args.quiet,
      step: args.step,
      trace_file: args.trace_file.as_deref(),
      report_file: args.report.as_deref(),
      model: args.model.as_deref(),
      max_ticks: args.max_ticks,
    },
  )?;
  init_log(config.simulation.quiet);
  validate_config(&config)?;

  let workload = match &args.workload {
    Some(path) => Workload::load(path)?,
    None => Workload::demo(),
  };

  let report = run_app(&config, workload)?;
  if report.completed && !report.accelerators_match_cpu() {
    log::warn!("accelerator logits differ from the cpu reference");
  }
  Ok(())
}
