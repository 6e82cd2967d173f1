/// Simulator configuration: TOML file, CLI overrides and validation
use crate::bus::MemoryMap;
use crate::error::{Result, SimError};
use crate::host::CpuCost;
use crate::imc::controller::WINDOW as IMC_WINDOW;
use crate::imc::DeviceParams;
use crate::npu::regs::RESULT as NPU_RESULT;
use crate::npu::DIM;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Memory section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MemorySection {
  /// Bytes, must be a power of two
  pub size: usize,
}

impl Default for MemorySection {
  fn default() -> Self {
    Self { size: 64 * 1024 }
  }
}

/// Which crossbar model sits behind the IMC controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossbarModel {
  #[default]
  Exact,
  Nonlinear,
}

impl CrossbarModel {
  pub fn parse(s: &str) -> Result<Self> {
    match s.to_lowercase().as_str() {
      "exact" => Ok(CrossbarModel::Exact),
      "nonlinear" => Ok(CrossbarModel::Nonlinear),
      other => Err(SimError::config(format!("unknown crossbar model: {}", other))),
    }
  }
}

/// Crossbar section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CrossbarSection {
  pub model: CrossbarModel,
  /// Only used by the nonlinear model
  pub device: DeviceParams,
}

/// Simulation section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationSection {
  pub quiet: bool,
  pub step_mode: bool,
  /// JSON-lines bus trace, empty disables tracing
  pub trace_file: String,
  /// JSON run report, empty disables it
  pub report_file: String,
  /// Hard stop for continuous runs
  pub max_ticks: u64,
  /// Idle ticks between applying crossbar inputs and reading results
  pub settle_ticks: u32,
}

impl Default for SimulationSection {
  fn default() -> Self {
    Self {
      quiet: false,
      step_mode: false,
      trace_file: String::new(),
      report_file: String::new(),
      max_ticks: 10_000_000,
      settle_ticks: 2,
    }
  }
}

/// Unified application config
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
  pub memory: MemorySection,
  pub map: MemoryMap,
  pub crossbar: CrossbarSection,
  /// Cost of the work the core does without the bus
  pub cpu: CpuCost,
  pub simulation: SimulationSection,
}

/// CLI values that override the config file when present
#[derive(Debug, Clone, Default)]
pub struct Overrides<'a> {
  pub quiet: bool,
  pub step: bool,
  pub trace_file: Option<&'a str>,
  pub report_file: Option<&'a str>,
  pub model: Option<&'a str>,
  pub max_ticks: Option<u64>,
}

/// Load config from a TOML file
pub fn load_config_file(path: &Path) -> Result<AppConfig> {
  let content = fs::read_to_string(path).map_err(|e| SimError::file(path, e))?;
  parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig> {
  Ok(toml::from_str::<AppConfig>(content)?)
}

/// Apply CLI overrides on top of the file config
pub fn apply_cli_overrides(config: &mut AppConfig, overrides: &Overrides) -> Result<()> {
  if overrides.quiet {
    config.simulation.quiet = true;
  }
  if overrides.step {
    config.simulation.step_mode = true;
  }
  if let Some(file) = overrides.trace_file {
    config.simulation.trace_file = file.to_string();
  }
  if let Some(file) = overrides.report_file {
    config.simulation.report_file = file.to_string();
  }
  if let Some(model) = overrides.model {
    config.crossbar.model = CrossbarModel::parse(model)?;
  }
  if let Some(max_ticks) = overrides.max_ticks {
    config.simulation.max_ticks = max_ticks;
  }
  Ok(())
}

fn overlaps(a_base: u32, a_size: u32, b_base: u32, b_size: u32) -> bool {
  let a_end = a_base as u64 + a_size as u64;
  let b_end = b_base as u64 + b_size as u64;
  (a_base as u64) < b_end && (b_base as u64) < a_end
}

/// Validate config
pub fn validate_config(config: &AppConfig) -> Result<()> {
  let size = config.memory.size;
  if size == 0 || !size.is_power_of_two() {
    return Err(SimError::config(format!("memory size must be a power of two, got {}", size)));
  }

  let map = &config.map;
  let npu_needed = NPU_RESULT + 4 * DIM as u32;
  if map.npu_size < npu_needed {
    return Err(SimError::config(format!(
      "npu window of 0x{:x} bytes is smaller than its register file (0x{:x})",
      map.npu_size, npu_needed
    )));
  }
  if map.imc_size < IMC_WINDOW {
    return Err(SimError::config(format!(
      "imc window of 0x{:x} bytes is smaller than its register file (0x{:x})",
      map.imc_size, IMC_WINDOW
    )));
  }
  if overlaps(map.npu_base, map.npu_size, map.imc_base, map.imc_size) {
    return Err(SimError::config("npu and imc windows overlap"));
  }
  if map.uart == map.cycle_counter {
    return Err(SimError::config("uart and cycle counter share an address"));
  }
  for (name, addr) in [("uart", map.uart), ("cycle_counter", map.cycle_counter)] {
    if overlaps(addr, 4, map.npu_base, map.npu_size) || overlaps(addr, 4, map.imc_base, map.imc_size) {
      return Err(SimError::config(format!("{} at 0x{:x} lies inside a register window", name, addr)));
    }
  }

  let device = &config.crossbar.device;
  if device.drift_shift > 63 {
    return Err(SimError::config("crossbar.device.drift_shift must be at most 63"));
  }

  if config.simulation.max_ticks == 0 {
    return Err(SimError::config("max_ticks must be positive"));
  }

  Ok(())
}
