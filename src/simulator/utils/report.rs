/// End-of-run report
use crate::error::{Result, SimError};
use crate::host::{Engine, EngineSummary, ImageResult};
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseTicks {
  pub name: String,
  pub ticks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
  pub workload: String,
  pub model: String,
  /// Every image went through every engine
  pub completed: bool,
  pub ticks: u64,
  pub transactions: u64,
  pub images: Vec<ImageResult>,
  pub engines: Vec<EngineSummary>,
  /// Console phases, last occurrence of each marker
  pub phases: Vec<PhaseTicks>,
  pub console: Vec<String>,
}

impl RunReport {
  pub fn engine(&self, engine: Engine) -> Option<&EngineSummary> {
    self.engines.iter().find(|s| s.engine == engine)
  }

  /// Both accelerators reproduced the CPU logits on every image
  pub fn accelerators_match_cpu(&self) -> bool {
    self.engines.iter().all(|s| s.matches_cpu)
  }

  pub fn log_summary(&self) {
    info!(
      "workload {} on {} crossbar: {} ticks, {} bus transactions",
      self.workload, self.model, self.ticks, self.transactions
    );
    if !self.completed {
      warn!("run stopped early, results are incomplete");
    }
    for phase in &self.phases {
      info!("{:<20} {:>12} ticks", phase.name, phase.ticks);
    }
    for s in &self.engines {
      info!(
        "{} accuracy {}/{}, avg {} ticks per image, logits match cpu: {}",
        s.engine.tag(),
        s.correct,
        s.total,
        s.avg_ticks,
        s.matches_cpu
      );
    }
  }

  pub fn write_json(&self, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(self)?;
    fs::write(path, text).map_err(|e| SimError::file(path, e))
  }
}
