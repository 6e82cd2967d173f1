/// Classification workloads loaded from JSON
use crate::error::{Result, SimError};
use crate::host::Mlp;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A quantized two-layer classifier plus the labelled images to run through
/// it. Model fields sit at the top level of the JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Workload {
  pub name: String,
  #[serde(flatten)]
  pub model: Mlp,
  pub images: Vec<Vec<u8>>,
  pub labels: Vec<usize>,
}

impl Workload {
  pub fn load(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path).map_err(|e| SimError::file(path, e))?;
    Self::parse(&content)
  }

  pub fn parse(content: &str) -> Result<Self> {
    let workload: Workload = serde_json::from_str(content)?;
    workload.validate()?;
    Ok(workload)
  }

  pub fn validate(&self) -> Result<()> {
    let m = &self.model;
    let fail = |reason: String| Err(SimError::workload(format!("{}: {}", self.name, reason)));

    if m.input_size == 0 || m.hidden_size == 0 || m.output_size == 0 {
      return fail(format!(
        "empty layer in {}-{}-{} network",
        m.input_size, m.hidden_size, m.output_size
      ));
    }
    for (what, got, want) in [
      ("w1", m.w1.len(), m.hidden_size * m.input_size),
      ("b1", m.b1.len(), m.hidden_size),
      ("w2", m.w2.len(), m.output_size * m.hidden_size),
      ("b2", m.b2.len(), m.output_size),
    ] {
      if got != want {
        return fail(format!("{} has {} entries, expected {}", what, got, want));
      }
    }
    if m.h_div <= 0 {
      return fail(format!("h_div must be positive, got {}", m.h_div));
    }
    if self.images.len() != self.labels.len() {
      return fail(format!("{} images but {} labels", self.images.len(), self.labels.len()));
    }
    if let Some(i) = self.images.iter().position(|img| img.len() != m.input_size) {
      return fail(format!(
        "image {} has {} pixels, expected {}",
        i,
        self.images[i].len(),
        m.input_size
      ));
    }
    if let Some(i) = self.labels.iter().position(|l| *l >= m.output_size) {
      return fail(format!("label {} of image {} is not a class", self.labels[i], i));
    }
    Ok(())
  }

  /// Fixed 20-12-5 network with four images. No layer is a multiple of the
  /// tile size. Labels are the reference predictions except for the last
  /// image, which is deliberately mislabelled.
  pub fn demo() -> Self {
    let (input_size, hidden_size, output_size) = (20, 12, 5);
    let model = Mlp {
      input_size,
      hidden_size,
      output_size,
      w1: (0..hidden_size * input_size).map(|i| ((i * 29 + 7) % 256) as u8 as i8).collect(),
      b1: (0..hidden_size).map(|i| (i as i32 * 997) % 4001 - 2000).collect(),
      w2: (0..output_size * hidden_size).map(|i| ((i * 53 + 11) % 256) as u8 as i8).collect(),
      b2: (0..output_size).map(|i| i as i32 * 50 - 100).collect(),
      h_div: 64,
    };
    let images: Vec<Vec<u8>> = (0..4)
      .map(|n| (0..input_size).map(|c| ((c * 53 + n * 71 + 3) % 256) as u8).collect())
      .collect();
    let mut labels: Vec<usize> = images.iter().map(|img| model.infer(img).class).collect();
    if let Some(last) = labels.last_mut() {
      *last = (*last + 1) % output_size;
    }
    Self {
      name: "demo".to_string(),
      model,
      images,
      labels,
    }
  }
}
