/// 8x8 MAC array
use crate::builtin::Module;

/// Rows and columns of the physical array
pub const DIM: usize = 8;

/// How the activation byte is widened before the multiply
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActivationMode {
  /// zero-extend (layer-1 pixels)
  #[default]
  Unsigned,
  /// sign-extend
  Signed,
}

impl ActivationMode {
  fn widen(self, a: u8) -> i16 {
    match self {
      ActivationMode::Unsigned => a as i16,
      ActivationMode::Signed => a as i8 as i16,
    }
  }
}

/// One multiply-accumulate unit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MacUnit {
  acc: i32,
}

impl MacUnit {
  /// 16-bit product, then 32-bit accumulate. Both wrap like the hardware.
  #[inline]
  fn step(&mut self, weight: i8, activation: i16) {
    let product = (weight as i16).wrapping_mul(activation);
    self.acc = self.acc.wrapping_add(product as i32);
  }

  pub fn acc(&self) -> i32 {
    self.acc
  }
}

/// Inputs sampled at each clock edge
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MacInputs {
  pub enable: bool,
  pub clear: bool,
  pub mode: ActivationMode,
  /// Row-major, index `row * DIM + col`
  pub weights: [i8; DIM * DIM],
  pub activations: [u8; DIM],
}

impl Default for MacInputs {
  fn default() -> Self {
    Self {
      enable: false,
      clear: false,
      mode: ActivationMode::Unsigned,
      weights: [0; DIM * DIM],
      activations: [0; DIM],
    }
  }
}

/// 64 MAC units in a flat row-major array.
///
/// Row `r` reports the wrapping sum of its 8 unit accumulators, i.e.
/// `Σ_c weight[r][c] * activation[c]` summed over every enabled edge since
/// the last clear.
pub struct MacArray {
  name: String,
  pub input: MacInputs,
  units: [MacUnit; DIM * DIM],
}

impl MacArray {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      input: MacInputs::default(),
      units: [MacUnit::default(); DIM * DIM],
    }
  }

  pub fn unit(&self, row: usize, col: usize) -> &MacUnit {
    &self.units[row * DIM + col]
  }

  pub fn row(&self, row: usize) -> i32 {
    self.units[row * DIM..(row + 1) * DIM]
      .iter()
      .fold(0i32, |sum, u| sum.wrapping_add(u.acc))
  }

  pub fn rows(&self) -> [i32; DIM] {
    std::array::from_fn(|r| self.row(r))
  }
}

impl Module for MacArray {
  fn run(&mut self) {
    let input = &self.input;
    if input.clear {
      self.units = [MacUnit::default(); DIM * DIM];
      return;
    }
    if !input.enable {
      return;
    }
    let acts: [i16; DIM] = std::array::from_fn(|c| input.mode.widen(input.activations[c]));
    for (i, unit) in self.units.iter_mut().enumerate() {
      unit.step(input.weights[i], acts[i % DIM]);
    }
  }

  /// Asynchronous, dominant reset
  fn reset(&mut self) {
    self.units = [MacUnit::default(); DIM * DIM];
    self.input = MacInputs::default();
  }

  fn name(&self) -> &str {
    &self.name
  }
}
