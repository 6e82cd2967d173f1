/// Crossbar contract and the exact-integer model

/// Rows and columns of the physical crossbar
pub const DIM: usize = 8;
pub const CELLS: usize = DIM * DIM;

/// An 8x8 analog multiply-accumulate substrate.
///
/// `compute` takes `&mut self` because a physical model may drift with every
/// applied voltage. Implementations must be deterministic: the same sequence
/// of calls from the same initial state yields the same outputs.
pub trait Crossbar {
  /// Set the state of one cell, `cell = row * DIM + col`.
  fn program(&mut self, cell: usize, value: u8);

  /// Apply one column voltage vector for one tick and return the row currents.
  fn compute(&mut self, voltages: &[u8; DIM]) -> [u32; DIM];

  /// Programmed value of one cell as the model currently sees it
  fn conductance(&self, cell: usize) -> u8;

  fn reset(&mut self);

  fn name(&self) -> &'static str;
}

/// Exact-integer model: cell current is `v * g`, row current the exact sum.
/// 8 terms of 255 * 255 stay well inside 32 bits.
#[derive(Clone, Debug)]
pub struct ExactCrossbar {
  conductance: [u8; CELLS],
}

impl ExactCrossbar {
  pub fn new() -> Self {
    Self { conductance: [0; CELLS] }
  }
}

impl Default for ExactCrossbar {
  fn default() -> Self {
    Self::new()
  }
}

impl Crossbar for ExactCrossbar {
  fn program(&mut self, cell: usize, value: u8) {
    debug_assert!(cell < CELLS, "crossbar cell {} out of range", cell);
    self.conductance[cell % CELLS] = value;
  }

  fn compute(&mut self, voltages: &[u8; DIM]) -> [u32; DIM] {
    std::array::from_fn(|row| {
      self.conductance[row * DIM..(row + 1) * DIM]
        .iter()
        .zip(voltages)
        .map(|(g, v)| (*v as u16 * *g as u16) as u32)
        .sum()
    })
  }

  fn conductance(&self, cell: usize) -> u8 {
    self.conductance[cell % CELLS]
  }

  fn reset(&mut self) {
    self.conductance = [0; CELLS];
  }

  fn name(&self) -> &'static str {
    "exact"
  }
}
