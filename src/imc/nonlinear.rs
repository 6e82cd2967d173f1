/// Nonlinear-conductance crossbar model.
///
/// Each cell carries a 16-bit filament state `w` in `[0, 65535]`, read as the
/// fraction `w / 65536` of the oxide that is conductive. Resistance is the
/// linear blend of the on/off bounds, the cell current is `v * v_scale / R`,
/// and every tick the state drifts by `I * mobility * timestep`, shifted into
/// the same fixed-point domain as `w` and clamped.
use super::crossbar::{Crossbar, CELLS, DIM};
use serde::{Deserialize, Serialize};

/// Midpoint of the state range, the power-on value of every cell
pub const W_MID: u16 = 32768;

/// Device constants of the nonlinear model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceParams {
  /// Resistance of a fully formed filament (w = 65536)
  pub r_on: u32,
  /// Resistance with no filament (w = 0)
  pub r_off: u32,
  /// Voltage LSB to current-numerator scale
  pub v_scale: u32,
  /// Saturation current, also returned when resistance is zero
  pub i_max: u32,
  /// Signed drift coefficient; negative values dissolve the filament
  pub mobility: i32,
  pub timestep: u32,
  /// Right shift taking `I * mobility * timestep` into the `w` domain
  pub drift_shift: u32,
}

impl Default for DeviceParams {
  fn default() -> Self {
    Self {
      r_on: 100,
      r_off: 16_000,
      v_scale: 1_000,
      i_max: 0xffff,
      mobility: 1,
      timestep: 1,
      drift_shift: 4,
    }
  }
}

impl DeviceParams {
  /// Interpolated resistance at state `w`
  pub fn resistance(&self, w: u16) -> u64 {
    let w = w as u64;
    (self.r_on as u64 * w + self.r_off as u64 * (65536 - w)) >> 16
  }

  /// Instantaneous cell current
  pub fn current(&self, voltage: u8, w: u16) -> u32 {
    if voltage == 0 {
      return 0;
    }
    let r = self.resistance(w);
    if r == 0 {
      return self.i_max;
    }
    let i = voltage as u64 * self.v_scale as u64 / r;
    i.min(self.i_max as u64) as u32
  }

  /// State after one tick carrying `current`. The product is taken in i128,
  /// so any `u32`/`i32` constants only ever saturate the state.
  pub fn drift(&self, w: u16, current: u32) -> u16 {
    let product = current as i128 * self.mobility as i128 * self.timestep as i128;
    let dw = product >> self.drift_shift.min(127);
    (w as i128 + dw).clamp(0, u16::MAX as i128) as u16
  }
}

#[derive(Clone, Debug)]
pub struct NonlinearCrossbar {
  params: DeviceParams,
  w: [u16; CELLS],
}

impl NonlinearCrossbar {
  pub fn new(params: DeviceParams) -> Self {
    Self {
      params,
      w: [W_MID; CELLS],
    }
  }

  pub fn params(&self) -> &DeviceParams {
    &self.params
  }

  pub fn state(&self, cell: usize) -> u16 {
    self.w[cell % CELLS]
  }
}

impl Default for NonlinearCrossbar {
  fn default() -> Self {
    Self::new(DeviceParams::default())
  }
}

impl Crossbar for NonlinearCrossbar {
  fn program(&mut self, cell: usize, value: u8) {
    debug_assert!(cell < CELLS, "crossbar cell {} out of range", cell);
    self.w[cell % CELLS] = (value as u16) << 8;
  }

  fn compute(&mut self, voltages: &[u8; DIM]) -> [u32; DIM] {
    let mut rows = [0u32; DIM];
    for (cell, w) in self.w.iter_mut().enumerate() {
      let i = self.params.current(voltages[cell % DIM], *w);
      rows[cell / DIM] = rows[cell / DIM].saturating_add(i);
      *w = self.params.drift(*w, i);
    }
    rows
  }

  fn conductance(&self, cell: usize) -> u8 {
    (self.w[cell % CELLS] >> 8) as u8
  }

  fn reset(&mut self) {
    self.w = [W_MID; CELLS];
  }

  fn name(&self) -> &'static str {
    "nonlinear"
  }
}
