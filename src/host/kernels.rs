/// Matrix-vector kernels.
///
/// The accelerators only see 8x8 tiles. Splitting a larger matrix into tiles,
/// biasing signed weights into the crossbar's unsigned conductance range and
/// summing partial results all happen here, on the host side.
use super::program::BusProgram;
use crate::bus::MemoryMap;
use crate::imc::controller as imc;
use crate::npu::regs as npu;
use crate::npu::{ActivationMode, DIM};

/// Offset added to a signed weight to get a conductance in `0..=255`
pub const CONDUCTANCE_BIAS: i32 = 128;

/// Plain integer reference, `out[r] = Σ_c w[r][c] * x[c]`
pub fn cpu_matvec(weights: &[i8], rows: usize, cols: usize, input: &[u8], mode: ActivationMode) -> Vec<i32> {
  assert_eq!(weights.len(), rows * cols);
  assert_eq!(input.len(), cols);
  (0..rows)
    .map(|r| {
      weights[r * cols..(r + 1) * cols]
        .iter()
        .zip(input)
        .fold(0i32, |acc, (w, x)| {
          let x = match mode {
            ActivationMode::Unsigned => *x as i32,
            ActivationMode::Signed => *x as i8 as i32,
          };
          acc.wrapping_add(*w as i32 * x)
        })
    })
    .collect()
}

fn pack(bytes: [u8; 4]) -> u32 {
  u32::from_le_bytes(bytes)
}

/// Column slice of `input` for one tile, zero padded
fn tile_input(input: &[u8], col_start: usize) -> [u8; DIM] {
  std::array::from_fn(|c| input.get(col_start + c).copied().unwrap_or(0))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ImcTile {
  row_start: usize,
  valid_rows: usize,
  sum_v: u32,
}

/// How to turn the raw RESULT reads of an IMC run back into outputs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImcPlan {
  rows: usize,
  tiles: Vec<ImcTile>,
}

impl ImcPlan {
  pub fn read_count(&self) -> usize {
    self.tiles.iter().map(|t| t.valid_rows).sum()
  }

  /// Remove the conductance bias from every tile and sum the partials:
  /// `true = raw - 128 * Σv`.
  pub fn finish(&self, reads: &[u32]) -> Vec<i32> {
    assert_eq!(reads.len(), self.read_count());
    let mut out = vec![0i32; self.rows];
    let mut reads = reads.iter();
    for tile in &self.tiles {
      let bias = CONDUCTANCE_BIAS.wrapping_mul(tile.sum_v as i32);
      for r in 0..tile.valid_rows {
        if let Some(raw) = reads.next() {
          let partial = (*raw as i32).wrapping_sub(bias);
          out[tile.row_start + r] = out[tile.row_start + r].wrapping_add(partial);
        }
      }
    }
    out
  }
}

/// Tiled matrix-vector product through the IMC register file.
///
/// Column blocks outer, row blocks inner. Each tile programs all 64 cells
/// (`g = w + 128`, padding cells `g = 128`), applies the tile's inputs as
/// voltages, waits `settle` ticks and reads the rows that exist.
pub fn imc_matvec(
  map: &MemoryMap,
  weights: &[i8],
  rows: usize,
  cols: usize,
  input: &[u8],
  settle: u32,
) -> (BusProgram, ImcPlan) {
  assert_eq!(weights.len(), rows * cols);
  assert_eq!(input.len(), cols);

  let mut program = BusProgram::new();
  let mut tiles = Vec::new();

  for cs in (0..cols).step_by(DIM) {
    for rs in (0..rows).step_by(DIM) {
      for r in 0..DIM {
        for c in 0..DIM {
          let (wr, wc) = (rs + r, cs + c);
          let g = if wr < rows && wc < cols {
            weights[wr * cols + wc] as i32 + CONDUCTANCE_BIAS
          } else {
            CONDUCTANCE_BIAS
          };
          program
            .write(map.imc_reg(imc::PROG_DATA), g as u32)
            .write(map.imc_reg(imc::PROG_ADDR), (r * DIM + c) as u32);
        }
      }

      let v = tile_input(input, cs);
      program
        .write(map.imc_reg(imc::V_INPUT_LO), pack([v[0], v[1], v[2], v[3]]))
        .write(map.imc_reg(imc::V_INPUT_HI), pack([v[4], v[5], v[6], v[7]]))
        .idle(settle);

      let valid_rows = DIM.min(rows - rs);
      for r in 0..valid_rows {
        program.read(map.imc_reg(imc::RESULT + 4 * r as u32));
      }
      tiles.push(ImcTile {
        row_start: rs,
        valid_rows,
        sum_v: v.iter().map(|x| *x as u32).sum(),
      });
    }
  }

  (program, ImcPlan { rows, tiles })
}

/// How to turn the RESULT reads of an NPU run into outputs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NpuPlan {
  rows: usize,
}

impl NpuPlan {
  pub fn read_count(&self) -> usize {
    self.rows
  }

  pub fn finish(&self, reads: &[u32]) -> Vec<i32> {
    assert_eq!(reads.len(), self.rows);
    reads.iter().map(|r| *r as i32).collect()
  }
}

/// Tiled matrix-vector product through the NPU register file.
///
/// Per row block the accumulators are cleared once; every column tile then
/// loads its weights and activations and pulses START without clearing, so
/// the MAC array itself sums the partials.
pub fn npu_matvec(
  map: &MemoryMap,
  weights: &[i8],
  rows: usize,
  cols: usize,
  input: &[u8],
  mode: ActivationMode,
) -> (BusProgram, NpuPlan) {
  assert_eq!(weights.len(), rows * cols);
  assert_eq!(input.len(), cols);

  let mode_bits = match mode {
    ActivationMode::Unsigned => 0,
    ActivationMode::Signed => npu::CTRL_SIGNED,
  };
  let mut program = BusProgram::new();

  for rs in (0..rows).step_by(DIM) {
    program.write(map.npu_reg(npu::CTRL), npu::CTRL_CLEAR | mode_bits);

    for cs in (0..cols).step_by(DIM) {
      let tile: [u8; DIM * DIM] = std::array::from_fn(|i| {
        let (wr, wc) = (rs + i / DIM, cs + i % DIM);
        if wr < rows && wc < cols {
          weights[wr * cols + wc] as u8
        } else {
          0
        }
      });
      for (k, chunk) in tile.chunks_exact(4).enumerate() {
        program.write(
          map.npu_reg(npu::WEIGHT + 4 * k as u32),
          pack([chunk[0], chunk[1], chunk[2], chunk[3]]),
        );
      }
      let a = tile_input(input, cs);
      program
        .write(map.npu_reg(npu::ACT), pack([a[0], a[1], a[2], a[3]]))
        .write(map.npu_reg(npu::ACT + 4), pack([a[4], a[5], a[6], a[7]]))
        .write(map.npu_reg(npu::CTRL), npu::CTRL_START | mode_bits);
    }

    for r in 0..DIM.min(rows - rs) {
      program.read(map.npu_reg(npu::RESULT + 4 * r as u32));
    }
  }

  (program, NpuPlan { rows })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cpu_matvec_modes() {
    let w = [1i8, -2, 3, 4];
    let x = [10u8, 0xff];
    assert_eq!(cpu_matvec(&w, 2, 2, &x, ActivationMode::Unsigned), vec![10 - 510, 30 + 1020]);
    assert_eq!(cpu_matvec(&w, 2, 2, &x, ActivationMode::Signed), vec![10 + 2, 30 - 4]);
  }

  #[test]
  fn test_imc_program_shape() {
    let map = MemoryMap::default();
    let (program, plan) = imc_matvec(&map, &[0i8; 10 * 12], 10, 12, &[0u8; 12], 2);
    // 2 column blocks x 2 row blocks
    assert_eq!(plan.tiles.len(), 4);
    assert_eq!(plan.read_count(), 2 * (8 + 2));
    assert_eq!(program.read_count(), plan.read_count());
  }

  #[test]
  fn test_imc_finish_removes_bias() {
    let plan = ImcPlan {
      rows: 2,
      tiles: vec![
        ImcTile { row_start: 0, valid_rows: 2, sum_v: 3 },
        ImcTile { row_start: 0, valid_rows: 2, sum_v: 1 },
      ],
    };
    let out = plan.finish(&[384 + 5, 384 - 7, 128 + 1, 128]);
    assert_eq!(out, vec![6, -7]);
  }

  #[test]
  fn test_npu_program_shape() {
    let map = MemoryMap::default();
    let (program, plan) = npu_matvec(&map, &[0i8; 9 * 17], 9, 17, &[0u8; 17], ActivationMode::Unsigned);
    assert_eq!(plan.read_count(), 9);
    assert_eq!(program.read_count(), 9);
    // per row block: clear + 3 col tiles * (16 + 2 + 1) writes + reads
    assert_eq!(program.len(), (1 + 3 * 19 + 8) + (1 + 3 * 19 + 1));
  }
}
