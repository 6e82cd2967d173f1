/// IMC controller: bus register file that stages crossbar programming and keeps
/// the input voltages live
use super::crossbar::{Crossbar, CELLS, DIM};
use crate::builtin::{Module, Wire};
use crate::bus::{merge_bytes, BusReq};
use log::{debug, trace};

/// Staged conductance value (low 8 bits)
pub const PROG_DATA: u32 = 0x00;
/// Writing a cell index here programs it on the next edge
pub const PROG_ADDR: u32 = 0x04;
/// Voltages 0..3, little-endian
pub const V_INPUT_LO: u32 = 0x08;
/// Voltages 4..7
pub const V_INPUT_HI: u32 = 0x0c;
/// 8 read-only words, one row current each
pub const RESULT: u32 = 0x10;

/// Size of the register window
pub const WINDOW: u32 = RESULT + 4 * DIM as u32;

pub struct ImcController<X: Crossbar> {
  name: String,
  base: u32,

  pub req: Wire<BusReq>,
  pub resp: Wire<u32>,

  prog_data: u32,
  prog_addr: u32,
  v_input_lo: u32,
  v_input_hi: u32,
  // one-shot, armed by a PROG_ADDR write and consumed on the next edge
  trigger: Wire<usize>,
  results: [u32; DIM],
  programmed: u64,

  crossbar: X,
}

impl<X: Crossbar> ImcController<X> {
  pub fn new(name: impl Into<String>, base: u32, crossbar: X) -> Self {
    Self {
      name: name.into(),
      base,
      req: Wire::default(),
      resp: Wire::default(),
      prog_data: 0,
      prog_addr: 0,
      v_input_lo: 0,
      v_input_hi: 0,
      trigger: Wire::default(),
      results: [0; DIM],
      programmed: 0,
      crossbar,
    }
  }

  pub fn crossbar(&self) -> &X {
    &self.crossbar
  }

  pub fn results(&self) -> &[u32; DIM] {
    &self.results
  }

  /// Number of crossbar programming events since reset
  pub fn programmed(&self) -> u64 {
    self.programmed
  }

  pub fn voltages(&self) -> [u8; DIM] {
    let lo = self.v_input_lo.to_le_bytes();
    let hi = self.v_input_hi.to_le_bytes();
    std::array::from_fn(|i| if i < 4 { lo[i] } else { hi[i - 4] })
  }

  fn read_reg(&self, offset: u32) -> u32 {
    match offset {
      PROG_DATA => self.prog_data,
      PROG_ADDR => self.prog_addr,
      V_INPUT_LO => self.v_input_lo,
      V_INPUT_HI => self.v_input_hi,
      o if (RESULT..WINDOW).contains(&o) => self.results[((o - RESULT) / 4) as usize],
      _ => 0,
    }
  }

  fn write_reg(&mut self, offset: u32, data: u32, be: u8) {
    match offset {
      PROG_DATA => self.prog_data = merge_bytes(self.prog_data, data, be) & 0xff,
      PROG_ADDR => {
        self.prog_addr = merge_bytes(self.prog_addr, data, be) & (CELLS as u32 - 1);
        self.trigger.set(self.prog_addr as usize);
      }
      V_INPUT_LO => self.v_input_lo = merge_bytes(self.v_input_lo, data, be),
      V_INPUT_HI => self.v_input_hi = merge_bytes(self.v_input_hi, data, be),
      _ => trace!("[{}] write to read-only/unmapped offset 0x{:x} ignored", self.name, offset),
    }
  }
}

impl<X: Crossbar> Module for ImcController<X> {
  fn run(&mut self) {
    let req = self.req.take();
    let offset = |r: &BusReq| r.addr.wrapping_sub(self.base) & !3;

    // everything below reads pre-edge state
    let rdata = match &req {
      Some(r) if !r.write => self.read_reg(offset(r)),
      _ => 0,
    };

    let currents = self.crossbar.compute(&self.voltages());

    if let Some(cell) = self.trigger.take() {
      let value = self.prog_data as u8;
      self.crossbar.program(cell, value);
      self.programmed += 1;
      debug!("[{}] program cell {} (r{} c{}) = {}", self.name, cell, cell / DIM, cell % DIM, value);
    }

    self.results = currents;

    match req {
      Some(r) => {
        if r.write {
          let off = offset(&r);
          self.write_reg(off, r.wdata, r.be);
        }
        self.resp.set(rdata);
      }
      None => self.resp.clear(),
    }
  }

  fn reset(&mut self) {
    self.req = Wire::default();
    self.resp = Wire::default();
    self.prog_data = 0;
    self.prog_addr = 0;
    self.v_input_lo = 0;
    self.v_input_hi = 0;
    self.trigger = Wire::default();
    self.results = [0; DIM];
    self.programmed = 0;
    self.crossbar.reset();
  }

  fn name(&self) -> &str {
    &self.name
  }
}
