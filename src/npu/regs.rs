/// NPU register file: weight/activation buffers, control and results in front
/// of the MAC array
use super::mac_array::{ActivationMode, MacArray, MacInputs, DIM};
use crate::builtin::{Module, Wire};
use crate::bus::{merge_bytes, BusReq};
use log::{debug, trace};

/// 16 words, word k holds weights 4k..4k+3
pub const WEIGHT: u32 = 0x00;
/// 2 words, activations 0..3 and 4..7
pub const ACT: u32 = 0x40;
pub const CTRL: u32 = 0x48;
/// 8 words, one accumulator per row
pub const RESULT: u32 = 0x50;

/// One enabled MAC tick on the next edge
pub const CTRL_START: u32 = 1 << 0;
/// Zero the accumulators on the next edge, wins over START
pub const CTRL_CLEAR: u32 = 1 << 1;
/// Level bit: sign-extend activations
pub const CTRL_SIGNED: u32 = 1 << 2;

const WEIGHT_WORDS: u32 = (DIM * DIM / 4) as u32;
const ACT_WORDS: u32 = (DIM / 4) as u32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Pulse {
  start: bool,
  clear: bool,
}

pub struct Npu {
  name: String,
  base: u32,

  pub req: Wire<BusReq>,
  pub resp: Wire<u32>,

  weights: [i8; DIM * DIM],
  activations: [u8; DIM],
  ctrl: u32,
  // armed by a CTRL write, consumed on the following edge
  pulse: Wire<Pulse>,

  pub mac: MacArray,
}

impl Npu {
  pub fn new(name: impl Into<String>, base: u32) -> Self {
    Self {
      name: name.into(),
      base,
      req: Wire::default(),
      resp: Wire::default(),
      weights: [0; DIM * DIM],
      activations: [0; DIM],
      ctrl: 0,
      pulse: Wire::default(),
      mac: MacArray::new("mac_array"),
    }
  }

  pub fn weights(&self) -> &[i8; DIM * DIM] {
    &self.weights
  }

  pub fn activations(&self) -> &[u8; DIM] {
    &self.activations
  }

  fn offset(&self, addr: u32) -> u32 {
    addr.wrapping_sub(self.base) & !3
  }

  fn mode(&self) -> ActivationMode {
    if self.ctrl & CTRL_SIGNED != 0 {
      ActivationMode::Signed
    } else {
      ActivationMode::Unsigned
    }
  }

  fn read_reg(&self, offset: u32) -> u32 {
    match offset {
      o if (WEIGHT..WEIGHT + 4 * WEIGHT_WORDS).contains(&o) => {
        let base = ((o - WEIGHT) / 4) as usize * 4;
        u32::from_le_bytes(std::array::from_fn(|i| self.weights[base + i] as u8))
      }
      o if (ACT..ACT + 4 * ACT_WORDS).contains(&o) => {
        let base = ((o - ACT) / 4) as usize * 4;
        u32::from_le_bytes(std::array::from_fn(|i| self.activations[base + i]))
      }
      CTRL => self.ctrl,
      o if (RESULT..RESULT + 4 * DIM as u32).contains(&o) => self.mac.row(((o - RESULT) / 4) as usize) as u32,
      _ => 0,
    }
  }

  fn write_reg(&mut self, offset: u32, data: u32, be: u8) {
    match offset {
      o if (WEIGHT..WEIGHT + 4 * WEIGHT_WORDS).contains(&o) => {
        let word = merge_bytes(self.read_reg(o), data, be).to_le_bytes();
        let base = ((o - WEIGHT) / 4) as usize * 4;
        for (i, b) in word.iter().enumerate() {
          self.weights[base + i] = *b as i8;
        }
      }
      o if (ACT..ACT + 4 * ACT_WORDS).contains(&o) => {
        let word = merge_bytes(self.read_reg(o), data, be).to_le_bytes();
        let base = ((o - ACT) / 4) as usize * 4;
        self.activations[base..base + 4].copy_from_slice(&word);
      }
      CTRL => {
        self.ctrl = merge_bytes(self.ctrl, data, be);
        let pulse = Pulse {
          start: self.ctrl & CTRL_START != 0,
          clear: self.ctrl & CTRL_CLEAR != 0,
        };
        if pulse.start || pulse.clear {
          self.pulse.set(pulse);
        }
      }
      _ => trace!("[{}] write to read-only/unmapped offset 0x{:x} ignored", self.name, offset),
    }
  }
}

impl Module for Npu {
  fn run(&mut self) {
    let req = self.req.take();

    // bus reads see the pre-edge state
    let rdata = match req {
      Some(r) if !r.write => self.read_reg(self.offset(r.addr)),
      _ => 0,
    };

    let pulse = self.pulse.take().unwrap_or_default();
    if pulse.start || pulse.clear {
      debug!(
        "[{}] mac pulse start={} clear={} mode={:?}",
        self.name,
        pulse.start,
        pulse.clear,
        self.mode()
      );
    }
    self.mac.input = MacInputs {
      enable: pulse.start,
      clear: pulse.clear,
      mode: self.mode(),
      weights: self.weights,
      activations: self.activations,
    };
    self.mac.run();

    match req {
      Some(r) => {
        if r.write {
          self.write_reg(self.offset(r.addr), r.wdata, r.be);
        }
        self.resp.set(rdata);
      }
      None => self.resp.clear(),
    }
  }

  fn reset(&mut self) {
    self.req = Wire::default();
    self.resp = Wire::default();
    self.weights = [0; DIM * DIM];
    self.activations = [0; DIM];
    self.ctrl = 0;
    self.pulse = Wire::default();
    self.mac.reset();
  }

  fn name(&self) -> &str {
    &self.name
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn write(npu: &mut Npu, offset: u32, data: u32) {
    npu.req.set(BusReq::write(0x200 + offset, data));
    npu.run();
    assert!(npu.resp.valid);
  }

  fn read(npu: &mut Npu, offset: u32) -> u32 {
    npu.req.set(BusReq::read(0x200 + offset));
    npu.run();
    assert!(npu.resp.valid);
    npu.resp.value
  }

  fn load_identity(npu: &mut Npu) {
    for k in 0..WEIGHT_WORDS {
      let mut word = 0u32;
      for lane in 0..4 {
        let idx = (k * 4 + lane) as usize;
        if idx / DIM == idx % DIM {
          word |= 1 << (8 * lane);
        }
      }
      write(npu, WEIGHT + 4 * k, word);
    }
  }

  #[test]
  fn test_identity_scenario() {
    let mut npu = Npu::new("npu", 0x200);
    load_identity(&mut npu);
    write(&mut npu, ACT, 0x0000_0305);
    write(&mut npu, ACT + 4, 0);
    write(&mut npu, CTRL, CTRL_START);
    // pulse fires on this edge
    npu.run();
    let rows: Vec<u32> = (0..8).map(|r| read(&mut npu, RESULT + 4 * r)).collect();
    assert_eq!(rows, vec![5, 3, 0, 0, 0, 0, 0, 0]);
  }

  #[test]
  fn test_weight_word_packing() {
    let mut npu = Npu::new("npu", 0x200);
    write(&mut npu, WEIGHT + 4, 0x80ff_0201);
    assert_eq!(&npu.weights()[4..8], &[1, 2, -1, -128]);
    assert_eq!(read(&mut npu, WEIGHT + 4), 0x80ff_0201);
  }

  #[test]
  fn test_start_fires_exactly_once() {
    let mut npu = Npu::new("npu", 0x200);
    load_identity(&mut npu);
    write(&mut npu, ACT, 0x0000_0007);
    write(&mut npu, CTRL, CTRL_START);
    for _ in 0..5 {
      npu.run();
    }
    assert_eq!(npu.mac.row(0), 7);

    // re-writing CTRL re-arms
    write(&mut npu, CTRL, CTRL_START);
    npu.run();
    assert_eq!(npu.mac.row(0), 14);
  }

  #[test]
  fn test_clear_wins_over_start() {
    let mut npu = Npu::new("npu", 0x200);
    load_identity(&mut npu);
    write(&mut npu, ACT, 0x0000_0009);
    write(&mut npu, CTRL, CTRL_START);
    npu.run();
    assert_eq!(npu.mac.row(0), 9);
    write(&mut npu, CTRL, CTRL_START | CTRL_CLEAR);
    npu.run();
    assert_eq!(npu.mac.rows(), [0; 8]);
  }

  #[test]
  fn test_signed_activation_bit() {
    let mut npu = Npu::new("npu", 0x200);
    load_identity(&mut npu);
    write(&mut npu, ACT, 0x0000_00ff);
    write(&mut npu, CTRL, CTRL_START | CTRL_SIGNED);
    npu.run();
    assert_eq!(read(&mut npu, RESULT), (-1i32) as u32);
    assert_eq!(read(&mut npu, CTRL), CTRL_START | CTRL_SIGNED);
  }

  #[test]
  fn test_register_echo_and_unmapped() {
    let mut npu = Npu::new("npu", 0x200);
    write(&mut npu, ACT + 4, 0xdead_beef);
    assert_eq!(read(&mut npu, ACT + 4), 0xdead_beef);
    assert_eq!(read(&mut npu, 0x4c), 0);
    assert_eq!(read(&mut npu, 0xfc), 0);
    // results are read-only
    write(&mut npu, RESULT, 0x1234);
    assert_eq!(read(&mut npu, RESULT), 0);
  }
}
