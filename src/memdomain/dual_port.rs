/// Dual-port byte-addressable memory backing instruction fetch and data access
use crate::builtin::{Module, Wire};
use crate::bus::BusReq;
use log::debug;

/// Bytes returned by one Port A fetch
pub const FETCH_BYTES: usize = 16;

/// Dual-port RAM.
///
/// Port A is a read-only 128-bit fetch port, Port B the 32-bit byte-enabled
/// data port on the bus. Both ports may fire in the same tick; Port A always
/// sees the contents from before the edge and never masks a Port B write.
pub struct DualPortRam {
  name: String,

  // Port A: fetch address in, 128-bit line out
  pub fetch_req: Wire<u32>,
  pub fetch_resp: Wire<u128>,

  // Port B: bus request in, read data / valid out
  pub req: Wire<BusReq>,
  pub resp: Wire<u32>,

  cells: Vec<u8>,
  mask: usize,
}

impl DualPortRam {
  pub fn new(name: impl Into<String>, size: usize) -> Self {
    assert!(size.is_power_of_two(), "memory size must be a power of two, got {}", size);
    Self {
      name: name.into(),
      fetch_req: Wire::default(),
      fetch_resp: Wire::default(),
      req: Wire::default(),
      resp: Wire::default(),
      cells: vec![0; size],
      mask: size - 1,
    }
  }

  pub fn size(&self) -> usize {
    self.cells.len()
  }

  /// Out-of-range access is the caller's bug. Debug builds trap on it,
  /// release builds wrap into the address space.
  fn index(&self, addr: u32, len: usize) -> usize {
    debug_assert!(
      (addr as usize).saturating_add(len) <= self.cells.len(),
      "[{}] access of {} bytes at 0x{:x} beyond 0x{:x}",
      self.name,
      len,
      addr,
      self.cells.len()
    );
    addr as usize & self.mask
  }

  fn read_le(&self, addr: u32, len: usize) -> u128 {
    let base = self.index(addr, len);
    (0..len).rev().fold(0u128, |acc, i| (acc << 8) | self.cells[(base + i) & self.mask] as u128)
  }

  /// Backdoor image load, bypassing the ports (testbench preload)
  pub fn load_image(&mut self, base: u32, bytes: &[u8]) {
    let start = self.index(base, bytes.len());
    for (i, b) in bytes.iter().enumerate() {
      self.cells[(start + i) & self.mask] = *b;
    }
    debug!("[{}] loaded {} bytes at 0x{:x}", self.name, bytes.len(), base);
  }

  /// Backdoor aligned word read, bypassing the ports
  pub fn peek_word(&self, addr: u32) -> u32 {
    self.read_le(addr & !3, 4) as u32
  }
}

impl Module for DualPortRam {
  fn run(&mut self) {
    // Port A reads the pre-edge contents
    match self.fetch_req.take() {
      Some(addr) => {
        let line = self.read_le(addr, FETCH_BYTES);
        self.fetch_resp.set(line);
      }
      None => self.fetch_resp.clear(),
    }

    // Port B
    match self.req.take() {
      Some(req) => {
        let addr = req.addr & !3;
        if req.write {
          let base = self.index(addr, 4);
          for lane in 0..4 {
            if req.be & (1 << lane) != 0 {
              self.cells[(base + lane) & self.mask] = (req.wdata >> (8 * lane)) as u8;
            }
          }
          self.resp.set(0);
        } else {
          let data = self.read_le(addr, 4) as u32;
          self.resp.set(data);
        }
      }
      None => self.resp.clear(),
    }
  }

  fn reset(&mut self) {
    self.fetch_req = Wire::default();
    self.fetch_resp = Wire::default();
    self.req = Wire::default();
    self.resp = Wire::default();
    self.cells.fill(0);
  }

  fn name(&self) -> &str {
    &self.name
  }
}
