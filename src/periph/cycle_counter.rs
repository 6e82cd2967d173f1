/// Free-running cycle counter
use crate::builtin::{Module, Wire};
use crate::bus::BusReq;

/// Counts edges since reset, wrapping at 32 bits. Read-only: bus writes
/// complete their handshake and are dropped.
pub struct CycleCounter {
  name: String,
  pub req: Wire<BusReq>,
  pub resp: Wire<u32>,
  count: u32,
}

impl CycleCounter {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      req: Wire::default(),
      resp: Wire::default(),
      count: 0,
    }
  }

  pub fn count(&self) -> u32 {
    self.count
  }
}

impl Module for CycleCounter {
  fn run(&mut self) {
    match self.req.take() {
      Some(req) => self.resp.set(if req.write { 0 } else { self.count }),
      None => self.resp.clear(),
    }
    self.count = self.count.wrapping_add(1);
  }

  fn reset(&mut self) {
    self.req = Wire::default();
    self.resp = Wire::default();
    self.count = 0;
  }

  fn name(&self) -> &str {
    &self.name
  }
}
