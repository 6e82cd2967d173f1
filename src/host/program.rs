/// Scripted bus programs
use crate::bus::{BusReq, BE_ALL};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostOp {
  Write { addr: u32, data: u32, be: u8 },
  Read { addr: u32 },
  /// Drive no request for this many ticks
  Idle(u32),
}

impl HostOp {
  pub fn request(&self) -> Option<BusReq> {
    match *self {
      HostOp::Write { addr, data, be } => Some(BusReq::write_masked(addr, data, be)),
      HostOp::Read { addr } => Some(BusReq::read(addr)),
      HostOp::Idle(_) => None,
    }
  }
}

/// An ordered list of bus operations. Read results come back in op order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BusProgram {
  ops: Vec<HostOp>,
  reads: usize,
}

impl BusProgram {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn write(&mut self, addr: u32, data: u32) -> &mut Self {
    self.write_masked(addr, data, BE_ALL)
  }

  pub fn write_masked(&mut self, addr: u32, data: u32, be: u8) -> &mut Self {
    self.ops.push(HostOp::Write { addr, data, be });
    self
  }

  pub fn read(&mut self, addr: u32) -> &mut Self {
    self.ops.push(HostOp::Read { addr });
    self.reads += 1;
    self
  }

  pub fn idle(&mut self, ticks: u32) -> &mut Self {
    if ticks > 0 {
      self.ops.push(HostOp::Idle(ticks));
    }
    self
  }

  /// One UART write per byte of `text`
  pub fn print(&mut self, uart: u32, text: &str) -> &mut Self {
    for b in text.bytes() {
      self.write(uart, b as u32);
    }
    self
  }

  pub fn append(&mut self, other: &BusProgram) -> &mut Self {
    self.ops.extend_from_slice(&other.ops);
    self.reads += other.reads;
    self
  }

  pub fn ops(&self) -> &[HostOp] {
    &self.ops
  }

  pub fn len(&self) -> usize {
    self.ops.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ops.is_empty()
  }

  /// Number of read results the program produces
  pub fn read_count(&self) -> usize {
    self.reads
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_builder() {
    let mut p = BusProgram::new();
    p.write(0x10, 1).read(0x10).idle(0).idle(3).print(0x100, "hi");
    assert_eq!(p.len(), 5);
    assert_eq!(p.read_count(), 1);
    assert_eq!(p.ops()[2], HostOp::Idle(3));
    assert_eq!(p.ops()[4], HostOp::Write { addr: 0x100, data: 'i' as u32, be: BE_ALL });
    assert_eq!(p.ops()[2].request(), None);
  }
}
