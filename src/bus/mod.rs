/// Data bus: transaction types, memory map and address classification
pub mod arbiter;

pub use arbiter::{Arbiter, ResponsePorts};

use serde::{Deserialize, Serialize};

/// All four byte lanes enabled
pub const BE_ALL: u8 = 0b1111;

/// One data-bus request, driven by the host for a single tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BusReq {
  pub addr: u32,
  pub write: bool,
  pub wdata: u32,
  /// Byte enables, bit i covers bits 8*i..8*i+7 of `wdata`
  pub be: u8,
}

impl BusReq {
  pub fn read(addr: u32) -> Self {
    Self {
      addr,
      write: false,
      wdata: 0,
      be: BE_ALL,
    }
  }

  pub fn write(addr: u32, wdata: u32) -> Self {
    Self::write_masked(addr, wdata, BE_ALL)
  }

  pub fn write_masked(addr: u32, wdata: u32, be: u8) -> Self {
    Self {
      addr,
      write: true,
      wdata,
      be: be & BE_ALL,
    }
  }
}

/// What the bus shows the host during one tick.
///
/// `grant` answers the request driven this tick; `valid`/`rdata` carry the
/// response to the request driven one tick earlier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BusResp {
  pub grant: bool,
  pub valid: bool,
  pub rdata: u32,
}

/// Bus targets, in decode priority order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Target {
  Uart,
  Npu,
  CycleCtr,
  Imc,
  Memory,
}

impl Target {
  pub const ALL: [Target; 5] = [Target::Uart, Target::Npu, Target::CycleCtr, Target::Imc, Target::Memory];
}

/// Peripheral addresses on the data bus. Everything not claimed here is memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryMap {
  pub uart: u32,
  pub npu_base: u32,
  pub npu_size: u32,
  pub cycle_counter: u32,
  pub imc_base: u32,
  pub imc_size: u32,
}

impl Default for MemoryMap {
  fn default() -> Self {
    Self {
      uart: 0x100,
      npu_base: 0x200,
      npu_size: 0x100,
      cycle_counter: 0x300,
      imc_base: 0x400,
      imc_size: 0x30,
    }
  }
}

impl MemoryMap {
  /// First match wins: UART > NPU > cycle counter > IMC > memory.
  pub fn classify(&self, addr: u32) -> Target {
    if addr == self.uart {
      Target::Uart
    } else if in_window(addr, self.npu_base, self.npu_size) {
      Target::Npu
    } else if addr == self.cycle_counter {
      Target::CycleCtr
    } else if in_window(addr, self.imc_base, self.imc_size) {
      Target::Imc
    } else {
      Target::Memory
    }
  }

  pub fn npu_reg(&self, offset: u32) -> u32 {
    self.npu_base + offset
  }

  pub fn imc_reg(&self, offset: u32) -> u32 {
    self.imc_base + offset
  }
}

fn in_window(addr: u32, base: u32, size: u32) -> bool {
  addr.wrapping_sub(base) < size
}

/// Replace the byte lanes of `old` selected by `be` with those of `new`.
pub fn merge_bytes(old: u32, new: u32, be: u8) -> u32 {
  let mut mask = 0u32;
  for lane in 0..4 {
    if be & (1 << lane) != 0 {
      mask |= 0xff << (8 * lane);
    }
  }
  (old & !mask) | (new & mask)
}
