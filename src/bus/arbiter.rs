/// Bus arbiter: address decode on the request side, response mux on the way back
use super::{BusReq, BusResp, MemoryMap, Target};
use crate::builtin::Wire;
use log::trace;

/// Registered response outputs of every bus target, sampled during one tick
pub struct ResponsePorts<'a> {
  pub uart: &'a Wire<u32>,
  pub npu: &'a Wire<u32>,
  pub cycle_ctr: &'a Wire<u32>,
  pub imc: &'a Wire<u32>,
  pub memory: &'a Wire<u32>,
}

impl ResponsePorts<'_> {
  fn valid_count(&self) -> usize {
    [self.uart, self.npu, self.cycle_ctr, self.imc, self.memory]
      .iter()
      .filter(|w| w.valid)
      .count()
  }
}

pub struct Arbiter {
  name: String,
  map: MemoryMap,
}

impl Arbiter {
  pub fn new(name: impl Into<String>, map: MemoryMap) -> Self {
    Self { name: name.into(), map }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn map(&self) -> &MemoryMap {
    &self.map
  }

  /// Route a request to exactly one target.
  pub fn decode(&self, req: Option<&BusReq>) -> Option<Target> {
    let req = req?;
    let target = self.map.classify(req.addr);
    trace!(
      "[{}] {} 0x{:08x} -> {:?}",
      self.name,
      if req.write { "W" } else { "R" },
      req.addr,
      target
    );
    Some(target)
  }

  /// Combine per-target handshakes into the single bus response.
  ///
  /// Every target grants as soon as it is addressed, so the combined grant is
  /// set whenever a request was routed. Read data is picked by priority
  /// NPU > cycle counter > IMC > memory; the UART completes its handshake but
  /// never drives read data.
  pub fn respond(&self, routed: Option<Target>, ports: &ResponsePorts) -> BusResp {
    debug_assert!(
      ports.valid_count() <= 1,
      "[{}] more than one target asserted valid in the same tick",
      self.name
    );

    let grant = Target::ALL.iter().any(|t| routed == Some(*t));
    let valid = ports.uart.valid || ports.npu.valid || ports.cycle_ctr.valid || ports.imc.valid || ports.memory.valid;

    let rdata = if ports.npu.valid {
      ports.npu.value
    } else if ports.cycle_ctr.valid {
      ports.cycle_ctr.value
    } else if ports.imc.valid {
      ports.imc.value
    } else if ports.memory.valid {
      ports.memory.value
    } else {
      0
    };

    BusResp { grant, valid, rdata }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn idle() -> Wire<u32> {
    Wire::default()
  }

  fn valid(v: u32) -> Wire<u32> {
    let mut w = Wire::default();
    w.set(v);
    w
  }

  #[test]
  fn test_exactly_one_target_per_address() {
    let arb = Arbiter::new("arb", MemoryMap::default());
    for addr in (0..0x1000u32).step_by(4).chain([0x100, 0x300, 0xffff_fffc]) {
      let routed = arb.decode(Some(&BusReq::read(addr)));
      assert!(routed.is_some());
      let hits = Target::ALL.iter().filter(|t| routed == Some(**t)).count();
      assert_eq!(hits, 1, "addr 0x{:x}", addr);
    }
    assert_eq!(arb.decode(None), None);
  }

  #[test]
  fn test_response_mux() {
    let arb = Arbiter::new("arb", MemoryMap::default());
    let (u, n, c, i, m) = (idle(), idle(), idle(), valid(0x55), idle());
    let ports = ResponsePorts {
      uart: &u,
      npu: &n,
      cycle_ctr: &c,
      imc: &i,
      memory: &m,
    };
    let resp = arb.respond(None, &ports);
    assert!(!resp.grant);
    assert!(resp.valid);
    assert_eq!(resp.rdata, 0x55);
  }

  #[test]
  fn test_uart_valid_carries_no_data() {
    let arb = Arbiter::new("arb", MemoryMap::default());
    let (u, n, c, i, m) = (valid(0x41), idle(), idle(), idle(), idle());
    let ports = ResponsePorts {
      uart: &u,
      npu: &n,
      cycle_ctr: &c,
      imc: &i,
      memory: &m,
    };
    let resp = arb.respond(Some(Target::Memory), &ports);
    assert!(resp.grant);
    assert!(resp.valid);
    assert_eq!(resp.rdata, 0);
  }
}
