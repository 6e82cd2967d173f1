/// Top Module - the SoC: bus arbiter plus every bus target
use crate::builtin::Module;
use crate::bus::{Arbiter, BusReq, BusResp, MemoryMap, ResponsePorts, Target};
use crate::imc::{Crossbar, ImcController};
use crate::memdomain::DualPortRam;
use crate::npu::Npu;
use crate::periph::{CycleCounter, Uart, UartWrite};

/// Everything the outside world sees during one tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickOutput {
  pub resp: BusResp,
  /// Port A line for the fetch issued one tick earlier
  pub fetch: Option<u128>,
  /// UART observation pin for a write issued this tick
  pub uart: Option<UartWrite>,
}

pub struct Top<X: Crossbar> {
  name: String,

  pub arbiter: Arbiter,

  pub uart: Uart,
  pub npu: Npu,
  pub cycle_counter: CycleCounter,
  pub imc: ImcController<X>,
  pub mem: DualPortRam,

  ticks: u64,
}

impl<X: Crossbar> Top<X> {
  pub fn new(name: impl Into<String>, mem_size: usize, map: MemoryMap, crossbar: X) -> Self {
    Self {
      name: name.into(),
      arbiter: Arbiter::new("arbiter", map),
      uart: Uart::new("uart"),
      npu: Npu::new("npu", map.npu_base),
      cycle_counter: CycleCounter::new("cycle_counter"),
      imc: ImcController::new("imc", map.imc_base, crossbar),
      mem: DualPortRam::new("mem", mem_size),
      ticks: 0,
    }
  }

  pub fn map(&self) -> &MemoryMap {
    self.arbiter.map()
  }

  /// Ticks since reset
  pub fn ticks(&self) -> u64 {
    self.ticks
  }

  /// Advance one clock.
  ///
  /// The request is routed and granted combinationally, the registered
  /// outputs (answers to last tick's request and fetch) are sampled, and only
  /// then does every module take its edge.
  pub fn tick(&mut self, req: Option<BusReq>, fetch: Option<u32>) -> TickOutput {
    let routed = self.arbiter.decode(req.as_ref());
    if let (Some(req), Some(target)) = (req, routed) {
      match target {
        Target::Uart => self.uart.req.set(req),
        Target::Npu => self.npu.req.set(req),
        Target::CycleCtr => self.cycle_counter.req.set(req),
        Target::Imc => self.imc.req.set(req),
        Target::Memory => self.mem.req.set(req),
      }
    }
    if let Some(addr) = fetch {
      self.mem.fetch_req.set(addr);
    }

    let resp = self.arbiter.respond(
      routed,
      &ResponsePorts {
        uart: &self.uart.resp,
        npu: &self.npu.resp,
        cycle_ctr: &self.cycle_counter.resp,
        imc: &self.imc.resp,
        memory: &self.mem.resp,
      },
    );
    let fetch = self.mem.fetch_resp.get().copied();

    self.run();

    TickOutput {
      resp,
      fetch,
      uart: self.uart.tx.get().copied(),
    }
  }

  /// Issue one request and wait the tick for its response. Returns read data.
  pub fn transact(&mut self, req: BusReq) -> u32 {
    let issued = self.tick(Some(req), None);
    debug_assert!(issued.resp.grant);
    let done = self.tick(None, None);
    debug_assert!(done.resp.valid, "[{}] no valid one tick after request", self.name);
    done.resp.rdata
  }

  pub fn write(&mut self, addr: u32, data: u32) {
    self.transact(BusReq::write(addr, data));
  }

  pub fn read(&mut self, addr: u32) -> u32 {
    self.transact(BusReq::read(addr))
  }
}

impl<X: Crossbar> Module for Top<X> {
  fn run(&mut self) {
    // every target only reads its own pre-edge state, order is free
    self.uart.run();
    self.npu.run();
    self.cycle_counter.run();
    self.imc.run();
    self.mem.run();
    self.ticks += 1;
  }

  fn reset(&mut self) {
    self.uart.reset();
    self.npu.reset();
    self.cycle_counter.reset();
    self.imc.reset();
    self.mem.reset();
    self.ticks = 0;
  }

  fn name(&self) -> &str {
    &self.name
  }
}
