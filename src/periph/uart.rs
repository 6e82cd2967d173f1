/// Write-only UART tap
use crate::builtin::{Module, Wire};
use crate::bus::BusReq;
use serde::Serialize;

/// What the observation pin shows for one UART write
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UartWrite {
  pub addr: u32,
  pub data: u32,
}

impl UartWrite {
  pub fn byte(&self) -> u8 {
    self.data as u8
  }
}

/// The UART completes its handshake like any target but never drives read
/// data; writes are forwarded to the harness through `tx`.
pub struct Uart {
  name: String,
  pub req: Wire<BusReq>,
  pub resp: Wire<u32>,
  pub tx: Wire<UartWrite>,
  written: u64,
}

impl Uart {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      req: Wire::default(),
      resp: Wire::default(),
      tx: Wire::default(),
      written: 0,
    }
  }

  pub fn written(&self) -> u64 {
    self.written
  }
}

impl Module for Uart {
  fn run(&mut self) {
    match self.req.take() {
      Some(req) => {
        if req.write {
          self.tx.set(UartWrite {
            addr: req.addr,
            data: req.wdata,
          });
          self.written += 1;
        } else {
          self.tx.clear();
        }
        self.resp.set(0);
      }
      None => {
        self.tx.clear();
        self.resp.clear();
      }
    }
  }

  fn reset(&mut self) {
    self.req = Wire::default();
    self.resp = Wire::default();
    self.tx = Wire::default();
    self.written = 0;
  }

  fn name(&self) -> &str {
    &self.name
  }
}
