/// Tick-driven bus master executing a `BusProgram`
use super::program::{BusProgram, HostOp};
use crate::bus::{BusReq, BusResp};
use log::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HostState {
  Ready,
  /// `age` counts observed ticks since issue
  Waiting { read: bool, age: u8 },
  Idle(u32),
}

/// Issues one request, waits for its valid on the following tick, then moves
/// on. Never has more than one request in flight.
pub struct Host {
  program: BusProgram,
  pc: usize,
  state: HostState,
  reads: Vec<u32>,
  completed: u64,
}

impl Host {
  pub fn new(program: BusProgram) -> Self {
    Self {
      reads: Vec::with_capacity(program.read_count()),
      program,
      pc: 0,
      state: HostState::Ready,
      completed: 0,
    }
  }

  pub fn is_done(&self) -> bool {
    matches!(self.state, HostState::Ready | HostState::Idle(0)) && self.pc >= self.program.len()
  }

  /// Read results so far, in program order
  pub fn reads(&self) -> &[u32] {
    &self.reads
  }

  /// Completed bus transactions
  pub fn completed(&self) -> u64 {
    self.completed
  }

  pub fn pc(&self) -> usize {
    self.pc
  }

  pub fn program(&self) -> &BusProgram {
    &self.program
  }

  /// The request to drive this tick, if any
  pub fn drive(&mut self) -> Option<BusReq> {
    loop {
      match self.state {
        HostState::Waiting { .. } => return None,
        HostState::Idle(0) => self.state = HostState::Ready,
        HostState::Idle(n) => {
          self.state = HostState::Idle(n - 1);
          return None;
        }
        HostState::Ready => {
          let op = *self.program.ops().get(self.pc)?;
          self.pc += 1;
          match op {
            HostOp::Idle(n) => self.state = HostState::Idle(n),
            HostOp::Write { .. } | HostOp::Read { .. } => {
              let req = op.request()?;
              trace!("[host] issue {:?}", req);
              self.state = HostState::Waiting {
                read: !req.write,
                age: 0,
              };
              return Some(req);
            }
          }
        }
      }
    }
  }

  /// Observe the bus at the end of this tick
  pub fn observe(&mut self, resp: &BusResp) {
    if let HostState::Waiting { read, age } = self.state {
      if age == 0 {
        debug_assert!(resp.grant, "[host] request not granted");
        self.state = HostState::Waiting { read, age: 1 };
        return;
      }
      debug_assert!(resp.valid, "[host] no valid one tick after request");
      if resp.valid {
        if read {
          self.reads.push(resp.rdata);
        }
        self.completed += 1;
        self.state = HostState::Ready;
      }
    }
  }
}
