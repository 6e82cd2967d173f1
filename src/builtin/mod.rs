/// Building blocks shared by every clocked component
pub mod port;

pub use port::Wire;

/// A clocked hardware block.
///
/// `run` is one rising clock edge. A module reads only its own pre-edge state
/// and the input wires driven during the current tick, so the order in which
/// sibling modules run never changes the result.
pub trait Module {
  fn run(&mut self);

  fn reset(&mut self);

  fn name(&self) -> &str;
}
