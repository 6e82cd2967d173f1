/// Resistive in-memory-compute: crossbar models and their register controller
pub mod controller;
pub mod crossbar;
pub mod nonlinear;

pub use controller::ImcController;
pub use crossbar::{Crossbar, ExactCrossbar, CELLS, DIM};
pub use nonlinear::{DeviceParams, NonlinearCrossbar};
