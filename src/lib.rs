pub mod builtin;
pub mod bus;
pub mod config;
pub mod error;
pub mod host;
pub mod imc;
pub mod memdomain;
pub mod npu;
pub mod periph;
pub mod simulator;
pub mod top;

pub use error::{Result, SimError};
pub use top::{TickOutput, Top};
