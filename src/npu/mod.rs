/// Digital INT8 NPU: the MAC array and its bus register file
pub mod mac_array;
pub mod regs;

pub use mac_array::{ActivationMode, MacArray, MacUnit, DIM};
pub use regs::Npu;
