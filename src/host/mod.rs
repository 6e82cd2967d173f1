/// Host side: a scripted bus master standing in for the processor core, the
/// kernels that drive the accelerators through their register files, and the
/// classifier built on top of them
pub mod host;
pub mod inference;
pub mod kernels;
pub mod mlp;
pub mod program;

pub use host::Host;
pub use inference::{CpuCost, Engine, EngineResult, EngineSummary, ImageResult, InferenceSession};
pub use kernels::{cpu_matvec, imc_matvec, npu_matvec, ImcPlan, NpuPlan};
pub use mlp::{argmax, Inference, Mlp};
pub use program::{BusProgram, HostOp};
