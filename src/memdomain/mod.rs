pub mod dual_port;

pub use dual_port::DualPortRam;
