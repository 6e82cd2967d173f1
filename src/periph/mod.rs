/// Small bus peripherals sharing the data bus with the accelerators
pub mod cycle_counter;
pub mod uart;

pub use cycle_counter::CycleCounter;
pub use uart::{Uart, UartWrite};
