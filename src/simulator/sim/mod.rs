pub mod console;
pub mod mode;
pub mod shell;
