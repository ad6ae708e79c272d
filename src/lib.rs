pub mod console;
pub mod fault;
pub mod memory;
pub mod operand;
pub mod processor;
pub mod register;
pub mod stack;
