pub mod descriptor;
pub mod memory;
pub mod order;
