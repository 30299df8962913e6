pub mod facade;
pub mod file;
pub mod memory;
pub mod storage;

pub use facade::*;
pub use file::*;
pub use memory::*;
pub use storage::*;
