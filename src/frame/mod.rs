pub mod compression;
pub mod padder;

pub use compression::*;
pub use padder::*;
