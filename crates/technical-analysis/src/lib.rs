pub mod indicators;
pub mod signals;
pub mod analyzer;


pub use indicators::*;
pub use signals::*;
pub use analyzer::*;
