pub mod portfolio;
pub mod returns;

pub use portfolio::*;
pub use returns::*;
