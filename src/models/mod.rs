pub mod addon;
pub mod catalog;
pub mod playlist;

pub use addon::*;
pub use catalog::*;
pub use playlist::*;
