pub mod activity;
pub mod admission;
pub mod capacity;
pub mod code;
pub mod contact;
pub mod cpi;
pub mod math;
pub mod settlement;

pub use activity::*;
pub use admission::*;
pub use capacity::*;
pub use code::*;
pub use contact::*;
pub use cpi::*;
pub use math::*;
pub use settlement::*;
