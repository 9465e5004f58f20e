pub mod availability;
pub mod lifecycle;
pub mod scheduling;
pub mod statistics;

pub use availability::*;
pub use lifecycle::*;
pub use scheduling::*;
pub use statistics::*;
