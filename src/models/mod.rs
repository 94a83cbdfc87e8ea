pub mod appliance;
pub mod enums;

pub use appliance::*;
pub use enums::*;
