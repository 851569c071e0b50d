pub mod booking;
pub mod enums;
pub mod filters;
pub mod slot;
pub mod template;

pub use booking::*;
pub use filters::*;
pub use slot::*;
pub use template::*;
