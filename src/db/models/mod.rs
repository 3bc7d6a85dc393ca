//! Database models split into domain-specific modules.

pub mod session;
pub mod space;
pub mod stats;
pub mod user;
pub mod vehicle;

pub use session::*;
pub use space::*;
pub use stats::*;
pub use user::*;
pub use vehicle::*;
