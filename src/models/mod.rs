//! Data models shared with the quoting backend.
//!
//! Field names follow the backend's JSON (snake_case) so records pass through
//! the console without renaming.

mod account;
mod company;
mod customer;
mod menu;
mod role;

pub use account::*;
pub use company::*;
pub use customer::*;
pub use menu::*;
pub use role::*;
