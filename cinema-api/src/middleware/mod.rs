pub mod auth;

pub use auth::{identify_caller, Caller, Claims, Role};
