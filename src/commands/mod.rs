//! CLI command handlers.

mod cookies;
mod expires;

pub use cookies::run_cookie_command;
pub use expires::run_expires_command;
