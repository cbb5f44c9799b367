//! Wire and storage models shared by the client library and the CLI.

mod auth;
mod errors;
mod user;

pub use auth::*;
pub use errors::*;
pub use user::*;
