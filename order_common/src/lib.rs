//! Small helpers shared by the order engine and the order server.
pub mod helpers;
mod secret;

pub use secret::Secret;
