pub mod api;
pub mod auth;
pub mod batch;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod preview;
pub mod submit;
pub mod template;
pub mod transform;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{BotError, BotResult};
pub use template::TemplateName;
