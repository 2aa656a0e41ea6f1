pub mod agent;
pub mod changelog;
pub mod config;
pub mod dns;
pub mod error;
pub mod ip;
pub mod secrets;

pub use error::{AgentError, LogIoError, ProviderError, ResolutionError};
