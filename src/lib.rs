pub mod auth;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod profile;

pub use error::BootstrapError;

#[cfg(test)]
pub mod testing;
