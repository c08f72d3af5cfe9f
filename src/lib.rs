//! Forum curator: greenlights community suggestions by reaction sentiment.

pub mod command;
pub mod config;
pub mod curator;
pub mod error;
pub mod metrics;
pub mod platform;
pub mod scheduler;
pub mod store;

#[cfg(test)]
mod testing;
