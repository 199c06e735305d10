//! Command implementations for ota-agent

pub mod bootstrap;
pub mod check;
pub mod fetch;

#[cfg(test)]
pub(crate) mod canned;

pub use bootstrap::bootstrap;
pub use check::check;
pub use fetch::fetch;
