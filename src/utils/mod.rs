//! Shared helpers: subprocess execution and message formatting.

pub mod exec;
mod plural;

pub use plural::plural_count;
