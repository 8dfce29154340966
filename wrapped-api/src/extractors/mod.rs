//! Custom request extractors.

pub mod account_path;

pub use account_path::AccountPath;
