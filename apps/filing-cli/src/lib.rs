//! Filing CLI support: configuration loading and file-backed capabilities

pub mod capabilities;
pub mod config;
