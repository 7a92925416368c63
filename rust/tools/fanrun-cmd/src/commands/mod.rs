//! Command implementations for fanrun-cmd

pub mod notify;
pub mod stream;
