//! Database initialisation and schema

pub mod init;

pub use init::*;
