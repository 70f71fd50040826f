#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// COLMAP pose reader module.
pub mod colmap;
