#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use freefall_scale as scale;

#[doc(inline)]
pub use freefall_io as io;
