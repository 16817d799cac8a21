//! Read entities definitions.

pub mod device;
