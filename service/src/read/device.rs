//! [`Device`] read model definition.

#[cfg(doc)]
use crate::domain::{Device, Order};

/// Wrapper around a [`Device`] indicating that it's not allocated to any
/// [`Order`] in progress, so may be allocated to a new one.
#[derive(Clone, Debug)]
pub struct Available<T>(pub T);
