//! [`Query`] collection related to [`Extension`]s.

use common::operations::By;

use crate::domain::{order, Extension};
#[cfg(doc)]
use crate::{domain::Order, Query};

use super::DatabaseQuery;

/// Queries [`Extension`]s of an [`Order`] in their request order.
pub type OfOrder = DatabaseQuery<By<Vec<Extension>, order::Id>>;
