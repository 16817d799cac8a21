//! [`Query`] collection related to [`Settlement`]s.

use common::operations::By;

use crate::domain::{order, Settlement};
#[cfg(doc)]
use crate::{domain::Order, Query};

use super::DatabaseQuery;

/// Queries the [`Settlement`] of an [`Order`].
pub type OfOrder = DatabaseQuery<By<Option<Settlement>, order::Id>>;
