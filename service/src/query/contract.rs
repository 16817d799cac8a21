//! [`Query`] collection related to [`Contract`]s.

use common::operations::By;

use crate::domain::{order, Contract};
#[cfg(doc)]
use crate::{domain::Order, Query};

use super::DatabaseQuery;

/// Queries the latest [`Contract`] of an [`Order`].
pub type OfOrder = DatabaseQuery<By<Option<Contract>, order::Id>>;
