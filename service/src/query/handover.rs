//! [`Query`] collection related to handover [`Report`]s.

use common::operations::By;

use crate::domain::{handover::Report, order};
#[cfg(doc)]
use crate::{domain::Order, Query};

use super::DatabaseQuery;

/// Queries [`Report`]s of an [`Order`] in their creation order.
pub type ReportsOfOrder = DatabaseQuery<By<Vec<Report>, order::Id>>;
