//! [`Query`] collection related to logistics [`Task`]s.

use common::operations::By;

use crate::domain::{logistics::Task, order};
#[cfg(doc)]
use crate::{domain::Order, Query};

use super::DatabaseQuery;

/// Queries logistics [`Task`]s of an [`Order`] in their scheduling order.
pub type TasksOfOrder = DatabaseQuery<By<Vec<Task>, order::Id>>;
