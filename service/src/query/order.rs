//! [`Query`] collection related to [`Order`]s.

use common::operations::By;

use crate::domain::{order, user, Order};
#[cfg(doc)]
use crate::{domain::User, Query};

use super::DatabaseQuery;

/// Queries an [`Order`] by its [`order::Id`].
pub type ById = DatabaseQuery<By<Option<Order>, order::Id>>;

/// Queries [`Order`]s of a customer [`User`], the most recent first.
pub type OfCustomer = DatabaseQuery<By<Vec<Order>, user::Id>>;
