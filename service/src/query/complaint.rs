//! [`Query`] collection related to [`Complaint`]s.

use common::operations::By;

use crate::domain::{complaint, order, Complaint};
#[cfg(doc)]
use crate::{domain::Order, Query};

use super::DatabaseQuery;

/// Queries a [`Complaint`] by its [`complaint::Id`].
pub type ById = DatabaseQuery<By<Option<Complaint>, complaint::Id>>;

/// Queries [`Complaint`]s about [`Device`]s of an [`Order`].
///
/// [`Device`]: crate::domain::Device
pub type OfOrder = DatabaseQuery<By<Vec<Complaint>, order::Id>>;
