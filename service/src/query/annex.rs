//! [`Query`] collection related to [`Annex`]es.

use common::operations::By;

use crate::domain::{extension, Annex};
#[cfg(doc)]
use crate::{domain::Extension, Query};

use super::DatabaseQuery;

/// Queries the [`Annex`] of an [`Extension`].
pub type OfExtension = DatabaseQuery<By<Option<Annex>, extension::Id>>;
