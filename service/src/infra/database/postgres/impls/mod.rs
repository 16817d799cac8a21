//! [`Database`] implementations.

#![allow(
    clippy::items_after_statements,
    reason = "`const SQL` after statements"
)]
#![allow(clippy::too_many_lines, reason = "SQL-related code a bit verbose")]

mod annex;
mod complaint;
mod contract;
mod device;
mod extension;
mod handover;
mod logistics;
mod order;
mod settlement;
mod signature;
mod user;

use async_trait::async_trait;
use common::operations::{Commit, Transact};
use refinery_core::{
    traits::r#async::{AsyncQuery, AsyncTransaction},
    AsyncMigrate, Migration,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        signature::{Blob, Role, Signature, SigningDateTime},
        user::Id as UserId,
    },
    infra::{database, postgres, Database},
};

use super::{NonTx, Postgres, Tx};

impl Database<Transact> for Postgres<NonTx> {
    type Ok = Postgres<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Postgres(Tx::from_non_tx(self.0.clone())))
    }
}

impl Database<Transact> for Postgres<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Postgres<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.commit().await.map_err(tracerr::wrap!())
    }
}

#[async_trait]
impl AsyncTransaction for Postgres {
    type Error = Traced<database::Error>;

    async fn execute(
        &mut self,
        queries: &[&str],
    ) -> Result<usize, Self::Error> {
        let mut conn = self
            .0
            .pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)?;
        AsyncTransaction::execute(&mut **conn, queries)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

#[async_trait]
impl AsyncQuery<Vec<Migration>> for Postgres {
    async fn query(
        &mut self,
        query: &str,
    ) -> Result<Vec<Migration>, <Self as AsyncTransaction>::Error> {
        let mut conn = self
            .0
            .pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)?;
        AsyncQuery::query(&mut **conn, query)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

impl AsyncMigrate for Postgres {}

/// Typed decoding of a [`Row`] into an entity.
///
/// Fails on any column missing or mistyped.
trait FromRow: Sized {
    /// Decodes the provided [`Row`].
    fn from_row(row: &Row) -> Result<Self, postgres::connection::Error>;
}

/// Decodes all the provided [`Row`]s.
fn decode<T: FromRow>(rows: &[Row]) -> Result<Vec<T>, Traced<database::Error>> {
    rows.iter()
        .map(T::from_row)
        .collect::<Result<_, _>>()
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
}

/// Decodes a single [`Row`], if any.
fn decode_opt<T: FromRow>(
    row: Option<&Row>,
) -> Result<Option<T>, Traced<database::Error>> {
    row.map(T::from_row)
        .transpose()
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
}

/// Decodes a [`Signature`] given in the provided [`Role`] out of the
/// `{party}_signer_id`, `{party}_signature` and `{party}_signed_at` columns.
fn decode_signature(
    row: &Row,
    party: &str,
    role: Role,
) -> Result<Option<Signature>, postgres::connection::Error> {
    let Some(signer_id) =
        row.try_get(format!("{party}_signer_id").as_str())?
    else {
        return Ok(None);
    };
    Ok(Some(Signature {
        role,
        signer_id,
        blob: row.try_get(format!("{party}_signature").as_str())?,
        signed_at: row.try_get(format!("{party}_signed_at").as_str())?,
    }))
}

/// Splits the provided [`Signature`] into its `{party}_signer_id`,
/// `{party}_signature` and `{party}_signed_at` column values.
fn signature_columns(
    signature: Option<&Signature>,
) -> (
    Option<UserId>,
    Option<&Blob>,
    Option<SigningDateTime>,
) {
    (
        signature.map(|s| s.signer_id),
        signature.map(|s| &s.blob),
        signature.map(|s| s.signed_at),
    )
}
