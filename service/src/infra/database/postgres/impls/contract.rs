//! [`Contract`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{contract, order, signature::Role, Contract},
    infra::{
        database::{
            self,
            postgres::{self, Connection},
            Postgres,
        },
        Database,
    },
};

use super::{decode_opt, decode_signature, signature_columns, FromRow};

impl FromRow for Contract {
    fn from_row(row: &Row) -> Result<Self, postgres::connection::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            status: row.try_get("status")?,
            terms: row.try_get("terms")?,
            signature: decode_signature(row, "customer", Role::Customer)?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl<C> Database<Select<By<Option<Contract>, contract::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: contract::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, order_id, status, terms, \
                   customer_signer_id, customer_signature, \
                   customer_signed_at, \
                   created_at \
            FROM contracts \
            WHERE id = $1::UUID";
        let row = self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?;
        decode_opt(row.as_ref())
    }
}

impl<C> Database<Select<By<Option<Contract>, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let order_id: order::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, order_id, status, terms, \
                   customer_signer_id, customer_signature, \
                   customer_signed_at, \
                   created_at \
            FROM contracts \
            WHERE order_id = $1::UUID \
            ORDER BY created_at DESC \
            LIMIT 1";
        let row = self
            .query_opt(SQL, &[&order_id])
            .await
            .map_err(tracerr::wrap!())?;
        decode_opt(row.as_ref())
    }
}

impl<C> Database<Insert<Contract>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(contract): Insert<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        let Contract {
            id,
            order_id,
            status,
            terms,
            signature,
            created_at,
        } = contract;
        let (signer_id, blob, signed_at) =
            signature_columns(signature.as_ref());

        const SQL: &str = "\
            INSERT INTO contracts (\
                id, order_id, status, terms, \
                customer_signer_id, customer_signature, \
                customer_signed_at, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::INT2, $4::TEXT, \
                $5::UUID, $6::TEXT, $7::TIMESTAMPTZ, \
                $8::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                customer_signer_id = EXCLUDED.customer_signer_id, \
                customer_signature = EXCLUDED.customer_signature, \
                customer_signed_at = EXCLUDED.customer_signed_at";
        self.exec(
            SQL,
            &[
                &id,
                &order_id,
                &status,
                &terms,
                &signer_id,
                &blob,
                &signed_at,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Contract, contract::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Contract, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: contract::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO contracts_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
