//! [`Annex`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{annex, extension, signature::Role, Annex},
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

impl FromRow for Annex {
    fn from_row(row: &Row) -> Result<Self, postgres::connection::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            extension_id: row.try_get("extension_id")?,
            order_id: row.try_get("order_id")?,
            contract_id: row.try_get("contract_id")?,
            status: row.try_get("status")?,
            terms: row.try_get("terms")?,
            staff_signature: decode_signature(row, "staff", Role::Staff)?,
            customer_signature: decode_signature(
                row,
                "customer",
                Role::Customer,
            )?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Columns of an [`Annex`] row.
const COLUMNS: &str = "\
    id, extension_id, order_id, contract_id, status, terms, \
    staff_signer_id, staff_signature, staff_signed_at, \
    customer_signer_id, customer_signature, customer_signed_at, \
    created_at";

impl<C> Database<Select<By<Option<Annex>, annex::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Annex>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Annex>, annex::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: annex::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM annexes \
             WHERE id = $1::UUID",
        );
        let row = self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?;
        decode_opt(row.as_ref())
    }
}

impl<C> Database<Select<By<Option<Annex>, extension::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Annex>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Annex>, extension::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let extension_id: extension::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM annexes \
             WHERE extension_id = $1::UUID",
        );
        let row = self
            .query_opt(&sql, &[&extension_id])
            .await
            .map_err(tracerr::wrap!())?;
        decode_opt(row.as_ref())
    }
}

impl<C> Database<Insert<Annex>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(annex): Insert<Annex>,
    ) -> Result<Self::Ok, Self::Err> {
        let Annex {
            id,
            extension_id,
            order_id,
            contract_id,
            status,
            terms,
            staff_signature,
            customer_signature,
            created_at,
        } = annex;
        let (staff_id, staff_blob, staff_at) =
            signature_columns(staff_signature.as_ref());
        let (customer_id, customer_blob, customer_at) =
            signature_columns(customer_signature.as_ref());

        const SQL: &str = "\
            INSERT INTO annexes (\
                id, extension_id, order_id, contract_id, status, terms, \
                staff_signer_id, staff_signature, staff_signed_at, \
                customer_signer_id, customer_signature, customer_signed_at, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::UUID, $5::INT2, $6::TEXT, \
                $7::UUID, $8::TEXT, $9::TIMESTAMPTZ, \
                $10::UUID, $11::TEXT, $12::TIMESTAMPTZ, \
                $13::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                staff_signer_id = EXCLUDED.staff_signer_id, \
                staff_signature = EXCLUDED.staff_signature, \
                staff_signed_at = EXCLUDED.staff_signed_at, \
                customer_signer_id = EXCLUDED.customer_signer_id, \
                customer_signature = EXCLUDED.customer_signature, \
                customer_signed_at = EXCLUDED.customer_signed_at";
        self.exec(
            SQL,
            &[
                &id,
                &extension_id,
                &order_id,
                &contract_id,
                &status,
                &terms,
                &staff_id,
                &staff_blob,
                &staff_at,
                &customer_id,
                &customer_blob,
                &customer_at,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Annex, annex::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Annex, annex::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: annex::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO annexes_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
