//! [`Extension`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Lock, Select},
    Money,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{extension, order, Extension},
    infra::{
        database::{
            self,
            postgres::{self, Connection},
            Postgres,
        },
        Database,
    },
};

use super::{decode, decode_opt, FromRow};

impl FromRow for Extension {
    fn from_row(row: &Row) -> Result<Self, postgres::connection::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            annex_id: row.try_get("annex_id")?,
            previous_end_at: row.try_get("previous_end_at")?,
            new_end_at: row.try_get("new_end_at")?,
            additional_price: Money {
                amount: row.try_get("additional_price")?,
                currency: row.try_get("currency")?,
            },
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            paid_at: row.try_get("paid_at")?,
        })
    }
}

/// Columns of an [`Extension`] row.
const COLUMNS: &str = "\
    id, order_id, annex_id, \
    previous_end_at, new_end_at, \
    additional_price, currency, status, \
    created_at, paid_at";

impl<C> Database<Select<By<Option<Extension>, extension::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Extension>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Extension>, extension::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: extension::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM extensions \
             WHERE id = $1::UUID",
        );
        let row = self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?;
        decode_opt(row.as_ref())
    }
}

impl<C> Database<Select<By<Vec<Extension>, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Extension>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Extension>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let order_id: order::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM extensions \
             WHERE order_id = $1::UUID \
             ORDER BY created_at",
        );
        let rows = self
            .query(&sql, &[&order_id])
            .await
            .map_err(tracerr::wrap!())?;
        decode(&rows)
    }
}

impl<C> Database<Insert<Extension>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(extension): Insert<Extension>,
    ) -> Result<Self::Ok, Self::Err> {
        let Extension {
            id,
            order_id,
            annex_id,
            previous_end_at,
            new_end_at,
            additional_price,
            status,
            created_at,
            paid_at,
        } = extension;

        const SQL: &str = "\
            INSERT INTO extensions (\
                id, order_id, annex_id, \
                previous_end_at, new_end_at, \
                additional_price, currency, status, \
                created_at, paid_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::TIMESTAMPTZ, $5::TIMESTAMPTZ, \
                $6::INT8, $7::INT2, $8::INT2, \
                $9::TIMESTAMPTZ, $10::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                paid_at = EXCLUDED.paid_at";
        self.exec(
            SQL,
            &[
                &id,
                &order_id,
                &annex_id,
                &previous_end_at,
                &new_end_at,
                &additional_price.amount,
                &additional_price.currency,
                &status,
                &created_at,
                &paid_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Extension, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Extension, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let order_id: order::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO extensions_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (order_id) DO UPDATE SET order_id = EXCLUDED.order_id";
        self.exec(SQL, &[&order_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
