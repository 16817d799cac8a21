//! [`Complaint`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{complaint, order, Complaint},
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

impl FromRow for Complaint {
    fn from_row(row: &Row) -> Result<Self, postgres::connection::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            device_id: row.try_get("device_id")?,
            author_id: row.try_get("author_id")?,
            description: row.try_get("description")?,
            status: row.try_get("status")?,
            resolution: row.try_get("resolution")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Columns of a [`Complaint`] row.
const COLUMNS: &str = "\
    id, order_id, device_id, author_id, \
    description, status, resolution, \
    created_at, updated_at";

impl<C> Database<Select<By<Option<Complaint>, complaint::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Complaint>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Complaint>, complaint::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: complaint::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM complaints \
             WHERE id = $1::UUID",
        );
        let row = self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?;
        decode_opt(row.as_ref())
    }
}

impl<C> Database<Select<By<Vec<Complaint>, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Complaint>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Complaint>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let order_id: order::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM complaints \
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

impl<C> Database<Insert<Complaint>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(complaint): Insert<Complaint>,
    ) -> Result<Self::Ok, Self::Err> {
        let Complaint {
            id,
            order_id,
            device_id,
            author_id,
            description,
            status,
            resolution,
            created_at,
            updated_at,
        } = complaint;

        const SQL: &str = "\
            INSERT INTO complaints (\
                id, order_id, device_id, author_id, \
                description, status, resolution, \
                created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::UUID, \
                $5::TEXT, $6::INT2, $7::TEXT, \
                $8::TIMESTAMPTZ, $9::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                resolution = EXCLUDED.resolution, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &order_id,
                &device_id,
                &author_id,
                &description,
                &status,
                &resolution,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Complaint, complaint::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Complaint, complaint::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: complaint::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO complaints_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
