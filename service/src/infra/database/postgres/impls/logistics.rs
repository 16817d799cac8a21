//! [`logistics::Task`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{logistics, order},
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

impl FromRow for logistics::Task {
    fn from_row(row: &Row) -> Result<Self, postgres::connection::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            category: row.try_get("category")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl<C> Database<Select<By<Option<logistics::Task>, logistics::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<logistics::Task>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<logistics::Task>, logistics::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: logistics::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, order_id, category, status, \
                   created_at, updated_at \
            FROM logistics_tasks \
            WHERE id = $1::UUID";
        let row = self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?;
        decode_opt(row.as_ref())
    }
}

impl<C> Database<Select<By<Vec<logistics::Task>, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<logistics::Task>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<logistics::Task>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let order_id: order::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, order_id, category, status, \
                   created_at, updated_at \
            FROM logistics_tasks \
            WHERE order_id = $1::UUID \
            ORDER BY created_at";
        let rows = self
            .query(SQL, &[&order_id])
            .await
            .map_err(tracerr::wrap!())?;
        decode(&rows)
    }
}

impl<C> Database<Insert<logistics::Task>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(task): Insert<logistics::Task>,
    ) -> Result<Self::Ok, Self::Err> {
        let logistics::Task {
            id,
            order_id,
            category,
            status,
            created_at,
            updated_at,
        } = task;

        const SQL: &str = "\
            INSERT INTO logistics_tasks (\
                id, order_id, category, status, \
                created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::INT2, $4::INT2, \
                $5::TIMESTAMPTZ, $6::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[&id, &order_id, &category, &status, &created_at, &updated_at],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<logistics::Task, logistics::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<logistics::Task, logistics::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: logistics::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO logistics_tasks_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
