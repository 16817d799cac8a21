//! [`Device`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{By, Lock, Select},
    Money,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{device, Device},
    infra::{
        database::{
            self,
            postgres::{self, Connection},
            Postgres,
        },
        Database,
    },
    read::device::Available,
};

use super::{decode, decode_opt, FromRow};

impl FromRow for Device {
    fn from_row(row: &Row) -> Result<Self, postgres::connection::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            model_id: row.try_get("model_id")?,
            serial_number: row.try_get("serial_number")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl FromRow for device::Model {
    fn from_row(row: &Row) -> Result<Self, postgres::connection::Error> {
        let currency = row.try_get("currency")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            price_per_day: Money {
                amount: row.try_get("price_per_day")?,
                currency,
            },
            value: Money {
                amount: row.try_get("value")?,
                currency,
            },
            deposit_percent: row.try_get("deposit_percent")?,
        })
    }
}

impl<C> Database<Select<By<Option<Device>, device::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Device>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Device>, device::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: device::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, model_id, serial_number, created_at \
            FROM devices \
            WHERE id = $1::UUID";
        let row = self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?;
        decode_opt(row.as_ref())
    }
}

impl<C, IDs> Database<Select<By<HashMap<device::ModelId, device::Model>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[device::ModelId]>,
{
    type Ok = HashMap<device::ModelId, device::Model>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<HashMap<device::ModelId, device::Model>, IDs>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[device::ModelId] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, name, currency, \
                   price_per_day, value, deposit_percent \
            FROM device_models \
            WHERE id = ANY($1::UUID[])";
        let rows = self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?;
        Ok(decode::<device::Model>(&rows)?
            .into_iter()
            .map(|m| (m.id, m))
            .collect())
    }
}

impl<C> Database<Lock<By<device::Model, device::ModelId>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<device::Model, device::ModelId>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: device::ModelId = by.into_inner();

        const SQL: &str = "\
            INSERT INTO device_models_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<Vec<Available<Device>>, device::ModelId>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Available<Device>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Available<Device>>, device::ModelId>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let model_id: device::ModelId = by.into_inner();

        // Statuses 5 and 6 are `Completed` and `Cancelled` respectively.
        const SQL: &str = "\
            SELECT d.id, d.model_id, d.serial_number, d.created_at \
            FROM devices AS d \
            WHERE d.model_id = $1::UUID \
              AND NOT EXISTS (\
                  SELECT 1 \
                  FROM order_devices AS od \
                  INNER JOIN orders AS o ON o.id = od.order_id \
                  WHERE od.device_id = d.id \
                    AND o.status NOT IN (5, 6)\
              ) \
            ORDER BY d.id";
        let rows = self
            .query(SQL, &[&model_id])
            .await
            .map_err(tracerr::wrap!())?;
        Ok(decode::<Device>(&rows)?.into_iter().map(Available).collect())
    }
}
