//! [`Order`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{By, Insert, Lock, Select},
    Money,
};
use itertools::Itertools as _;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{device, order, user, Order},
    infra::{
        database::{
            self,
            postgres::{self, Connection},
            Postgres,
        },
        Database,
    },
};

impl<C, IDs> Database<Select<By<HashMap<order::Id, Order>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[order::Id]>,
{
    type Ok = HashMap<order::Id, Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<order::Id, Order>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[order::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const ORDERS_SQL: &str = "\
            SELECT id, customer_id, currency, status, \
                   start_at, end_at, started_at, ended_at, \
                   return_confirmed_at, created_at \
            FROM orders \
            WHERE id = ANY($1::UUID[])";
        const LINES_SQL: &str = "\
            SELECT order_id, model_id, quantity, \
                   price_per_day, deposit_per_unit \
            FROM order_lines \
            WHERE order_id = ANY($1::UUID[]) \
            ORDER BY order_id, position";
        const DEVICES_SQL: &str = "\
            SELECT order_id, device_id \
            FROM order_devices \
            WHERE order_id = ANY($1::UUID[]) \
            ORDER BY order_id, position";
        let orders = self
            .query(ORDERS_SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?;
        let lines = self
            .query(LINES_SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?;
        let devices = self
            .query(DEVICES_SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?;

        assemble(&orders, &lines, &devices)
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

/// Assembles [`Order`]s out of their own, [`order::Detail`]s' and allocated
/// [`device::Id`]s' [`Row`]s.
fn assemble(
    orders: &[Row],
    lines: &[Row],
    devices: &[Row],
) -> Result<HashMap<order::Id, Order>, postgres::connection::Error> {
    let mut orders = orders
        .iter()
        .map(|row| {
            Ok::<_, postgres::connection::Error>(Order {
                id: row.try_get("id")?,
                customer_id: row.try_get("customer_id")?,
                currency: row.try_get("currency")?,
                details: vec![],
                status: row.try_get("status")?,
                start_at: row.try_get("start_at")?,
                end_at: row.try_get("end_at")?,
                started_at: row.try_get("started_at")?,
                ended_at: row.try_get("ended_at")?,
                return_confirmed_at: row.try_get("return_confirmed_at")?,
                devices: vec![],
                created_at: row.try_get("created_at")?,
            })
        })
        .map_ok(|o| (o.id, o))
        .collect::<Result<HashMap<_, _>, _>>()?;

    for row in lines {
        let order_id: order::Id = row.try_get("order_id")?;
        let Some(order) = orders.get_mut(&order_id) else {
            continue;
        };
        order.details.push(order::Detail {
            model_id: row.try_get("model_id")?,
            quantity: row.try_get("quantity")?,
            price_per_day: Money {
                amount: row.try_get("price_per_day")?,
                currency: order.currency,
            },
            deposit_per_unit: Money {
                amount: row.try_get("deposit_per_unit")?,
                currency: order.currency,
            },
        });
    }
    for row in devices {
        let order_id: order::Id = row.try_get("order_id")?;
        if let Some(order) = orders.get_mut(&order_id) {
            order.devices.push(row.try_get("device_id")?);
        }
    }
    Ok(orders)
}

impl<C> Database<Select<By<Option<Order>, order::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<order::Id, Order>, [order::Id; 1]>>,
        Ok = HashMap<order::Id, Order>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Order>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Select<By<Vec<Order>, user::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<order::Id, Order>, Vec<order::Id>>>,
        Ok = HashMap<order::Id, Order>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Order>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let customer_id: user::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM orders \
            WHERE customer_id = $1::UUID \
            ORDER BY created_at DESC";
        let ids = self
            .query(SQL, &[&customer_id])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| row.try_get("id"))
            .collect::<Result<Vec<order::Id>, _>>()
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)?;

        let mut orders = self
            .execute(Select(By::new(ids.clone())))
            .await
            .map_err(tracerr::wrap!())?;
        Ok(ids.iter().filter_map(|id| orders.remove(id)).collect())
    }
}

impl<C> Database<Insert<Order>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(order): Insert<Order>,
    ) -> Result<Self::Ok, Self::Err> {
        let Order {
            id,
            customer_id,
            currency,
            details,
            status,
            start_at,
            end_at,
            started_at,
            ended_at,
            return_confirmed_at,
            devices,
            created_at,
        } = order;

        const SQL: &str = "\
            INSERT INTO orders (\
                id, customer_id, currency, status, \
                start_at, end_at, started_at, ended_at, \
                return_confirmed_at, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::INT2, $4::INT2, \
                $5::TIMESTAMPTZ, $6::TIMESTAMPTZ, \
                $7::TIMESTAMPTZ, $8::TIMESTAMPTZ, \
                $9::TIMESTAMPTZ, $10::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                end_at = EXCLUDED.end_at, \
                started_at = EXCLUDED.started_at, \
                ended_at = EXCLUDED.ended_at, \
                return_confirmed_at = EXCLUDED.return_confirmed_at";
        self.exec(
            SQL,
            &[
                &id,
                &customer_id,
                &currency,
                &status,
                &start_at,
                &end_at,
                &started_at,
                &ended_at,
                &return_confirmed_at,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())?;

        let (models, quantities, prices, deposits): (
            Vec<device::ModelId>,
            Vec<order::Quantity>,
            Vec<i64>,
            Vec<i64>,
        ) = details
            .into_iter()
            .map(|d| {
                (
                    d.model_id,
                    d.quantity,
                    d.price_per_day.amount,
                    d.deposit_per_unit.amount,
                )
            })
            .multiunzip();

        // Lines are immutable once placed.
        const LINES_SQL: &str = "\
            INSERT INTO order_lines (\
                order_id, position, model_id, quantity, \
                price_per_day, deposit_per_unit\
            ) \
            SELECT $1::UUID, l.position::INT2, l.model_id, l.quantity, \
                   l.price_per_day, l.deposit_per_unit \
            FROM unnest(\
                $2::UUID[], $3::INT4[], $4::INT8[], $5::INT8[]\
            ) WITH ORDINALITY \
              AS l(model_id, quantity, price_per_day, deposit_per_unit, \
                   position) \
            ON CONFLICT (order_id, position) DO NOTHING";
        self.exec(LINES_SQL, &[&id, &models, &quantities, &prices, &deposits])
            .await
            .map_err(tracerr::wrap!())?;

        const DEVICES_SQL: &str = "\
            INSERT INTO order_devices (order_id, position, device_id) \
            SELECT $1::UUID, d.position::INT2, d.device_id \
            FROM unnest($2::UUID[]) WITH ORDINALITY AS d(device_id, position) \
            ON CONFLICT (order_id, device_id) DO NOTHING";
        self.exec(DEVICES_SQL, &[&id, &devices])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Order, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Order, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: order::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO orders_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
