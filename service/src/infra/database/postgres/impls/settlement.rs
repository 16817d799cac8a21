//! [`Settlement`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Lock, Select},
    Money,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{order, settlement, Settlement},
    infra::{
        database::{
            self,
            postgres::{self, Connection},
            Postgres,
        },
        Database,
    },
};

use super::{decode_opt, FromRow};

impl FromRow for Settlement {
    fn from_row(row: &Row) -> Result<Self, postgres::connection::Error> {
        let currency = row.try_get("currency")?;
        let money = |column: &str| {
            Ok::<_, postgres::connection::Error>(Money {
                amount: row.try_get(column)?,
                currency,
            })
        };
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            total_deposit: money("total_deposit")?,
            fees: settlement::Fees {
                damage: money("damage_fee")?,
                late: money("late_fee")?,
                accessory: money("accessory_fee")?,
            },
            final_return_amount: money("final_return_amount")?,
            state: row.try_get("state")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            closed_at: row.try_get("closed_at")?,
        })
    }
}

/// Columns of a [`Settlement`] row.
const COLUMNS: &str = "\
    id, order_id, currency, total_deposit, \
    damage_fee, late_fee, accessory_fee, \
    final_return_amount, state, \
    created_at, updated_at, closed_at";

impl<C> Database<Select<By<Option<Settlement>, settlement::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Settlement>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Settlement>, settlement::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: settlement::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM settlements \
             WHERE id = $1::UUID",
        );
        let row = self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?;
        decode_opt(row.as_ref())
    }
}

impl<C> Database<Select<By<Option<Settlement>, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Settlement>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Settlement>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let order_id: order::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM settlements \
             WHERE order_id = $1::UUID",
        );
        let row = self
            .query_opt(&sql, &[&order_id])
            .await
            .map_err(tracerr::wrap!())?;
        decode_opt(row.as_ref())
    }
}

impl<C> Database<Insert<Settlement>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(settlement): Insert<Settlement>,
    ) -> Result<Self::Ok, Self::Err> {
        let Settlement {
            id,
            order_id,
            total_deposit,
            fees,
            final_return_amount,
            state,
            created_at,
            updated_at,
            closed_at,
        } = settlement;

        const SQL: &str = "\
            INSERT INTO settlements (\
                id, order_id, currency, total_deposit, \
                damage_fee, late_fee, accessory_fee, \
                final_return_amount, state, \
                created_at, updated_at, closed_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::INT2, $4::INT8, \
                $5::INT8, $6::INT8, $7::INT8, \
                $8::INT8, $9::INT2, \
                $10::TIMESTAMPTZ, $11::TIMESTAMPTZ, $12::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET damage_fee = EXCLUDED.damage_fee, \
                late_fee = EXCLUDED.late_fee, \
                accessory_fee = EXCLUDED.accessory_fee, \
                final_return_amount = EXCLUDED.final_return_amount, \
                state = EXCLUDED.state, \
                updated_at = EXCLUDED.updated_at, \
                closed_at = EXCLUDED.closed_at";
        self.exec(
            SQL,
            &[
                &id,
                &order_id,
                &total_deposit.currency,
                &total_deposit.amount,
                &fees.damage.amount,
                &fees.late.amount,
                &fees.accessory.amount,
                &final_return_amount.amount,
                &state,
                &created_at,
                &updated_at,
                &closed_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Settlement, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Settlement, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let order_id: order::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO settlements_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (order_id) DO UPDATE SET order_id = EXCLUDED.order_id";
        self.exec(SQL, &[&order_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
