//! [`handover::Report`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select};
use itertools::Itertools as _;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{device, handover, order, signature::Role},
    infra::{
        database::{
            self,
            postgres::{self, Connection},
            Postgres,
        },
        Database,
    },
};

use super::{decode, decode_signature, signature_columns, FromRow};

impl FromRow for handover::Report {
    fn from_row(row: &Row) -> Result<Self, postgres::connection::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            phase: row.try_get("phase")?,
            status: row.try_get("status")?,
            observations: vec![],
            staff_signature: decode_signature(row, "staff", Role::Staff)?,
            customer_signature: decode_signature(
                row,
                "customer",
                Role::Customer,
            )?,
            created_at: row.try_get("created_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }
}

impl FromRow for (handover::Id, handover::Observation) {
    fn from_row(row: &Row) -> Result<Self, postgres::connection::Error> {
        Ok((
            row.try_get("report_id")?,
            handover::Observation {
                device_id: row.try_get("device_id")?,
                condition: row.try_get("condition")?,
                note: row.try_get("note")?,
            },
        ))
    }
}

/// Columns of a [`handover::Report`] row.
const COLUMNS: &str = "\
    id, order_id, phase, status, \
    staff_signer_id, staff_signature, staff_signed_at, \
    customer_signer_id, customer_signature, customer_signed_at, \
    created_at, completed_at";

/// Decodes the provided [`handover::Report`] rows, loading their
/// [`handover::Observation`]s.
async fn load<C: Connection>(
    db: &Postgres<C>,
    rows: &[Row],
) -> Result<Vec<handover::Report>, Traced<database::Error>> {
    let mut reports = decode::<handover::Report>(rows)?;
    if reports.is_empty() {
        return Ok(reports);
    }
    let ids = reports.iter().map(|r| r.id).collect::<Vec<_>>();

    const SQL: &str = "\
        SELECT report_id, device_id, condition, note \
        FROM handover_observations \
        WHERE report_id = ANY($1::UUID[]) \
        ORDER BY report_id, position";
    let rows = db.query(SQL, &[&ids]).await.map_err(tracerr::wrap!())?;
    let mut observations: HashMap<_, Vec<_>> =
        decode::<(handover::Id, handover::Observation)>(&rows)?
            .into_iter()
            .into_group_map();

    for r in &mut reports {
        r.observations = observations.remove(&r.id).unwrap_or_default();
    }
    Ok(reports)
}

impl<C> Database<Select<By<Option<handover::Report>, handover::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<handover::Report>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<handover::Report>, handover::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: handover::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM handover_reports \
             WHERE id = $1::UUID",
        );
        let rows = self
            .query(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?;
        Ok(load(self, &rows).await?.pop())
    }
}

impl<C> Database<Select<By<Vec<handover::Report>, order::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<handover::Report>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<handover::Report>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let order_id: order::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM handover_reports \
             WHERE order_id = $1::UUID \
             ORDER BY created_at",
        );
        let rows = self
            .query(&sql, &[&order_id])
            .await
            .map_err(tracerr::wrap!())?;
        load(self, &rows).await
    }
}

impl<C> Database<Insert<handover::Report>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(report): Insert<handover::Report>,
    ) -> Result<Self::Ok, Self::Err> {
        let handover::Report {
            id,
            order_id,
            phase,
            status,
            observations,
            staff_signature,
            customer_signature,
            created_at,
            completed_at,
        } = report;
        let (staff_id, staff_blob, staff_at) =
            signature_columns(staff_signature.as_ref());
        let (customer_id, customer_blob, customer_at) =
            signature_columns(customer_signature.as_ref());

        const SQL: &str = "\
            INSERT INTO handover_reports (\
                id, order_id, phase, status, \
                staff_signer_id, staff_signature, staff_signed_at, \
                customer_signer_id, customer_signature, customer_signed_at, \
                created_at, completed_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::INT2, $4::INT2, \
                $5::UUID, $6::TEXT, $7::TIMESTAMPTZ, \
                $8::UUID, $9::TEXT, $10::TIMESTAMPTZ, \
                $11::TIMESTAMPTZ, $12::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                staff_signer_id = EXCLUDED.staff_signer_id, \
                staff_signature = EXCLUDED.staff_signature, \
                staff_signed_at = EXCLUDED.staff_signed_at, \
                customer_signer_id = EXCLUDED.customer_signer_id, \
                customer_signature = EXCLUDED.customer_signature, \
                customer_signed_at = EXCLUDED.customer_signed_at, \
                completed_at = EXCLUDED.completed_at";
        self.exec(
            SQL,
            &[
                &id,
                &order_id,
                &phase,
                &status,
                &staff_id,
                &staff_blob,
                &staff_at,
                &customer_id,
                &customer_blob,
                &customer_at,
                &created_at,
                &completed_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())?;

        let (devices, conditions, notes): (
            Vec<device::Id>,
            Vec<handover::Condition>,
            Vec<Option<handover::Note>>,
        ) = observations
            .into_iter()
            .map(|o| (o.device_id, o.condition, o.note))
            .multiunzip();

        // Observations are immutable once recorded.
        const OBSERVATIONS_SQL: &str = "\
            INSERT INTO handover_observations (\
                report_id, position, device_id, condition, note\
            ) \
            SELECT $1::UUID, o.position::INT2, \
                   o.device_id, o.condition, o.note \
            FROM unnest($2::UUID[], $3::INT2[], $4::TEXT[]) WITH ORDINALITY \
              AS o(device_id, condition, note, position) \
            ON CONFLICT (report_id, position) DO NOTHING";
        self.exec(OBSERVATIONS_SQL, &[&id, &devices, &conditions, &notes])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<handover::Report, handover::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<handover::Report, handover::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: handover::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO handover_reports_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
