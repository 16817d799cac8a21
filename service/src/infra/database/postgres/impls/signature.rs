//! Signature-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        annex, contract, handover,
        signature::{self, Challenge, Document, Target},
        Annex, Contract,
    },
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

impl FromRow for Challenge {
    fn from_row(row: &Row) -> Result<Self, postgres::connection::Error> {
        Ok(Self {
            target: Target::from_parts(
                row.try_get("target_kind")?,
                row.try_get("target_id")?,
            ),
            role: row.try_get("role")?,
            recipient_id: row.try_get("recipient_id")?,
            pin_hash: row.try_get("pin_hash")?,
            issued_at: row.try_get("issued_at")?,
            consumed_at: row.try_get("consumed_at")?,
        })
    }
}

impl<C> Database<Select<By<Option<Challenge>, (Target, signature::Role)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Challenge>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Challenge>, (Target, signature::Role)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (target, role) = by.into_inner();

        const SQL: &str = "\
            SELECT target_kind, target_id, role, \
                   recipient_id, pin_hash, \
                   issued_at, consumed_at \
            FROM signature_challenges \
            WHERE target_kind = $1::INT2 \
              AND target_id = $2::UUID \
              AND role = $3::INT2";
        let row = self
            .query_opt(SQL, &[&target.kind(), &target.uuid(), &role])
            .await
            .map_err(tracerr::wrap!())?;
        decode_opt(row.as_ref())
    }
}

impl<C> Database<Insert<Challenge>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(challenge): Insert<Challenge>,
    ) -> Result<Self::Ok, Self::Err> {
        let Challenge {
            target,
            role,
            recipient_id,
            pin_hash,
            issued_at,
            consumed_at,
        } = challenge;

        const SQL: &str = "\
            INSERT INTO signature_challenges (\
                target_kind, target_id, role, \
                recipient_id, pin_hash, \
                issued_at, consumed_at\
            ) \
            VALUES (\
                $1::INT2, $2::UUID, $3::INT2, \
                $4::UUID, $5::UUID, \
                $6::TIMESTAMPTZ, $7::TIMESTAMPTZ\
            ) \
            ON CONFLICT (target_kind, target_id, role) DO UPDATE \
            SET recipient_id = EXCLUDED.recipient_id, \
                pin_hash = EXCLUDED.pin_hash, \
                issued_at = EXCLUDED.issued_at, \
                consumed_at = EXCLUDED.consumed_at";
        self.exec(
            SQL,
            &[
                &target.kind(),
                &target.uuid(),
                &role,
                &recipient_id,
                &pin_hash,
                &issued_at,
                &consumed_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<Challenge, signature::ConsumptionDateTime>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Challenge, signature::ConsumptionDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let deadline: signature::ConsumptionDateTime = by.into_inner();

        const SQL: &str = "\
            DELETE FROM signature_challenges \
            WHERE consumed_at < $1::TIMESTAMPTZ";
        self.exec(SQL, &[&deadline])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<Option<Document>, Target>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<handover::Report>, handover::Id>>,
            Ok = Option<handover::Report>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Annex>, annex::Id>>,
            Ok = Option<Annex>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Option<Document>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Document>, Target>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(match by.into_inner() {
            Target::Contract(id) => self
                .execute(Select(By::<Option<Contract>, _>::new(id)))
                .await
                .map_err(tracerr::wrap!())?
                .map(Into::into),
            Target::HandoverReport(id) => self
                .execute(Select(By::<Option<handover::Report>, _>::new(id)))
                .await
                .map_err(tracerr::wrap!())?
                .map(Into::into),
            Target::Annex(id) => self
                .execute(Select(By::<Option<Annex>, _>::new(id)))
                .await
                .map_err(tracerr::wrap!())?
                .map(Into::into),
        })
    }
}

impl<C> Database<Insert<Document>> for Postgres<C>
where
    C: Connection,
    Self: Database<Insert<Contract>, Ok = (), Err = Traced<database::Error>>
        + Database<
            Insert<handover::Report>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Insert<Annex>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(doc): Insert<Document>,
    ) -> Result<Self::Ok, Self::Err> {
        match doc {
            Document::Contract(c) => self.execute(Insert(c)).await,
            Document::HandoverReport(r) => self.execute(Insert(r)).await,
            Document::Annex(a) => self.execute(Insert(a)).await,
        }
        .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Lock<By<Document, Target>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
            Lock<By<Contract, contract::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<handover::Report, handover::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Annex, annex::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Document, Target>>,
    ) -> Result<Self::Ok, Self::Err> {
        match by.into_inner() {
            Target::Contract(id) => {
                self.execute(Lock(By::<Contract, _>::new(id))).await
            }
            Target::HandoverReport(id) => {
                self.execute(Lock(By::<handover::Report, _>::new(id))).await
            }
            Target::Annex(id) => {
                self.execute(Lock(By::<Annex, _>::new(id))).await
            }
        }
        .map_err(tracerr::wrap!())
    }
}
