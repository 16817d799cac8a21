//! [`Command`] for closing a [`Settlement`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    command::{complete_order, CompleteOrder},
    domain::{order, settlement, user, Order, Settlement, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for confirming the refund or the collection of an
/// [`settlement::State::Issued`] [`Settlement`] has actually happened.
///
/// Attempts to complete the [`Order`] afterwards.
#[derive(Clone, Copy, Debug)]
pub struct ConfirmSettlementTransaction {
    /// ID of the [`Settlement`] to be closed.
    pub settlement_id: settlement::Id,

    /// ID of the staff [`User`] confirming the transaction.
    pub initiator_id: user::Id,
}

impl<Db, Nt> Command<ConfirmSettlementTransaction> for Service<Db, Nt>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Settlement>, settlement::Id>>,
            Ok = Option<Settlement>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Settlement, order::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Settlement>, settlement::Id>>,
            Ok = Option<Settlement>,
            Err = Traced<database::Error>,
        > + Database<Insert<Settlement>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Self: Command<
        CompleteOrder,
        Ok = Order,
        Err = Traced<complete_order::ExecutionError>,
    >,
{
    type Ok = Settlement;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ConfirmSettlementTransaction,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ConfirmSettlementTransaction {
            settlement_id,
            initiator_id,
        } = cmd;

        let initiator = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(initiator_id))
            .map_err(tracerr::wrap!())?;
        if !initiator.is_staff() {
            return Err(tracerr::new!(E::UserNotStaff(initiator.id)));
        }

        let order_id = self
            .database()
            .execute(Select(By::<Option<Settlement>, _>::new(settlement_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SettlementNotExists(settlement_id))
            .map_err(tracerr::wrap!())?
            .order_id;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Settlement, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut settlement = tx
            .execute(Select(By::<Option<Settlement>, _>::new(settlement_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SettlementNotExists(settlement_id))
            .map_err(tracerr::wrap!())?;

        settlement
            .close()
            .map_err(E::InvalidSettlementState)
            .map_err(tracerr::wrap!())?;

        tx.execute(Insert(settlement.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`Settlement(id: {})` closed", settlement.id);

        let completion = self
            .execute(CompleteOrder {
                order_id: settlement.order_id,
                initiator_id,
            })
            .await;
        if let Err(e) = completion {
            log::warn!(
                "`Order(id: {})` is not completed after closing its \
                 `Settlement`: {e}",
                settlement.order_id,
            );
        }

        Ok(settlement)
    }
}

/// Error of [`ConfirmSettlementTransaction`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Settlement`] is not accepted by the customer.
    #[display("`Settlement` cannot be closed in `{_0}` state")]
    #[from(ignore)]
    InvalidSettlementState(#[error(not(source))] settlement::State),

    /// [`Settlement`] with the provided ID does not exist.
    #[display("`Settlement(id: {_0})` does not exist")]
    #[from(ignore)]
    SettlementNotExists(#[error(not(source))] settlement::Id),

    /// [`User`] is not a staff member.
    #[display("`User(id: {_0})` is not a staff member")]
    #[from(ignore)]
    UserNotStaff(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{
            CreateHandoverReport, RespondToSettlement, SubmitSettlement,
        },
        domain::{handover, order, settlement::State, signature::Target},
        testing::Fixture,
        Command as _,
    };

    use super::{ConfirmSettlementTransaction, ExecutionError};

    #[tokio::test]
    async fn closes_issued_settlement_only() {
        let fx = Fixture::new(1);
        let settlement = fx.settlement(0).await;
        let cmd = ConfirmSettlementTransaction {
            settlement_id: settlement.id,
            initiator_id: fx.staff.id,
        };

        let err = fx.service.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidSettlementState(State::Draft),
        ));
    }

    #[tokio::test]
    async fn completes_order_once_checked_in() {
        let fx = Fixture::new(1);
        let settlement = fx.settlement(300_000).await;
        let order_id = settlement.order_id;

        let report = fx
            .service
            .execute(CreateHandoverReport {
                order_id,
                initiator_id: fx.staff.id,
                phase: handover::Phase::Checkin,
                observations: vec![],
            })
            .await
            .unwrap();
        fx.sign(Target::HandoverReport(report.id), &fx.staff).await;
        fx.sign(Target::HandoverReport(report.id), &fx.customer).await;

        _ = fx
            .service
            .execute(SubmitSettlement {
                settlement_id: settlement.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap();
        _ = fx
            .service
            .execute(RespondToSettlement {
                settlement_id: settlement.id,
                initiator_id: fx.customer.id,
                accept: true,
            })
            .await
            .unwrap();

        let closed = fx
            .service
            .execute(ConfirmSettlementTransaction {
                settlement_id: settlement.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap();

        assert_eq!(closed.state, State::Closed);
        assert!(closed.closed_at.is_some());
        let state = fx.service.database().snapshot();
        assert_eq!(state.orders[&order_id].status, order::Status::Completed);
        assert!(state.orders[&order_id].ended_at.is_some());
    }

    #[tokio::test]
    async fn keeps_order_in_use_without_checkin() {
        let fx = Fixture::new(1);
        let settlement = fx.settlement(0).await;
        _ = fx
            .service
            .execute(SubmitSettlement {
                settlement_id: settlement.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap();
        _ = fx
            .service
            .execute(RespondToSettlement {
                settlement_id: settlement.id,
                initiator_id: fx.customer.id,
                accept: true,
            })
            .await
            .unwrap();

        let closed = fx
            .service
            .execute(ConfirmSettlementTransaction {
                settlement_id: settlement.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap();

        assert_eq!(closed.state, State::Closed);
        assert_eq!(
            fx.service.database().snapshot().orders[&settlement.order_id]
                .status,
            order::Status::InUse,
        );
    }
}
