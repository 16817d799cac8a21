//! [`Command`] for presenting a [`Settlement`] to the customer.

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{order, settlement, user, Settlement, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for presenting a [`Settlement`] to the customer for a
/// response.
#[derive(Clone, Copy, Debug)]
pub struct SubmitSettlement {
    /// ID of the [`Settlement`] to be submitted.
    pub settlement_id: settlement::Id,

    /// ID of the staff [`User`] submitting the [`Settlement`].
    pub initiator_id: user::Id,
}

impl<Db, Nt> Command<SubmitSettlement> for Service<Db, Nt>
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
{
    type Ok = Settlement;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SubmitSettlement,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SubmitSettlement {
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
            .submit()
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

        log::info!(
            "`Settlement(id: {})` awaits the customer's response",
            settlement.id,
        );

        Ok(settlement)
    }
}

/// Error of [`SubmitSettlement`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Settlement`] cannot be submitted in its current state.
    #[display("`Settlement` cannot be submitted in `{_0}` state")]
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
        domain::settlement::State, testing::Fixture, Command as _,
    };

    use super::{ExecutionError, SubmitSettlement};

    #[tokio::test]
    async fn awaits_customer_once() {
        let fx = Fixture::new(1);
        let settlement = fx.settlement(0).await;
        let cmd = SubmitSettlement {
            settlement_id: settlement.id,
            initiator_id: fx.staff.id,
        };

        let submitted = fx.service.execute(cmd).await.unwrap();
        assert_eq!(submitted.state, State::AwaitingCustomer);

        let err = fx.service.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidSettlementState(State::AwaitingCustomer),
        ));
    }

    #[tokio::test]
    async fn only_staff_submits() {
        let fx = Fixture::new(1);
        let settlement = fx.settlement(0).await;

        let err = fx
            .service
            .execute(SubmitSettlement {
                settlement_id: settlement.id,
                initiator_id: fx.customer.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotStaff(_)));
    }
}
