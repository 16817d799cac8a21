//! [`Command`] for recording the customer's response to a [`Settlement`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{order, settlement, user, Order, Settlement},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for accepting or rejecting a [`Settlement`] by the customer
/// of its [`Order`].
#[derive(Clone, Copy, Debug)]
pub struct RespondToSettlement {
    /// ID of the [`Settlement`] being responded to.
    pub settlement_id: settlement::Id,

    /// ID of the customer responding.
    pub initiator_id: user::Id,

    /// Whether the [`Settlement`] is accepted.
    pub accept: bool,
}

impl<Db, Nt> Command<RespondToSettlement> for Service<Db, Nt>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Settlement>, settlement::Id>>,
            Ok = Option<Settlement>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Settlement, order::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
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
        cmd: RespondToSettlement,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RespondToSettlement {
            settlement_id,
            initiator_id,
            accept,
        } = cmd;

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

        let order = tx
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BrokenReference(order_id))
            .map_err(tracerr::wrap!())?;
        if order.customer_id != initiator_id {
            return Err(tracerr::new!(E::UserNotCustomer(initiator_id)));
        }

        let mut settlement = tx
            .execute(Select(By::<Option<Settlement>, _>::new(settlement_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SettlementNotExists(settlement_id))
            .map_err(tracerr::wrap!())?;

        settlement
            .respond(accept)
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
            "`Settlement(id: {})` is `{}` by the customer",
            settlement.id,
            settlement.state,
        );

        Ok(settlement)
    }
}

/// Error of [`RespondToSettlement`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Settlement`] refers to a missing [`Order`].
    #[display("`Settlement` refers to missing `Order(id: {_0})`")]
    #[from(ignore)]
    BrokenReference(#[error(not(source))] order::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Settlement`] cannot be responded in its current state.
    #[display("`Settlement` cannot be responded in `{_0}` state")]
    #[from(ignore)]
    InvalidSettlementState(#[error(not(source))] settlement::State),

    /// [`Settlement`] with the provided ID does not exist.
    #[display("`Settlement(id: {_0})` does not exist")]
    #[from(ignore)]
    SettlementNotExists(#[error(not(source))] settlement::Id),

    /// [`User`] is not the customer of the [`Order`].
    ///
    /// [`User`]: crate::domain::User
    #[display("`User(id: {_0})` is not the customer of the `Order`")]
    #[from(ignore)]
    UserNotCustomer(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::SubmitSettlement, domain::settlement::State,
        testing::Fixture, Command as _,
    };

    use super::{ExecutionError, RespondToSettlement};

    #[tokio::test]
    async fn customer_accepts_once() {
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
        let respond = |accept| RespondToSettlement {
            settlement_id: settlement.id,
            initiator_id: fx.customer.id,
            accept,
        };

        let accepted = fx.service.execute(respond(true)).await.unwrap();
        assert_eq!(accepted.state, State::Issued);

        let err = fx.service.execute(respond(false)).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidSettlementState(State::Issued),
        ));
    }

    #[tokio::test]
    async fn only_order_customer_responds() {
        let fx = Fixture::new(1);
        let settlement = fx.settlement(0).await;
        let stranger = fx.add_customer();

        for initiator_id in [fx.staff.id, stranger.id] {
            let err = fx
                .service
                .execute(RespondToSettlement {
                    settlement_id: settlement.id,
                    initiator_id,
                    accept: true,
                })
                .await
                .unwrap_err();
            assert!(matches!(
                err.as_ref(),
                ExecutionError::UserNotCustomer(_),
            ));
        }
        assert_eq!(
            fx.service.database().snapshot().settlements[&settlement.id]
                .state,
            State::Draft,
        );
    }
}
