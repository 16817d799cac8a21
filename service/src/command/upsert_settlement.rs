//! [`Command`] for creating or updating a [`Settlement`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        logistics, order,
        settlement::{self, Fees},
        user, Order, Settlement, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for recording the [`Fees`] incurred by the customer of an
/// [`Order`].
///
/// Creates the [`Settlement`] of the [`Order`] if there is none, or updates
/// the existing one otherwise.
#[derive(Clone, Copy, Debug)]
pub struct UpsertSettlement {
    /// ID of the [`Order`] to be settled.
    pub order_id: order::Id,

    /// ID of the staff [`User`] recording the [`Fees`].
    pub initiator_id: user::Id,

    /// [`Fees`] incurred by the customer.
    pub fees: Fees,
}

impl<Db, Nt> Command<UpsertSettlement> for Service<Db, Nt>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
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
            Select<By<Option<Settlement>, order::Id>>,
            Ok = Option<Settlement>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<logistics::Task>, order::Id>>,
            Ok = Vec<logistics::Task>,
            Err = Traced<database::Error>,
        > + Database<Insert<Settlement>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Settlement;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpsertSettlement,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpsertSettlement {
            order_id,
            initiator_id,
            fees,
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
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())?;
        if !fees.is_valid_in(order.currency) {
            return Err(tracerr::new!(E::InvalidFees));
        }

        let existing = tx
            .execute(Select(By::<Option<Settlement>, _>::new(order.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let settlement = if let Some(mut settlement) = existing {
            let changed = settlement
                .update(fees)
                .map_err(|_| E::SettlementLocked(settlement.id))
                .map_err(tracerr::wrap!())?;
            if !changed {
                return Ok(settlement);
            }
            settlement
        } else {
            if !matches!(
                order.status,
                order::Status::DeliveryConfirmed | order::Status::InUse,
            ) {
                return Err(tracerr::new!(E::InvalidOrderStatus(
                    order.status
                )));
            }

            let picked_up = tx
                .execute(Select(By::<Vec<logistics::Task>, _>::new(order.id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .iter()
                .any(logistics::Task::is_completed_pickup);
            if !picked_up {
                return Err(tracerr::new!(E::PickupNotCompleted(order.id)));
            }

            let deposit = order
                .total_deposit()
                .ok_or(E::AmountOverflow)
                .map_err(tracerr::wrap!())?;
            Settlement::new(order.id, deposit, fees)
        };

        tx.execute(Insert(settlement.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Settlement(id: {})` of `Order(id: {})` is `{}` with final \
             return amount {}",
            settlement.id,
            order.id,
            settlement.state,
            settlement.final_return_amount,
        );

        Ok(settlement)
    }
}

/// Error of [`UpsertSettlement`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Total deposit of the [`Order`] overflows.
    #[display("Total deposit of the `Order` overflows")]
    AmountOverflow,

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Fees`] are negative or not in the [`Order`]'s currency.
    #[display("Fees must be non-negative and in the `Order`'s currency")]
    InvalidFees,

    /// [`Order`] cannot be settled in its current status.
    #[display("`Settlement` cannot be created in `{_0}` status")]
    #[from(ignore)]
    InvalidOrderStatus(#[error(not(source))] order::Status),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    #[from(ignore)]
    OrderNotExists(#[error(not(source))] order::Id),

    /// [`Order`] has no completed pickup [`logistics::Task`].
    #[display("`Device`s of `Order(id: {_0})` are not picked up yet")]
    #[from(ignore)]
    PickupNotCompleted(#[error(not(source))] order::Id),

    /// [`Settlement`] is closed already.
    #[display("`Settlement(id: {_0})` is closed")]
    #[from(ignore)]
    SettlementLocked(#[error(not(source))] settlement::Id),

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
        command::{RespondToSettlement, SubmitSettlement},
        domain::settlement::{Fees, State},
        testing::{self, Fixture},
        Command as _,
    };

    use super::{ExecutionError, UpsertSettlement};

    fn fees(damage: i64) -> Fees {
        Fees {
            damage: testing::vnd(damage),
            late: testing::vnd(0),
            accessory: testing::vnd(0),
        }
    }

    #[tokio::test]
    async fn requires_completed_pickup() {
        let fx = Fixture::new(1);
        let order = fx.order_in_use(1, 3).await;
        let cmd = UpsertSettlement {
            order_id: order.id,
            initiator_id: fx.staff.id,
            fees: fees(0),
        };

        let err = fx.service.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::PickupNotCompleted(_),
        ));
        assert!(fx.service.database().snapshot().settlements.is_empty());

        fx.complete_pickup(order.id).await;
        let settlement = fx.service.execute(cmd).await.unwrap();
        assert_eq!(settlement.state, State::Draft);
    }

    #[tokio::test]
    async fn settles_deposit_against_fees() {
        let fx = Fixture::new(2);
        let order = fx.returned_order(2, 3).await;

        let settlement = fx
            .service
            .execute(UpsertSettlement {
                order_id: order.id,
                initiator_id: fx.staff.id,
                fees: fees(500_000),
            })
            .await
            .unwrap();

        assert_eq!(settlement.total_deposit, testing::vnd(2_000_000));
        assert_eq!(settlement.final_return_amount, testing::vnd(1_500_000));
        assert_eq!(settlement.calculation().refund_amount, 1_500_000);
        assert_eq!(settlement.calculation().customer_due_amount, 0);
    }

    #[tokio::test]
    async fn identical_fees_change_nothing() {
        let fx = Fixture::new(1);
        let order = fx.returned_order(1, 3).await;
        let cmd = UpsertSettlement {
            order_id: order.id,
            initiator_id: fx.staff.id,
            fees: fees(1_200_000),
        };

        let created = fx.service.execute(cmd).await.unwrap();
        _ = fx
            .service
            .execute(SubmitSettlement {
                settlement_id: created.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap();

        let repeated = fx.service.execute(cmd).await.unwrap();
        assert_eq!(repeated.id, created.id);
        assert_eq!(repeated.final_return_amount, created.final_return_amount);
        assert_eq!(repeated.final_return_amount, testing::vnd(-200_000));
        assert_eq!(repeated.state, State::AwaitingCustomer);
    }

    #[tokio::test]
    async fn changed_fees_require_new_response() {
        let fx = Fixture::new(1);
        let order = fx.returned_order(1, 3).await;
        let settlement = fx
            .service
            .execute(UpsertSettlement {
                order_id: order.id,
                initiator_id: fx.staff.id,
                fees: fees(0),
            })
            .await
            .unwrap();
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
                accept: false,
            })
            .await
            .unwrap();

        let updated = fx
            .service
            .execute(UpsertSettlement {
                order_id: order.id,
                initiator_id: fx.staff.id,
                fees: fees(100_000),
            })
            .await
            .unwrap();

        assert_eq!(updated.state, State::Pending);
        assert_eq!(updated.final_return_amount, testing::vnd(900_000));
    }

    #[tokio::test]
    async fn rejects_foreign_currency_fees() {
        let fx = Fixture::new(1);
        let order = fx.returned_order(1, 3).await;
        let mut foreign = fees(0);
        foreign.late = "10USD".parse().unwrap();

        let err = fx
            .service
            .execute(UpsertSettlement {
                order_id: order.id,
                initiator_id: fx.staff.id,
                fees: foreign,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidFees));
    }
}
