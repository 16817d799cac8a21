//! [`Command`] for activating an [`Order`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{handover, order, user, Order, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for moving a delivered [`Order`] into use.
///
/// Records the actual rental start from the completed checkout
/// [`handover::Report`].
#[derive(Clone, Copy, Debug)]
pub struct ActivateOrder {
    /// ID of the [`Order`] to be activated.
    pub order_id: order::Id,

    /// ID of the staff [`User`] activating the [`Order`].
    pub initiator_id: user::Id,
}

impl<Db, Nt> Command<ActivateOrder> for Service<Db, Nt>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Order, order::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<handover::Report>, order::Id>>,
            Ok = Vec<handover::Report>,
            Err = Traced<database::Error>,
        > + Database<Insert<Order>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Order;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ActivateOrder,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ActivateOrder {
            order_id,
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

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Order, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut order = tx
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())?;
        if order.status != order::Status::DeliveryConfirmed {
            return Err(tracerr::new!(E::InvalidOrderStatus(order.status)));
        }

        let started_at = tx
            .execute(Select(By::<Vec<handover::Report>, _>::new(order.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_iter()
            .filter(|r| r.phase == handover::Phase::Checkout)
            .find_map(|r| r.completed_at)
            .ok_or(E::CheckoutNotCompleted(order.id))
            .map_err(tracerr::wrap!())?;

        order
            .transit(order::Status::InUse)
            .map_err(E::InvalidOrderStatus)
            .map_err(tracerr::wrap!())?;
        order.started_at = Some(started_at.coerce());

        tx.execute(Insert(order.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`Order(id: {})` is in use", order.id);

        Ok(order)
    }
}

/// Error of [`ActivateOrder`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Checkout [`handover::Report`] of the [`Order`] is not signed by both
    /// sides.
    #[display("Checkout of `Order(id: {_0})` is not completed")]
    #[from(ignore)]
    CheckoutNotCompleted(#[error(not(source))] order::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Order`] is not delivered.
    #[display("`Order` cannot be activated in `{_0}` status")]
    #[from(ignore)]
    InvalidOrderStatus(#[error(not(source))] order::Status),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    #[from(ignore)]
    OrderNotExists(#[error(not(source))] order::Id),

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
    use crate::{domain::order, testing::Fixture, Command as _};

    use super::{ActivateOrder, ExecutionError};

    #[tokio::test]
    async fn records_actual_start() {
        let fx = Fixture::new(1);
        let delivered = fx.delivered_order(1, 3).await;
        assert!(delivered.started_at.is_none());

        let order = fx
            .service
            .execute(ActivateOrder {
                order_id: delivered.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap();

        assert_eq!(order.status, order::Status::InUse);
        assert!(order.started_at.is_some());
    }

    #[tokio::test]
    async fn requires_delivery() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;

        let err = fx
            .service
            .execute(ActivateOrder {
                order_id: confirmed.order.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidOrderStatus(order::Status::Processing),
        ));
    }
}
