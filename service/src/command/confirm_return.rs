//! [`Command`] for confirming an upcoming return of an [`Order`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{order, user, Order, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for confirming the [`Order`]'s [`Device`]s are going to be
/// returned.
///
/// Doesn't change the [`order::Status`]: the checkin [`handover::Report`]
/// and the closed [`Settlement`] complete the [`Order`].
///
/// [`Device`]: crate::domain::Device
/// [`handover::Report`]: crate::domain::handover::Report
/// [`Settlement`]: crate::domain::Settlement
#[derive(Clone, Copy, Debug)]
pub struct ConfirmReturn {
    /// ID of the [`Order`] to be returned.
    pub order_id: order::Id,

    /// ID of the [`User`] confirming the return: either the [`Order`]'s
    /// customer or a staff member.
    pub initiator_id: user::Id,
}

impl ConfirmReturn {
    /// Maximum number of calendar days left to the rental end when the
    /// return may be confirmed.
    pub const MAX_DAYS_REMAINING: i64 = 1;
}

impl<Db, Nt> Command<ConfirmReturn> for Service<Db, Nt>
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
        > + Database<Insert<Order>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Order;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ConfirmReturn,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ConfirmReturn {
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
        if !initiator.is_staff() && initiator.id != order.customer_id {
            return Err(tracerr::new!(E::UserNotAllowed(initiator.id)));
        }
        if order.status != order::Status::InUse {
            return Err(tracerr::new!(E::InvalidOrderStatus(order.status)));
        }
        if order.return_confirmed_at.is_some() {
            return Ok(order);
        }

        let now = order::ReturnConfirmationDateTime::now();
        let days = order.days_remaining(&now);
        if days > ConfirmReturn::MAX_DAYS_REMAINING {
            return Err(tracerr::new!(E::ReturnTooEarly(days)));
        }
        order.return_confirmed_at = Some(now);

        tx.execute(Insert(order.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`Order(id: {})` return confirmed", order.id);

        Ok(order)
    }
}

/// Error of [`ConfirmReturn`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Order`] is not in use.
    #[display("`Order` return cannot be confirmed in `{_0}` status")]
    #[from(ignore)]
    InvalidOrderStatus(#[error(not(source))] order::Status),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    #[from(ignore)]
    OrderNotExists(#[error(not(source))] order::Id),

    /// Too many days are left until the rental end.
    #[display("Return cannot be confirmed {_0} days before the rental end")]
    #[from(ignore)]
    ReturnTooEarly(#[error(not(source))] i64),

    /// [`User`] is neither the [`Order`]'s customer nor a staff member.
    #[display("`User(id: {_0})` is not allowed to manage the `Order`")]
    #[from(ignore)]
    UserNotAllowed(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{domain::order, testing::Fixture, Command as _};

    use super::{ConfirmReturn, ExecutionError};

    #[tokio::test]
    async fn confirms_on_last_day_only() {
        let fx = Fixture::new(2);
        let early = fx.order_in_use(1, 5).await;
        let due = fx.order_in_use(1, 1).await;

        let err = fx
            .service
            .execute(ConfirmReturn {
                order_id: early.id,
                initiator_id: fx.customer.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::ReturnTooEarly(5)));

        let order = fx
            .service
            .execute(ConfirmReturn {
                order_id: due.id,
                initiator_id: fx.customer.id,
            })
            .await
            .unwrap();
        assert_eq!(order.status, order::Status::InUse);
        let confirmed_at = order.return_confirmed_at.unwrap();

        let again = fx
            .service
            .execute(ConfirmReturn {
                order_id: due.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap();
        assert_eq!(again.return_confirmed_at, Some(confirmed_at));
    }

    #[tokio::test]
    async fn requires_order_in_use() {
        let fx = Fixture::new(1);
        let order = fx.place_order(1, 1).await;

        let err = fx
            .service
            .execute(ConfirmReturn {
                order_id: order.id,
                initiator_id: fx.customer.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidOrderStatus(
                order::Status::PendingConfirmation
            ),
        ));
    }
}
