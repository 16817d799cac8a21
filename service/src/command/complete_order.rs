//! [`Command`] for completing an [`Order`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{handover, order, settlement, user, Order, Settlement, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for completing a returned [`Order`].
///
/// Requires the completed checkin [`handover::Report`] and the closed
/// [`Settlement`]. Records the actual rental end from the checkin
/// [`handover::Report`].
#[derive(Clone, Copy, Debug)]
pub struct CompleteOrder {
    /// ID of the [`Order`] to be completed.
    pub order_id: order::Id,

    /// ID of the staff [`User`] completing the [`Order`].
    pub initiator_id: user::Id,
}

impl<Db, Nt> Command<CompleteOrder> for Service<Db, Nt>
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
        > + Database<
            Select<By<Option<Settlement>, order::Id>>,
            Ok = Option<Settlement>,
            Err = Traced<database::Error>,
        > + Database<Insert<Order>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Order;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CompleteOrder,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CompleteOrder {
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
        if order.status != order::Status::InUse {
            return Err(tracerr::new!(E::InvalidOrderStatus(order.status)));
        }

        let ended_at = tx
            .execute(Select(By::<Vec<handover::Report>, _>::new(order.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_iter()
            .filter(|r| r.phase == handover::Phase::Checkin)
            .find_map(|r| r.completed_at)
            .ok_or(E::CheckinNotCompleted(order.id))
            .map_err(tracerr::wrap!())?;

        let settled = tx
            .execute(Select(By::<Option<Settlement>, _>::new(order.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .is_some_and(|s| s.state == settlement::State::Closed);
        if !settled {
            return Err(tracerr::new!(E::SettlementNotClosed(order.id)));
        }

        order
            .transit(order::Status::Completed)
            .map_err(E::InvalidOrderStatus)
            .map_err(tracerr::wrap!())?;
        order.ended_at = Some(ended_at.coerce());

        tx.execute(Insert(order.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`Order(id: {})` completed", order.id);

        Ok(order)
    }
}

/// Error of [`CompleteOrder`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Checkin [`handover::Report`] of the [`Order`] is not signed by both
    /// sides.
    #[display("Checkin of `Order(id: {_0})` is not completed")]
    #[from(ignore)]
    CheckinNotCompleted(#[error(not(source))] order::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Order`] is not in use.
    #[display("`Order` cannot be completed in `{_0}` status")]
    #[from(ignore)]
    InvalidOrderStatus(#[error(not(source))] order::Status),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    #[from(ignore)]
    OrderNotExists(#[error(not(source))] order::Id),

    /// [`Settlement`] of the [`Order`] is absent or not closed.
    #[display("`Settlement` of `Order(id: {_0})` is not closed")]
    #[from(ignore)]
    SettlementNotClosed(#[error(not(source))] order::Id),

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
        command::CreateHandoverReport,
        domain::{handover, order, signature::Target},
        testing::Fixture,
        Command as _,
    };

    use super::{CompleteOrder, ExecutionError};

    #[tokio::test]
    async fn requires_checkin_and_closed_settlement() {
        let fx = Fixture::new(1);
        let order = fx.order_in_use(1, 3).await;
        let cmd = CompleteOrder {
            order_id: order.id,
            initiator_id: fx.staff.id,
        };

        let err = fx.service.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::CheckinNotCompleted(_),
        ));

        let report = fx
            .service
            .execute(CreateHandoverReport {
                order_id: order.id,
                initiator_id: fx.staff.id,
                phase: handover::Phase::Checkin,
                observations: vec![],
            })
            .await
            .unwrap();
        fx.sign(Target::HandoverReport(report.id), &fx.customer).await;
        fx.sign(Target::HandoverReport(report.id), &fx.staff).await;

        let err = fx.service.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::SettlementNotClosed(_),
        ));
        assert_eq!(
            fx.service.database().snapshot().orders[&order.id].status,
            order::Status::InUse,
        );
    }
}
