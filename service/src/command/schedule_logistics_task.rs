//! [`Command`] for scheduling a logistics [`Task`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        logistics::{self, Category, Task},
        order, user, Order, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for scheduling a delivery or a pickup [`Task`] of an
/// [`Order`].
#[derive(Clone, Copy, Debug)]
pub struct ScheduleLogisticsTask {
    /// ID of the [`Order`] the [`Task`] is for.
    pub order_id: order::Id,

    /// ID of the staff [`User`] scheduling the [`Task`].
    pub initiator_id: user::Id,

    /// [`Category`] of the [`Task`].
    pub category: Category,
}

impl<Db, Nt> Command<ScheduleLogisticsTask> for Service<Db, Nt>
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
        > + Database<Insert<Task>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Task;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ScheduleLogisticsTask,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ScheduleLogisticsTask {
            order_id,
            initiator_id,
            category,
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

        let order = tx
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())?;
        if order.status == order::Status::PendingConfirmation
            || order.status.is_terminal()
        {
            return Err(tracerr::new!(E::InvalidOrderStatus(order.status)));
        }

        let now = logistics::CreationDateTime::now();
        let task = Task {
            id: logistics::Id::new(),
            order_id: order.id,
            category,
            status: logistics::Status::Pending,
            created_at: now,
            updated_at: now.coerce(),
        };

        tx.execute(Insert(task.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`{category}` task `LogisticsTask(id: {})` scheduled for \
             `Order(id: {})`",
            task.id,
            order.id,
        );

        Ok(task)
    }
}

/// Error of [`ScheduleLogisticsTask`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Order`] is not confirmed yet or terminated already.
    #[display("`LogisticsTask` cannot be scheduled in `{_0}` status")]
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
    use crate::{
        domain::{logistics, order},
        testing::Fixture,
        Command as _,
    };

    use super::{ExecutionError, ScheduleLogisticsTask};

    #[tokio::test]
    async fn schedules_for_confirmed_order() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;

        let task = fx
            .service
            .execute(ScheduleLogisticsTask {
                order_id: confirmed.order.id,
                initiator_id: fx.staff.id,
                category: logistics::Category::Delivery,
            })
            .await
            .unwrap();

        assert_eq!(task.status, logistics::Status::Pending);
        assert_eq!(task.category, logistics::Category::Delivery);
        assert!(fx.service.database().snapshot().tasks.contains_key(&task.id));
    }

    #[tokio::test]
    async fn refuses_unconfirmed_order() {
        let fx = Fixture::new(1);
        let order = fx.place_order(1, 3).await;

        let err = fx
            .service
            .execute(ScheduleLogisticsTask {
                order_id: order.id,
                initiator_id: fx.staff.id,
                category: logistics::Category::Delivery,
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
