//! [`Command`] for moving a logistics [`Task`] to another [`Status`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        logistics::{self, Status, Task},
        user, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for recording a progress of a logistics [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct TransitLogisticsTask {
    /// ID of the [`Task`] to be moved.
    pub task_id: logistics::Id,

    /// ID of the staff [`User`] recording the progress.
    pub initiator_id: user::Id,

    /// New [`Status`] of the [`Task`].
    pub status: Status,
}

impl<Db, Nt> Command<TransitLogisticsTask> for Service<Db, Nt>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Task, logistics::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Task>, logistics::Id>>,
            Ok = Option<Task>,
            Err = Traced<database::Error>,
        > + Database<Insert<Task>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Task;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: TransitLogisticsTask,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let TransitLogisticsTask {
            task_id,
            initiator_id,
            status,
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

        tx.execute(Lock(By::<Task, _>::new(task_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut task = tx
            .execute(Select(By::<Option<Task>, _>::new(task_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::TaskNotExists(task_id))
            .map_err(tracerr::wrap!())?;

        task.transit(status)
            .map_err(|from| E::InvalidTaskStatus { from, to: status })
            .map_err(tracerr::wrap!())?;

        tx.execute(Insert(task.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!("`LogisticsTask(id: {})` moved to `{status}`", task.id);

        Ok(task)
    }
}

/// Error of [`TransitLogisticsTask`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Task`] cannot move to the requested [`Status`].
    #[display("`LogisticsTask` cannot move from `{from}` to `{to}`")]
    #[from(ignore)]
    InvalidTaskStatus {
        /// Current [`Status`] of the [`Task`].
        from: Status,

        /// Requested [`Status`].
        to: Status,
    },

    /// [`Task`] with the provided ID does not exist.
    #[display("`LogisticsTask(id: {_0})` does not exist")]
    #[from(ignore)]
    TaskNotExists(#[error(not(source))] logistics::Id),

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
        command::ScheduleLogisticsTask,
        domain::logistics::{Category, Status},
        testing::Fixture,
        Command as _,
    };

    use super::{ExecutionError, TransitLogisticsTask};

    #[tokio::test]
    async fn follows_transition_table() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;
        let task = fx
            .service
            .execute(ScheduleLogisticsTask {
                order_id: confirmed.order.id,
                initiator_id: fx.staff.id,
                category: Category::Pickup,
            })
            .await
            .unwrap();
        let transit = |status| TransitLogisticsTask {
            task_id: task.id,
            initiator_id: fx.staff.id,
            status,
        };

        let task =
            fx.service.execute(transit(Status::InProgress)).await.unwrap();
        assert_eq!(task.status, Status::InProgress);

        let err = fx
            .service
            .execute(transit(Status::Pending))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidTaskStatus {
                from: Status::InProgress,
                to: Status::Pending,
            },
        ));

        let task =
            fx.service.execute(transit(Status::Completed)).await.unwrap();
        assert!(task.is_completed_pickup());

        let err = fx
            .service
            .execute(transit(Status::Cancelled))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidTaskStatus { .. },
        ));
    }
}
