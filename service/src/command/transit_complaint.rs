//! [`Command`] for moving a [`Complaint`] to another [`Status`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        complaint::{self, Complaint, Description, Status},
        user, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for handling a [`Complaint`] by staff.
#[derive(Clone, Debug)]
pub struct TransitComplaint {
    /// ID of the [`Complaint`] to be moved.
    pub complaint_id: complaint::Id,

    /// ID of the staff [`User`] handling the [`Complaint`].
    pub initiator_id: user::Id,

    /// New [`Status`] of the [`Complaint`].
    pub status: Status,

    /// Resolution note replacing the existing one, if any.
    pub resolution: Option<Description>,
}

impl<Db, Nt> Command<TransitComplaint> for Service<Db, Nt>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Complaint, complaint::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Complaint>, complaint::Id>>,
            Ok = Option<Complaint>,
            Err = Traced<database::Error>,
        > + Database<Insert<Complaint>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Complaint;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: TransitComplaint,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let TransitComplaint {
            complaint_id,
            initiator_id,
            status,
            resolution,
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

        tx.execute(Lock(By::<Complaint, _>::new(complaint_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut complaint = tx
            .execute(Select(By::<Option<Complaint>, _>::new(complaint_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ComplaintNotExists(complaint_id))
            .map_err(tracerr::wrap!())?;

        complaint
            .transit(status, resolution)
            .map_err(|from| E::InvalidComplaintStatus { from, to: status })
            .map_err(tracerr::wrap!())?;

        tx.execute(Insert(complaint.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!("`Complaint(id: {})` moved to `{status}`", complaint.id);

        Ok(complaint)
    }
}

/// Error of [`TransitComplaint`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Complaint`] with the provided ID does not exist.
    #[display("`Complaint(id: {_0})` does not exist")]
    #[from(ignore)]
    ComplaintNotExists(#[error(not(source))] complaint::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Complaint`] cannot move to the requested [`Status`].
    #[display("`Complaint` cannot move from `{from}` to `{to}`")]
    #[from(ignore)]
    InvalidComplaintStatus {
        /// Current [`Status`] of the [`Complaint`].
        from: Status,

        /// Requested [`Status`].
        to: Status,
    },

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
        command::CreateComplaint,
        domain::{
            complaint::{Description, Status},
            order,
        },
        testing::Fixture,
        Command as _,
    };

    use super::{ExecutionError, TransitComplaint};

    #[tokio::test]
    async fn resolves_without_touching_order() {
        let fx = Fixture::new(1);
        let order = fx.order_in_use(1, 3).await;
        let complaint = fx
            .service
            .execute(CreateComplaint {
                order_id: order.id,
                author_id: fx.customer.id,
                device_id: order.devices[0],
                description: Description::new("Screen flickers").unwrap(),
            })
            .await
            .unwrap();
        let transit = |status, resolution| TransitComplaint {
            complaint_id: complaint.id,
            initiator_id: fx.staff.id,
            status,
            resolution,
        };

        let err = fx
            .service
            .execute(transit(Status::Resolved, None))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidComplaintStatus {
                from: Status::Pending,
                to: Status::Resolved,
            },
        ));

        _ = fx
            .service
            .execute(transit(Status::InProgress, None))
            .await
            .unwrap();
        let resolved = fx
            .service
            .execute(transit(
                Status::Resolved,
                Description::new("Display replaced"),
            ))
            .await
            .unwrap();

        assert_eq!(resolved.status, Status::Resolved);
        assert_eq!(
            resolved.resolution.as_ref().map(AsRef::<str>::as_ref),
            Some("Display replaced"),
        );
        assert_eq!(
            fx.service.database().snapshot().orders[&order.id].status,
            order::Status::InUse,
        );
    }

    #[tokio::test]
    async fn only_staff_transits() {
        let fx = Fixture::new(1);
        let order = fx.order_in_use(1, 3).await;
        let complaint = fx
            .service
            .execute(CreateComplaint {
                order_id: order.id,
                author_id: fx.customer.id,
                device_id: order.devices[0],
                description: Description::new("Strap is torn").unwrap(),
            })
            .await
            .unwrap();

        let err = fx
            .service
            .execute(TransitComplaint {
                complaint_id: complaint.id,
                initiator_id: fx.customer.id,
                status: Status::Closed,
                resolution: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotStaff(_)));
    }
}
