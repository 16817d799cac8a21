//! [`Command`] for reporting a [`Complaint`].

use common::operations::{By, Commit, Insert, Select, Transact, Transacted};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        complaint::{self, Complaint, Description},
        device, order, user, Order, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for reporting an issue about a [`Device`] allocated to an
/// [`Order`].
///
/// [`Device`]: crate::domain::Device
#[derive(Clone, Debug)]
pub struct CreateComplaint {
    /// ID of the [`Order`] the [`Device`] is allocated to.
    ///
    /// [`Device`]: crate::domain::Device
    pub order_id: order::Id,

    /// ID of the [`User`] reporting the issue: either the [`Order`]'s
    /// customer or a staff member.
    pub author_id: user::Id,

    /// ID of the [`Device`] the issue is about.
    ///
    /// [`Device`]: crate::domain::Device
    pub device_id: device::Id,

    /// [`Description`] of the issue.
    pub description: Description,
}

impl<Db, Nt> Command<CreateComplaint> for Service<Db, Nt>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<Insert<Complaint>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Complaint;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateComplaint,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateComplaint {
            order_id,
            author_id,
            device_id,
            description,
        } = cmd;

        let author = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(author_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(author_id))
            .map_err(tracerr::wrap!())?;

        let order = self
            .database()
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())?;
        if order.customer_id != author.id && !author.is_staff() {
            return Err(tracerr::new!(E::UserNotAllowed(author.id)));
        }
        if !order.has_device(device_id) {
            return Err(tracerr::new!(E::DeviceNotAllocated(device_id)));
        }

        let now = complaint::CreationDateTime::now();
        let complaint = Complaint {
            id: complaint::Id::new(),
            order_id: order.id,
            device_id,
            author_id: author.id,
            description,
            status: complaint::Status::Pending,
            resolution: None,
            created_at: now,
            updated_at: now.coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Insert(complaint.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Complaint(id: {})` reported about `Device(id: {device_id})` of \
             `Order(id: {})`",
            complaint.id,
            order.id,
        );

        Ok(complaint)
    }
}

/// Error of [`CreateComplaint`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Device`] is not allocated to the [`Order`].
    ///
    /// [`Device`]: crate::domain::Device
    #[display("`Device(id: {_0})` is not allocated to the `Order`")]
    #[from(ignore)]
    DeviceNotAllocated(#[error(not(source))] device::Id),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    #[from(ignore)]
    OrderNotExists(#[error(not(source))] order::Id),

    /// [`User`] is neither the customer of the [`Order`] nor a staff member.
    #[display("`User(id: {_0})` is not allowed to complain about the `Order`")]
    #[from(ignore)]
    UserNotAllowed(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{
            complaint::{Description, Status},
            device,
        },
        testing::Fixture,
        Command as _,
    };

    use super::{CreateComplaint, ExecutionError};

    #[tokio::test]
    async fn reports_allocated_device() {
        let fx = Fixture::new(1);
        let order = fx.order_in_use(1, 3).await;

        let complaint = fx
            .service
            .execute(CreateComplaint {
                order_id: order.id,
                author_id: fx.customer.id,
                device_id: order.devices[0],
                description: Description::new("Battery drains fast").unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(complaint.status, Status::Pending);
        assert!(complaint.resolution.is_none());
        let state = fx.service.database().snapshot();
        assert!(state.complaints.contains_key(&complaint.id));
        assert_eq!(state.orders[&order.id].status, order.status);
    }

    #[tokio::test]
    async fn rejects_foreign_device() {
        let fx = Fixture::new(1);
        let order = fx.order_in_use(1, 3).await;

        let err = fx
            .service
            .execute(CreateComplaint {
                order_id: order.id,
                author_id: fx.customer.id,
                device_id: device::Id::new(),
                description: Description::new("Broken").unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::DeviceNotAllocated(_)));
        assert!(fx.service.database().snapshot().complaints.is_empty());
    }
}
