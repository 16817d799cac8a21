//! [`Command`] for cancelling an [`Extension`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{annex, extension, order, user, Annex, Extension, Order, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for cancelling an unpaid [`Extension`] along with its
/// [`Annex`].
#[derive(Clone, Copy, Debug)]
pub struct CancelExtension {
    /// ID of the [`Extension`] to be cancelled.
    pub extension_id: extension::Id,

    /// ID of the [`User`] cancelling the [`Extension`]: either the
    /// [`Order`]'s customer or a staff member.
    pub initiator_id: user::Id,
}

impl<Db, Nt> Command<CancelExtension> for Service<Db, Nt>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Extension>, extension::Id>>,
            Ok = Option<Extension>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Extension, order::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Annex, annex::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Extension>, extension::Id>>,
            Ok = Option<Extension>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Annex>, annex::Id>>,
            Ok = Option<Annex>,
            Err = Traced<database::Error>,
        > + Database<Insert<Extension>, Err = Traced<database::Error>>
        + Database<Insert<Annex>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Extension;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CancelExtension,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelExtension {
            extension_id,
            initiator_id,
        } = cmd;

        let initiator = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(initiator_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(initiator_id))
            .map_err(tracerr::wrap!())?;

        let extension = self
            .database()
            .execute(Select(By::<Option<Extension>, _>::new(extension_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ExtensionNotExists(extension_id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Extension, _>::new(extension.order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Lock(By::<Annex, _>::new(extension.annex_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let order = tx
            .execute(Select(By::<Option<Order>, _>::new(extension.order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BrokenReference(extension.id))
            .map_err(tracerr::wrap!())?;
        if order.customer_id != initiator.id && !initiator.is_staff() {
            return Err(tracerr::new!(E::UserNotAllowed(initiator.id)));
        }

        let mut extension = tx
            .execute(Select(By::<Option<Extension>, _>::new(extension_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ExtensionNotExists(extension_id))
            .map_err(tracerr::wrap!())?;
        let mut annex = tx
            .execute(Select(By::<Option<Annex>, _>::new(extension.annex_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BrokenReference(extension.id))
            .map_err(tracerr::wrap!())?;

        extension
            .cancel()
            .map_err(E::InvalidExtensionStatus)
            .map_err(tracerr::wrap!())?;
        annex.cancel();

        tx.execute(Insert(extension.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Insert(annex))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`Extension(id: {})` cancelled", extension.id);

        Ok(extension)
    }
}

/// Error of [`CancelExtension`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Extension`] refers to a missing [`Order`] or [`Annex`].
    #[display("`Extension(id: {_0})` has broken references")]
    #[from(ignore)]
    BrokenReference(#[error(not(source))] extension::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Extension`] with the provided ID does not exist.
    #[display("`Extension(id: {_0})` does not exist")]
    #[from(ignore)]
    ExtensionNotExists(#[error(not(source))] extension::Id),

    /// [`Extension`] is not in progress anymore.
    #[display("`Extension` cannot be cancelled in `{_0}` status")]
    #[from(ignore)]
    InvalidExtensionStatus(#[error(not(source))] extension::Status),

    /// [`User`] is neither the customer of the [`Order`] nor a staff member.
    #[display("`User(id: {_0})` is not allowed to cancel the `Extension`")]
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
        command::{ConfirmExtensionPayment, RequestExtension},
        domain::{annex, extension, signature::Target},
        testing::{self, Fixture},
        Command as _,
    };

    use super::{CancelExtension, ExecutionError};

    #[tokio::test]
    async fn cancels_annex_and_frees_order() {
        let fx = Fixture::new(1);
        let order = fx.order_in_use(1, 3).await;
        let request = RequestExtension {
            order_id: order.id,
            initiator_id: fx.customer.id,
            new_end_at: order.end_at + testing::DAY,
        };
        let out = fx.service.execute(request).await.unwrap();

        let cancelled = fx
            .service
            .execute(CancelExtension {
                extension_id: out.extension.id,
                initiator_id: fx.customer.id,
            })
            .await
            .unwrap();

        assert_eq!(cancelled.status, extension::Status::Cancelled);
        assert_eq!(
            fx.service.database().snapshot().annexes[&out.annex.id].status,
            annex::Status::Cancelled,
        );
        _ = fx.service.execute(request).await.unwrap();
    }

    #[tokio::test]
    async fn paid_extension_stays() {
        let fx = Fixture::new(1);
        let order = fx.order_in_use(1, 3).await;
        let out = fx
            .service
            .execute(RequestExtension {
                order_id: order.id,
                initiator_id: fx.customer.id,
                new_end_at: order.end_at + testing::DAY,
            })
            .await
            .unwrap();
        fx.sign(Target::Annex(out.annex.id), &fx.staff).await;
        fx.sign(Target::Annex(out.annex.id), &fx.customer).await;
        _ = fx
            .service
            .execute(ConfirmExtensionPayment {
                extension_id: out.extension.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap();

        let err = fx
            .service
            .execute(CancelExtension {
                extension_id: out.extension.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidExtensionStatus(extension::Status::Paid),
        ));
        assert_eq!(
            fx.service.database().snapshot().annexes[&out.annex.id].status,
            annex::Status::Active,
        );
    }
}
