//! [`Command`] for confirming an [`Extension`] is paid.

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

/// [`Command`] for confirming the payment of an [`Extension`] with an
/// [`annex::Status::Active`] [`Annex`], moving the end of its [`Order`].
///
/// Repeated confirmations change nothing.
#[derive(Clone, Copy, Debug)]
pub struct ConfirmExtensionPayment {
    /// ID of the paid [`Extension`].
    pub extension_id: extension::Id,

    /// ID of the staff [`User`] confirming the payment.
    pub initiator_id: user::Id,
}

impl<Db, Nt> Command<ConfirmExtensionPayment> for Service<Db, Nt>
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
            Lock<By<Order, order::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Extension>, extension::Id>>,
            Ok = Option<Extension>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Annex>, extension::Id>>,
            Ok = Option<Annex>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<Insert<Extension>, Err = Traced<database::Error>>
        + Database<Insert<Order>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Extension;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ConfirmExtensionPayment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ConfirmExtensionPayment {
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
        if !initiator.is_staff() {
            return Err(tracerr::new!(E::UserNotStaff(initiator.id)));
        }

        let order_id = self
            .database()
            .execute(Select(By::<Option<Extension>, _>::new(extension_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ExtensionNotExists(extension_id))
            .map_err(tracerr::wrap!())?
            .order_id;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Extension, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Lock(By::<Order, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut extension = tx
            .execute(Select(By::<Option<Extension>, _>::new(extension_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ExtensionNotExists(extension_id))
            .map_err(tracerr::wrap!())?;
        if extension.status == extension::Status::Paid {
            return Ok(extension);
        }

        let annex_status = tx
            .execute(Select(By::<Option<Annex>, _>::new(extension.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BrokenReference(extension.id))
            .map_err(tracerr::wrap!())?
            .status;
        if annex_status != annex::Status::Active {
            return Err(tracerr::new!(E::AnnexNotActive(annex_status)));
        }

        let mut order = tx
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())?;
        if order.status != order::Status::InUse {
            return Err(tracerr::new!(E::InvalidOrderStatus(order.status)));
        }

        _ = extension
            .pay()
            .map_err(E::InvalidExtensionStatus)
            .map_err(tracerr::wrap!())?;
        order.end_at = extension.new_end_at;
        order.return_confirmed_at = None;

        tx.execute(Insert(extension.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Insert(order.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Extension(id: {})` paid, `Order(id: {})` now ends at {}",
            extension.id,
            order.id,
            order.end_at.to_rfc3339(),
        );

        Ok(extension)
    }
}

/// Error of [`ConfirmExtensionPayment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Annex`] of the [`Extension`] is not signed by both sides.
    #[display("`Annex` of the `Extension` is `{_0}`")]
    #[from(ignore)]
    AnnexNotActive(#[error(not(source))] annex::Status),

    /// [`Extension`] has no [`Annex`].
    #[display("`Extension(id: {_0})` has no `Annex`")]
    #[from(ignore)]
    BrokenReference(#[error(not(source))] extension::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Extension`] with the provided ID does not exist.
    #[display("`Extension(id: {_0})` does not exist")]
    #[from(ignore)]
    ExtensionNotExists(#[error(not(source))] extension::Id),

    /// [`Extension`] is not awaiting payment.
    #[display("`Extension` cannot be paid in `{_0}` status")]
    #[from(ignore)]
    InvalidExtensionStatus(#[error(not(source))] extension::Status),

    /// [`Order`] is not in use.
    #[display("`Order` cannot be extended in `{_0}` status")]
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
        command::RequestExtension,
        domain::{annex, extension, signature::Target},
        testing::{self, Fixture},
        Command as _,
    };

    use super::{ConfirmExtensionPayment, ExecutionError};

    #[tokio::test]
    async fn requires_active_annex() {
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

        let err = fx
            .service
            .execute(ConfirmExtensionPayment {
                extension_id: out.extension.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::AnnexNotActive(
                annex::Status::PendingCustomerSignature
            ),
        ));
    }

    #[tokio::test]
    async fn repeated_payment_is_noop() {
        let fx = Fixture::new(1);
        let order = fx.order_in_use(1, 3).await;
        let new_end_at = order.end_at + testing::DAY;
        let out = fx
            .service
            .execute(RequestExtension {
                order_id: order.id,
                initiator_id: fx.customer.id,
                new_end_at,
            })
            .await
            .unwrap();
        fx.sign(Target::Annex(out.annex.id), &fx.staff).await;
        fx.sign(Target::Annex(out.annex.id), &fx.customer).await;
        let cmd = ConfirmExtensionPayment {
            extension_id: out.extension.id,
            initiator_id: fx.staff.id,
        };

        let paid = fx.service.execute(cmd).await.unwrap();
        assert_eq!(paid.status, extension::Status::Paid);
        let extended =
            fx.service.database().snapshot().orders[&order.id].clone();
        assert_eq!(extended.end_at, new_end_at);

        let repeated = fx.service.execute(cmd).await.unwrap();
        assert_eq!(repeated.status, extension::Status::Paid);
        assert_eq!(repeated.paid_at, paid.paid_at);
        let state = fx.service.database().snapshot();
        assert_eq!(state.orders[&order.id].end_at, new_end_at);
        assert_eq!(state.orders[&order.id].status, extended.status);
    }
}
