//! [`Command`] for requesting an [`Extension`] of an [`Order`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        annex, contract, extension, order, user, Annex, Contract, Extension,
        Order, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for requesting a prolongation of an [`Order`]'s rental
/// period.
///
/// Creates a [`extension::Status::Draft`] [`Extension`] along with its
/// [`Annex`] awaiting the staff's signature.
#[derive(Clone, Copy, Debug)]
pub struct RequestExtension {
    /// ID of the [`Order`] to be extended.
    pub order_id: order::Id,

    /// ID of the [`User`] requesting the [`Extension`]: either the
    /// [`Order`]'s customer or a staff member.
    pub initiator_id: user::Id,

    /// Requested new end of the rental period.
    pub new_end_at: order::EndDateTime,
}

/// Output of [`RequestExtension`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Requested [`Extension`].
    pub extension: Extension,

    /// [`Annex`] documenting the [`Extension`].
    pub annex: Annex,
}

impl<Db, Nt> Command<RequestExtension> for Service<Db, Nt>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Extension, order::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Contract>, order::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Extension>, order::Id>>,
            Ok = Vec<Extension>,
            Err = Traced<database::Error>,
        > + Database<Insert<Extension>, Err = Traced<database::Error>>
        + Database<Insert<Annex>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RequestExtension,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RequestExtension {
            order_id,
            initiator_id,
            new_end_at,
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

        tx.execute(Lock(By::<Extension, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let order = tx
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())?;
        if order.customer_id != initiator.id && !initiator.is_staff() {
            return Err(tracerr::new!(E::UserNotAllowed(initiator.id)));
        }
        if order.status != order::Status::InUse {
            return Err(tracerr::new!(E::InvalidOrderStatus(order.status)));
        }
        if new_end_at <= order.end_at {
            return Err(tracerr::new!(E::InvalidEndDate(order.end_at)));
        }

        let in_progress = tx
            .execute(Select(By::<Vec<Extension>, _>::new(order.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_iter()
            .find(|e| e.status.is_pending());
        if let Some(e) = in_progress {
            return Err(tracerr::new!(E::ExtensionInProgress(e.id)));
        }

        let contract = tx
            .execute(Select(By::<Option<Contract>, _>::new(order.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.status == contract::Status::Signed)
            .ok_or(E::ContractNotSigned(order.id))
            .map_err(tracerr::wrap!())?;

        let annex_id = annex::Id::new();
        let extension = Extension::new(&order, annex_id, new_end_at)
            .ok_or(E::AmountOverflow)
            .map_err(tracerr::wrap!())?;
        let annex = Annex::new(annex_id, &extension, contract.id);

        tx.execute(Insert(extension.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Insert(annex.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Extension(id: {})` of `Order(id: {})` requested up to {} \
             for {}",
            extension.id,
            order.id,
            extension.new_end_at.to_rfc3339(),
            extension.additional_price,
        );

        Ok(Output { extension, annex })
    }
}

/// Error of [`RequestExtension`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Price of the [`Extension`] overflows.
    #[display("Price of the `Extension` overflows")]
    AmountOverflow,

    /// [`Contract`] of the [`Order`] is not signed.
    #[display("`Contract` of `Order(id: {_0})` is not signed")]
    #[from(ignore)]
    ContractNotSigned(#[error(not(source))] order::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Another [`Extension`] of the [`Order`] is in progress.
    #[display("`Extension(id: {_0})` is in progress already")]
    #[from(ignore)]
    ExtensionInProgress(#[error(not(source))] extension::Id),

    /// Requested end is not after the current end of the [`Order`].
    #[display("New end must be after the current end {}", _0.to_rfc3339())]
    #[from(ignore)]
    InvalidEndDate(#[error(not(source))] order::EndDateTime),

    /// [`Order`] is not in use.
    #[display("`Order` cannot be extended in `{_0}` status")]
    #[from(ignore)]
    InvalidOrderStatus(#[error(not(source))] order::Status),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    #[from(ignore)]
    OrderNotExists(#[error(not(source))] order::Id),

    /// [`User`] is neither the customer of the [`Order`] nor a staff member.
    #[display("`User(id: {_0})` is not allowed to extend the `Order`")]
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
        domain::{annex, extension, order},
        testing::{self, Fixture},
        Command as _,
    };

    use super::{ExecutionError, RequestExtension};

    #[tokio::test]
    async fn prices_additional_days() {
        let fx = Fixture::new(2);
        let order = fx.order_in_use(2, 3).await;

        let out = fx
            .service
            .execute(RequestExtension {
                order_id: order.id,
                initiator_id: fx.customer.id,
                new_end_at: order.end_at + 2 * testing::DAY,
            })
            .await
            .unwrap();

        assert_eq!(out.extension.status, extension::Status::Draft);
        assert_eq!(out.extension.previous_end_at, order.end_at);
        assert_eq!(out.extension.additional_price, testing::vnd(400_000));
        assert_eq!(out.extension.annex_id, out.annex.id);
        assert_eq!(out.annex.status, annex::Status::PendingAdminSignature);
        assert_eq!(
            fx.service.database().snapshot().orders[&order.id].end_at,
            order.end_at,
        );
    }

    #[tokio::test]
    async fn allows_single_extension_in_progress() {
        let fx = Fixture::new(1);
        let order = fx.order_in_use(1, 3).await;
        let cmd = RequestExtension {
            order_id: order.id,
            initiator_id: fx.customer.id,
            new_end_at: order.end_at + testing::DAY,
        };

        let first = fx.service.execute(cmd).await.unwrap();
        let err = fx.service.execute(cmd).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ExtensionInProgress(id)
                if *id == first.extension.id,
        ));
        assert_eq!(fx.service.database().snapshot().extensions.len(), 1);
    }

    #[tokio::test]
    async fn requires_later_end() {
        let fx = Fixture::new(1);
        let order = fx.order_in_use(1, 3).await;

        let err = fx
            .service
            .execute(RequestExtension {
                order_id: order.id,
                initiator_id: fx.staff.id,
                new_end_at: order.end_at,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidEndDate(_)));
    }

    #[tokio::test]
    async fn requires_order_in_use() {
        let fx = Fixture::new(1);
        let order = fx.delivered_order(1, 3).await;

        let err = fx
            .service
            .execute(RequestExtension {
                order_id: order.id,
                initiator_id: fx.customer.id,
                new_end_at: order.end_at + testing::DAY,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidOrderStatus(
                order::Status::DeliveryConfirmed,
            ),
        ));
    }
}
