//! [`Command`] for cancelling an [`Order`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{contract, handover, order, user, Contract, Order, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for cancelling an [`Order`] before its delivery.
///
/// Releases the allocated [`Device`]s and cancels the unsigned [`Contract`].
/// Refused once the checkout [`handover::Report`] is completed, as the
/// [`Device`]s are handed over then.
///
/// [`Device`]: crate::domain::Device
#[derive(Clone, Copy, Debug)]
pub struct CancelOrder {
    /// ID of the [`Order`] to be cancelled.
    pub order_id: order::Id,

    /// ID of the [`User`] cancelling the [`Order`]: either its customer or a
    /// staff member.
    pub initiator_id: user::Id,
}

impl<Db, Nt> Command<CancelOrder> for Service<Db, Nt>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Contract>, order::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Order, order::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Contract, contract::Id>>,
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
            Select<By<Vec<handover::Report>, order::Id>>,
            Ok = Vec<handover::Report>,
            Err = Traced<database::Error>,
        > + Database<Insert<Order>, Err = Traced<database::Error>>
        + Database<Insert<Contract>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Order;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CancelOrder) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelOrder {
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

        let contract_id = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .map(|c| c.id);

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Order, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if let Some(id) = contract_id {
            // Avoid signing the `Contract` while it's being cancelled.
            tx.execute(Lock(By::<Contract, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        let mut order = tx
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())?;
        if !initiator.is_staff() && initiator.id != order.customer_id {
            return Err(tracerr::new!(E::UserNotAllowed(initiator.id)));
        }

        order
            .transit(order::Status::Cancelled)
            .map_err(E::InvalidOrderStatus)
            .map_err(tracerr::wrap!())?;

        let checked_out = tx
            .execute(Select(By::<Vec<handover::Report>, _>::new(order.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .iter()
            .any(|r| {
                r.phase == handover::Phase::Checkout && r.is_completed()
            });
        if checked_out {
            return Err(tracerr::new!(E::CheckoutCompleted(order.id)));
        }

        let contract = tx
            .execute(Select(By::<Option<Contract>, _>::new(order.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Some(mut contract) = contract {
            if contract.status != contract::Status::Cancelled
                && contract.cancel().is_ok()
            {
                tx.execute(Insert(contract))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }
        }

        tx.execute(Insert(order.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Order(id: {})` cancelled by `User(id: {})`",
            order.id,
            initiator.id,
        );

        Ok(order)
    }
}

/// Error of [`CancelOrder`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Device`]s of the [`Order`] are handed over by the completed
    /// checkout [`handover::Report`].
    ///
    /// [`Device`]: crate::domain::Device
    #[display("`Order(id: {_0})` devices are handed over already")]
    #[from(ignore)]
    CheckoutCompleted(#[error(not(source))] order::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Order`] is delivered already or terminated.
    #[display("`Order` cannot be cancelled in `{_0}` status")]
    #[from(ignore)]
    InvalidOrderStatus(#[error(not(source))] order::Status),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    #[from(ignore)]
    OrderNotExists(#[error(not(source))] order::Id),

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
    use crate::{
        command::{
            send_signature_pin, sign_with_pin, ConfirmOrder,
            CreateHandoverReport, SendSignaturePin, SignWithPin,
        },
        domain::{
            contract, handover, order,
            signature::{Blob, Role, Target},
        },
        testing::Fixture,
        Command as _,
    };

    use super::{CancelOrder, ExecutionError};

    #[tokio::test]
    async fn releases_devices_and_contract() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;

        let order = fx
            .service
            .execute(CancelOrder {
                order_id: confirmed.order.id,
                initiator_id: fx.customer.id,
            })
            .await
            .unwrap();
        assert_eq!(order.status, order::Status::Cancelled);
        assert_eq!(
            fx.service.database().snapshot().contracts[&confirmed.contract.id]
                .status,
            contract::Status::Cancelled,
        );

        let next = fx.place_order(1, 3).await;
        let out = fx
            .service
            .execute(ConfirmOrder {
                order_id: next.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap();
        assert_eq!(out.order.devices, confirmed.order.devices);
    }

    #[tokio::test]
    async fn refuses_after_delivery() {
        let fx = Fixture::new(1);
        let delivered = fx.delivered_order(1, 3).await;

        let err = fx
            .service
            .execute(CancelOrder {
                order_id: delivered.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidOrderStatus(
                order::Status::DeliveryConfirmed
            ),
        ));
        assert_eq!(
            fx.service.database().snapshot().orders[&delivered.id].status,
            order::Status::DeliveryConfirmed,
        );
    }

    #[tokio::test]
    async fn refuses_foreign_customer() {
        let fx = Fixture::new(1);
        let order = fx.place_order(1, 3).await;
        let stranger = fx.add_customer();

        let err = fx
            .service
            .execute(CancelOrder {
                order_id: order.id,
                initiator_id: stranger.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotAllowed(_)));
    }

    #[tokio::test]
    async fn cancelled_order_documents_are_not_signable() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;
        fx.sign(Target::Contract(confirmed.contract.id), &fx.customer)
            .await;
        let report = fx
            .service
            .execute(CreateHandoverReport {
                order_id: confirmed.order.id,
                initiator_id: fx.staff.id,
                phase: handover::Phase::Checkout,
                observations: vec![],
            })
            .await
            .unwrap();
        let target = Target::HandoverReport(report.id);
        let contact = fx
            .service
            .execute(SendSignaturePin {
                target,
                signer_id: fx.staff.id,
            })
            .await
            .unwrap();
        let pin = fx.outbox().last_pin(&contact).unwrap();

        let order = fx
            .service
            .execute(CancelOrder {
                order_id: confirmed.order.id,
                initiator_id: fx.customer.id,
            })
            .await
            .unwrap();
        assert_eq!(order.status, order::Status::Cancelled);

        let err = fx
            .service
            .execute(SignWithPin {
                target,
                signer_id: fx.staff.id,
                pin,
                blob: Blob::new("signature").unwrap(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            sign_with_pin::ExecutionError::InvalidOrderStatus(
                order::Status::Cancelled
            ),
        ));

        let sent = fx.outbox().len();
        let err = fx
            .service
            .execute(SendSignaturePin {
                target,
                signer_id: fx.customer.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            send_signature_pin::ExecutionError::InvalidOrderStatus(
                order::Status::Cancelled
            ),
        ));
        assert_eq!(fx.outbox().len(), sent);

        let state = fx.service.database().snapshot();
        assert_eq!(
            state.reports[&report.id].status,
            handover::Status::PendingSignature,
        );
        assert!(state.challenges[&(target, Role::Staff)]
            .consumed_at
            .is_none());
    }

    #[tokio::test]
    async fn refuses_after_checkout_completed() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;
        fx.sign(Target::Contract(confirmed.contract.id), &fx.customer)
            .await;
        let report = fx
            .service
            .execute(CreateHandoverReport {
                order_id: confirmed.order.id,
                initiator_id: fx.staff.id,
                phase: handover::Phase::Checkout,
                observations: vec![],
            })
            .await
            .unwrap();
        fx.sign(Target::HandoverReport(report.id), &fx.staff).await;
        fx.sign(Target::HandoverReport(report.id), &fx.customer).await;

        let err = fx
            .service
            .execute(CancelOrder {
                order_id: confirmed.order.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::CheckoutCompleted(id) if *id == confirmed.order.id,
        ));
        let state = fx.service.database().snapshot();
        assert_eq!(
            state.orders[&confirmed.order.id].status,
            order::Status::Processing,
        );
        assert_eq!(
            state.contracts[&confirmed.contract.id].status,
            contract::Status::Signed,
        );
    }
}
