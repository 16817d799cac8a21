//! [`Command`] for confirming a delivery of an [`Order`].

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

/// [`Command`] for confirming the [`Order`]'s [`Device`]s are delivered to
/// its customer.
///
/// Requires the signed [`Contract`] and the completed checkout
/// [`handover::Report`].
///
/// [`Device`]: crate::domain::Device
#[derive(Clone, Copy, Debug)]
pub struct ConfirmDelivery {
    /// ID of the delivered [`Order`].
    pub order_id: order::Id,

    /// ID of the staff [`User`] confirming the delivery.
    pub initiator_id: user::Id,
}

impl<Db, Nt> Command<ConfirmDelivery> for Service<Db, Nt>
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
            Select<By<Option<Contract>, order::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<handover::Report>, order::Id>>,
            Ok = Vec<handover::Report>,
            Err = Traced<database::Error>,
        > + Database<Insert<Order>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Order;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ConfirmDelivery,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ConfirmDelivery {
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
        if order.status != order::Status::Processing {
            return Err(tracerr::new!(E::InvalidOrderStatus(order.status)));
        }

        let contract = tx
            .execute(Select(By::<Option<Contract>, _>::new(order.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.status == contract::Status::Signed);
        if contract.is_none() {
            return Err(tracerr::new!(E::ContractNotSigned(order.id)));
        }

        let checked_out = tx
            .execute(Select(By::<Vec<handover::Report>, _>::new(order.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .iter()
            .any(|r| {
                r.phase == handover::Phase::Checkout && r.is_completed()
            });
        if !checked_out {
            return Err(tracerr::new!(E::CheckoutNotCompleted(order.id)));
        }

        order
            .transit(order::Status::DeliveryConfirmed)
            .map_err(E::InvalidOrderStatus)
            .map_err(tracerr::wrap!())?;

        tx.execute(Insert(order.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!("`Order(id: {})` delivery confirmed", order.id);

        Ok(order)
    }
}

/// Error of [`ConfirmDelivery`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Checkout [`handover::Report`] of the [`Order`] is not signed by both
    /// sides.
    #[display("Checkout of `Order(id: {_0})` is not completed")]
    #[from(ignore)]
    CheckoutNotCompleted(#[error(not(source))] order::Id),

    /// [`Contract`] of the [`Order`] is not signed.
    #[display("`Contract` of `Order(id: {_0})` is not signed")]
    #[from(ignore)]
    ContractNotSigned(#[error(not(source))] order::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Order`] is not being processed.
    #[display("`Order` delivery cannot be confirmed in `{_0}` status")]
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
        command::CreateHandoverReport,
        domain::{handover, order, signature::Target},
        testing::Fixture,
        Command as _,
    };

    use super::{ConfirmDelivery, ExecutionError};

    #[tokio::test]
    async fn requires_signed_contract_and_checkout() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;
        let cmd = ConfirmDelivery {
            order_id: confirmed.order.id,
            initiator_id: fx.staff.id,
        };

        let err = fx.service.execute(cmd).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::ContractNotSigned(_)));

        fx.sign(Target::Contract(confirmed.contract.id), &fx.customer)
            .await;
        let err = fx.service.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::CheckoutNotCompleted(_),
        ));

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
        let err = fx.service.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::CheckoutNotCompleted(_),
        ));

        fx.sign(Target::HandoverReport(report.id), &fx.customer).await;
        let order = fx.service.execute(cmd).await.unwrap();
        assert_eq!(order.status, order::Status::DeliveryConfirmed);

        let err = fx.service.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidOrderStatus(
                order::Status::DeliveryConfirmed
            ),
        ));
    }
}
