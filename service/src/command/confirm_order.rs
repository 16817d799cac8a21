//! [`Command`] for confirming an [`Order`].

use std::collections::HashMap;

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{device, order, user, Contract, Device, Order, User},
    infra::{database, Database},
    read::device::Available,
    Service,
};

use super::Command;

/// [`Command`] for confirming an [`Order`] by staff.
///
/// Allocates [`Device`]s for every [`order::Detail`] and generates the
/// [`Contract`] to be signed by the customer.
#[derive(Clone, Copy, Debug)]
pub struct ConfirmOrder {
    /// ID of the [`Order`] to be confirmed.
    pub order_id: order::Id,

    /// ID of the staff [`User`] confirming the [`Order`].
    pub initiator_id: user::Id,
}

/// Output of [`ConfirmOrder`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Confirmed [`Order`].
    pub order: Order,

    /// Generated [`Contract`].
    pub contract: Contract,
}

impl<Db, Nt> Command<ConfirmOrder> for Service<Db, Nt>
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
    Transacted<Db>: Database<
            Lock<By<Order, order::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<device::Model, device::ModelId>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Available<Device>>, device::ModelId>>,
            Ok = Vec<Available<Device>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<
                    HashMap<device::ModelId, device::Model>,
                    Vec<device::ModelId>,
                >,
            >,
            Ok = HashMap<device::ModelId, device::Model>,
            Err = Traced<database::Error>,
        > + Database<Insert<Order>, Err = Traced<database::Error>>
        + Database<Insert<Contract>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ConfirmOrder,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ConfirmOrder {
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

        let order = self
            .database()
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Order, _>::new(order.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        // Locking in a stable order avoids deadlocks with concurrent
        // confirmations of overlapping models.
        let mut model_ids =
            order.details.iter().map(|d| d.model_id).collect::<Vec<_>>();
        model_ids.sort_by_key(|id| uuid::Uuid::from(*id));
        for id in &model_ids {
            tx.execute(Lock(By::<device::Model, _>::new(*id)))
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
        if order.status != order::Status::PendingConfirmation {
            return Err(tracerr::new!(E::InvalidOrderStatus(order.status)));
        }

        let mut devices = Vec::new();
        for detail in &order.details {
            let available = tx
                .execute(Select(By::<Vec<Available<Device>>, _>::new(
                    detail.model_id,
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if available.len() < detail.quantity.as_usize() {
                return Err(tracerr::new!(E::DevicesUnavailable(
                    detail.model_id
                )));
            }
            devices.extend(
                available
                    .into_iter()
                    .take(detail.quantity.as_usize())
                    .map(|Available(d)| d.id),
            );
        }

        let models = tx
            .execute(Select(By::new(model_ids)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        order
            .transit(order::Status::Processing)
            .map_err(E::InvalidOrderStatus)
            .map_err(tracerr::wrap!())?;
        order.devices = devices;
        let contract = Contract::generate(&order, &models);

        tx.execute(Insert(order.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Insert(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Order(id: {})` confirmed with {} device(s), `Contract(id: {})` \
             generated",
            order.id,
            order.devices.len(),
            contract.id,
        );

        Ok(Output { order, contract })
    }
}

/// Error of [`ConfirmOrder`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Not enough [`Device`]s of a [`device::Model`] are available.
    #[display("Not enough `Device`s of `DeviceModel(id: {_0})` available")]
    #[from(ignore)]
    DevicesUnavailable(#[error(not(source))] device::ModelId),

    /// [`Order`] is not awaiting confirmation.
    #[display("`Order` cannot be confirmed in `{_0}` status")]
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
        domain::{contract, order},
        testing::Fixture,
        Command as _,
    };

    use super::{ConfirmOrder, ExecutionError};

    #[tokio::test]
    async fn allocates_devices_and_generates_contract() {
        let fx = Fixture::new(3);
        let order = fx.place_order(2, 3).await;

        let out = fx
            .service
            .execute(ConfirmOrder {
                order_id: order.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap();

        assert_eq!(out.order.status, order::Status::Processing);
        assert_eq!(out.order.devices.len(), 2);
        assert_eq!(out.contract.status, contract::Status::Draft);
        assert_eq!(out.contract.order_id, order.id);

        let state = fx.service.database().snapshot();
        assert_eq!(state.orders[&order.id].devices, out.order.devices);
        assert!(state.contracts.contains_key(&out.contract.id));
    }

    #[tokio::test]
    async fn fails_whole_confirmation_without_inventory() {
        let fx = Fixture::new(3);
        let first = fx.place_order(2, 3).await;
        let second = fx.place_order(2, 3).await;

        _ = fx
            .service
            .execute(ConfirmOrder {
                order_id: first.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap();
        let err = fx
            .service
            .execute(ConfirmOrder {
                order_id: second.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::DevicesUnavailable(id) if *id == fx.model.id,
        ));
        let state = fx.service.database().snapshot();
        assert_eq!(
            state.orders[&second.id].status,
            order::Status::PendingConfirmation,
        );
        assert!(state.orders[&second.id].devices.is_empty());
        assert_eq!(state.contracts.len(), 1);
    }

    #[tokio::test]
    async fn requires_staff_and_pending_order() {
        let fx = Fixture::new(1);
        let order = fx.place_order(1, 3).await;

        let err = fx
            .service
            .execute(ConfirmOrder {
                order_id: order.id,
                initiator_id: fx.customer.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::UserNotStaff(_)));

        _ = fx
            .service
            .execute(ConfirmOrder {
                order_id: order.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap();
        let err = fx
            .service
            .execute(ConfirmOrder {
                order_id: order.id,
                initiator_id: fx.staff.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidOrderStatus(order::Status::Processing),
        ));
    }
}
