//! [`Command`] for creating a handover [`Report`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        contract, device,
        handover::{self, Observation, Phase, Report},
        order, user, Contract, Order, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a handover [`Report`] of an [`Order`]'s
/// [`Device`]s transfer.
///
/// [`Device`]: crate::domain::Device
#[derive(Clone, Debug)]
pub struct CreateHandoverReport {
    /// ID of the [`Order`] being handed over.
    pub order_id: order::Id,

    /// ID of the staff [`User`] creating the [`Report`].
    pub initiator_id: user::Id,

    /// [`Phase`] of the [`Report`].
    pub phase: Phase,

    /// [`Observation`]s of the transferred [`Device`]s.
    ///
    /// [`Device`]: crate::domain::Device
    pub observations: Vec<Observation>,
}

impl<Db, Nt> Command<CreateHandoverReport> for Service<Db, Nt>
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
            Select<By<Vec<Report>, order::Id>>,
            Ok = Vec<Report>,
            Err = Traced<database::Error>,
        > + Database<Insert<Report>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Report;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateHandoverReport,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateHandoverReport {
            order_id,
            initiator_id,
            phase,
            observations,
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

        // Avoid concurrent creation of multiple `Report`s of the same phase.
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

        match phase {
            Phase::Checkout => {
                if order.status != order::Status::Processing {
                    return Err(tracerr::new!(E::InvalidOrderStatus(
                        order.status
                    )));
                }
                let signed = tx
                    .execute(Select(By::<Option<Contract>, _>::new(order.id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .is_some_and(|c| c.status == contract::Status::Signed);
                if !signed {
                    return Err(tracerr::new!(E::ContractNotSigned(order.id)));
                }
            }
            Phase::Checkin => {
                if order.status != order::Status::InUse {
                    return Err(tracerr::new!(E::InvalidOrderStatus(
                        order.status
                    )));
                }
            }
        }

        if let Some(o) =
            observations.iter().find(|o| !order.has_device(o.device_id))
        {
            return Err(tracerr::new!(E::DeviceNotAllocated(o.device_id)));
        }

        let existing = tx
            .execute(Select(By::<Vec<Report>, _>::new(order.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_iter()
            .find(|r| r.phase == phase);
        if let Some(r) = existing {
            return Err(tracerr::new!(E::ReportExists(r.id)));
        }

        let report = Report::new(order.id, phase, observations);

        tx.execute(Insert(report.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`HandoverReport(id: {})` of `{phase}` created for `Order(id: {})`",
            report.id,
            order.id,
        );

        Ok(report)
    }
}

/// Error of [`CreateHandoverReport`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Contract`] of the [`Order`] is not signed.
    #[display("`Contract` of `Order(id: {_0})` is not signed")]
    #[from(ignore)]
    ContractNotSigned(#[error(not(source))] order::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Observed [`Device`] is not allocated to the [`Order`].
    ///
    /// [`Device`]: crate::domain::Device
    #[display("`Device(id: {_0})` is not allocated to the `Order`")]
    #[from(ignore)]
    DeviceNotAllocated(#[error(not(source))] device::Id),

    /// [`Order`] is not in the [`Phase`]-appropriate status.
    #[display("`HandoverReport` cannot be created in `{_0}` status")]
    #[from(ignore)]
    InvalidOrderStatus(#[error(not(source))] order::Status),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    #[from(ignore)]
    OrderNotExists(#[error(not(source))] order::Id),

    /// [`Report`] of the same [`Phase`] exists already.
    #[display("`HandoverReport(id: {_0})` of the same phase exists already")]
    #[from(ignore)]
    ReportExists(#[error(not(source))] handover::Id),

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
        domain::{
            device,
            handover::{Condition, Note, Observation, Phase, Status},
            signature::Target,
        },
        testing::Fixture,
        Command as _,
    };

    use super::{CreateHandoverReport, ExecutionError};

    #[tokio::test]
    async fn checkout_requires_signed_contract() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;
        let cmd = CreateHandoverReport {
            order_id: confirmed.order.id,
            initiator_id: fx.staff.id,
            phase: Phase::Checkout,
            observations: vec![Observation {
                device_id: confirmed.order.devices[0],
                condition: Condition::Good,
                note: Some(Note::new("Sealed box").unwrap()),
            }],
        };

        let err = fx.service.execute(cmd.clone()).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::ContractNotSigned(_)));

        fx.sign(Target::Contract(confirmed.contract.id), &fx.customer)
            .await;
        let report = fx.service.execute(cmd.clone()).await.unwrap();
        assert_eq!(report.status, Status::PendingSignature);
        assert_eq!(report.observations.len(), 1);

        let err = fx.service.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::ReportExists(id) if *id == report.id,
        ));
    }

    #[tokio::test]
    async fn observes_allocated_devices_only() {
        let fx = Fixture::new(1);
        let order = fx.order_in_use(1, 3).await;

        let err = fx
            .service
            .execute(CreateHandoverReport {
                order_id: order.id,
                initiator_id: fx.staff.id,
                phase: Phase::Checkin,
                observations: vec![Observation {
                    device_id: device::Id::new(),
                    condition: Condition::Lost,
                    note: None,
                }],
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::DeviceNotAllocated(_)));
    }

    #[tokio::test]
    async fn checkin_requires_order_in_use() {
        let fx = Fixture::new(1);
        let delivered = fx.delivered_order(1, 3).await;

        let err = fx
            .service
            .execute(CreateHandoverReport {
                order_id: delivered.id,
                initiator_id: fx.staff.id,
                phase: Phase::Checkin,
                observations: vec![],
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidOrderStatus(_)));
    }
}
