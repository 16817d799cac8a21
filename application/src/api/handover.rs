//! Handover [`Report`]-related definitions.

use common::{DateTime, DateTimeOf};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLInputObject, GraphQLObject, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    Context,
};

/// Handover [`Report`] recording the condition of an `Order`'s devices.
#[derive(Clone, Debug, From, Into)]
pub struct Report(domain::handover::Report);

/// Report recording the condition of an `Order`'s devices when they are
/// handed over, signed by both the staff and the customer.
#[graphql_object(context = Context, name = "HandoverReport")]
impl Report {
    /// Unique identifier of this `HandoverReport`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the `Order` this `HandoverReport` is for.
    #[must_use]
    pub fn order_id(&self) -> api::order::Id {
        self.0.order_id.into()
    }

    /// Direction of the handover.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.0.phase.into()
    }

    /// Current status of this `HandoverReport`.
    #[must_use]
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// Recorded conditions of the handed over devices.
    #[must_use]
    pub fn observations(&self) -> Vec<Observation> {
        self.0.observations.iter().cloned().map(Into::into).collect()
    }

    /// Staff's `Signature` of this `HandoverReport`.
    #[must_use]
    pub fn staff_signature(&self) -> Option<api::signature::Signature> {
        self.0.staff_signature.clone().map(Into::into)
    }

    /// Customer's `Signature` of this `HandoverReport`.
    #[must_use]
    pub fn customer_signature(&self) -> Option<api::signature::Signature> {
        self.0.customer_signature.clone().map(Into::into)
    }

    /// `DateTime` when this `HandoverReport` was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `HandoverReport` was signed by both sides.
    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime> {
        self.0.completed_at.map(DateTimeOf::coerce)
    }
}

/// Condition of a single device at a handover.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(name = "HandoverObservation")]
pub struct Observation {
    /// ID of the observed device.
    pub device_id: api::device::Id,

    /// Observed condition of the device.
    pub condition: Condition,

    /// Free-form note about the device.
    pub note: Option<String>,
}

impl From<domain::handover::Observation> for Observation {
    fn from(observation: domain::handover::Observation) -> Self {
        let domain::handover::Observation {
            device_id,
            condition,
            note,
        } = observation;
        Self {
            device_id: device_id.into(),
            condition: condition.into(),
            note: note.map(|n| n.to_string()),
        }
    }
}

/// Condition of a single device to be recorded at a handover.
#[derive(Clone, Debug, GraphQLInputObject)]
#[graphql(name = "HandoverObservationInput")]
pub struct ObservationInput {
    /// ID of the observed device.
    pub device_id: api::device::Id,

    /// Observed condition of the device.
    pub condition: Condition,

    /// Free-form note about the device.
    pub note: Option<String>,
}

/// Unique identifier of a `HandoverReport`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::handover::Id)]
#[into(domain::handover::Id)]
#[graphql(name = "HandoverReportId", transparent)]
pub struct Id(Uuid);

/// Direction of a handover.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "HandoverPhase",
    with = scalar::Via::<domain::handover::Phase>,
)]
pub struct Phase(domain::handover::Phase);

/// Status of a `HandoverReport`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "HandoverReportStatus",
    with = scalar::Via::<domain::handover::Status>,
)]
pub struct Status(domain::handover::Status);

/// Condition of a handed over device.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "DeviceCondition",
    with = scalar::Via::<domain::handover::Condition>,
)]
pub struct Condition(domain::handover::Condition);
