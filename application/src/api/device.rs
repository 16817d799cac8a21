//! Device-related definitions.

use derive_more::{Display, From, Into};
use juniper::GraphQLScalar;
use service::domain;
use uuid::Uuid;

/// Unique identifier of a rented `Device`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::device::Id)]
#[into(domain::device::Id)]
#[graphql(name = "DeviceId", transparent)]
pub struct Id(Uuid);

/// Unique identifier of a `Device` model in the catalog.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::device::ModelId)]
#[into(domain::device::ModelId)]
#[graphql(name = "DeviceModelId", transparent)]
pub struct ModelId(Uuid);
