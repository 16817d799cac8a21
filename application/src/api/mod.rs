//! GraphQL API definitions.

pub mod complaint;
pub mod contract;
pub mod device;
pub mod extension;
pub mod handover;
pub mod logistics;
mod mutation;
pub mod order;
mod query;
pub mod scalar;
pub mod settlement;
pub mod signature;
pub mod user;

use juniper::EmptySubscription;

use crate::{define_error, Context};

pub use self::{
    complaint::Complaint,
    contract::Contract,
    extension::{Annex, Extension},
    handover::Report as HandoverReport,
    logistics::Task as LogisticsTask,
    mutation::Mutation,
    order::Order,
    query::Query,
    settlement::Settlement,
    user::User,
};

/// GraphQL schema.
pub type Schema =
    juniper::RootNode<'static, Query, Mutation, EmptySubscription<Context>>;

define_error! {
    enum PrivilegeError {
        #[code = "NOT_STAFF"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be a staff member"]
        Staff,

        #[code = "NOT_CUSTOMER"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be a customer"]
        Customer,

        #[code = "NOT_PARTICIPANT"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be a staff member or the \
                     customer of the `Order`"]
        Participant,
    }
}
