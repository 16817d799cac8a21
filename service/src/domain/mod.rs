//! Domain definitions.

pub mod annex;
pub mod complaint;
pub mod contract;
pub mod device;
pub mod extension;
pub mod handover;
pub mod logistics;
pub mod order;
pub mod settlement;
pub mod signature;
pub mod user;

pub use self::{
    annex::Annex, complaint::Complaint, contract::Contract, device::Device,
    extension::Extension, order::Order, settlement::Settlement, user::User,
};
