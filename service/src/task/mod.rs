//! Background [`Task`]s definitions.

mod background;
pub mod purge_signature_pins;

pub use common::Handler as Task;

pub use self::{
    background::Background, purge_signature_pins::PurgeSignaturePins,
};
