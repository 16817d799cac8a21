//! Infrastructure layer.

pub mod database;
pub mod notifier;

pub use self::{database::Database, notifier::Notifier};
#[cfg(any(test, feature = "memory"))]
pub use self::{database::Memory, notifier::Outbox};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
#[cfg(feature = "http")]
pub use self::notifier::Http;
