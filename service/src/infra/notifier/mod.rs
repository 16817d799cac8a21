//! [`Notifier`]-related implementations.
//!
//! [`Notifier`] issues one-time signing [`Pin`]s and delivers them to the
//! signer's [`Contact`], answering with the issued [`Pin`]:
//! ```ignore
//! Notifier<Issue<By<Pin, Contact>>, Ok = SecretBox<Pin>>
//! ```
//!
//! [`Contact`]: crate::domain::user::Contact
//! [`Pin`]: crate::domain::signature::Pin

#[cfg(feature = "http")]
pub mod http;
#[cfg(any(test, feature = "memory"))]
pub mod outbox;

use derive_more::{Display, Error as StdError, From};

#[cfg(feature = "http")]
pub use self::http::Http;
#[cfg(any(test, feature = "memory"))]
pub use self::outbox::Outbox;

/// Notification operation.
pub use common::Handler as Notifier;

/// [`Notifier`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(feature = "http")]
    /// [`Http`] error.
    #[display("HTTP notification failed: {_0}")]
    Http(reqwest::Error),
}
