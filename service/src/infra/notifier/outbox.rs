//! In-memory [`Notifier`] implementation.

use std::sync::{Arc, Mutex, PoisonError};

use common::operations::{By, Issue};
use secrecy::SecretBox;
use tracerr::Traced;

use crate::{
    domain::{signature::Pin, user::Contact},
    infra::{notifier, Notifier},
};

/// In-memory [`Notifier`] remembering every issued [`Pin`] instead of
/// delivering it anywhere.
#[derive(Clone, Debug, Default)]
pub struct Outbox {
    /// Issued [`Pin`]s along with their recipients, in the issuing order.
    sent: Arc<Mutex<Vec<(Contact, Pin)>>>,
}

impl Outbox {
    /// Length of the issued [`Pin`]s.
    const PIN_LENGTH: usize = 6;

    /// Returns the last [`Pin`] issued to the provided [`Contact`].
    #[must_use]
    pub fn last_pin(&self, to: &Contact) -> Option<Pin> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(c, _)| c == to)
            .map(|(_, pin)| pin.clone())
    }

    /// Returns the number of issued [`Pin`]s.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Indicates whether no [`Pin`]s were issued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier<Issue<By<Pin, Contact>>> for Outbox {
    type Ok = SecretBox<Pin>;
    type Err = Traced<notifier::Error>;

    async fn execute(
        &self,
        Issue(by): Issue<By<Pin, Contact>>,
    ) -> Result<Self::Ok, Self::Err> {
        let pin = Pin::random(Self::PIN_LENGTH);
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((by.into_inner(), pin.clone()));
        Ok(SecretBox::new(Box::new(pin)))
    }
}
