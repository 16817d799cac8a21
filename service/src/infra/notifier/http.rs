//! HTTP [`Notifier`] implementation.

use std::time::Duration;

use common::operations::{By, Issue};
use secrecy::SecretBox;
use serde::Serialize;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{signature::Pin, user::Contact},
    infra::{notifier, Notifier},
};

/// [`Http`] notifier configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// URL of the notification collaborator endpoint accepting messages.
    pub endpoint: String,

    /// Timeout of a single delivery request.
    pub timeout: Duration,

    /// Number of digits in the issued [`Pin`]s.
    pub pin_length: usize,
}

/// [`Notifier`] delivering [`Pin`]s through an external HTTP notification
/// collaborator.
#[derive(Clone, Debug)]
pub struct Http {
    /// HTTP client.
    client: reqwest::Client,

    /// [`Config`] of this [`Http`] notifier.
    config: Config,
}

impl Http {
    /// Creates a new [`Http`] notifier with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If failed to build an HTTP client.
    pub fn new(config: Config) -> Result<Self, Traced<notifier::Error>> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(tracerr::from_and_wrap!(=> notifier::Error))?;
        Ok(Self { client, config })
    }
}

/// Message to be delivered by the notification collaborator.
#[derive(Debug, Serialize)]
struct Message<'a> {
    /// Delivery channel: `email` or `sms`.
    channel: &'static str,

    /// Address of the recipient within the `channel`.
    recipient: &'a str,

    /// Text of the message.
    text: String,
}

impl Notifier<Issue<By<Pin, Contact>>> for Http {
    type Ok = SecretBox<Pin>;
    type Err = Traced<notifier::Error>;

    async fn execute(
        &self,
        Issue(by): Issue<By<Pin, Contact>>,
    ) -> Result<Self::Ok, Self::Err> {
        let contact = by.into_inner();
        let (channel, recipient): (_, &str) = match &contact {
            Contact::Email(email) => ("email", email.as_ref()),
            Contact::Phone(phone) => ("sms", phone.as_ref()),
        };

        let pin = Pin::random(self.config.pin_length);
        let message = Message {
            channel,
            recipient,
            text: format!(
                "Your signing code is {}. Do not share it with anyone.",
                pin.expose(),
            ),
        };

        _ = self
            .client
            .post(&self.config.endpoint)
            .json(&message)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(tracerr::from_and_wrap!(=> notifier::Error))?;
        log::debug!("signing PIN delivered to `{channel}` channel");

        Ok(SecretBox::new(Box::new(pin)))
    }
}
