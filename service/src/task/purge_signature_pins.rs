//! [`PurgeSignaturePins`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Delete, Perform, Start};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::signature::{self, Challenge},
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::signature::Pin;

use super::Task;

/// Configuration for [`PurgeSignaturePins`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between purges.
    pub interval: time::Duration,

    /// Time a consumed [`Challenge`] is kept for after its consumption.
    pub retention: time::Duration,
}

/// [`Task`] for deleting consumed signature [`Challenge`]s.
///
/// Unconsumed [`Challenge`]s are never touched, so issued [`Pin`]s stay
/// valid until verified or superseded.
#[derive(Clone, Copy, Debug)]
pub struct PurgeSignaturePins<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db, Nt> Task<Start<By<PurgeSignaturePins<Self>, Config>>>
    for Service<Db, Nt>
where
    PurgeSignaturePins<Service<Db, Nt>>:
        Task<Perform<()>, Ok = (), Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<PurgeSignaturePins<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = PurgeSignaturePins {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`task::PurgeSignaturePins` failed: {e}");
            });
        }
    }
}

impl<Db, Nt> Task<Perform<()>> for PurgeSignaturePins<Service<Db, Nt>>
where
    Db: Database<
        Delete<By<Challenge, signature::ConsumptionDateTime>>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let deadline =
            signature::ConsumptionDateTime::now() - self.config.retention;
        self.service
            .database()
            .execute(Delete(By::new(deadline)))
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Error of [`PurgeSignaturePins`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{operations::Perform, DateTime};

    use crate::{
        domain::{
            contract,
            signature::{Challenge, Pin, Role, Target},
            user,
        },
        infra::database::memory::State,
        testing,
        Task as _,
    };

    use super::{Config, PurgeSignaturePins};

    #[tokio::test]
    async fn deletes_only_consumed_challenges() {
        let recipient = user::Id::new();
        let pin = Pin::new("1234").unwrap();
        let fresh = Challenge::new(
            Target::Contract(contract::Id::new()),
            Role::Customer,
            recipient,
            &pin,
        );
        let mut consumed = Challenge::new(
            Target::Contract(contract::Id::new()),
            Role::Customer,
            recipient,
            &pin,
        );
        consumed.consumed_at = Some(DateTime::UNIX_EPOCH.coerce());

        let mut state = State::default();
        for c in [fresh.clone(), consumed] {
            drop(state.challenges.insert((c.target, c.role), c));
        }
        let service = testing::service(state);

        let task = PurgeSignaturePins {
            config: Config {
                interval: Duration::from_secs(60),
                retention: Duration::from_secs(3600),
            },
            service: service.clone(),
        };
        task.execute(Perform(())).await.unwrap();

        let left = service.database().snapshot().challenges;
        assert_eq!(left.len(), 1);
        assert!(left.contains_key(&(fresh.target, fresh.role)));
    }
}
