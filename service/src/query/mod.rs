//! [`Query`] definition.

pub mod annex;
pub mod complaint;
pub mod contract;
pub mod extension;
pub mod handover;
pub mod logistics;
pub mod order;
pub mod settlement;
pub mod user;

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    infra::{database, Database},
    Service,
};

/// [`Query`] of the [`Service`].
pub use common::Handler as Query;

/// [`Query`] [`Select`]ing a `T`ype from a [`Database`].
#[derive(Clone, Copy, Debug)]
#[expect(clippy::module_name_repetitions, reason = "more readable")]
pub struct DatabaseQuery<T>(T);

impl<W, B> DatabaseQuery<By<W, B>> {
    /// Creates a new [`DatabaseQuery`] selecting a `W` by the provided `B`.
    #[must_use]
    pub fn by(by: B) -> Self {
        Self(By::new(by))
    }
}

impl<Db, Nt, W, B> Query<DatabaseQuery<By<W, B>>> for Service<Db, Nt>
where
    Db: Database<Select<By<W, B>>, Ok = W, Err = Traced<database::Error>>,
{
    type Ok = W;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        DatabaseQuery(by): DatabaseQuery<By<W, B>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.database()
            .execute(Select(by))
            .await
            .map_err(tracerr::wrap!())
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        query::{contract, order, user},
        testing::Fixture,
        Query as _,
    };

    #[tokio::test]
    async fn reads_committed_state() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;
        let placed = fx.place_order(1, 5).await;

        let orders = fx
            .service
            .execute(order::OfCustomer::by(fx.customer.id))
            .await
            .unwrap();
        assert_eq!(
            orders.iter().map(|o| o.id).collect::<Vec<_>>(),
            [placed.id, confirmed.order.id],
        );

        let contract = fx
            .service
            .execute(contract::OfOrder::by(confirmed.order.id))
            .await
            .unwrap();
        assert_eq!(contract.map(|c| c.id), Some(confirmed.contract.id));

        let user = fx
            .service
            .execute(user::ById::by(fx.staff.id))
            .await
            .unwrap();
        assert!(user.is_some_and(|u| u.is_staff()));
    }
}
