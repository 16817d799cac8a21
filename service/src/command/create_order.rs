//! [`Command`] for placing a new [`Order`].

use std::collections::{HashMap, HashSet};

use common::operations::{By, Commit, Insert, Select, Transact, Transacted};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        device,
        order::{self, Detail, Quantity},
        user, Order, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for placing a new [`Order`].
#[derive(Clone, Debug)]
pub struct CreateOrder {
    /// ID of the customer [`User`] placing the [`Order`].
    pub customer_id: user::Id,

    /// Ordered [`Item`]s.
    pub items: Vec<Item>,

    /// Planned start of the rental period.
    pub start_at: order::StartDateTime,

    /// Planned end of the rental period.
    pub end_at: order::EndDateTime,
}

/// Line of a [`CreateOrder`] [`Command`].
#[derive(Clone, Copy, Debug)]
pub struct Item {
    /// ID of the ordered [`device::Model`].
    pub model_id: device::ModelId,

    /// Number of [`device::Device`]s to rent.
    pub quantity: Quantity,
}

impl<Db, Nt> Command<CreateOrder> for Service<Db, Nt>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<
                    HashMap<device::ModelId, device::Model>,
                    Vec<device::ModelId>,
                >,
            >,
            Ok = HashMap<device::ModelId, device::Model>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<Insert<Order>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Order;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateOrder) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateOrder {
            customer_id,
            items,
            start_at,
            end_at,
        } = cmd;

        if items.is_empty() {
            return Err(tracerr::new!(E::NoItems));
        }
        let mut seen = HashSet::with_capacity(items.len());
        if let Some(dup) = items.iter().find(|i| !seen.insert(i.model_id)) {
            return Err(tracerr::new!(E::DuplicateItem(dup.model_id)));
        }
        if start_at.coerce::<()>() >= end_at.coerce() {
            return Err(tracerr::new!(E::InvalidPeriod));
        }

        let customer = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(customer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(customer_id))
            .map_err(tracerr::wrap!())?;
        if customer.role != user::Role::Customer {
            return Err(tracerr::new!(E::UserNotCustomer(customer.id)));
        }

        let models = self
            .database()
            .execute(Select(By::new(
                items.iter().map(|i| i.model_id).collect::<Vec<_>>(),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut currency = None;
        let details = items
            .iter()
            .map(|item| {
                let model = models
                    .get(&item.model_id)
                    .ok_or(E::ModelNotExists(item.model_id))?;
                let deposit_per_unit = model.deposit_per_unit();
                let expected =
                    *currency.get_or_insert(model.price_per_day.currency);
                if model.price_per_day.currency != expected
                    || deposit_per_unit.currency != expected
                {
                    return Err(E::CurrencyMismatch(model.id));
                }
                Ok(Detail {
                    model_id: model.id,
                    quantity: item.quantity,
                    price_per_day: model.price_per_day,
                    deposit_per_unit,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(tracerr::wrap!())?;
        let Some(currency) = currency else {
            return Err(tracerr::new!(E::NoItems));
        };

        let order = Order {
            id: order::Id::new(),
            customer_id: customer.id,
            currency,
            details,
            status: order::Status::PendingConfirmation,
            start_at,
            end_at,
            started_at: None,
            ended_at: None,
            return_confirmed_at: None,
            devices: vec![],
            created_at: order::CreationDateTime::now(),
        };
        if order.rental_price().is_none() || order.total_deposit().is_none() {
            return Err(tracerr::new!(E::AmountOverflow));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Insert(order.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Order(id: {})` placed by `User(id: {})`",
            order.id,
            customer.id,
        );

        Ok(order)
    }
}

/// Error of [`CreateOrder`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Ordered amounts overflow.
    #[display("`Order` amounts overflow")]
    AmountOverflow,

    /// Prices of the ordered [`device::Model`]s are denominated in different
    /// currencies.
    #[display("`DeviceModel(id: {_0})` is priced in another currency")]
    #[from(ignore)]
    CurrencyMismatch(#[error(not(source))] device::ModelId),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// The same [`device::Model`] is ordered in multiple [`Item`]s.
    #[display("`DeviceModel(id: {_0})` is ordered more than once")]
    #[from(ignore)]
    DuplicateItem(#[error(not(source))] device::ModelId),

    /// Planned rental period doesn't end after its start.
    #[display("Rental period must end after its start")]
    InvalidPeriod,

    /// [`device::Model`] with the provided ID does not exist.
    #[display("`DeviceModel(id: {_0})` does not exist")]
    #[from(ignore)]
    ModelNotExists(#[error(not(source))] device::ModelId),

    /// No [`Item`]s are ordered.
    #[display("`Order` has no items")]
    NoItems,

    /// [`User`] is not a customer.
    #[display("`User(id: {_0})` is not a customer")]
    #[from(ignore)]
    UserNotCustomer(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::{money::Currency, Money};

    use crate::{
        domain::{device, order},
        testing::{self, Fixture},
        Command as _,
    };

    use super::{CreateOrder, ExecutionError, Item};

    #[tokio::test]
    async fn copies_model_terms_into_details() {
        let fx = Fixture::new(2);

        let order = fx
            .service
            .execute(CreateOrder {
                customer_id: fx.customer.id,
                items: vec![Item {
                    model_id: fx.model.id,
                    quantity: order::Quantity::new(2).unwrap(),
                }],
                start_at: testing::in_days(1).coerce(),
                end_at: testing::in_days(4).coerce(),
            })
            .await
            .unwrap();

        assert_eq!(order.status, order::Status::PendingConfirmation);
        assert_eq!(order.currency, Currency::Vnd);
        assert_eq!(order.details[0].price_per_day, fx.model.price_per_day);
        assert_eq!(order.details[0].deposit_per_unit, testing::vnd(1_000_000));
        assert_eq!(order.total_deposit(), Some(testing::vnd(2_000_000)));
        assert!(fx
            .service
            .database()
            .snapshot()
            .orders
            .contains_key(&order.id));
    }

    #[tokio::test]
    async fn rejects_invalid_input() {
        let fx = Fixture::new(1);
        let item = Item {
            model_id: fx.model.id,
            quantity: order::Quantity::new(1).unwrap(),
        };
        let cmd = CreateOrder {
            customer_id: fx.customer.id,
            items: vec![item],
            start_at: testing::in_days(1).coerce(),
            end_at: testing::in_days(2).coerce(),
        };

        let err = fx
            .service
            .execute(CreateOrder {
                items: vec![],
                ..cmd.clone()
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NoItems));

        let err = fx
            .service
            .execute(CreateOrder {
                items: vec![item, item],
                ..cmd.clone()
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::DuplicateItem(_)));

        let err = fx
            .service
            .execute(CreateOrder {
                end_at: cmd.start_at.coerce(),
                ..cmd.clone()
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidPeriod));

        let err = fx
            .service
            .execute(CreateOrder {
                customer_id: fx.staff.id,
                ..cmd.clone()
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::UserNotCustomer(_)));

        let err = fx
            .service
            .execute(CreateOrder {
                items: vec![Item {
                    model_id: device::ModelId::new(),
                    ..item
                }],
                ..cmd
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::ModelNotExists(_)));
    }

    #[tokio::test]
    async fn rejects_mixed_currencies() {
        let fx = Fixture::new(1);
        let usd = device::Model {
            id: device::ModelId::new(),
            name: device::ModelName::new("Drone").unwrap(),
            price_per_day: Money {
                amount: 5_000,
                currency: Currency::Usd,
            },
            value: Money {
                amount: 100_000,
                currency: Currency::Usd,
            },
            deposit_percent: "10".parse().unwrap(),
        };
        let fx = fx.with_model(usd.clone());

        let err = fx
            .service
            .execute(CreateOrder {
                customer_id: fx.customer.id,
                items: vec![
                    Item {
                        model_id: fx.model.id,
                        quantity: order::Quantity::new(1).unwrap(),
                    },
                    Item {
                        model_id: usd.id,
                        quantity: order::Quantity::new(1).unwrap(),
                    },
                ],
                start_at: testing::in_days(1).coerce(),
                end_at: testing::in_days(2).coerce(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::CurrencyMismatch(id) if *id == usd.id,
        ));
    }
}
