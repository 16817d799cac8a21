//! [`Order`]-related definitions.

use common::{DateTime, DateTimeOf, Money};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLInputObject, GraphQLObject, GraphQLScalar};
use service::{domain, query, Query as _};
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// Rental [`Order`] of a customer.
#[derive(Clone, Debug, From, Into)]
pub struct Order(domain::Order);

impl Order {
    /// Loads the [`domain::Order`] with the provided ID on behalf of the
    /// current [`Session`].
    ///
    /// # Errors
    ///
    /// Errors if:
    /// - the current HTTP request is not authorized;
    /// - the [`domain::Order`] doesn't exist;
    /// - the current [`Session`] is neither a staff member nor the customer
    ///   of the [`domain::Order`].
    ///
    /// [`Session`]: crate::Session
    pub(crate) async fn load(
        id: domain::order::Id,
        ctx: &Context,
    ) -> Result<domain::Order, Error> {
        let session = ctx.current_session().await?;
        let order = ctx
            .service()
            .execute(query::order::ById::by(id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::query::OrderError::NotExists.into())
            .map_err(ctx.error())?;

        let is_own = session.user_id == api::user::Id::from(order.customer_id);
        if !is_own && !session.is_staff() {
            return Err(api::PrivilegeError::Participant.into())
                .map_err(ctx.error());
        }
        Ok(order)
    }
}

/// Rental `Order` of a customer.
#[graphql_object(context = Context)]
impl Order {
    /// Unique identifier of this `Order`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Customer who placed this `Order`.
    #[must_use]
    pub fn customer(&self) -> api::User {
        #[expect(
            unsafe_code,
            reason = "`Order` loaded from repository guarantees `User` \
                      existence"
        )]
        unsafe {
            api::User::new_unchecked(self.0.customer_id)
        }
    }

    /// Current status of this `Order`.
    #[must_use]
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// Ordered device models with their prices frozen at the checkout.
    #[must_use]
    pub fn lines(&self) -> Vec<Line> {
        self.0.details.iter().cloned().map(Into::into).collect()
    }

    /// Devices allocated to this `Order` on its confirmation.
    #[must_use]
    pub fn devices(&self) -> Vec<api::device::Id> {
        self.0.devices.iter().copied().map(Into::into).collect()
    }

    /// Planned `DateTime` of the rental start.
    #[must_use]
    pub fn start_at(&self) -> DateTime {
        self.0.start_at.coerce()
    }

    /// Planned `DateTime` of the rental end, moved by paid extensions.
    #[must_use]
    pub fn end_at(&self) -> DateTime {
        self.0.end_at.coerce()
    }

    /// `DateTime` when the customer started using the devices.
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime> {
        self.0.started_at.map(DateTimeOf::coerce)
    }

    /// `DateTime` when this `Order` was completed.
    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime> {
        self.0.ended_at.map(DateTimeOf::coerce)
    }

    /// `DateTime` when the upcoming return of the devices was confirmed.
    #[must_use]
    pub fn return_confirmed_at(&self) -> Option<DateTime> {
        self.0.return_confirmed_at.map(DateTimeOf::coerce)
    }

    /// Number of calendar days left until the rental end.
    ///
    /// Negative when the rental end has passed.
    #[must_use]
    pub fn days_remaining(&self) -> i32 {
        let days = self.0.days_remaining(&DateTime::now());
        i32::try_from(days)
            .unwrap_or(if days < 0 { i32::MIN } else { i32::MAX })
    }

    /// Price of renting all the ordered devices for a day.
    #[must_use]
    pub fn daily_price(&self) -> Option<Money> {
        self.0.daily_price()
    }

    /// Price of the whole planned rental period.
    #[must_use]
    pub fn rental_price(&self) -> Option<Money> {
        self.0.rental_price()
    }

    /// Deposit held for all the ordered devices.
    #[must_use]
    pub fn total_deposit(&self) -> Option<Money> {
        self.0.total_deposit()
    }

    /// `DateTime` when this `Order` was placed.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// Latest rental `Contract` of this `Order`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.contract",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn contract(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Contract>, Error> {
        ctx.service()
            .execute(query::contract::OfOrder::by(self.0.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|c| c.map(Into::into))
    }

    /// Handover reports of this `Order` in their creation order.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.handoverReports",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn handover_reports(
        &self,
        ctx: &Context,
    ) -> Result<Vec<api::HandoverReport>, Error> {
        ctx.service()
            .execute(query::handover::ReportsOfOrder::by(self.0.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|r| r.into_iter().map(Into::into).collect())
    }

    /// Deposit `Settlement` of this `Order`, if any.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.settlement",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn settlement(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Settlement>, Error> {
        ctx.service()
            .execute(query::settlement::OfOrder::by(self.0.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|s| s.map(Into::into))
    }

    /// Rental period `Extension`s requested for this `Order`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.extensions",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn extensions(
        &self,
        ctx: &Context,
    ) -> Result<Vec<api::Extension>, Error> {
        ctx.service()
            .execute(query::extension::OfOrder::by(self.0.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|e| e.into_iter().map(Into::into).collect())
    }

    /// `Complaint`s filed about the devices of this `Order`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.complaints",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn complaints(
        &self,
        ctx: &Context,
    ) -> Result<Vec<api::Complaint>, Error> {
        ctx.service()
            .execute(query::complaint::OfOrder::by(self.0.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|c| c.into_iter().map(Into::into).collect())
    }

    /// Delivery and pickup `LogisticsTask`s of this `Order`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Order.logisticsTasks",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn logistics_tasks(
        &self,
        ctx: &Context,
    ) -> Result<Vec<api::LogisticsTask>, Error> {
        ctx.service()
            .execute(query::logistics::TasksOfOrder::by(self.0.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|t| t.into_iter().map(Into::into).collect())
    }
}

/// Line of an `Order`.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(name = "OrderLine")]
pub struct Line {
    /// ID of the ordered device model.
    pub model_id: api::device::ModelId,

    /// Number of ordered devices of the model.
    pub quantity: i32,

    /// Daily rental price of a single device.
    pub price_per_day: Money,

    /// Deposit held for a single device.
    pub deposit_per_unit: Money,
}

impl From<domain::order::Detail> for Line {
    fn from(detail: domain::order::Detail) -> Self {
        let domain::order::Detail {
            model_id,
            quantity,
            price_per_day,
            deposit_per_unit,
        } = detail;
        Self {
            model_id: model_id.into(),
            quantity: quantity.into(),
            price_per_day,
            deposit_per_unit,
        }
    }
}

/// Device model to be ordered.
#[derive(Clone, Copy, Debug, GraphQLInputObject)]
#[graphql(name = "OrderItemInput")]
pub struct ItemInput {
    /// ID of the device model.
    pub model_id: api::device::ModelId,

    /// Number of devices of the model.
    pub quantity: i32,
}

/// Unique identifier of an `Order`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::order::Id)]
#[into(domain::order::Id)]
#[graphql(name = "OrderId", transparent)]
pub struct Id(Uuid);

/// Status of an `Order`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "OrderStatus",
    with = scalar::Via::<domain::order::Status>,
)]
pub struct Status(domain::order::Status);
