//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{query, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the currently authenticated `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myUser",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_user(ctx: &Context) -> Result<api::User, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(query::user::ById::by(my_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| UserError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `User` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist;
    /// - `NOT_STAFF` - the current `User` is not a staff member and tries to
    ///                 access another `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "user",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn user(
        id: api::user::Id,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        let session = ctx.current_session().await?;
        if session.user_id != id && !session.is_staff() {
            return Err(api::PrivilegeError::Staff.into());
        }

        ctx.service()
            .execute(query::user::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| UserError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Order` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `ORDER_NOT_EXISTS` - the `Order` with the specified ID does not
    ///                        exist;
    /// - `NOT_PARTICIPANT` - the current `User` is neither a staff member nor
    ///                       the customer of the `Order`.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "order",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn order(
        id: api::order::Id,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        api::Order::load(id.into(), ctx).await.map(Into::into)
    }

    /// Returns the `Order`s of the specified customer, the most recent first.
    ///
    /// Returns the `Order`s of the current `User` if no customer is
    /// specified.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_STAFF` - the current `User` is not a staff member and tries to
    ///                 access `Order`s of another `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            customer_id = ?customer_id,
            gql.name = "orders",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn orders(
        customer_id: Option<api::user::Id>,
        ctx: &Context,
    ) -> Result<Vec<api::Order>, Error> {
        let session = ctx.current_session().await?;
        let customer_id = customer_id.unwrap_or(session.user_id);
        if customer_id != session.user_id && !session.is_staff() {
            return Err(api::PrivilegeError::Staff.into());
        }

        ctx.service()
            .execute(query::order::OfCustomer::by(customer_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|o| o.into_iter().map(Into::into).collect())
    }

    /// Returns the `Complaint` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `COMPLAINT_NOT_EXISTS` - the `Complaint` with the specified ID does
    ///                            not exist;
    /// - `NOT_PARTICIPANT` - the current `User` is neither a staff member nor
    ///                       the customer of the `Order` the `Complaint` is
    ///                       filed within.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "complaint",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn complaint(
        id: api::complaint::Id,
        ctx: &Context,
    ) -> Result<api::Complaint, Error> {
        let complaint = ctx
            .service()
            .execute(query::complaint::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| ComplaintError::NotExists.into())
            .map_err(ctx.error())?;

        // Checks the access to the `Order` the `Complaint` is filed within.
        _ = api::Order::load(complaint.order_id, ctx).await?;

        Ok(complaint.into())
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` does not exist"]
        NotExists,
    }
}

define_error! {
    enum OrderError {
        #[code = "ORDER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Order` does not exist"]
        NotExists,
    }
}

define_error! {
    enum ComplaintError {
        #[code = "COMPLAINT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Complaint` does not exist"]
        NotExists,
    }
}
