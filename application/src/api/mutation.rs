//! GraphQL [`Mutation`]s definitions.

use common::{DateTime, Money};
use juniper::graphql_object;
use service::{
    command,
    domain::{self, settlement::Fees},
    Command as _,
};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Places a new `Order` of the provided device models on behalf of the
    /// current `User`.
    ///
    /// Prices and deposits of the device models are frozen at this moment.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_CUSTOMER` - the current `User` is not a customer;
    /// - `NO_ITEMS` - no device models are ordered;
    /// - `INVALID_QUANTITY` - ordered quantity is not positive;
    /// - `DUPLICATE_ITEM` - the same device model is ordered more than once;
    /// - `INVALID_PERIOD` - rental period doesn't end after its start;
    /// - `DEVICE_MODEL_NOT_EXISTS` - an ordered device model does not exist;
    /// - `CURRENCY_MISMATCH` - ordered device models are priced in different
    ///                         currencies;
    /// - `AMOUNT_OVERFLOW` - ordered amounts are too large.
    #[tracing::instrument(
        skip_all,
        fields(
            end_at = %end_at.to_rfc3339(),
            gql.name = "createOrder",
            items = items.len(),
            otel.name = Self::SPAN_NAME,
            start_at = %start_at.to_rfc3339(),
        ),
    )]
    pub async fn create_order(
        items: Vec<api::order::ItemInput>,
        start_at: DateTime,
        end_at: DateTime,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        let items = items
            .into_iter()
            .map(|i| {
                Some(command::create_order::Item {
                    model_id: i.model_id.into(),
                    quantity: domain::order::Quantity::new(i.quantity)?,
                })
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| InputError::InvalidQuantity.into())
            .map_err(ctx.error())?;

        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::CreateOrder {
                customer_id: my_id.into(),
                items,
                start_at: start_at.coerce(),
                end_at: end_at.coerce(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Confirms the `Order`, allocating available devices to it and drafting
    /// its rental `Contract`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_STAFF` - the current `User` is not a staff member;
    /// - `ORDER_NOT_EXISTS` - the `Order` does not exist;
    /// - `INVALID_ORDER_STATUS` - the `Order` is not pending confirmation;
    /// - `DEVICES_UNAVAILABLE` - not enough devices of a model are available.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "confirmOrder",
            order_id = %order_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn confirm_order(
        order_id: api::order::Id,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::ConfirmOrder {
                order_id: order_id.into(),
                initiator_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|o| o.order.into())
    }

    /// Cancels the `Order` before its devices are handed over.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_PARTICIPANT` - the current `User` is neither a staff member nor
    ///                       the customer of the `Order`;
    /// - `ORDER_NOT_EXISTS` - the `Order` does not exist;
    /// - `INVALID_ORDER_STATUS` - the `Order` cannot be cancelled anymore;
    /// - `CHECKOUT_COMPLETED` - the `Order` devices are handed over already.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "cancelOrder",
            order_id = %order_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn cancel_order(
        order_id: api::order::Id,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::CancelOrder {
                order_id: order_id.into(),
                initiator_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Confirms the devices of the `Order` are delivered to its customer.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_STAFF` - the current `User` is not a staff member;
    /// - `ORDER_NOT_EXISTS` - the `Order` does not exist;
    /// - `INVALID_ORDER_STATUS` - the `Order` is not confirmed;
    /// - `CONTRACT_NOT_SIGNED` - the rental `Contract` is not signed;
    /// - `CHECKOUT_NOT_COMPLETED` - the checkout `HandoverReport` is not
    ///                              signed by both sides.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "confirmDelivery",
            order_id = %order_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn confirm_delivery(
        order_id: api::order::Id,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::ConfirmDelivery {
                order_id: order_id.into(),
                initiator_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Starts the rental of the delivered `Order`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_STAFF` - the current `User` is not a staff member;
    /// - `ORDER_NOT_EXISTS` - the `Order` does not exist;
    /// - `INVALID_ORDER_STATUS` - the `Order` delivery is not confirmed;
    /// - `CHECKOUT_NOT_COMPLETED` - the checkout `HandoverReport` is not
    ///                              signed by both sides.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "activateOrder",
            order_id = %order_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn activate_order(
        order_id: api::order::Id,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::ActivateOrder {
                order_id: order_id.into(),
                initiator_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Confirms the devices of the `Order` will be returned at the end of
    /// its rental period.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_PARTICIPANT` - the current `User` is neither a staff member nor
    ///                       the customer of the `Order`;
    /// - `ORDER_NOT_EXISTS` - the `Order` does not exist;
    /// - `INVALID_ORDER_STATUS` - the `Order` is not in use;
    /// - `RETURN_TOO_EARLY` - the rental end is too far away yet.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "confirmReturn",
            order_id = %order_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn confirm_return(
        order_id: api::order::Id,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::ConfirmReturn {
                order_id: order_id.into(),
                initiator_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Completes the `Order` whose devices are checked in and whose
    /// `Settlement` is closed.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_STAFF` - the current `User` is not a staff member;
    /// - `ORDER_NOT_EXISTS` - the `Order` does not exist;
    /// - `INVALID_ORDER_STATUS` - the `Order` is not in use;
    /// - `CHECKIN_NOT_COMPLETED` - the checkin `HandoverReport` is not signed
    ///                             by both sides;
    /// - `SETTLEMENT_NOT_CLOSED` - the `Settlement` of the `Order` is not
    ///                             closed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "completeOrder",
            order_id = %order_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn complete_order(
        order_id: api::order::Id,
        ctx: &Context,
    ) -> Result<api::Order, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::CompleteOrder {
                order_id: order_id.into(),
                initiator_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Creates a new `HandoverReport` recording the condition of the
    /// `Order`'s devices.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_STAFF` - the current `User` is not a staff member;
    /// - `INVALID_NOTE` - an observation note is empty or too long;
    /// - `ORDER_NOT_EXISTS` - the `Order` does not exist;
    /// - `INVALID_ORDER_STATUS` - the `Order` is not at the provided
    ///                            `HandoverPhase`;
    /// - `CONTRACT_NOT_SIGNED` - the rental `Contract` is not signed;
    /// - `DEVICE_NOT_ALLOCATED` - an observed device is not allocated to the
    ///                            `Order`;
    /// - `HANDOVER_REPORT_EXISTS` - the `Order` already has a
    ///                              `HandoverReport` of the provided
    ///                              `HandoverPhase`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createHandoverReport",
            observations = observations.len(),
            order_id = %order_id,
            otel.name = Self::SPAN_NAME,
            phase = %phase,
        ),
    )]
    pub async fn create_handover_report(
        order_id: api::order::Id,
        phase: api::handover::Phase,
        observations: Vec<api::handover::ObservationInput>,
        ctx: &Context,
    ) -> Result<api::HandoverReport, Error> {
        let observations = observations
            .into_iter()
            .map(|o| {
                Some(domain::handover::Observation {
                    device_id: o.device_id.into(),
                    condition: o.condition.into(),
                    note: o
                        .note
                        .map(domain::handover::Note::new)
                        .map_or(Some(None), |n| n.map(Some))?,
                })
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| InputError::InvalidNote.into())
            .map_err(ctx.error())?;

        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::CreateHandoverReport {
                order_id: order_id.into(),
                initiator_id: my_id.into(),
                phase: phase.into(),
                observations,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Issues a new one-time PIN for signing the provided document and
    /// delivers it to the current `User`.
    ///
    /// Any PIN previously issued for the same signing is invalidated.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `SIGNATURE_TARGET_NOT_EXISTS` - the document does not exist;
    /// - `NOT_SIGNER` - the current `User` is not allowed to sign the
    ///                  document;
    /// - `ALREADY_SIGNED` - the document is already signed by the current
    ///                      `User`'s side;
    /// - `INVALID_SIGNATURE_STATUS` - the document doesn't await a signature
    ///                                of the current `User`'s side;
    /// - `INVALID_ORDER_STATUS` - the `Order` of the document is completed or
    ///                            cancelled;
    /// - `CONTACT_MISSING` - the current `User` has neither email nor phone.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "sendSignaturePin",
            otel.name = Self::SPAN_NAME,
            target_id = %target.id,
            target_kind = %target.kind,
        ),
    )]
    pub async fn send_signature_pin(
        target: api::signature::TargetInput,
        ctx: &Context,
    ) -> Result<api::signature::Channel, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::SendSignaturePin {
                target: target.into(),
                signer_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|contact| (&contact).into())
    }

    /// Signs the provided document on behalf of the current `User` with the
    /// PIN delivered to them.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_PIN` - the PIN is malformed, wrong, already used or never
    ///                   issued;
    /// - `INVALID_SIGNATURE` - the signature data is empty or too long;
    /// - `SIGNATURE_TARGET_NOT_EXISTS` - the document does not exist;
    /// - `NOT_SIGNER` - the current `User` is not allowed to sign the
    ///                  document;
    /// - `ALREADY_SIGNED` - the document is already signed by the current
    ///                      `User`'s side;
    /// - `INVALID_SIGNATURE_STATUS` - the document doesn't await a signature
    ///                                of the current `User`'s side;
    /// - `INVALID_ORDER_STATUS` - the `Order` of the document is completed or
    ///                            cancelled.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "signWithPin",
            otel.name = Self::SPAN_NAME,
            target_id = %target.id,
            target_kind = %target.kind,
        ),
    )]
    pub async fn sign_with_pin(
        target: api::signature::TargetInput,
        pin: String,
        signature: String,
        ctx: &Context,
    ) -> Result<api::signature::Document, Error> {
        let pin = domain::signature::Pin::new(pin)
            .ok_or_else(|| InputError::InvalidPin.into())
            .map_err(ctx.error())?;
        let blob = domain::signature::Blob::new(signature)
            .ok_or_else(|| InputError::InvalidSignature.into())
            .map_err(ctx.error())?;

        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::SignWithPin {
                target: target.into(),
                signer_id: my_id.into(),
                pin,
                blob,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Creates or updates the `Settlement` of the returned `Order` with the
    /// provided fees.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_STAFF` - the current `User` is not a staff member;
    /// - `ORDER_NOT_EXISTS` - the `Order` does not exist;
    /// - `INVALID_ORDER_STATUS` - the `Order` devices are not handed over;
    /// - `PICKUP_NOT_COMPLETED` - the `Order` devices are not picked up yet;
    /// - `INVALID_FEES` - a fee is negative or in a foreign currency;
    /// - `SETTLEMENT_LOCKED` - the `Settlement` is already issued or closed;
    /// - `AMOUNT_OVERFLOW` - the fees are too large.
    #[tracing::instrument(
        skip_all,
        fields(
            accessory_fee = %accessory_fee,
            damage_fee = %damage_fee,
            gql.name = "upsertSettlement",
            late_fee = %late_fee,
            order_id = %order_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn upsert_settlement(
        order_id: api::order::Id,
        damage_fee: Money,
        late_fee: Money,
        accessory_fee: Money,
        ctx: &Context,
    ) -> Result<api::Settlement, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::UpsertSettlement {
                order_id: order_id.into(),
                initiator_id: my_id.into(),
                fees: Fees {
                    damage: damage_fee,
                    late: late_fee,
                    accessory: accessory_fee,
                },
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Presents the `Settlement` to the customer for a response.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_STAFF` - the current `User` is not a staff member;
    /// - `SETTLEMENT_NOT_EXISTS` - the `Settlement` does not exist;
    /// - `INVALID_SETTLEMENT_STATE` - the `Settlement` cannot be submitted
    ///                                in its current state.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "submitSettlement",
            otel.name = Self::SPAN_NAME,
            settlement_id = %settlement_id,
        ),
    )]
    pub async fn submit_settlement(
        settlement_id: api::settlement::Id,
        ctx: &Context,
    ) -> Result<api::Settlement, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::SubmitSettlement {
                settlement_id: settlement_id.into(),
                initiator_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Accepts or rejects the `Settlement` of the current `User`'s `Order`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_CUSTOMER` - the current `User` is not the customer of the
    ///                    `Order`;
    /// - `SETTLEMENT_NOT_EXISTS` - the `Settlement` does not exist;
    /// - `INVALID_SETTLEMENT_STATE` - the `Settlement` doesn't await a
    ///                                response.
    #[tracing::instrument(
        skip_all,
        fields(
            accept = accept,
            gql.name = "respondToSettlement",
            otel.name = Self::SPAN_NAME,
            settlement_id = %settlement_id,
        ),
    )]
    pub async fn respond_to_settlement(
        settlement_id: api::settlement::Id,
        accept: bool,
        ctx: &Context,
    ) -> Result<api::Settlement, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::RespondToSettlement {
                settlement_id: settlement_id.into(),
                initiator_id: my_id.into(),
                accept,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Confirms the money transaction of the accepted `Settlement`, closing
    /// it.
    ///
    /// Completes the `Order` if its devices are checked in already.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_STAFF` - the current `User` is not a staff member;
    /// - `SETTLEMENT_NOT_EXISTS` - the `Settlement` does not exist;
    /// - `INVALID_SETTLEMENT_STATE` - the `Settlement` is not accepted by the
    ///                                customer.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "confirmSettlementTransaction",
            otel.name = Self::SPAN_NAME,
            settlement_id = %settlement_id,
        ),
    )]
    pub async fn confirm_settlement_transaction(
        settlement_id: api::settlement::Id,
        ctx: &Context,
    ) -> Result<api::Settlement, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::ConfirmSettlementTransaction {
                settlement_id: settlement_id.into(),
                initiator_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Requests prolonging the rental period of the `Order` up to the
    /// provided `DateTime`, drafting an `Annex` to its `Contract`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_PARTICIPANT` - the current `User` is neither a staff member nor
    ///                       the customer of the `Order`;
    /// - `ORDER_NOT_EXISTS` - the `Order` does not exist;
    /// - `INVALID_ORDER_STATUS` - the `Order` is not in use;
    /// - `CONTRACT_NOT_SIGNED` - the rental `Contract` is not signed;
    /// - `INVALID_END_DATE` - the provided `DateTime` is not after the
    ///                        current rental end;
    /// - `EXTENSION_IN_PROGRESS` - another `Extension` is not finished yet;
    /// - `AMOUNT_OVERFLOW` - the additional price is too large.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "requestExtension",
            new_end_at = %new_end_at.to_rfc3339(),
            order_id = %order_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn request_extension(
        order_id: api::order::Id,
        new_end_at: DateTime,
        ctx: &Context,
    ) -> Result<api::Extension, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::RequestExtension {
                order_id: order_id.into(),
                initiator_id: my_id.into(),
                new_end_at: new_end_at.coerce(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|o| o.extension.into())
    }

    /// Confirms the payment of the `Extension` whose `Annex` is signed,
    /// moving the rental end of its `Order`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_STAFF` - the current `User` is not a staff member;
    /// - `EXTENSION_NOT_EXISTS` - the `Extension` does not exist;
    /// - `INVALID_EXTENSION_STATUS` - the `Extension` doesn't await a
    ///                                payment;
    /// - `ANNEX_NOT_ACTIVE` - the `Annex` is not signed by both sides;
    /// - `INVALID_ORDER_STATUS` - the `Order` is not in use.
    #[tracing::instrument(
        skip_all,
        fields(
            extension_id = %extension_id,
            gql.name = "confirmExtensionPayment",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn confirm_extension_payment(
        extension_id: api::extension::Id,
        ctx: &Context,
    ) -> Result<api::Extension, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::ConfirmExtensionPayment {
                extension_id: extension_id.into(),
                initiator_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Cancels the unpaid `Extension` along with its `Annex`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_PARTICIPANT` - the current `User` is neither a staff member nor
    ///                       the customer of the `Order`;
    /// - `EXTENSION_NOT_EXISTS` - the `Extension` does not exist;
    /// - `INVALID_EXTENSION_STATUS` - the `Extension` is paid or cancelled
    ///                                already.
    #[tracing::instrument(
        skip_all,
        fields(
            extension_id = %extension_id,
            gql.name = "cancelExtension",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn cancel_extension(
        extension_id: api::extension::Id,
        ctx: &Context,
    ) -> Result<api::Extension, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::CancelExtension {
                extension_id: extension_id.into(),
                initiator_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Files a new `Complaint` about a device of the `Order`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_DESCRIPTION` - the description is empty, too long or has
    ///                           surrounding whitespaces;
    /// - `NOT_PARTICIPANT` - the current `User` is neither a staff member nor
    ///                       the customer of the `Order`;
    /// - `ORDER_NOT_EXISTS` - the `Order` does not exist;
    /// - `DEVICE_NOT_ALLOCATED` - the device is not allocated to the `Order`.
    #[tracing::instrument(
        skip_all,
        fields(
            device_id = %device_id,
            gql.name = "createComplaint",
            order_id = %order_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn create_complaint(
        order_id: api::order::Id,
        device_id: api::device::Id,
        description: String,
        ctx: &Context,
    ) -> Result<api::Complaint, Error> {
        let description = domain::complaint::Description::new(description)
            .ok_or_else(|| InputError::InvalidDescription.into())
            .map_err(ctx.error())?;

        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::CreateComplaint {
                order_id: order_id.into(),
                author_id: my_id.into(),
                device_id: device_id.into(),
                description,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Moves the `Complaint` to the provided `ComplaintStatus`, optionally
    /// describing its resolution.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_DESCRIPTION` - the resolution is empty, too long or has
    ///                           surrounding whitespaces;
    /// - `NOT_STAFF` - the current `User` is not a staff member;
    /// - `COMPLAINT_NOT_EXISTS` - the `Complaint` does not exist;
    /// - `INVALID_COMPLAINT_STATUS` - the `Complaint` cannot be moved to the
    ///                                provided `ComplaintStatus`.
    #[tracing::instrument(
        skip_all,
        fields(
            complaint_id = %complaint_id,
            gql.name = "transitComplaint",
            otel.name = Self::SPAN_NAME,
            status = %status,
        ),
    )]
    pub async fn transit_complaint(
        complaint_id: api::complaint::Id,
        status: api::complaint::Status,
        resolution: Option<String>,
        ctx: &Context,
    ) -> Result<api::Complaint, Error> {
        let resolution = resolution
            .map(|r| {
                domain::complaint::Description::new(r)
                    .ok_or_else(|| InputError::InvalidDescription.into())
                    .map_err(ctx.error())
            })
            .transpose()?;

        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::TransitComplaint {
                complaint_id: complaint_id.into(),
                initiator_id: my_id.into(),
                status: status.into(),
                resolution,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Schedules a new delivery or pickup `LogisticsTask` for the `Order`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_STAFF` - the current `User` is not a staff member;
    /// - `ORDER_NOT_EXISTS` - the `Order` does not exist;
    /// - `INVALID_ORDER_STATUS` - the `Order` is pending, completed or
    ///                            cancelled.
    #[tracing::instrument(
        skip_all,
        fields(
            category = %category,
            gql.name = "scheduleLogisticsTask",
            order_id = %order_id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn schedule_logistics_task(
        order_id: api::order::Id,
        category: api::logistics::Category,
        ctx: &Context,
    ) -> Result<api::LogisticsTask, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::ScheduleLogisticsTask {
                order_id: order_id.into(),
                initiator_id: my_id.into(),
                category: category.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Moves the `LogisticsTask` to the provided `LogisticsTaskStatus`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_STAFF` - the current `User` is not a staff member;
    /// - `LOGISTICS_TASK_NOT_EXISTS` - the `LogisticsTask` does not exist;
    /// - `INVALID_TASK_STATUS` - the `LogisticsTask` cannot be moved to the
    ///                           provided `LogisticsTaskStatus`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "transitLogisticsTask",
            otel.name = Self::SPAN_NAME,
            status = %status,
            task_id = %task_id,
        ),
    )]
    pub async fn transit_logistics_task(
        task_id: api::logistics::Id,
        status: api::logistics::Status,
        ctx: &Context,
    ) -> Result<api::LogisticsTask, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::TransitLogisticsTask {
                task_id: task_id.into(),
                initiator_id: my_id.into(),
                status: status.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

define_error! {
    enum InputError {
        #[code = "INVALID_QUANTITY"]
        #[status = BAD_REQUEST]
        #[message = "Ordered quantity must be positive"]
        InvalidQuantity,

        #[code = "INVALID_NOTE"]
        #[status = BAD_REQUEST]
        #[message = "Observation note must be non-empty and not too long"]
        InvalidNote,

        #[code = "INVALID_PIN"]
        #[status = FORBIDDEN]
        #[message = "Provided PIN is invalid"]
        InvalidPin,

        #[code = "INVALID_SIGNATURE"]
        #[status = BAD_REQUEST]
        #[message = "Signature data must be non-empty and not too long"]
        InvalidSignature,

        #[code = "INVALID_DESCRIPTION"]
        #[status = BAD_REQUEST]
        #[message = "Description must be non-empty, not too long and have \
                     no surrounding whitespaces"]
        InvalidDescription,
    }
}

define_error! {
    enum OrderError {
        #[code = "INVALID_ORDER_STATUS"]
        #[status = CONFLICT]
        #[message = "`Order` is in an invalid status for the operation"]
        InvalidStatus,

        #[code = "CONTRACT_NOT_SIGNED"]
        #[status = CONFLICT]
        #[message = "Rental `Contract` of the `Order` is not signed"]
        ContractNotSigned,

        #[code = "CHECKOUT_NOT_COMPLETED"]
        #[status = CONFLICT]
        #[message = "Checkout `HandoverReport` of the `Order` is not \
                     completed"]
        CheckoutNotCompleted,

        #[code = "DEVICE_NOT_ALLOCATED"]
        #[status = BAD_REQUEST]
        #[message = "Device is not allocated to the `Order`"]
        DeviceNotAllocated,

        #[code = "AMOUNT_OVERFLOW"]
        #[status = BAD_REQUEST]
        #[message = "Amounts are too large"]
        AmountOverflow,
    }
}

impl AsError for command::create_order::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CURRENCY_MISMATCH"]
                #[status = BAD_REQUEST]
                #[message = "Ordered device models are priced in different \
                             currencies"]
                CurrencyMismatch,

                #[code = "DUPLICATE_ITEM"]
                #[status = BAD_REQUEST]
                #[message = "The same device model is ordered more than once"]
                DuplicateItem,

                #[code = "INVALID_PERIOD"]
                #[status = BAD_REQUEST]
                #[message = "Rental period must end after its start"]
                InvalidPeriod,

                #[code = "DEVICE_MODEL_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "Ordered device model does not exist"]
                ModelNotExists,

                #[code = "NO_ITEMS"]
                #[status = BAD_REQUEST]
                #[message = "At least one device model must be ordered"]
                NoItems,
            }
        }

        Some(match self {
            Self::AmountOverflow => OrderError::AmountOverflow.into(),
            Self::CurrencyMismatch(_) => Error::CurrencyMismatch.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::DuplicateItem(_) => Error::DuplicateItem.into(),
            Self::InvalidPeriod => Error::InvalidPeriod.into(),
            Self::ModelNotExists(_) => Error::ModelNotExists.into(),
            Self::NoItems => Error::NoItems.into(),
            Self::UserNotCustomer(_) => api::PrivilegeError::Customer.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

impl AsError for command::confirm_order::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "DEVICES_UNAVAILABLE"]
                #[status = CONFLICT]
                #[message = "Not enough devices of an ordered model are \
                             available"]
                DevicesUnavailable,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::DevicesUnavailable(_) => Error::DevicesUnavailable.into(),
            Self::InvalidOrderStatus(_) => OrderError::InvalidStatus.into(),
            Self::OrderNotExists(_) => api::query::OrderError::NotExists.into(),
            Self::UserNotStaff(_) => api::PrivilegeError::Staff.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

impl AsError for command::cancel_order::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CHECKOUT_COMPLETED"]
                #[status = CONFLICT]
                #[message = "Devices of the `Order` are handed over already"]
                CheckoutCompleted,
            }
        }

        Some(match self {
            Self::CheckoutCompleted(_) => Error::CheckoutCompleted.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidOrderStatus(_) => OrderError::InvalidStatus.into(),
            Self::OrderNotExists(_) => api::query::OrderError::NotExists.into(),
            Self::UserNotAllowed(_) => api::PrivilegeError::Participant.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

impl AsError for command::confirm_delivery::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::CheckoutNotCompleted(_) => {
                OrderError::CheckoutNotCompleted.into()
            }
            Self::ContractNotSigned(_) => OrderError::ContractNotSigned.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidOrderStatus(_) => OrderError::InvalidStatus.into(),
            Self::OrderNotExists(_) => api::query::OrderError::NotExists.into(),
            Self::UserNotStaff(_) => api::PrivilegeError::Staff.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

impl AsError for command::activate_order::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::CheckoutNotCompleted(_) => {
                OrderError::CheckoutNotCompleted.into()
            }
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidOrderStatus(_) => OrderError::InvalidStatus.into(),
            Self::OrderNotExists(_) => api::query::OrderError::NotExists.into(),
            Self::UserNotStaff(_) => api::PrivilegeError::Staff.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

impl AsError for command::confirm_return::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "RETURN_TOO_EARLY"]
                #[status = CONFLICT]
                #[message = "Return can be confirmed only close to the rental \
                             end"]
                ReturnTooEarly,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidOrderStatus(_) => OrderError::InvalidStatus.into(),
            Self::OrderNotExists(_) => api::query::OrderError::NotExists.into(),
            Self::ReturnTooEarly(_) => Error::ReturnTooEarly.into(),
            Self::UserNotAllowed(_) => api::PrivilegeError::Participant.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

impl AsError for command::complete_order::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CHECKIN_NOT_COMPLETED"]
                #[status = CONFLICT]
                #[message = "Checkin `HandoverReport` of the `Order` is not \
                             completed"]
                CheckinNotCompleted,

                #[code = "SETTLEMENT_NOT_CLOSED"]
                #[status = CONFLICT]
                #[message = "`Settlement` of the `Order` is not closed"]
                SettlementNotClosed,
            }
        }

        Some(match self {
            Self::CheckinNotCompleted(_) => Error::CheckinNotCompleted.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidOrderStatus(_) => OrderError::InvalidStatus.into(),
            Self::OrderNotExists(_) => api::query::OrderError::NotExists.into(),
            Self::SettlementNotClosed(_) => Error::SettlementNotClosed.into(),
            Self::UserNotStaff(_) => api::PrivilegeError::Staff.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

impl AsError for command::create_handover_report::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "HANDOVER_REPORT_EXISTS"]
                #[status = CONFLICT]
                #[message = "`Order` already has a `HandoverReport` of this \
                             phase"]
                ReportExists,
            }
        }

        Some(match self {
            Self::ContractNotSigned(_) => OrderError::ContractNotSigned.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::DeviceNotAllocated(_) => {
                OrderError::DeviceNotAllocated.into()
            }
            Self::InvalidOrderStatus(_) => OrderError::InvalidStatus.into(),
            Self::OrderNotExists(_) => api::query::OrderError::NotExists.into(),
            Self::ReportExists(_) => Error::ReportExists.into(),
            Self::UserNotStaff(_) => api::PrivilegeError::Staff.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

define_error! {
    enum SignatureError {
        #[code = "SIGNATURE_TARGET_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "Document to be signed does not exist"]
        TargetNotExists,

        #[code = "NOT_SIGNER"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` is not allowed to sign the document"]
        SignerNotAllowed,

        #[code = "ALREADY_SIGNED"]
        #[status = CONFLICT]
        #[message = "Document is already signed by this side"]
        AlreadySigned,

        #[code = "INVALID_SIGNATURE_STATUS"]
        #[status = CONFLICT]
        #[message = "Document doesn't await a signature of this side"]
        InvalidStatus,
    }
}

impl AsError for command::send_signature_pin::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CONTACT_MISSING"]
                #[status = CONFLICT]
                #[message = "`User` has neither email nor phone to deliver \
                             the PIN to"]
                ContactMissing,
            }
        }

        Some(match self {
            Self::AlreadySigned(_) => SignatureError::AlreadySigned.into(),
            Self::ContactMissing(_) => Error::ContactMissing.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidOrderStatus(_) => OrderError::InvalidStatus.into(),
            Self::InvalidSignatureStatus(_) => {
                SignatureError::InvalidStatus.into()
            }
            Self::Notifier(_) | Self::OrderNotExists(_) => return None,
            Self::SignerNotAllowed(_) => {
                SignatureError::SignerNotAllowed.into()
            }
            Self::TargetNotExists(_) => SignatureError::TargetNotExists.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

impl AsError for command::sign_with_pin::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::AlreadySigned(_) => SignatureError::AlreadySigned.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::ExtensionNotExists(_) | Self::OrderNotExists(_) => {
                return None
            }
            Self::InvalidOrderStatus(_) => OrderError::InvalidStatus.into(),
            Self::InvalidPin(_) => InputError::InvalidPin.into(),
            Self::InvalidSignatureStatus(_) => {
                SignatureError::InvalidStatus.into()
            }
            Self::SignerNotAllowed(_) => {
                SignatureError::SignerNotAllowed.into()
            }
            Self::TargetNotExists(_) => SignatureError::TargetNotExists.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

define_error! {
    enum SettlementError {
        #[code = "SETTLEMENT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Settlement` does not exist"]
        NotExists,

        #[code = "INVALID_SETTLEMENT_STATE"]
        #[status = CONFLICT]
        #[message = "`Settlement` is in an invalid state for the operation"]
        InvalidState,
    }
}

impl AsError for command::upsert_settlement::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVALID_FEES"]
                #[status = BAD_REQUEST]
                #[message = "Fees must be non-negative and in the currency of \
                             the `Order`"]
                InvalidFees,

                #[code = "PICKUP_NOT_COMPLETED"]
                #[status = CONFLICT]
                #[message = "Devices of the `Order` are not picked up yet"]
                PickupNotCompleted,

                #[code = "SETTLEMENT_LOCKED"]
                #[status = CONFLICT]
                #[message = "`Settlement` is issued to the customer already"]
                SettlementLocked,
            }
        }

        Some(match self {
            Self::AmountOverflow => OrderError::AmountOverflow.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidFees => Error::InvalidFees.into(),
            Self::InvalidOrderStatus(_) => OrderError::InvalidStatus.into(),
            Self::OrderNotExists(_) => api::query::OrderError::NotExists.into(),
            Self::PickupNotCompleted(_) => Error::PickupNotCompleted.into(),
            Self::SettlementLocked(_) => Error::SettlementLocked.into(),
            Self::UserNotStaff(_) => api::PrivilegeError::Staff.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

impl AsError for command::submit_settlement::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidSettlementState(_) => {
                SettlementError::InvalidState.into()
            }
            Self::SettlementNotExists(_) => SettlementError::NotExists.into(),
            Self::UserNotStaff(_) => api::PrivilegeError::Staff.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

impl AsError for command::respond_to_settlement::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::BrokenReference(_) => return None,
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidSettlementState(_) => {
                SettlementError::InvalidState.into()
            }
            Self::SettlementNotExists(_) => SettlementError::NotExists.into(),
            Self::UserNotCustomer(_) => api::PrivilegeError::Customer.into(),
        })
    }
}

impl AsError for command::confirm_settlement_transaction::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidSettlementState(_) => {
                SettlementError::InvalidState.into()
            }
            Self::SettlementNotExists(_) => SettlementError::NotExists.into(),
            Self::UserNotStaff(_) => api::PrivilegeError::Staff.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

define_error! {
    enum ExtensionError {
        #[code = "EXTENSION_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Extension` does not exist"]
        NotExists,

        #[code = "INVALID_EXTENSION_STATUS"]
        #[status = CONFLICT]
        #[message = "`Extension` is in an invalid status for the operation"]
        InvalidStatus,
    }
}

impl AsError for command::request_extension::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "EXTENSION_IN_PROGRESS"]
                #[status = CONFLICT]
                #[message = "Another `Extension` of the `Order` is not \
                             finished yet"]
                ExtensionInProgress,

                #[code = "INVALID_END_DATE"]
                #[status = BAD_REQUEST]
                #[message = "New rental end must be after the current one"]
                InvalidEndDate,
            }
        }

        Some(match self {
            Self::AmountOverflow => OrderError::AmountOverflow.into(),
            Self::ContractNotSigned(_) => OrderError::ContractNotSigned.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::ExtensionInProgress(_) => Error::ExtensionInProgress.into(),
            Self::InvalidEndDate(_) => Error::InvalidEndDate.into(),
            Self::InvalidOrderStatus(_) => OrderError::InvalidStatus.into(),
            Self::OrderNotExists(_) => api::query::OrderError::NotExists.into(),
            Self::UserNotAllowed(_) => api::PrivilegeError::Participant.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

impl AsError for command::confirm_extension_payment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ANNEX_NOT_ACTIVE"]
                #[status = CONFLICT]
                #[message = "`Annex` of the `Extension` is not signed by both \
                             sides"]
                AnnexNotActive,
            }
        }

        Some(match self {
            Self::AnnexNotActive(_) => Error::AnnexNotActive.into(),
            Self::BrokenReference(_) | Self::UserNotExists(_) => return None,
            Self::Db(e) => return e.try_as_error(),
            Self::ExtensionNotExists(_) => ExtensionError::NotExists.into(),
            Self::InvalidExtensionStatus(_) => {
                ExtensionError::InvalidStatus.into()
            }
            Self::InvalidOrderStatus(_) => OrderError::InvalidStatus.into(),
            Self::OrderNotExists(_) => api::query::OrderError::NotExists.into(),
            Self::UserNotStaff(_) => api::PrivilegeError::Staff.into(),
        })
    }
}

impl AsError for command::cancel_extension::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::BrokenReference(_) | Self::UserNotExists(_) => return None,
            Self::Db(e) => return e.try_as_error(),
            Self::ExtensionNotExists(_) => ExtensionError::NotExists.into(),
            Self::InvalidExtensionStatus(_) => {
                ExtensionError::InvalidStatus.into()
            }
            Self::UserNotAllowed(_) => api::PrivilegeError::Participant.into(),
        })
    }
}

impl AsError for command::create_complaint::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::DeviceNotAllocated(_) => {
                OrderError::DeviceNotAllocated.into()
            }
            Self::OrderNotExists(_) => api::query::OrderError::NotExists.into(),
            Self::UserNotAllowed(_) => api::PrivilegeError::Participant.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

impl AsError for command::transit_complaint::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVALID_COMPLAINT_STATUS"]
                #[status = CONFLICT]
                #[message = "`Complaint` cannot be moved to the provided \
                             status"]
                InvalidComplaintStatus,
            }
        }

        Some(match self {
            Self::ComplaintNotExists(_) => {
                api::query::ComplaintError::NotExists.into()
            }
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidComplaintStatus { .. } => {
                Error::InvalidComplaintStatus.into()
            }
            Self::UserNotStaff(_) => api::PrivilegeError::Staff.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

impl AsError for command::schedule_logistics_task::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidOrderStatus(_) => OrderError::InvalidStatus.into(),
            Self::OrderNotExists(_) => api::query::OrderError::NotExists.into(),
            Self::UserNotStaff(_) => api::PrivilegeError::Staff.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}

impl AsError for command::transit_logistics_task::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "LOGISTICS_TASK_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`LogisticsTask` does not exist"]
                TaskNotExists,

                #[code = "INVALID_TASK_STATUS"]
                #[status = CONFLICT]
                #[message = "`LogisticsTask` cannot be moved to the provided \
                             status"]
                InvalidTaskStatus,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidTaskStatus { .. } => Error::InvalidTaskStatus.into(),
            Self::TaskNotExists(_) => Error::TaskNotExists.into(),
            Self::UserNotStaff(_) => api::PrivilegeError::Staff.into(),
            Self::UserNotExists(_) => return None,
        })
    }
}
