//! [`Command`] definition.

pub mod activate_order;
pub mod authorize_user_session;
pub mod cancel_extension;
pub mod cancel_order;
pub mod complete_order;
pub mod confirm_delivery;
pub mod confirm_extension_payment;
pub mod confirm_order;
pub mod confirm_return;
pub mod confirm_settlement_transaction;
pub mod create_complaint;
pub mod create_handover_report;
pub mod create_order;
pub mod request_extension;
pub mod respond_to_settlement;
pub mod schedule_logistics_task;
pub mod send_signature_pin;
pub mod sign_with_pin;
pub mod submit_settlement;
pub mod transit_complaint;
pub mod transit_logistics_task;
pub mod upsert_settlement;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    activate_order::ActivateOrder,
    authorize_user_session::AuthorizeUserSession,
    cancel_extension::CancelExtension, cancel_order::CancelOrder,
    complete_order::CompleteOrder, confirm_delivery::ConfirmDelivery,
    confirm_extension_payment::ConfirmExtensionPayment,
    confirm_order::ConfirmOrder, confirm_return::ConfirmReturn,
    confirm_settlement_transaction::ConfirmSettlementTransaction,
    create_complaint::CreateComplaint,
    create_handover_report::CreateHandoverReport, create_order::CreateOrder,
    request_extension::RequestExtension,
    respond_to_settlement::RespondToSettlement,
    schedule_logistics_task::ScheduleLogisticsTask,
    send_signature_pin::SendSignaturePin, sign_with_pin::SignWithPin,
    submit_settlement::SubmitSettlement, transit_complaint::TransitComplaint,
    transit_logistics_task::TransitLogisticsTask,
    upsert_settlement::UpsertSettlement,
};
