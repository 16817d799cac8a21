//! Signature-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{
    GraphQLEnum, GraphQLInputObject, GraphQLObject, GraphQLScalar,
    GraphQLUnion,
};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    Context,
};

/// Electronic `Signature` put on a signable document.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(context = Context)]
pub struct Signature {
    /// Role the signer signed in.
    pub role: Role,

    /// `User` who signed.
    pub signer: api::User,

    /// Opaque signature data provided by the signer.
    pub blob: String,

    /// `DateTime` of the signing.
    pub signed_at: DateTime,
}

impl From<domain::signature::Signature> for Signature {
    fn from(signature: domain::signature::Signature) -> Self {
        let domain::signature::Signature {
            role,
            signer_id,
            blob,
            signed_at,
        } = signature;
        #[expect(
            unsafe_code,
            reason = "`Signature` is verified against an existing `User`"
        )]
        let signer = unsafe { api::User::new_unchecked(signer_id) };
        Self {
            role: role.into(),
            signer,
            blob: blob.to_string(),
            signed_at: signed_at.coerce(),
        }
    }
}

/// Document to be signed.
#[derive(Clone, Copy, Debug, GraphQLInputObject)]
#[graphql(name = "SignatureTargetInput")]
pub struct TargetInput {
    /// Kind of the document.
    pub kind: TargetKind,

    /// ID of the document.
    pub id: Uuid,
}

impl From<TargetInput> for domain::signature::Target {
    fn from(input: TargetInput) -> Self {
        Self::from_parts(input.kind.into(), input.id)
    }
}

/// Document signed with a PIN.
#[derive(Clone, Debug, GraphQLUnion)]
#[graphql(context = Context, name = "SignedDocument")]
pub enum Document {
    /// Rental `Contract`.
    Contract(api::Contract),

    /// Device `HandoverReport`.
    HandoverReport(api::HandoverReport),

    /// `Annex` of a rental period `Extension`.
    Annex(api::Annex),
}

impl From<domain::signature::Document> for Document {
    fn from(document: domain::signature::Document) -> Self {
        use domain::signature::Document as D;

        match document {
            D::Contract(c) => Self::Contract(c.into()),
            D::HandoverReport(r) => Self::HandoverReport(r.into()),
            D::Annex(a) => Self::Annex(a.into()),
        }
    }
}

/// Channel a signing PIN was delivered through.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "PinChannel")]
pub enum Channel {
    /// Email of the signer.
    Email,

    /// SMS to the phone of the signer.
    Sms,
}

impl From<&domain::user::Contact> for Channel {
    fn from(contact: &domain::user::Contact) -> Self {
        match contact {
            domain::user::Contact::Email(_) => Self::Email,
            domain::user::Contact::Phone(_) => Self::Sms,
        }
    }
}

/// Role of a signer.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "SignatureRole",
    with = scalar::Via::<domain::signature::Role>,
)]
pub struct Role(domain::signature::Role);

/// Kind of a signable document.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "SignatureTargetKind",
    with = scalar::Via::<domain::signature::TargetKind>,
)]
pub struct TargetKind(domain::signature::TargetKind);
