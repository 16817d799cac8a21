//! [`Command`] for sending a signing [`Pin`].

use common::operations::{
    By, Commit, Insert, Issue, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        contract, order,
        signature::{
            Challenge, Document, Pin, Refusal, Role, Signable as _, Target,
        },
        user::{self, Contact},
        Order, User,
    },
    infra::{database, notifier, Database, Notifier},
    Service,
};

use super::Command;

/// [`Command`] for issuing a one-time [`Pin`] authorizing a [`User`] to sign
/// a [`Document`].
///
/// The [`Pin`] is delivered to the [`User`]'s [`Contact`] and supersedes any
/// [`Pin`] previously issued for the same [`Target`] and [`Role`]. Documents
/// of completed or cancelled [`Order`]s cannot be signed.
#[derive(Clone, Copy, Debug)]
pub struct SendSignaturePin {
    /// [`Target`] to be signed.
    pub target: Target,

    /// ID of the [`User`] going to sign.
    pub signer_id: user::Id,
}

impl<Db, Nt> Command<SendSignaturePin> for Service<Db, Nt>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Document>, Target>>,
            Ok = Option<Document>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Order, order::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Document, Target>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Document>, Target>>,
            Ok = Option<Document>,
            Err = Traced<database::Error>,
        > + Database<Insert<Challenge>, Err = Traced<database::Error>>
        + Database<Insert<Document>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Nt: Notifier<
        Issue<By<Pin, Contact>>,
        Ok = SecretBox<Pin>,
        Err = Traced<notifier::Error>,
    >,
{
    type Ok = Contact;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: SendSignaturePin,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SendSignaturePin { target, signer_id } = cmd;

        let signer = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(signer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(signer_id))
            .map_err(tracerr::wrap!())?;

        let doc = self
            .database()
            .execute(Select(By::<Option<Document>, _>::new(target)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::TargetNotExists(target))
            .map_err(tracerr::wrap!())?;

        let order = self
            .database()
            .execute(Select(By::<Option<Order>, _>::new(doc.order_id())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(doc.order_id()))
            .map_err(tracerr::wrap!())?;

        let role = Role::of(&signer, &order)
            .ok_or(E::SignerNotAllowed(signer.id))
            .map_err(tracerr::wrap!())?;
        if order.status.is_terminal() {
            return Err(tracerr::new!(E::InvalidOrderStatus(order.status)));
        }
        doc.expects(role)
            .map_err(|r| E::refused(target, r))
            .map_err(tracerr::wrap!())?;

        let contact = signer
            .contact()
            .ok_or(E::ContactMissing(signer.id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Order, _>::new(order.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        // The `Pin` is delivered under this lock, so the stored hash always
        // belongs to the last delivered one.
        tx.execute(Lock(By::<Document, _>::new(target)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let order = tx
            .execute(Select(By::<Option<Order>, _>::new(order.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order.id))
            .map_err(tracerr::wrap!())?;
        if order.status.is_terminal() {
            return Err(tracerr::new!(E::InvalidOrderStatus(order.status)));
        }

        let mut doc = tx
            .execute(Select(By::<Option<Document>, _>::new(target)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::TargetNotExists(target))
            .map_err(tracerr::wrap!())?;
        doc.expects(role)
            .map_err(|r| E::refused(target, r))
            .map_err(tracerr::wrap!())?;

        let pin = self
            .notifier()
            .execute(Issue(By::new(contact.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let challenge =
            Challenge::new(target, role, signer.id, pin.expose_secret());
        tx.execute(Insert(challenge))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        if let Document::Contract(c) = &mut doc {
            if c.status == contract::Status::Draft {
                c.await_signature();
                tx.execute(Insert(doc))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "signing PIN for `{target}` issued to `User(id: {})` as `{role}`",
            signer.id,
        );

        Ok(contact)
    }
}

/// Error of [`SendSignaturePin`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Document`] is signed already by the [`Role`].
    #[display("`{_0}` is already signed")]
    #[from(ignore)]
    AlreadySigned(#[error(not(source))] Target),

    /// [`User`] has no [`Contact`] to deliver the [`Pin`] to.
    #[display("`User(id: {_0})` has no contact to deliver PIN to")]
    #[from(ignore)]
    ContactMissing(#[error(not(source))] user::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Order`] of the [`Document`] is completed or cancelled.
    #[display("`Order` is in `{_0}` status")]
    #[from(ignore)]
    InvalidOrderStatus(#[error(not(source))] order::Status),

    /// [`Document`] doesn't expect a [`Role`]'s signature now.
    #[display("`{_0}` signature is not expected now")]
    #[from(ignore)]
    InvalidSignatureStatus(#[error(not(source))] Role),

    /// [`Notifier`] error.
    #[display("`Notifier` operation failed: {_0}")]
    Notifier(notifier::Error),

    /// [`Order`] of the [`Document`] does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    #[from(ignore)]
    OrderNotExists(#[error(not(source))] order::Id),

    /// [`User`] is neither the [`Order`]'s customer nor a staff member.
    #[display("`User(id: {_0})` is not allowed to sign")]
    #[from(ignore)]
    SignerNotAllowed(#[error(not(source))] user::Id),

    /// [`Document`] to be signed does not exist.
    #[display("`{_0}` does not exist")]
    #[from(ignore)]
    TargetNotExists(#[error(not(source))] Target),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

impl ExecutionError {
    /// Converts the provided [`Refusal`] of the [`Target`] into an
    /// [`ExecutionError`].
    fn refused(target: Target, refusal: Refusal) -> Self {
        match refusal {
            Refusal::AlreadySigned => Self::AlreadySigned(target),
            Refusal::Unexpected(role) => Self::InvalidSignatureStatus(role),
        }
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{RequestExtension, SignWithPin},
        domain::{
            contract,
            signature::{Blob, Role, Target},
            user::Contact,
        },
        testing::{self, Fixture},
        Command as _,
    };

    use super::{ExecutionError, SendSignaturePin};

    #[tokio::test]
    async fn delivers_pin_to_signer_contact() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;
        let target = Target::Contract(confirmed.contract.id);

        let contact = fx
            .service
            .execute(SendSignaturePin {
                target,
                signer_id: fx.customer.id,
            })
            .await
            .unwrap();

        assert_eq!(Some(contact.clone()), fx.customer.contact());
        assert!(fx.outbox().last_pin(&contact).is_some());
        let state = fx.service.database().snapshot();
        assert_eq!(
            state.contracts[&confirmed.contract.id].status,
            contract::Status::PendingSignature,
        );
        let challenge = &state.challenges[&(target, Role::Customer)];
        assert_eq!(challenge.recipient_id, fx.customer.id);
        assert!(challenge.consumed_at.is_none());
    }

    #[tokio::test]
    async fn fails_without_contact() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;
        fx.service.database().with(|s| {
            let customer = s.users.get_mut(&fx.customer.id).unwrap();
            customer.email = None;
            customer.phone = None;
        });

        let err = fx
            .service
            .execute(SendSignaturePin {
                target: Target::Contract(confirmed.contract.id),
                signer_id: fx.customer.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::ContactMissing(_)));
        assert!(fx.outbox().is_empty());
    }

    #[tokio::test]
    async fn refuses_signed_contract() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;
        let target = Target::Contract(confirmed.contract.id);
        fx.sign(target, &fx.customer).await;
        let sent = fx.outbox().len();

        let err = fx
            .service
            .execute(SendSignaturePin {
                target,
                signer_id: fx.customer.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::AlreadySigned(t) if *t == target,
        ));
        assert_eq!(fx.outbox().len(), sent);
    }

    #[tokio::test]
    async fn refuses_unexpected_signers() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;
        let target = Target::Contract(confirmed.contract.id);
        let stranger = fx.add_customer();

        let err = fx
            .service
            .execute(SendSignaturePin {
                target,
                signer_id: stranger.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::SignerNotAllowed(_)));

        let err = fx
            .service
            .execute(SendSignaturePin {
                target,
                signer_id: fx.staff.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidSignatureStatus(Role::Staff),
        ));
    }

    #[tokio::test]
    async fn annex_expects_staff_first() {
        let fx = Fixture::new(1);
        let order = fx.order_in_use(1, 3).await;
        let out = fx
            .service
            .execute(RequestExtension {
                order_id: order.id,
                initiator_id: fx.customer.id,
                new_end_at: order.end_at + testing::DAY,
            })
            .await
            .unwrap();
        let sent = fx.outbox().len();

        let err = fx
            .service
            .execute(SendSignaturePin {
                target: Target::Annex(out.annex.id),
                signer_id: fx.customer.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidSignatureStatus(Role::Customer),
        ));
        assert_eq!(fx.outbox().len(), sent);
    }

    #[tokio::test]
    async fn sends_to_phone_without_email() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;
        fx.service.database().with(|s| {
            s.users.get_mut(&fx.customer.id).unwrap().email = None;
        });

        let contact = fx
            .service
            .execute(SendSignaturePin {
                target: Target::Contract(confirmed.contract.id),
                signer_id: fx.customer.id,
            })
            .await
            .unwrap();

        assert!(matches!(contact, Contact::Phone(_)));
    }

    #[tokio::test]
    async fn last_delivered_pin_wins_concurrent_sends() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;
        let target = Target::Contract(confirmed.contract.id);
        let send = SendSignaturePin {
            target,
            signer_id: fx.customer.id,
        };

        let (first, second) =
            tokio::join!(fx.service.execute(send), fx.service.execute(send));
        let contact = first.unwrap();
        assert_eq!(second.unwrap(), contact);
        assert_eq!(fx.outbox().len(), 2);
        let pin = fx.outbox().last_pin(&contact).unwrap();

        let state = fx.service.database().snapshot();
        assert!(state.challenges[&(target, Role::Customer)]
            .verify(fx.customer.id, &pin));

        _ = fx
            .service
            .execute(SignWithPin {
                target,
                signer_id: fx.customer.id,
                pin,
                blob: Blob::new("signature").unwrap(),
            })
            .await
            .unwrap();
        assert_eq!(
            fx.service.database().snapshot().contracts[&confirmed.contract.id]
                .status,
            contract::Status::Signed,
        );
    }
}
