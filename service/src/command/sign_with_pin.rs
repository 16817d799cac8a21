//! [`Command`] for signing a [`Document`] with a [`Pin`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        annex, extension, order,
        signature::{
            Blob, Challenge, Document, Pin, Refusal, Role, Signable as _,
            Signature, SigningDateTime, Target,
        },
        user, Extension, Order, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for signing a [`Document`] with a previously issued [`Pin`].
///
/// A wrong [`Pin`] changes nothing, so the signer may retry. A verified
/// [`Pin`] is consumed and cannot be replayed. Documents of completed or
/// cancelled [`Order`]s cannot be signed.
#[derive(Clone, Debug)]
pub struct SignWithPin {
    /// [`Target`] to be signed.
    pub target: Target,

    /// ID of the signing [`User`].
    pub signer_id: user::Id,

    /// [`Pin`] delivered to the signer.
    pub pin: Pin,

    /// Signature artifact provided by the signer.
    pub blob: Blob,
}

impl<Db, Nt> Command<SignWithPin> for Service<Db, Nt>
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
            Lock<By<Document, Target>>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Extension, order::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Order, order::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Document>, Target>>,
            Ok = Option<Document>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Challenge>, (Target, Role)>>,
            Ok = Option<Challenge>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Extension>, extension::Id>>,
            Ok = Option<Extension>,
            Err = Traced<database::Error>,
        > + Database<Insert<Challenge>, Err = Traced<database::Error>>
        + Database<Insert<Document>, Err = Traced<database::Error>>
        + Database<Insert<Extension>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Document;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SignWithPin) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SignWithPin {
            target,
            signer_id,
            pin,
            blob,
        } = cmd;

        let signer = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(signer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(signer_id))
            .map_err(tracerr::wrap!())?;

        let order_id = self
            .database()
            .execute(Select(By::<Option<Document>, _>::new(target)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::TargetNotExists(target))
            .map_err(tracerr::wrap!())?
            .order_id();

        let order = self
            .database()
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())?;

        let role = Role::of(&signer, &order)
            .ok_or(E::SignerNotAllowed(signer.id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        if matches!(target, Target::Annex(_)) {
            // The `Extension` follows its `Annex` once it becomes active.
            tx.execute(Lock(By::<Extension, _>::new(order.id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        // Avoid signing while the `Order` is being cancelled.
        tx.execute(Lock(By::<Order, _>::new(order.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
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
            .map_err(|r| match r {
                Refusal::AlreadySigned => E::AlreadySigned(target),
                Refusal::Unexpected(role) => E::InvalidSignatureStatus(role),
            })
            .map_err(tracerr::wrap!())?;

        let mut challenge = tx
            .execute(Select(By::<Option<Challenge>, _>::new((target, role))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|c| c.verify(signer.id, &pin))
            .ok_or(E::InvalidPin(target))
            .map_err(tracerr::wrap!())?;
        challenge.consume();

        tx.execute(Insert(challenge))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        doc.sign(Signature {
            role,
            signer_id: signer.id,
            blob,
            signed_at: SigningDateTime::now(),
        });

        if let Document::Annex(a) = &doc {
            if a.status == annex::Status::Active {
                let mut extension = tx
                    .execute(Select(By::<Option<Extension>, _>::new(
                        a.extension_id,
                    )))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::ExtensionNotExists(a.extension_id))
                    .map_err(tracerr::wrap!())?;
                extension.await_payment();

                tx.execute(Insert(extension))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
            }
        }

        tx.execute(Insert(doc.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`{target}` signed by `User(id: {})` as `{role}`",
            signer.id,
        );

        Ok(doc)
    }
}

/// Error of [`SignWithPin`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Document`] is signed already by the [`Role`].
    #[display("`{_0}` is already signed")]
    #[from(ignore)]
    AlreadySigned(#[error(not(source))] Target),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Extension`] of the signed [`Annex`] does not exist.
    ///
    /// [`Annex`]: crate::domain::Annex
    #[display("`Extension(id: {_0})` does not exist")]
    #[from(ignore)]
    ExtensionNotExists(#[error(not(source))] extension::Id),

    /// [`Order`] of the [`Document`] is completed or cancelled.
    #[display("`Order` is in `{_0}` status")]
    #[from(ignore)]
    InvalidOrderStatus(#[error(not(source))] order::Status),

    /// [`Pin`] doesn't match the last one issued to the signer.
    #[display("Invalid PIN for `{_0}`")]
    #[from(ignore)]
    InvalidPin(#[error(not(source))] Target),

    /// [`Document`] doesn't expect a [`Role`]'s signature now.
    #[display("`{_0}` signature is not expected now")]
    #[from(ignore)]
    InvalidSignatureStatus(#[error(not(source))] Role),

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

#[cfg(test)]
mod spec {
    use crate::{
        command::{CreateHandoverReport, SendSignaturePin},
        domain::{
            contract, handover,
            signature::{Blob, Document, Pin, Role, Target},
        },
        testing::Fixture,
        Command as _,
    };

    use super::{ExecutionError, SignWithPin};

    fn wrong(pin: &Pin) -> Pin {
        let digits = pin
            .expose()
            .chars()
            .map(|c| if c == '0' { '1' } else { '0' })
            .collect::<String>();
        Pin::new(digits).unwrap()
    }

    #[tokio::test]
    async fn wrong_pin_changes_nothing() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;
        fx.sign(Target::Contract(confirmed.contract.id), &fx.customer)
            .await;
        let report = fx
            .service
            .execute(CreateHandoverReport {
                order_id: confirmed.order.id,
                initiator_id: fx.staff.id,
                phase: handover::Phase::Checkout,
                observations: vec![],
            })
            .await
            .unwrap();
        let target = Target::HandoverReport(report.id);

        let contact = fx
            .service
            .execute(SendSignaturePin {
                target,
                signer_id: fx.customer.id,
            })
            .await
            .unwrap();
        let pin = fx.outbox().last_pin(&contact).unwrap();

        let err = fx
            .service
            .execute(SignWithPin {
                target,
                signer_id: fx.customer.id,
                pin: wrong(&pin),
                blob: Blob::new("signature").unwrap(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidPin(t) if *t == target,
        ));
        let state = fx.service.database().snapshot();
        assert_eq!(
            state.reports[&report.id].status,
            handover::Status::PendingSignature,
        );
        assert!(state.challenges[&(target, Role::Customer)]
            .consumed_at
            .is_none());

        let doc = fx
            .service
            .execute(SignWithPin {
                target,
                signer_id: fx.customer.id,
                pin: pin.clone(),
                blob: Blob::new("signature").unwrap(),
            })
            .await
            .unwrap();
        let Document::HandoverReport(report) = doc else {
            panic!("expected `HandoverReport`");
        };
        assert_eq!(report.status, handover::Status::CustomerSigned);

        fx.sign(target, &fx.staff).await;
        let state = fx.service.database().snapshot();
        assert_eq!(
            state.reports[&report.id].status,
            handover::Status::Completed,
        );
        assert!(state.reports[&report.id].completed_at.is_some());
    }

    #[tokio::test]
    async fn verified_pin_cannot_be_replayed() {
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
        let pin = fx.outbox().last_pin(&contact).unwrap();
        let cmd = SignWithPin {
            target,
            signer_id: fx.customer.id,
            pin,
            blob: Blob::new("signature").unwrap(),
        };

        let doc = fx.service.execute(cmd.clone()).await.unwrap();
        let Document::Contract(contract) = doc else {
            panic!("expected `Contract`");
        };
        assert_eq!(contract.status, contract::Status::Signed);
        assert_eq!(
            contract.signature.map(|s| s.signer_id),
            Some(fx.customer.id),
        );

        let err = fx.service.execute(cmd).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::AlreadySigned(_)));
    }

    #[tokio::test]
    async fn new_pin_supersedes_previous_one() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;
        let target = Target::Contract(confirmed.contract.id);
        let send = SendSignaturePin {
            target,
            signer_id: fx.customer.id,
        };

        let contact = fx.service.execute(send).await.unwrap();
        let first = fx.outbox().last_pin(&contact).unwrap();
        _ = fx.service.execute(send).await.unwrap();
        let second = fx.outbox().last_pin(&contact).unwrap();
        if first == second {
            return;
        }

        let err = fx
            .service
            .execute(SignWithPin {
                target,
                signer_id: fx.customer.id,
                pin: first,
                blob: Blob::new("signature").unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidPin(_)));
    }

    #[tokio::test]
    async fn pin_is_bound_to_its_recipient() {
        let fx = Fixture::new(1);
        let confirmed = fx.confirmed_order(1).await;
        fx.sign(Target::Contract(confirmed.contract.id), &fx.customer)
            .await;
        let report = fx
            .service
            .execute(CreateHandoverReport {
                order_id: confirmed.order.id,
                initiator_id: fx.staff.id,
                phase: handover::Phase::Checkout,
                observations: vec![],
            })
            .await
            .unwrap();
        let target = Target::HandoverReport(report.id);
        let colleague = fx.add_staff();

        let contact = fx
            .service
            .execute(SendSignaturePin {
                target,
                signer_id: fx.staff.id,
            })
            .await
            .unwrap();
        let pin = fx.outbox().last_pin(&contact).unwrap();

        let err = fx
            .service
            .execute(SignWithPin {
                target,
                signer_id: colleague.id,
                pin,
                blob: Blob::new("signature").unwrap(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidPin(_)));
    }
}
