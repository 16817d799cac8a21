//! [`Command`] for authorizing a [`User`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use jsonwebtoken::Validation;
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`] by a [`Session`] issued by the
/// external identity system.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl<Db, Nt> Command<AuthorizeUserSession> for Service<Db, Nt>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        let session = jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.config.jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims;

        self.database()
            .execute(Select(By::new(session.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::UserNotExists(session.user_id))
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),

    /// [`User`] the [`Session`] belongs to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use jsonwebtoken::{EncodingKey, Header};

    use crate::{
        domain::user::{session, Session},
        testing::{self, Fixture},
        Command as _,
    };

    use super::{AuthorizeUserSession, ExecutionError};

    fn token(session: &Session, secret: &[u8]) -> session::Token {
        let raw = jsonwebtoken::encode(
            &Header::default(),
            session,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();
        raw.parse().unwrap()
    }

    #[tokio::test]
    async fn authorizes_existing_user() {
        let fx = Fixture::new(0);
        let session = Session {
            user_id: fx.customer.id,
            expires_at: (DateTime::now() + testing::DAY).coerce(),
        };

        let user = fx
            .service
            .execute(AuthorizeUserSession {
                token: token(&session, testing::JWT_SECRET),
            })
            .await
            .unwrap();

        assert_eq!(user.id, fx.customer.id);
    }

    #[tokio::test]
    async fn rejects_foreign_signature() {
        let fx = Fixture::new(0);
        let session = Session {
            user_id: fx.customer.id,
            expires_at: (DateTime::now() + testing::DAY).coerce(),
        };

        let err = fx
            .service
            .execute(AuthorizeUserSession {
                token: token(&session, b"another secret"),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::JsonWebTokenDecodeError(_),
        ));
    }
}
