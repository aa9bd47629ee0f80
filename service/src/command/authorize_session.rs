//! [`Command`] for authorizing a [`Session`].

use derive_more::{Display, Error, From};
use jsonwebtoken::{Algorithm, Validation};
use tracerr::Traced;

use crate::{
    domain::user::{session, Session},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`Session`] issued by the identity provider.
#[derive(Clone, Debug, From)]
pub struct AuthorizeSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl<Db> Command<AuthorizeSession> for Service<Db> {
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeSession,
    ) -> Result<Self::Ok, Self::Err> {
        let AuthorizeSession { token } = cmd;

        let session = jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(tracerr::from_and_wrap!(=> ExecutionError))?
        .claims;

        tracing::trace!(
            user.id = %session.user_id,
            user.role = %session.role,
            "session authorized",
        );

        Ok(session)
    }
}

/// Error of [`AuthorizeSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use jsonwebtoken::{EncodingKey, Header};

    use crate::{
        domain::user::{self, session, Session},
        test_support::{service, JWT_SECRET},
        Command as _,
    };

    use super::{AuthorizeSession, ExecutionError};

    fn token(session: &Session, secret: &[u8]) -> session::Token {
        let token = jsonwebtoken::encode(
            &Header::default(),
            session,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();
        token.parse().unwrap()
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let svc = service();
        let issued = Session {
            user_id: user::Id::new(),
            role: user::Role::Librarian,
            expires_at: now() + 3600,
        };

        let session = svc
            .execute(AuthorizeSession {
                token: token(&issued, JWT_SECRET),
            })
            .await
            .unwrap();

        assert_eq!(session.user_id, issued.user_id);
        assert_eq!(session.role, user::Role::Librarian);
    }

    #[tokio::test]
    async fn rejects_expired_or_forged_tokens() {
        let svc = service();
        let mut session = Session {
            user_id: user::Id::new(),
            role: user::Role::Admin,
            expires_at: now() + 3600,
        };

        let e = svc
            .execute(AuthorizeSession {
                token: token(&session, b"another-secret"),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            e.as_ref(),
            ExecutionError::JsonWebTokenDecodeError(_),
        ));

        session.expires_at = now() - 3600;
        assert!(svc
            .execute(AuthorizeSession {
                token: token(&session, JWT_SECRET),
            })
            .await
            .is_err());

        assert!(svc
            .execute(AuthorizeSession {
                token: "not-a-jwt".parse().unwrap(),
            })
            .await
            .is_err());
    }
}
