use std::ops::Deref;
use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::ServiceRequest;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::AUTHORIZATION;
use actix_web::HttpMessage;
use actix_web_lab::middleware::Next;
use secrecy::ExposeSecret;
use secrecy::Secret;

/// The authenticated caller's principal name, extracted from the bearer token by
/// `authenticate`. `Out of scope` per the spec: real bearer-token introspection
/// (exchanging the token for a principal via an identity service) is not this
/// service's concern, but something has to stand in for it so the service runs; a
/// single shared static token maps to a fixed `owner`, in the shape of the
/// teacher's session-based `UserId` extension.
#[derive(Clone)]
pub struct Owner(pub String);

impl Deref for Owner {
    type Target = str;
    fn deref(&self) -> &Self::Target { &self.0 }
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("missing or malformed Authorization header")]
    MissingCredentials,
    #[error("invalid bearer token")]
    InvalidToken,
}

/// A bearer token that resolves to a caller's principal name (`owner`).
pub trait Authenticator: Send + Sync {
    fn authenticate(
        &self,
        token: &str,
    ) -> Result<String, AuthError>;
}

/// Stand-in for real token introspection: a single configured token authenticates
/// as a single fixed owner. Adequate for the single-tenant deployments this service
/// targets; a multi-tenant deployment would swap this for a real introspection
/// client without touching `authenticate_request`.
pub struct StaticTokenAuthenticator {
    token: Secret<String>,
    owner: String,
}

impl StaticTokenAuthenticator {
    pub fn new(
        token: Secret<String>,
        owner: String,
    ) -> Self {
        Self { token, owner }
    }
}

impl Authenticator for StaticTokenAuthenticator {
    fn authenticate(
        &self,
        token: &str,
    ) -> Result<String, AuthError> {
        if token == self.token.expose_secret() {
            Ok(self.owner.clone())
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}

/// Middleware extracting `Authorization: Bearer <token>`, resolving it to an
/// `Owner` via the request's `web::Data<dyn Authenticator>`, and rejecting with
/// `401`/`403` otherwise. In the shape of the teacher's `reject_anonymous_users`.
pub async fn authenticate_request(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let authenticator = req
        .app_data::<actix_web::web::Data<Arc<dyn Authenticator>>>()
        .expect("Authenticator must be registered as app_data")
        .clone();

    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let token = match token {
        Some(token) => token,
        None => return Err(actix_web::error::ErrorUnauthorized(AuthError::MissingCredentials)),
    };

    match authenticator.authenticate(token) {
        Ok(owner) => {
            req.extensions_mut().insert(Owner(owner));
            next.call(req).await
        }
        Err(e @ AuthError::InvalidToken) => Err(actix_web::error::ErrorForbidden(e)),
        Err(e) => Err(actix_web::error::ErrorUnauthorized(e)),
    }
}
