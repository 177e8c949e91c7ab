use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    ids::non_blank,
    routes::auth::Claims,
    AppState,
};

#[derive(Clone, Debug)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub username: String,
}

/// Who is making the request.
///
/// A bearer session token, when present, must verify. Handlers combine it with
/// any `user_id` the client put in the body through [`Caller::acting_user`].
#[derive(Clone, Debug, Default)]
pub struct Caller {
    pub session: Option<SessionUser>,
}

impl Caller {
    /// Resolves the user a mutation acts on behalf of.
    ///
    /// The session subject wins; a body `user_id` naming someone else is
    /// rejected rather than silently ignored.
    pub fn acting_user(&self, claimed: Option<&str>) -> Result<String> {
        let claimed = non_blank(claimed);
        match (&self.session, claimed) {
            (Some(session), Some(claimed)) if session.id != claimed => Err(AppError::Forbidden),
            (Some(session), _) => Ok(session.id.clone()),
            (None, Some(claimed)) => Ok(claimed.to_string()),
            (None, None) => Err(AppError::MissingFields),
        }
    }
}

/// `user_id` carried by bodiless requests (DELETE), from the query string or
/// an optional JSON body.
#[derive(Debug, Default, Deserialize)]
pub struct ActorParams {
    pub user_id: Option<String>,
}

impl ActorParams {
    pub fn merge(self, body: Option<Json<ActorParams>>) -> Option<String> {
        body.and_then(|Json(b)| b.user_id).or(self.user_id)
    }
}

pub fn verify_token(token: &str, secret: &str) -> Result<SessionUser> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    Ok(SessionUser {
        id: token_data.claims.sub,
        email: token_data.claims.email,
        username: token_data.claims.username,
    })
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
            Ok(TypedHeader(Authorization(bearer))) => {
                let session = verify_token(bearer.token(), &state.config.jwt_secret)?;
                Ok(Caller {
                    session: Some(session),
                })
            }
            Err(rejection) if rejection.is_missing() => Ok(Caller::default()),
            Err(_) => Err(AppError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str) -> Caller {
        Caller {
            session: Some(SessionUser {
                id: id.to_string(),
                email: format!("{id}@example.com"),
                username: id.to_string(),
            }),
        }
    }

    #[test]
    fn body_user_id_used_without_session() {
        let caller = Caller::default();
        assert_eq!(caller.acting_user(Some("u1")).unwrap(), "u1");
        assert!(matches!(caller.acting_user(None), Err(AppError::MissingFields)));
        assert!(matches!(caller.acting_user(Some("  ")), Err(AppError::MissingFields)));
    }

    #[test]
    fn session_overrides_and_guards_body_user_id() {
        let caller = session("u1");
        assert_eq!(caller.acting_user(None).unwrap(), "u1");
        assert_eq!(caller.acting_user(Some("u1")).unwrap(), "u1");
        assert!(matches!(caller.acting_user(Some("u2")), Err(AppError::Forbidden)));
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        assert!(matches!(
            verify_token("not-a-jwt", "secret"),
            Err(AppError::Unauthorized)
        ));
    }
}
