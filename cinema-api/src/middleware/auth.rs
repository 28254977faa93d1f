use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Staff,
    Customer,
}

impl Role {
    /// Exact match; any other role name gets no staff rights.
    pub fn from_claim(role: &str) -> Self {
        match role {
            "ADMIN" => Role::Admin,
            "STAFF" => Role::Staff,
            _ => Role::Customer,
        }
    }

    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }
}

/// Who is making the request, as established by [`identify_caller`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Authenticated { subject: String, role: Role },
}

impl Caller {
    pub fn is_privileged(&self) -> bool {
        match self {
            Caller::Anonymous => false,
            Caller::Authenticated { role, .. } => role.is_privileged(),
        }
    }
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Caller::Authenticated {
            role: Role::from_claim(&claims.role),
            subject: claims.sub,
        }
    }
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        AppError::AuthenticationError("Given token not valid for any token type".to_string())
    })
}

/// Resolves the caller for every request.
///
/// No `Authorization` header means anonymous; a header that is not a valid
/// bearer token is rejected with 401 before any handler runs.
pub async fn identify_caller(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let caller = if req.headers().contains_key(AUTHORIZATION) {
        let bearer = req
            .headers()
            .typed_get::<Authorization<Bearer>>()
            .ok_or_else(|| {
                AppError::AuthenticationError("Authorization header must be a Bearer token".to_string())
            })?;
        Caller::from(decode_claims(bearer.token(), &state.auth.secret)?)
    } else {
        Caller::Anonymous
    };

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(role: &str, secret: &str) -> String {
        let claims = Claims {
            sub: "user-1".into(),
            role: role.into(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn staff_and_admin_are_privileged() {
        assert!(Role::from_claim("ADMIN").is_privileged());
        assert!(Role::from_claim("STAFF").is_privileged());
        assert!(!Role::from_claim("CUSTOMER").is_privileged());
        assert!(!Role::from_claim("staff").is_privileged());
        assert!(!Role::from_claim("SUPER_ADMIN").is_privileged());
        assert!(!Caller::Anonymous.is_privileged());
    }

    #[test]
    fn decodes_tokens_signed_with_the_configured_secret() {
        let claims = decode_claims(&token("STAFF", "s3cret"), "s3cret").unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(Caller::from(claims).is_privileged());

        assert!(matches!(
            decode_claims(&token("STAFF", "other"), "s3cret"),
            Err(AppError::AuthenticationError(_))
        ));
    }
}
