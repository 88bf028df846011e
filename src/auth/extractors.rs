use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use uuid::Uuid;

use super::claims::Claims;
use crate::state::AppState;

/// Extracts and validates the bearer JWT, returning the user ID.
/// Every core call downstream takes this ID explicitly; nothing reads an
/// ambient "current user".
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "missing Authorization header".into(),
            ))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "invalid auth scheme".into()))?;

        let cfg = &state.config.jwt;
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&cfg.audience));
        validation.set_issuer(std::slice::from_ref(&cfg.issuer));
        let decoding = DecodingKey::from_secret(cfg.secret.as_bytes());

        let data = decode::<Claims>(token, &decoding, &validation)
            .map_err(|_| (StatusCode::UNAUTHORIZED, "invalid or expired token".into()))?;

        Ok(AuthUser(data.claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::OffsetDateTime;

    fn sign(secret: &str, iss: &str, aud: &str, user_id: Uuid) -> String {
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + 300,
            iss: iss.into(),
            aud: aud.into(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("sign test token")
    }

    fn verify(token: &str, secret: &str, iss: &str, aud: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(&[aud.to_string()]);
        validation.set_issuer(&[iss.to_string()]);
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?;
        Ok(data.claims)
    }

    #[test]
    fn accepts_token_from_the_configured_issuer() {
        let user_id = Uuid::new_v4();
        let token = sign("shared-secret", "foodvision-auth", "foodvision-users", user_id);
        let claims =
            verify(&token, "shared-secret", "foodvision-auth", "foodvision-users").unwrap();
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn rejects_wrong_issuer_or_audience() {
        let token = sign("shared-secret", "other-issuer", "other-aud", Uuid::new_v4());
        assert!(verify(&token, "shared-secret", "foodvision-auth", "foodvision-users").is_err());
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = sign("secret-a", "foodvision-auth", "foodvision-users", Uuid::new_v4());
        assert!(verify(&token, "secret-b", "foodvision-auth", "foodvision-users").is_err());
    }
}
