use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::{model::user::User, models::Claims};

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

pub fn generate_access_token(user: &User, secret: &str, ttl: usize) -> Result<String, Error> {
    let claims = Claims {
        user_id: user.id,
        sub: user.username.clone(),
        role: user.role.id(),
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    #[test]
    fn token_round_trip_carries_identity() {
        let user = User::new("Admin User".into(), "admin".into(), "h".into(), Role::Admin);
        let token = generate_access_token(&user, "s3cret", 900).unwrap();
        let claims = verify_token(&token, "s3cret").unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.sub, "admin");
        assert_eq!(Role::from_id(claims.role), Some(Role::Admin));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let user = User::new_employee("Bob".into(), "bob".into(), "h".into());
        let token = generate_access_token(&user, "one", 900).unwrap();
        assert!(verify_token(&token, "two").is_err());
    }
}
