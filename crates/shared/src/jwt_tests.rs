//! Unit tests for JWT verification.

use super::*;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

const SECRET: &str = "test-secret-key-for-testing";

fn service() -> JwtService {
    JwtService::new(&JwtConfig {
        secret: SECRET.to_string(),
        leeway_secs: 0,
    })
}

fn sign(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[test]
fn test_validate_round_trip() {
    let user_id = Uuid::new_v4();
    let tenant_id = Uuid::new_v4();
    let customer_id = Uuid::new_v4();
    let claims = Claims::new(
        user_id,
        Some(tenant_id),
        vec!["tenant_owner".to_string()],
        Utc::now() + Duration::hours(1),
    )
    .with_customer(customer_id);

    let decoded = service().validate_token(&sign(&claims, SECRET)).unwrap();

    assert_eq!(decoded.user_id(), user_id);
    assert_eq!(decoded.tenant_id(), Some(tenant_id));
    assert_eq!(decoded.customer, Some(customer_id));
    assert_eq!(decoded.roles, vec!["tenant_owner".to_string()]);
}

#[test]
fn test_expired_token() {
    let claims = Claims::new(
        Uuid::new_v4(),
        None,
        vec![],
        Utc::now() - Duration::hours(1),
    );

    let result = service().validate_token(&sign(&claims, SECRET));
    assert!(matches!(result, Err(JwtError::Expired)));
}

#[test]
fn test_wrong_signature_rejected() {
    let claims = Claims::new(
        Uuid::new_v4(),
        None,
        vec![],
        Utc::now() + Duration::hours(1),
    );

    let result = service().validate_token(&sign(&claims, "another-secret"));
    assert!(matches!(result, Err(JwtError::DecodingError(_))));
}

#[test]
fn test_garbage_rejected() {
    assert!(service().validate_token("invalid.token.here").is_err());
}

#[test]
fn test_missing_optional_claims_default() {
    #[derive(serde::Serialize)]
    struct Minimal {
        sub: Uuid,
        iat: i64,
        exp: i64,
    }
    let now = Utc::now();
    let token = encode(
        &Header::default(),
        &Minimal {
            sub: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let claims = service().validate_token(&token).unwrap();
    assert!(claims.tenant.is_none());
    assert!(claims.customer.is_none());
    assert!(claims.roles.is_empty());
}
