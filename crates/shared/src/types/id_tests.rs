use super::*;
use std::str::FromStr;
use uuid::Uuid;

#[test]
fn test_new_ids_are_time_ordered_v7() {
    let first = TenantId::new();
    let second = TenantId::new();
    assert_eq!(first.into_inner().get_version_num(), 7);
    assert!(first.into_inner() <= second.into_inner());
}

#[test]
fn test_from_uuid_round_trips_inner() {
    let uuid = Uuid::new_v4();
    assert_eq!(CustomerId::from_uuid(uuid).into_inner(), uuid);
}

#[test]
fn test_display_matches_uuid() {
    let uuid = Uuid::new_v4();
    assert_eq!(AccountTypeId::from_uuid(uuid).to_string(), uuid.to_string());
}

#[test]
fn test_parse_from_str() {
    let uuid = Uuid::new_v4();
    let id = TransactionTypeId::from_str(&uuid.to_string()).unwrap();
    assert_eq!(id.into_inner(), uuid);
    assert!(TransactionId::from_str("not-a-uuid").is_err());
}

#[test]
fn test_serializes_transparently() {
    let uuid = Uuid::new_v4();
    let json = serde_json::to_string(&TenantId::from_uuid(uuid)).unwrap();
    assert_eq!(json, format!("\"{uuid}\""));

    let back: TenantId = serde_json::from_str(&json).unwrap();
    assert_eq!(back.into_inner(), uuid);
}
