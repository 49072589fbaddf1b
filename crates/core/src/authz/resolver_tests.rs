//! Decision-table tests for `ScopeResolver`.

use loyalty_shared::types::{CustomerId, TenantId, UserId};
use proptest::prelude::*;
use rstest::rstest;
use uuid::Uuid;

use super::principal::{Principal, Role, UserRoleBinding};
use super::resolver::{AccessDenied, AccessRequest, Decision, ScopeKind, ScopeResolver};

const HOST: TenantId = TenantId::from_uuid(Uuid::from_u128(0x1000));
const T1: TenantId = TenantId::from_uuid(Uuid::from_u128(0x2001));
const T2: TenantId = TenantId::from_uuid(Uuid::from_u128(0x2002));
const C1: CustomerId = CustomerId::from_uuid(Uuid::from_u128(0x3001));
const C2: CustomerId = CustomerId::from_uuid(Uuid::from_u128(0x3002));

fn resolver() -> ScopeResolver {
    ScopeResolver::new(HOST)
}

fn principal(home: Option<TenantId>, roles: &[Role]) -> Principal {
    Principal::authenticated(UserId::new(), home, roles.iter().copied())
}

fn super_admin() -> Principal {
    principal(Some(HOST), &[Role::SuperAdmin])
}

fn owner_of(tenant: TenantId) -> Principal {
    principal(Some(tenant), &[Role::TenantOwner])
}

fn customer(home: Option<TenantId>, id: CustomerId) -> Principal {
    principal(home, &[Role::Customer]).with_customer(id)
}

#[rstest]
// Host super admin may act on any tenant.
#[case(super_admin(), AccessRequest::tenant(Some(T1)), Decision::Allow)]
#[case(super_admin(), AccessRequest::tenant(None), Decision::Allow)]
// Owner is confined to their own tenant.
#[case(owner_of(T1), AccessRequest::tenant(Some(T1)), Decision::Allow)]
#[case(owner_of(T1), AccessRequest::tenant(Some(T2)), Decision::Deny)]
// Owner with no tenant in the route acts on their own tenant.
#[case(owner_of(T1), AccessRequest::tenant(None), Decision::Allow)]
// Super admin role outside the host tenant grants nothing.
#[case(principal(Some(T1), &[Role::SuperAdmin]), AccessRequest::tenant(Some(T2)), Decision::Deny)]
#[case(principal(Some(T1), &[Role::SuperAdmin]), AccessRequest::platform_root(), Decision::Deny)]
// Unauthenticated principals are always denied.
#[case(super_admin().unauthenticated(), AccessRequest::tenant(Some(T1)), Decision::Deny)]
#[case(owner_of(T1).unauthenticated(), AccessRequest::tenant(None), Decision::Deny)]
// Owner without a home tenant never matches.
#[case(principal(None, &[Role::TenantOwner]), AccessRequest::tenant(None), Decision::Deny)]
// Customers and plain users have no tenant scope.
#[case(customer(Some(T1), C1), AccessRequest::tenant(Some(T1)), Decision::Deny)]
#[case(principal(Some(T1), &[Role::User]), AccessRequest::tenant(None), Decision::Deny)]
fn test_tenant_scope(
    #[case] principal: Principal,
    #[case] request: AccessRequest,
    #[case] expected: Decision,
) {
    assert_eq!(resolver().authorize(&principal, &request), expected);
}

#[rstest]
#[case(super_admin(), Decision::Allow)]
#[case(owner_of(HOST), Decision::Deny)]
#[case(principal(Some(HOST), &[Role::User]), Decision::Deny)]
#[case(principal(None, &[Role::SuperAdmin]), Decision::Deny)]
#[case(super_admin().unauthenticated(), Decision::Deny)]
fn test_platform_root(#[case] principal: Principal, #[case] expected: Decision) {
    assert_eq!(
        resolver().authorize(&principal, &AccessRequest::platform_root()),
        expected
    );
}

#[rstest]
#[case(super_admin(), AccessRequest::tenant_customer(T1, C1), Decision::Allow)]
#[case(owner_of(T1), AccessRequest::tenant_customer(T1, C1), Decision::Allow)]
#[case(owner_of(T2), AccessRequest::tenant_customer(T1, C1), Decision::Deny)]
#[case(customer(None, C1), AccessRequest::tenant_customer(T1, C1), Decision::Allow)]
#[case(customer(Some(T2), C1), AccessRequest::tenant_customer(T1, C1), Decision::Allow)]
#[case(customer(Some(T1), C2), AccessRequest::tenant_customer(T1, C1), Decision::Deny)]
#[case(principal(Some(T1), &[Role::Customer]), AccessRequest::tenant_customer(T1, C1), Decision::Deny)]
#[case(principal(Some(T1), &[Role::User]).with_customer(C1), AccessRequest::tenant_customer(T1, C1), Decision::Deny)]
#[case(customer(None, C1).unauthenticated(), AccessRequest::tenant_customer(T1, C1), Decision::Deny)]
fn test_tenant_customer_scope(
    #[case] principal: Principal,
    #[case] request: AccessRequest,
    #[case] expected: Decision,
) {
    assert_eq!(resolver().authorize(&principal, &request), expected);
}

#[rstest]
#[case(super_admin(), AccessRequest::customer(C1), Decision::Allow)]
#[case(customer(None, C1), AccessRequest::customer(C1), Decision::Allow)]
#[case(customer(None, C2), AccessRequest::customer(C1), Decision::Deny)]
#[case(owner_of(T1), AccessRequest::customer(C1), Decision::Deny)]
#[case(
    customer(None, C1),
    AccessRequest { scope: ScopeKind::CustomerAccess, route_tenant: None, route_customer: None },
    Decision::Deny
)]
fn test_customer_scope(
    #[case] principal: Principal,
    #[case] request: AccessRequest,
    #[case] expected: Decision,
) {
    assert_eq!(resolver().authorize(&principal, &request), expected);
}

#[test]
fn test_require_maps_deny_to_error() {
    assert_eq!(
        resolver().require(&owner_of(T1), &AccessRequest::tenant(Some(T2))),
        Err(AccessDenied)
    );
    assert_eq!(
        resolver().require(&owner_of(T1), &AccessRequest::tenant(Some(T1))),
        Ok(())
    );
    assert_eq!(AccessDenied.to_string(), "access denied");
}

#[test]
fn test_customer_from_bindings_reaches_own_account() {
    let user = UserId::new();
    let bindings = [UserRoleBinding {
        user_id: user,
        tenant_id: Some(T1),
        role: Role::Customer,
    }];
    let linked = Principal::from_bindings(user, Some(T1), Some(C1), &bindings);
    let unlinked = Principal::from_bindings(user, Some(T1), None, &bindings);

    assert!(resolver().authorize(&linked, &AccessRequest::tenant_customer(T1, C1)).is_allowed());
    assert!(resolver().authorize(&linked, &AccessRequest::customer(C1)).is_allowed());
    assert!(!resolver().authorize(&linked, &AccessRequest::customer(C2)).is_allowed());
    assert!(!resolver().authorize(&unlinked, &AccessRequest::tenant_customer(T1, C1)).is_allowed());
}

#[test]
fn test_resolver_is_independent_of_previous_calls() {
    let resolver = resolver();
    let request = AccessRequest::tenant(Some(T1));

    assert!(resolver.authorize(&owner_of(T1), &request).is_allowed());
    assert!(!resolver.authorize(&owner_of(T2), &request).is_allowed());
    assert!(resolver.authorize(&owner_of(T1), &request).is_allowed());
}

fn arb_role_set() -> impl Strategy<Value = Vec<Role>> {
    prop::collection::vec(
        prop_oneof![
            Just(Role::SuperAdmin),
            Just(Role::TenantOwner),
            Just(Role::Customer),
            Just(Role::User),
        ],
        0..4,
    )
}

fn arb_tenant() -> impl Strategy<Value = Option<TenantId>> {
    prop_oneof![Just(None), Just(Some(HOST)), Just(Some(T1)), Just(Some(T2))]
}

fn arb_scope() -> impl Strategy<Value = ScopeKind> {
    prop_oneof![
        Just(ScopeKind::PlatformRootAccess),
        Just(ScopeKind::TenantScopeAccess),
        Just(ScopeKind::TenantCustomerAccess),
        Just(ScopeKind::CustomerAccess),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Unauthenticated principals are denied for every scope.
    #[test]
    fn prop_unauthenticated_always_denied(
        roles in arb_role_set(),
        home in arb_tenant(),
        route in arb_tenant(),
        scope in arb_scope(),
    ) {
        let principal = principal(home, &roles).with_customer(C1).unauthenticated();
        let request = AccessRequest { scope, route_tenant: route, route_customer: Some(C1) };
        prop_assert_eq!(resolver().authorize(&principal, &request), Decision::Deny);
    }

    /// A principal without roles is denied for every scope.
    #[test]
    fn prop_no_roles_always_denied(
        home in arb_tenant(),
        route in arb_tenant(),
        scope in arb_scope(),
    ) {
        let principal = principal(home, &[]).with_customer(C1);
        let request = AccessRequest { scope, route_tenant: route, route_customer: Some(C1) };
        prop_assert_eq!(resolver().authorize(&principal, &request), Decision::Deny);
    }

    /// Platform-root access implies tenant-scope access on any tenant.
    #[test]
    fn prop_platform_root_implies_tenant_scope(
        roles in arb_role_set(),
        home in arb_tenant(),
        route in arb_tenant(),
    ) {
        let principal = principal(home, &roles);
        if resolver().authorize(&principal, &AccessRequest::platform_root()).is_allowed() {
            prop_assert!(resolver().authorize(&principal, &AccessRequest::tenant(route)).is_allowed());
        }
    }
}
