/// Role-based access control
///
/// Every permission decision in the system is made here. Handlers ask two
/// questions:
///
/// 1. [`authorize`]: may the caller perform this action on this kind of
///    resource at all? A denial becomes 403.
/// 2. [`visibility`]: which records of this kind can the caller see? The
///    models turn the returned [`Visibility`] into a SQL filter, so records
///    outside it are indistinguishable from missing ones (404) and list
///    endpoints simply come back empty.
///
/// Object-level checks ([`require_member_management`],
/// [`require_organization_access`]) and the role-grant rule
/// ([`require_role_grant`]) complete the model.
///
/// # Permission Model
///
/// | Resource | Read | Write |
/// |---|---|---|
/// | Users | Owner/Admin, own organization | Owner/Admin owning the user's organization (Admin: any) |
/// | Organizations | Admin: all, Owner: the one they own | Owner/Admin, owned organization (Admin: any) |
/// | Cargo requests | Admin: all, Owner: organization, Logistician/Driver: assigned | approved Logistician |
/// | Analytics | Owner/Admin with an organization | n/a |
///
/// # Example
///
/// ```
/// use cargodesk_shared::auth::authorization::{authorize, visibility, Action, Resource, Visibility};
/// use cargodesk_shared::auth::middleware::AuthContext;
/// use cargodesk_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let driver = AuthContext {
///     user_id: Uuid::new_v4(),
///     username: "driver".to_string(),
///     role: UserRole::Driver,
///     is_approved: true,
///     organization_id: None,
/// };
///
/// assert!(authorize(&driver, Resource::CargoRequest, Action::Create).is_err());
/// assert_eq!(
///     visibility(&driver, Resource::CargoRequest),
///     Visibility::Driver(driver.user_id),
/// );
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::organization::Organization;
use crate::models::user::{User, UserRole};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller's role may not perform the action
    #[error("Role {} may not {} {}", role.as_str(), action.as_str(), resource.as_str())]
    InsufficientRole {
        role: UserRole,
        resource: Resource,
        action: Action,
    },

    /// Caller has the right role but has not been approved yet
    #[error("Your account has not been approved yet")]
    NotApproved,

    /// Caller is not a member of any organization
    #[error("You are not a member of any organization")]
    NoOrganization,

    /// Caller doesn't own the organization the resource belongs to
    #[error("You do not have permission to perform this action")]
    NotOwner,

    /// Only admins may grant the admin role
    #[error("Only administrators can grant the ADMIN role")]
    AdminGrant,
}

/// Kinds of resources guarded by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Organization,
    CargoRequest,
    Analytics,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::User => "users",
            Resource::Organization => "organizations",
            Resource::CargoRequest => "cargo requests",
            Resource::Analytics => "analytics",
        }
    }
}

/// Actions a caller can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
    Approve,
    Reject,
    UpdateStatus,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Retrieve => "retrieve",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::UpdateStatus => "update the status of",
        }
    }
}

/// Records of one resource kind a caller can see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Everything
    All,

    /// Records belonging to this organization
    Organization(Uuid),

    /// Organizations owned by this user
    Owner(Uuid),

    /// Cargo requests where this user is the logistician
    Logistician(Uuid),

    /// Cargo requests where this user is the driver
    Driver(Uuid),

    /// Nothing at all
    Nothing,
}

/// Decides whether the caller may perform `action` on `resource`
///
/// This is the role gate only; record scoping is [`visibility`] and
/// per-record ownership is checked by the object-level helpers.
///
/// List actions are never denied. Callers without a matching rule get an
/// empty [`Visibility`] instead.
pub fn authorize(caller: &AuthContext, resource: Resource, action: Action) -> Result<(), AuthzError> {
    let denied = || AuthzError::InsufficientRole {
        role: caller.role,
        resource,
        action,
    };

    match (resource, action) {
        (_, Action::List) => Ok(()),

        (Resource::CargoRequest, Action::Retrieve) => Ok(()),
        (Resource::CargoRequest, _) => {
            if caller.role != UserRole::Logistician {
                return Err(denied());
            }
            if !caller.is_approved {
                return Err(AuthzError::NotApproved);
            }
            Ok(())
        }

        (Resource::User | Resource::Organization | Resource::Analytics, _) => {
            if caller.role.is_manager() {
                Ok(())
            } else {
                Err(denied())
            }
        }
    }
}

/// Computes which records of `resource` the caller can see
pub fn visibility(caller: &AuthContext, resource: Resource) -> Visibility {
    let own_organization = || {
        caller
            .organization_id
            .map(Visibility::Organization)
            .unwrap_or(Visibility::Nothing)
    };

    match (resource, caller.role) {
        (Resource::User, role) if role.is_manager() => own_organization(),
        (Resource::User, _) => Visibility::Nothing,

        (Resource::Organization, UserRole::Admin) => Visibility::All,
        (Resource::Organization, UserRole::Owner) => Visibility::Owner(caller.user_id),
        (Resource::Organization, _) => Visibility::Nothing,

        (Resource::CargoRequest, UserRole::Admin) => Visibility::All,
        (Resource::CargoRequest, UserRole::Owner) => own_organization(),
        (Resource::CargoRequest, UserRole::Logistician) => Visibility::Logistician(caller.user_id),
        (Resource::CargoRequest, UserRole::Driver) => Visibility::Driver(caller.user_id),

        (Resource::Analytics, role) if role.is_manager() => own_organization(),
        (Resource::Analytics, _) => Visibility::Nothing,
    }
}

/// Object-level check for managing a user
///
/// Admins pass unconditionally. Anyone else must own the organization the
/// target user belongs to; `organization` is that organization, looked up
/// from the target's `organization_id` (`None` when they have none).
pub fn require_member_management(
    caller: &AuthContext,
    target: &User,
    organization: Option<&Organization>,
) -> Result<(), AuthzError> {
    if caller.is_admin() {
        return Ok(());
    }

    match organization {
        Some(organization)
            if Some(organization.id) == target.organization_id
                && organization.owner_id == caller.user_id =>
        {
            Ok(())
        }
        _ => Err(AuthzError::NotOwner),
    }
}

/// Object-level check for managing an organization
///
/// Admins pass unconditionally; anyone else must be its direct owner.
pub fn require_organization_access(
    caller: &AuthContext,
    organization: &Organization,
) -> Result<(), AuthzError> {
    if caller.is_admin() || organization.owner_id == caller.user_id {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}

/// Checks the caller may assign `role` to a user
///
/// Only admins can create admins.
pub fn require_role_grant(caller: &AuthContext, role: UserRole) -> Result<(), AuthzError> {
    if role == UserRole::Admin && !caller.is_admin() {
        return Err(AuthzError::AdminGrant);
    }
    Ok(())
}

/// Resolves the organization whose analytics report the caller may read
///
/// Fails before any data is touched when the caller is not an owner or
/// admin, or belongs to no organization.
pub fn report_organization(caller: &AuthContext) -> Result<Uuid, AuthzError> {
    authorize(caller, Resource::Analytics, Action::Retrieve)?;

    match visibility(caller, Resource::Analytics) {
        Visibility::Organization(organization_id) => Ok(organization_id),
        _ => Err(AuthzError::NoOrganization),
    }
}

/// Resolves the organization a new cargo request is filed under
///
/// Always the creating logistician's own organization.
pub fn cargo_organization(caller: &AuthContext) -> Result<Uuid, AuthzError> {
    authorize(caller, Resource::CargoRequest, Action::Create)?;
    caller.organization_id.ok_or(AuthzError::NoOrganization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const ROLES: [UserRole; 4] = [
        UserRole::Admin,
        UserRole::Owner,
        UserRole::Logistician,
        UserRole::Driver,
    ];

    fn caller(role: UserRole, organization_id: Option<Uuid>) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            username: format!("{}-user", role.as_str().to_lowercase()),
            role,
            is_approved: true,
            organization_id,
        }
    }

    fn member_of(organization_id: Option<Uuid>) -> User {
        User {
            id: Uuid::new_v4(),
            username: "member".to_string(),
            email: "member@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            role: UserRole::Driver,
            is_approved: false,
            phone: None,
            organization_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    fn organization_owned_by(owner_id: Uuid) -> Organization {
        Organization {
            id: Uuid::new_v4(),
            name: "Acme Freight".to_string(),
            owner_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_list_is_never_denied() {
        for role in ROLES {
            let caller = caller(role, None);
            for resource in [Resource::User, Resource::Organization, Resource::CargoRequest] {
                assert!(authorize(&caller, resource, Action::List).is_ok());
            }
        }
    }

    #[test]
    fn test_cargo_mutations_require_logistician() {
        for role in [UserRole::Admin, UserRole::Owner, UserRole::Driver] {
            let caller = caller(role, Some(Uuid::new_v4()));
            for action in [Action::Create, Action::Update, Action::Delete, Action::UpdateStatus] {
                assert!(matches!(
                    authorize(&caller, Resource::CargoRequest, action),
                    Err(AuthzError::InsufficientRole { .. })
                ));
            }
        }

        let logistician = caller(UserRole::Logistician, Some(Uuid::new_v4()));
        assert!(authorize(&logistician, Resource::CargoRequest, Action::Create).is_ok());
        assert!(authorize(&logistician, Resource::CargoRequest, Action::UpdateStatus).is_ok());
    }

    #[test]
    fn test_unapproved_logistician_cannot_mutate_cargo() {
        let mut logistician = caller(UserRole::Logistician, Some(Uuid::new_v4()));
        logistician.is_approved = false;

        assert!(matches!(
            authorize(&logistician, Resource::CargoRequest, Action::Create),
            Err(AuthzError::NotApproved)
        ));
        assert!(authorize(&logistician, Resource::CargoRequest, Action::Retrieve).is_ok());
    }

    #[test]
    fn test_user_and_organization_actions_require_manager() {
        for resource in [Resource::User, Resource::Organization] {
            for action in [Action::Retrieve, Action::Create, Action::Update, Action::Delete] {
                assert!(authorize(&caller(UserRole::Owner, None), resource, action).is_ok());
                assert!(authorize(&caller(UserRole::Admin, None), resource, action).is_ok());
                assert!(authorize(&caller(UserRole::Logistician, None), resource, action).is_err());
                assert!(authorize(&caller(UserRole::Driver, None), resource, action).is_err());
            }
        }
    }

    #[test]
    fn test_organization_visibility() {
        let admin = caller(UserRole::Admin, None);
        let owner = caller(UserRole::Owner, None);

        assert_eq!(visibility(&admin, Resource::Organization), Visibility::All);
        assert_eq!(
            visibility(&owner, Resource::Organization),
            Visibility::Owner(owner.user_id)
        );

        for role in [UserRole::Logistician, UserRole::Driver] {
            assert_eq!(
                visibility(&caller(role, Some(Uuid::new_v4())), Resource::Organization),
                Visibility::Nothing
            );
        }
    }

    #[test]
    fn test_cargo_visibility() {
        let organization_id = Uuid::new_v4();

        let admin = caller(UserRole::Admin, Some(organization_id));
        let owner = caller(UserRole::Owner, Some(organization_id));
        let logistician = caller(UserRole::Logistician, Some(organization_id));
        let driver = caller(UserRole::Driver, Some(organization_id));

        assert_eq!(visibility(&admin, Resource::CargoRequest), Visibility::All);
        assert_eq!(
            visibility(&owner, Resource::CargoRequest),
            Visibility::Organization(organization_id)
        );
        assert_eq!(
            visibility(&logistician, Resource::CargoRequest),
            Visibility::Logistician(logistician.user_id)
        );
        assert_eq!(
            visibility(&driver, Resource::CargoRequest),
            Visibility::Driver(driver.user_id)
        );

        let orphan_owner = caller(UserRole::Owner, None);
        assert_eq!(visibility(&orphan_owner, Resource::CargoRequest), Visibility::Nothing);
    }

    #[test]
    fn test_user_visibility_is_own_organization() {
        let organization_id = Uuid::new_v4();

        for role in [UserRole::Admin, UserRole::Owner] {
            assert_eq!(
                visibility(&caller(role, Some(organization_id)), Resource::User),
                Visibility::Organization(organization_id)
            );
            assert_eq!(visibility(&caller(role, None), Resource::User), Visibility::Nothing);
        }

        for role in [UserRole::Logistician, UserRole::Driver] {
            assert_eq!(
                visibility(&caller(role, Some(organization_id)), Resource::User),
                Visibility::Nothing
            );
        }
    }

    #[test]
    fn test_member_management_requires_owning_the_organization() {
        let owner = caller(UserRole::Owner, None);
        let organization = organization_owned_by(owner.user_id);
        let member = member_of(Some(organization.id));

        assert!(require_member_management(&owner, &member, Some(&organization)).is_ok());

        let other_owner = caller(UserRole::Owner, Some(organization.id));
        assert!(matches!(
            require_member_management(&other_owner, &member, Some(&organization)),
            Err(AuthzError::NotOwner)
        ));

        let unaffiliated = member_of(None);
        assert!(require_member_management(&owner, &unaffiliated, None).is_err());

        let admin = caller(UserRole::Admin, None);
        assert!(require_member_management(&admin, &unaffiliated, None).is_ok());
    }

    #[test]
    fn test_organization_access() {
        let owner = caller(UserRole::Owner, None);
        let organization = organization_owned_by(owner.user_id);

        assert!(require_organization_access(&owner, &organization).is_ok());
        assert!(require_organization_access(&caller(UserRole::Admin, None), &organization).is_ok());
        assert!(require_organization_access(&caller(UserRole::Owner, None), &organization).is_err());
    }

    #[test]
    fn test_only_admins_grant_admin() {
        let owner = caller(UserRole::Owner, None);
        let admin = caller(UserRole::Admin, None);

        assert!(matches!(
            require_role_grant(&owner, UserRole::Admin),
            Err(AuthzError::AdminGrant)
        ));
        assert!(require_role_grant(&owner, UserRole::Logistician).is_ok());
        assert!(require_role_grant(&admin, UserRole::Admin).is_ok());
    }

    #[test]
    fn test_report_organization() {
        let organization_id = Uuid::new_v4();

        assert_eq!(
            report_organization(&caller(UserRole::Owner, Some(organization_id))).unwrap(),
            organization_id
        );
        assert_eq!(
            report_organization(&caller(UserRole::Admin, Some(organization_id))).unwrap(),
            organization_id
        );
        assert!(matches!(
            report_organization(&caller(UserRole::Owner, None)),
            Err(AuthzError::NoOrganization)
        ));
        assert!(matches!(
            report_organization(&caller(UserRole::Driver, Some(organization_id))),
            Err(AuthzError::InsufficientRole { .. })
        ));
    }

    #[test]
    fn test_cargo_organization_is_the_callers() {
        let organization_id = Uuid::new_v4();
        let logistician = caller(UserRole::Logistician, Some(organization_id));
        assert_eq!(cargo_organization(&logistician).unwrap(), organization_id);

        let homeless = caller(UserRole::Logistician, None);
        assert!(matches!(
            cargo_organization(&homeless),
            Err(AuthzError::NoOrganization)
        ));
    }

    #[test]
    fn test_authz_error_display() {
        let err = AuthzError::InsufficientRole {
            role: UserRole::Driver,
            resource: Resource::CargoRequest,
            action: Action::Create,
        };
        assert_eq!(err.to_string(), "Role DRIVER may not create cargo requests");

        assert!(AuthzError::NotApproved.to_string().contains("approved"));
    }
}
