//! Organizations and membership.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::id::OrganizationId;

/// A tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Organization {
    pub id: OrganizationId,
    pub slug: String,
    pub name: String,
}

impl Organization {
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: OrganizationId::new(),
            slug: slug.into(),
            name: name.into(),
        }
    }
}

/// Role of a member inside an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Admin,
    Member,
}

impl Role {
    /// Owners and admins may regenerate finished outputs.
    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

/// User membership in an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Membership {
    pub organization_id: OrganizationId,
    pub user_id: String,
    pub role: Role,
}

impl Membership {
    pub fn new(organization_id: OrganizationId, user_id: impl Into<String>, role: Role) -> Self {
        Self {
            organization_id,
            user_id: user_id.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_owners_and_admins_manage() {
        assert!(Role::Owner.can_manage());
        assert!(Role::Admin.can_manage());
        assert!(!Role::Member.can_manage());
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "ADMIN");
    }
}
