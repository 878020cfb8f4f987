use registry_common::domain::schema::IS_PUBLIC;
use registry_common::{ResourceKind, Role, User, UserId};
use serde::Deserialize;

use crate::domain::error::ResearchError;
use crate::domain::predicate::Predicate;
use crate::domain::publication::Publication;

/// Identity of the user behind a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub role: Role,
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            role: user.role,
        }
    }
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// How far a non-admin caller can see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopePolicy {
    /// public records plus the ones the caller authored
    PublicOrAuthored,
    /// only the records the caller authored
    AuthoredOnly,
}

/// Visibility predicate of `caller` over records of any kind.
/// Admins see everything, anonymous callers public records only.
pub fn resolve_scope(caller: Option<&Caller>, policy: ScopePolicy) -> Predicate {
    let public = Predicate::Eq {
        column: &IS_PUBLIC,
        value: true.into(),
    };

    let Some(caller) = caller else {
        return public;
    };

    let Some(author_kind) = caller.role.author_kind() else {
        return Predicate::True;
    };

    let authored = Predicate::HasAuthor {
        kind: author_kind,
        users: vec![caller.id.clone()],
    };

    match policy {
        ScopePolicy::PublicOrAuthored => Predicate::any(vec![public, authored]),
        ScopePolicy::AuthoredOnly => authored,
    }
}

/// Policies applied to collection reads of each kind
#[derive(Debug, Clone, Copy)]
pub struct AccessPolicies {
    pub journal_list: ScopePolicy,
}

impl AccessPolicies {
    pub fn list_policy(&self, kind: ResourceKind) -> ScopePolicy {
        match kind {
            ResourceKind::Journal => self.journal_list,
            ResourceKind::BookChapter | ResourceKind::Copyright => ScopePolicy::PublicOrAuthored,
        }
    }

    /// single record reads are never narrower than public-or-authored
    pub fn read_policy(&self, _kind: ResourceKind) -> ScopePolicy {
        ScopePolicy::PublicOrAuthored
    }
}

impl Default for AccessPolicies {
    fn default() -> Self {
        Self {
            journal_list: ScopePolicy::AuthoredOnly,
        }
    }
}

/// Admins and the record's own authors may edit it
pub fn ensure_can_modify(caller: &Caller, publication: &Publication) -> Result<(), ResearchError> {
    if caller.is_admin() || publication.is_authored_by(&caller.id) {
        Ok(())
    } else {
        Err(ResearchError::Forbidden(format!(
            "only administrators and authors can modify this {}",
            publication.kind.display_name().to_lowercase()
        )))
    }
}

/// Students cannot delete records
pub fn ensure_can_delete(caller: &Caller) -> Result<(), ResearchError> {
    if caller.role == Role::Student {
        Err(ResearchError::Forbidden(
            "students are not allowed to delete records".to_string(),
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use registry_common::AuthorKind;
    use registry_common::test_utils::user_id;

    use super::*;

    fn caller(id: &str, role: Role) -> Caller {
        Caller {
            id: user_id(id),
            role,
        }
    }

    #[test]
    fn anonymous_sees_public_records() {
        let scope = resolve_scope(None, ScopePolicy::AuthoredOnly);
        assert_eq!(
            scope,
            Predicate::Eq {
                column: &IS_PUBLIC,
                value: true.into()
            }
        );
    }

    #[test]
    fn admin_is_unrestricted() {
        let admin = caller("a1", Role::Admin);
        assert_eq!(resolve_scope(Some(&admin), ScopePolicy::AuthoredOnly), Predicate::True);
    }

    #[test]
    fn student_scope_depends_on_policy() {
        let student = caller("s1", Role::Student);
        let authored = Predicate::HasAuthor {
            kind: AuthorKind::Student,
            users: vec![user_id("s1")],
        };

        assert_eq!(
            resolve_scope(Some(&student), ScopePolicy::AuthoredOnly),
            authored
        );
        match resolve_scope(Some(&student), ScopePolicy::PublicOrAuthored) {
            Predicate::Or(parts) => assert_eq!(parts[1], authored),
            other => panic!("unexpected scope {:?}", other),
        }
    }

    #[test]
    fn journal_list_policy_is_configurable() {
        let policies = AccessPolicies::default();
        assert_eq!(policies.list_policy(ResourceKind::Journal), ScopePolicy::AuthoredOnly);
        assert_eq!(
            policies.list_policy(ResourceKind::Copyright),
            ScopePolicy::PublicOrAuthored
        );
        assert_eq!(
            policies.read_policy(ResourceKind::Journal),
            ScopePolicy::PublicOrAuthored
        );
    }

    #[test]
    fn students_cannot_delete() {
        assert!(ensure_can_delete(&caller("s1", Role::Student)).is_err());
        assert!(ensure_can_delete(&caller("f1", Role::Faculty)).is_ok());
        assert!(ensure_can_delete(&caller("a1", Role::Admin)).is_ok());
    }
}
