use serde::Serialize;

use crate::domain::{Role, UserId};

/// Institution user as seen by this service. Users are managed by the
/// identity system; research records only reference them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl User {
    /// `Name (email)` rendering used in exports
    pub fn display(&self) -> String {
        format!("{} ({})", self.name, self.email)
    }
}
