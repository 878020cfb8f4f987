use crate::domain::{Role, User, UserId};

/// Helper for building a user fixture.
///
/// Public so that other crates can reuse it for their own tests.
pub fn make_user(id: &str, name: &str, role: Role) -> User {
    User {
        id: user_id(id),
        name: name.to_string(),
        email: format!("{}@university.edu", id),
        role,
    }
}

pub fn user_id(id: &str) -> UserId {
    UserId::try_new(id).unwrap()
}

/// The directory every service test starts from:
/// one admin, two faculty members and two students.
pub fn campus_users() -> Vec<User> {
    vec![
        make_user("a1", "Ada Admin", Role::Admin),
        make_user("f1", "Frank Faculty", Role::Faculty),
        make_user("f2", "Fiona Faculty", Role::Faculty),
        make_user("s1", "Sam Student", Role::Student),
        make_user("s2", "Sara Student", Role::Student),
    ]
}
