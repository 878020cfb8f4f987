use registry_common::{
    AUTHOR_KIND_FIELD_NAME, ID_FIELD_NAME, RECORD_ID_FIELD_NAME, USER_EMAIL_FIELD_NAME,
    USER_ID_FIELD_NAME, USER_NAME_FIELD_NAME, USER_ROLE_FIELD_NAME,
};

use crate::infrastructure::persistence::schema::{AUTHORS_ALIAS, Column, MAIN_ALIAS, USERS_ALIAS};

/// Common columns

pub const ID_COLUMN: Column<'static> = Column {
    qualifier: MAIN_ALIAS,
    name: ID_FIELD_NAME,
};

/// Authorship join columns

pub const RECORD_ID_COLUMN: Column<'static> = Column {
    qualifier: AUTHORS_ALIAS,
    name: RECORD_ID_FIELD_NAME,
};
pub const AUTHOR_ID_COLUMN: Column<'static> = Column {
    qualifier: AUTHORS_ALIAS,
    name: USER_ID_FIELD_NAME,
};
pub const AUTHOR_KIND_COLUMN: Column<'static> = Column {
    qualifier: AUTHORS_ALIAS,
    name: AUTHOR_KIND_FIELD_NAME,
};

/// User directory columns

pub const USER_ID_COLUMN: Column<'static> = Column {
    qualifier: USERS_ALIAS,
    name: ID_FIELD_NAME,
};
pub const USER_NAME_COLUMN: Column<'static> = Column {
    qualifier: USERS_ALIAS,
    name: USER_NAME_FIELD_NAME,
};
pub const USER_EMAIL_COLUMN: Column<'static> = Column {
    qualifier: USERS_ALIAS,
    name: USER_EMAIL_FIELD_NAME,
};
pub const USER_ROLE_COLUMN: Column<'static> = Column {
    qualifier: USERS_ALIAS,
    name: USER_ROLE_FIELD_NAME,
};
