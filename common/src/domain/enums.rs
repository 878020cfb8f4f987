//! Closed enumerations of the research records.
//!
//! Values are stored and exchanged verbatim (upper snake case), so each
//! enumeration is just its allow-list.

/// Lifecycle of a record. The usual progression is
/// DRAFT → SUBMITTED → UNDER_REVIEW → (REVISION → SUBMITTED)* → APPROVED → PUBLISHED,
/// with REJECTED reachable from SUBMITTED and UNDER_REVIEW. Not enforced on writes.
pub const STATUS: &[&str] = &[
    "DRAFT",
    "SUBMITTED",
    "UNDER_REVIEW",
    "REVISION",
    "APPROVED",
    "PUBLISHED",
    "REJECTED",
];
pub const DEFAULT_STATUS: &str = "DRAFT";

/// Reviewer facing status
pub const TEACHER_STATUS: &[&str] = &["UPLOADED", "ACCEPTED", "PUBLISHED", "UPDATE"];
pub const DEFAULT_TEACHER_STATUS: &str = "UPLOADED";

pub const JOURNAL_SCOPE: &[&str] = &["NATIONAL", "INTERNATIONAL"];

pub const REVIEW_TYPE: &[&str] = &["PEER_REVIEWED", "NON_PEER_REVIEWED"];

pub const ACCESS_TYPE: &[&str] = &["OPEN_ACCESS", "SUBSCRIPTION", "HYBRID"];

pub const INDEXING: &[&str] = &[
    "SCOPUS",
    "WEB_OF_SCIENCE",
    "UGC_CARE",
    "PUBMED",
    "IEEE",
    "GOOGLE_SCHOLAR",
    "OTHER",
];

pub const QUARTILE: &[&str] = &["Q1", "Q2", "Q3", "Q4", "NA"];

pub const PUBLICATION_MODE: &[&str] = &["PRINT", "ONLINE", "BOTH"];
