use registry_common::UserId;

use crate::domain::error::ResearchError;
use crate::domain::repository::ResearchRepository;
use crate::domain::research::ResearchService;

pub mod access;
pub mod error;
pub mod export;
pub mod filter;
pub mod pagination;
pub mod predicate;
pub mod publication;
pub mod repository;
pub mod research;
pub mod stats;
pub mod validation;

/// Turns a bearer token into the id of the signed in user
pub trait SessionVerifier: Clone + Send + Sync + 'static {
    /// fails with Unauthorized on malformed, expired or forged tokens
    fn verify(&self, token: &str) -> Result<UserId, ResearchError>;
}

//// The global application state shared between all request handlers.
pub trait AppState: Clone + Send + Sync + 'static {
    type R: ResearchRepository;
    type V: SessionVerifier;
    fn research(&self) -> &ResearchService<Self::R>;
    fn sessions(&self) -> &Self::V;
}
