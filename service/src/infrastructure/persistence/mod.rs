pub mod build;
pub mod columns;
pub mod parameters;
pub mod query;
pub mod repository;
pub mod result;
pub mod schema;

pub use repository::PostgresResearchRepository;
