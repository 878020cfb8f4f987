use std::collections::HashSet;

use crate::domain::migration::MigrationStep;

pub trait Persistence: Send + Sync + Clone + 'static {
    /// load names of the tables present in the database schema
    fn load(&self) -> impl Future<Output = Result<HashSet<String>, anyhow::Error>>;
    /// apply migration steps to database, one transaction per step
    fn apply_migration_steps(
        &self,
        steps: Vec<impl MigrationStep>,
    ) -> impl Future<Output = Result<(), anyhow::Error>>;
    fn database_schema(&self) -> &str;
}
