use std::env;

use anyhow::Context;
use config::{Config, Environment, File};
use dotenvy::dotenv;
use registry_common::infrastructure::database::DatabaseSettings;
use serde::Deserialize;

use crate::domain::access::{AccessPolicies, ScopePolicy};
use crate::domain::pagination::PaginationSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_port: String,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub pagination: PaginationSettings,
    #[serde(default)]
    pub access: AccessSettings,
}

#[derive(Clone, Deserialize)]
pub struct AuthSettings {
    /// HS256 secret shared with the sign in service
    pub jwt_secret: String,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AccessSettings {
    #[serde(default = "default_journal_list_policy")]
    pub journal_list_policy: ScopePolicy,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            journal_list_policy: default_journal_list_policy(),
        }
    }
}

impl From<AccessSettings> for AccessPolicies {
    fn from(settings: AccessSettings) -> Self {
        AccessPolicies {
            journal_list: settings.journal_list_policy,
        }
    }
}

fn default_journal_list_policy() -> ScopePolicy {
    AccessPolicies::default().journal_list
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        let run_mode = load_env("RUN_MODE", "development");

        // APP_AUTH__JWT_SECRET overrides auth.jwt_secret
        let s = Config::builder()
            .add_source(File::with_name("./config/default"))
            .add_source(File::with_name(&format!("./config/{run_mode}")).required(false))
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        s.try_deserialize().with_context(|| "failed to read config")
    }
}

fn load_env(key: &str, default_value: &'static str) -> String {
    env::var(key).unwrap_or_else(|_| default_value.into())
}
