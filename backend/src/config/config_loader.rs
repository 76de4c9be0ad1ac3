use anyhow::{Context, Result};
use crates::payments::stripe_client::DEFAULT_STRIPE_API_BASE;
use std::str::FromStr;

use super::config_model::{BackendServer, Database, DotEnvyConfig, Stripe, Supabase};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Builds the config from any key lookup; `load` passes the process environment.
pub fn from_lookup<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let backend_server = BackendServer {
        port: required_parse(&lookup, "SERVER_PORT_BACKEND")?,
        body_limit: required_parse(&lookup, "SERVER_BODY_LIMIT")?,
        timeout: required_parse(&lookup, "SERVER_TIMEOUT")?,
    };

    let database = Database {
        url: required(&lookup, "DATABASE_URL")?,
        max_connections: optional_parse(&lookup, "DATABASE_MAX_CONNECTIONS")?.unwrap_or(10),
    };

    let supabase = Supabase {
        project_url: required(&lookup, "SUPABASE_PROJECT_URL")?,
        api_key: required(&lookup, "SUPABASE_API_KEY")?,
    };

    let stripe = Stripe {
        secret_key: required(&lookup, "STRIPE_SECRET_KEY")?,
        api_base: lookup("STRIPE_API_BASE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.to_string()),
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        supabase,
        stripe,
    })
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .with_context(|| format!("{key} is invalid"))
}

fn required_parse<F, T>(lookup: &F, key: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    required(lookup, key)?
        .parse()
        .with_context(|| format!("{key} is invalid"))
}

fn optional_parse<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(raw) => Ok(Some(
            raw.parse().with_context(|| format!("{key} is invalid"))?,
        )),
        None => Ok(None),
    }
}
