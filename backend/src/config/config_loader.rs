use anyhow::{Context, Result};
use crates::domain::value_objects::enums::gateway_environments::GatewayEnvironment;

use super::{
    config_model::{
        Autopay, BackendServer, Database, DotEnvyConfig, Internal, UserSecret, WebhookCredentials,
    },
    stage::Stage,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: std::env::var("SERVER_PORT_BACKEND")
            .expect("SERVER_PORT_BACKEND is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let internal = Internal {
        cron_token: optional_var("INTERNAL_CRON_TOKEN"),
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        autopay: get_autopay()?,
        internal,
    })
}

/// Gateway settings, shared by the backend and the worker.
pub fn get_autopay() -> Result<Autopay> {
    dotenvy::dotenv().ok();

    let environment_raw = std::env::var("AUTOPAY_ENV").unwrap_or_else(|_| "SANDBOX".to_string());
    let environment = GatewayEnvironment::from_str(&environment_raw)
        .with_context(|| format!("AUTOPAY_ENV is invalid: {environment_raw}"))?;

    let webhook = match (
        optional_var("AUTOPAY_WEBHOOK_USERNAME"),
        optional_var("AUTOPAY_WEBHOOK_PASSWORD"),
    ) {
        (Some(username), Some(password)) => Some(WebhookCredentials { username, password }),
        _ => None,
    };

    Ok(Autopay {
        environment,
        client_id: std::env::var("AUTOPAY_CLIENT_ID").expect("AUTOPAY_CLIENT_ID is invalid"),
        client_secret: std::env::var("AUTOPAY_CLIENT_SECRET")
            .expect("AUTOPAY_CLIENT_SECRET is invalid"),
        client_version: std::env::var("AUTOPAY_CLIENT_VERSION")
            .unwrap_or_else(|_| "1".to_string()),
        base_url: std::env::var("AUTOPAY_BASE_URL").expect("AUTOPAY_BASE_URL is invalid"),
        auth_url: std::env::var("AUTOPAY_AUTH_URL").expect("AUTOPAY_AUTH_URL is invalid"),
        http_timeout_secs: std::env::var("AUTOPAY_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("AUTOPAY_HTTP_TIMEOUT_SECS is invalid")?,
        webhook,
        mandate_validity_days: std::env::var("AUTOPAY_MANDATE_VALIDITY_DAYS")
            .unwrap_or_else(|_| "3650".to_string())
            .parse()
            .context("AUTOPAY_MANDATE_VALIDITY_DAYS is invalid")?,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(&stage_str).unwrap_or_default()
}

pub fn get_user_secret() -> Result<UserSecret> {
    dotenvy::dotenv().ok();

    Ok(UserSecret {
        secret: std::env::var("JWT_USER_SECRET").expect("JWT_USER_SECRET is invalid"),
    })
}

fn optional_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
