use std::{env, path::PathBuf};

use anyhow::Context;

use crate::groups::DeletePolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// Externally visible origin, used to build OAuth redirect URLs.
    pub public_url: String,
    pub client_secrets: PathBuf,
    pub session_minutes: i64,
    pub delete_policy: DeletePolicy,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned()),
            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_owned())
                .trim_end_matches('/')
                .to_owned(),
            client_secrets: env::var("CLIENT_SECRETS")
                .unwrap_or_else(|_| "client_secret.json".to_owned())
                .into(),
            session_minutes: match env::var("SESSION_MINUTES") {
                Ok(minutes) => minutes.parse().context("SESSION_MINUTES must be a whole number")?,
                Err(_) => 5,
            },
            delete_policy: match env::var("GROUP_DELETE_POLICY") {
                Ok(policy) => policy.parse()?,
                Err(_) => DeletePolicy::default(),
            },
        })
    }
}
