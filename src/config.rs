/*
 * Responsibility
 * - 環境変数の読み込み (TABLE_NAME, PRIMARY_KEY, SORT_KEY, IAM_ROLE_ARN, タグ mapping など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::repos::policy_store::TableSettings;
use crate::services::credentials::{
    ClaimTagMapping, DEFAULT_SESSION_DURATION_SECONDS, MAX_SESSION_DURATION_SECONDS,
    MIN_SESSION_DURATION_SECONDS,
};
use crate::services::tenant::DEFAULT_TENANT_CLAIM;

const DEFAULT_REGION: &str = "us-east-2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: CorsOrigins,
    pub request_timeout: Duration,

    pub aws_region: String,
    pub table: TableSettings,

    // ABAC role assumed per request, tagged from the caller's claims
    pub iam_role_arn: String,
    pub tag_mapping: ClaimTagMapping,
    pub session_duration_seconds: i32,

    pub tenant_claim: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let port: u16 = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        let cors_allowed_origins = if origins.is_empty() || origins.iter().any(|o| o == "*") {
            CorsOrigins::Any
        } else {
            CorsOrigins::List(origins)
        };

        let request_timeout = lookup("REQUEST_TIMEOUT_SECONDS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECONDS"))?
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        let aws_region = lookup("AWS_REGION")
            .or_else(|| lookup("AWS_DEFAULT_REGION"))
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let table = TableSettings {
            table_name: required("TABLE_NAME")?,
            partition_key: required("PRIMARY_KEY")?,
            sort_key: required("SORT_KEY")?,
        };

        let iam_role_arn = required("IAM_ROLE_ARN")?;

        let tag_mapping =
            ClaimTagMapping::from_json(&required("REQUEST_TAG_KEYS_MAPPING_ATTRIBUTES")?)
                .map_err(|_| ConfigError::Invalid("REQUEST_TAG_KEYS_MAPPING_ATTRIBUTES"))?;

        let session_duration_seconds = match lookup("SESSION_DURATION_SECONDS") {
            Some(raw) => raw
                .parse::<i32>()
                .ok()
                .filter(|s| (MIN_SESSION_DURATION_SECONDS..=MAX_SESSION_DURATION_SECONDS).contains(s))
                .ok_or(ConfigError::Invalid("SESSION_DURATION_SECONDS"))?,
            None => DEFAULT_SESSION_DURATION_SECONDS,
        };

        let tenant_claim = lookup("TENANT_CLAIM")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_TENANT_CLAIM.to_string());

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            request_timeout,
            aws_region,
            table,
            iam_role_arn,
            tag_mapping,
            session_duration_seconds,
            tenant_claim,
        })
    }
}
