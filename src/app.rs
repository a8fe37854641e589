/*
 * Responsibility
 * - tracing / panic hook の初期化
 * - Config読み込み → 依存生成 (STS, DynamoDB factory) → Router 組み立て
 * - Middleware の適用 (CORS / request-id / trace / timeout)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::Result;
use axum::{Router, routing::get};
use aws_config::{BehaviorVersion, Region};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::Config,
    middleware,
    repos::dynamo::DynamoRecordStoreFactory,
    services::{
        credentials::{CredentialBroker, StsCredentialExchange},
        tenant::TenantResolver,
    },
    state::AppState,
};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,tenant_policies=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development: fail fast / production: default hook, keep serving
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        env = ?config.app_env,
        addr = %config.addr,
        region = %config.aws_region,
        table = %config.table.table_name,
        role_arn = %config.iam_role_arn,
        "starting tenant-policies"
    );

    let state = build_state(&config).await;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_state(config: &Config) -> AppState {
    // Process-level SDK config: region + HTTP client + the execution role's credentials.
    // Only STS uses those credentials; DynamoDB clients get per-request scoped ones.
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .load()
        .await;

    let exchange = Arc::new(StsCredentialExchange::new(&sdk_config));
    let broker = Arc::new(CredentialBroker::new(
        exchange,
        config.iam_role_arn.clone(),
        config.tag_mapping.clone(),
        config.session_duration_seconds,
    ));
    let stores = Arc::new(DynamoRecordStoreFactory::new(
        sdk_config,
        config.table.clone(),
    ));

    AppState::new(broker, TenantResolver::new(config.tenant_claim.clone()), stores)
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/health", get(api::v1::handlers::health::health))
        .nest("/api/v1", api::v1::routes())
        .with_state(state);

    // CORS outermost so the 408/413/500 answered by the http stack carry it too
    let router = middleware::http::apply(router, config.request_timeout);
    middleware::cors::apply(router, config)
}
