use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use server_api::ApiContext;
use shared::protocol::{published_tutorials_route, tutorial_route, tutorials_route};
use storage::Storage;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use api::{
    healthz, http_create_tutorial, http_delete_all_tutorials, http_delete_tutorial,
    http_get_tutorial, http_list_published_tutorials, http_list_tutorials, http_update_tutorial,
};
use app_state::AppState;
use config::{load_settings, prepare_database_url, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            error = %format!("{error:#}"),
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext::new(storage),
    };
    let app = with_middleware(build_router(Arc::new(state)), &settings)?;

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            tutorials_route(),
            get(http_list_tutorials)
                .post(http_create_tutorial)
                .delete(http_delete_all_tutorials),
        )
        .route(published_tutorials_route(), get(http_list_published_tutorials))
        .route(
            tutorial_route(),
            get(http_get_tutorial)
                .put(http_update_tutorial)
                .delete(http_delete_tutorial),
        )
        .with_state(state)
}

fn with_middleware(router: Router, settings: &Settings) -> anyhow::Result<Router> {
    Ok(router
        .layer(RequestBodyLimitLayer::new(settings.max_body_bytes))
        .layer(cors_layer(settings.cors_allowed_origin.as_deref())?))
}

fn cors_layer(allowed_origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let Some(origin) = allowed_origin else {
        return Ok(CorsLayer::permissive());
    };
    let origin = HeaderValue::from_str(origin)
        .with_context(|| format!("invalid CORS origin '{origin}'"))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
