use crate::{
    args::INVALID_INPUT,
    arxiv::{self, LinkMode},
    share::{self, WireValue},
    tool::{Output, Tool},
};
use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, RawQuery},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Command, CommandFactory, Parser};
use serde::Deserialize;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "serve", about = "Serve share links and legacy redirects over HTTP")]
pub struct ServeTool {
    /// Port number the server should listen to
    #[arg(short, long, default_value = "3000", env = "AQRXIV_PORT")]
    port: u16,

    /// Host address the server should bind to
    #[arg(long, default_value = "127.0.0.1", env = "AQRXIV_HOST")]
    host: String,
}

impl Tool for ServeTool {
    fn cli() -> Command {
        ServeTool::command()
    }

    fn execute(&self) -> anyhow::Result<Option<Output>> {
        tokio::runtime::Runtime::new()
            .context("Could not create tokio runtime")?
            .block_on(self.run())
            .context("Could not run server")?;

        Ok(None)
    }
}

impl ServeTool {
    async fn run(&self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(format!("{}:{}", self.host, self.port))
            .await
            .context("Could not setup listener")?;

        tracing::info!("listening on {}:{}", self.host, self.port);
        axum::serve(listener, router())
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
                tracing::info!("shutting down");
            })
            .await
            .context("Could not serve")?;

        Ok(())
    }
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(restore))
        .route("/api/resolve", get(resolve))
        // Legacy short links.
        .route("/abs/{id}", get(abs_redirect))
        .route("/a/{id}", get(a_redirect))
        .route("/p/{id}", get(pdf_redirect))
        .route("/d/{id}", get(doi_redirect))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

// Reads a share query back into generator state.
async fn restore(RawQuery(query): RawQuery) -> Json<serde_json::Value> {
    let state = share::decode(query.as_deref().unwrap_or_default());
    let target = state
        .id
        .as_deref()
        .filter(|id| arxiv::is_valid_id(id))
        .map(|id| arxiv::build_url(id, state.options.mode));

    Json(json!({
        "state": state,
        "target": target,
    }))
}

#[derive(Deserialize, Debug)]
struct ResolveParams {
    input: Option<String>,
    mode: Option<String>,
}

async fn resolve(Query(params): Query<ResolveParams>) -> Response {
    let Some(ident) = params.input.as_deref().and_then(arxiv::resolve) else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": INVALID_INPUT })),
        )
            .into_response();
    };

    // A selected mode wins over the shape of the input, and a mode that
    // cannot be read is taken as abs.
    let mode = match params.mode.as_deref() {
        Some(mode) => LinkMode::from_wire(mode).unwrap_or_default(),
        None => ident.mode,
    };

    Json(json!({
        "id": ident.id,
        "mode": mode,
        "url": arxiv::build_url(&ident.id, mode),
    }))
    .into_response()
}

fn redirect(id: &str, mode: Option<LinkMode>) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, share::redirect_location(id, mode))],
    )
        .into_response()
}

async fn abs_redirect(Path(id): Path<String>) -> Response {
    redirect(&id, None)
}

async fn a_redirect(Path(id): Path<String>) -> Response {
    redirect(&id, Some(LinkMode::Abs))
}

async fn pdf_redirect(Path(id): Path<String>) -> Response {
    redirect(&id, Some(LinkMode::Pdf))
}

async fn doi_redirect(Path(id): Path<String>) -> Response {
    redirect(&id, Some(LinkMode::Doi))
}
