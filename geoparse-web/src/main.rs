//! Servidor web Axum para demonstração do geoparser: anotação de topônimos
//! com contexto de discurso mantido entre requisições.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use geoparse_core::{gazetteer::demo_texts, ParseOptions, ParsedToken, Session};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Estado compartilhado: a sessão é sequencial por natureza, então vive atrás
/// de um Mutex — o "lock externo" que o contexto exige.
struct AppState {
    session: Mutex<Session>,
}

#[derive(Deserialize)]
struct ParseRequest {
    text: String,
    /// Opções da requisição (mescladas sobre as correntes da sessão).
    #[serde(default)]
    options: Option<ParseOptions>,
    /// Zera o contexto de discurso antes de analisar.
    #[serde(default)]
    reset: bool,
}

#[derive(Serialize)]
struct ParseResponse {
    tokens: Vec<Vec<ParsedToken>>,
    total_sentences: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    let state = Arc::new(AppState {
        session: Mutex::new(Session::demo()),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/parse", post(parse_handler))
        .route("/demo-texts", get(demo_texts_handler))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("🌎 Servidor do geoparser iniciado em http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}

/// Página principal com um formulário mínimo.
async fn index_handler() -> impl IntoResponse {
    Html(include_str!("index.html"))
}

/// Análise de texto via HTTP POST. Sentenças são separadas por ponto final e
/// analisadas como um discurso único (o contexto atravessa as sentenças).
async fn parse_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ParseRequest>,
) -> impl IntoResponse {
    if req.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Texto vazio"})),
        )
            .into_response();
    }

    let mut session = state.session.lock().expect("sessão envenenada");
    if req.reset {
        if let Err(e) = session.reset_options() {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response();
        }
    }
    if let Some(options) = &req.options {
        if let Err(e) = session.set_options(options) {
            // Erro de configuração = falha de formato da requisição
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response();
        }
    }

    let sentences: Vec<String> = req
        .text
        .split_inclusive('.')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let sentence_refs: Vec<&str> = sentences.iter().map(String::as_str).collect();

    match session.parse_batch(&sentence_refs) {
        Ok(tokens) => {
            let total_sentences = tokens.len();
            Json(ParseResponse {
                tokens,
                total_sentences,
            })
            .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

/// Textos de demonstração.
async fn demo_texts_handler() -> impl IntoResponse {
    let texts: Vec<serde_json::Value> = demo_texts()
        .iter()
        .map(|(domain, text)| {
            serde_json::json!({
                "domain": domain,
                "text": text
            })
        })
        .collect();
    Json(texts)
}
