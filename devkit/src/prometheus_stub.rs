/*!
Serveur Prometheus factice pour tests sans backend réel

Démarre un vrai serveur HTTP (axum) sur un port éphémère de 127.0.0.1 qui
répond à `/api/v1/query` selon des règles "si la requête contient X".
Enregistre toutes les requêtes reçues pour les assertions de tests.
*/

use crate::responses::PromResponse;
use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Réponse simulée pour une requête
#[derive(Debug, Clone)]
pub enum StubAnswer {
    /// Vecteur à une série
    Value(f64),
    /// Vecteur vide (hôte absent, métrique inconnue)
    Empty,
    /// Résultat de type scalar au lieu de vector
    Scalar(f64),
    /// Erreur d'évaluation, HTTP 422
    Error { error_type: String, message: String },
    /// Backend indisponible, HTTP 503 sans JSON
    Unavailable,
}

impl IntoResponse for StubAnswer {
    fn into_response(self) -> Response {
        match self {
            StubAnswer::Value(v) => Json(PromResponse::vector(v)).into_response(),
            StubAnswer::Empty => Json(PromResponse::empty_vector()).into_response(),
            StubAnswer::Scalar(v) => Json(PromResponse::scalar(v)).into_response(),
            StubAnswer::Error { error_type, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(PromResponse::error(&error_type, &message)),
            )
                .into_response(),
            StubAnswer::Unavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response()
            }
        }
    }
}

/// Requête reçue par le stub
#[derive(Debug, Clone, Deserialize)]
pub struct ReceivedQuery {
    pub query: String,
    pub time: Option<String>,
}

#[derive(Clone, Default)]
struct StubState {
    rules: Arc<Mutex<Vec<(String, StubAnswer)>>>,
    received: Arc<Mutex<Vec<ReceivedQuery>>>,
}

pub struct StubPrometheus {
    addr: SocketAddr,
    state: StubState,
    server: JoinHandle<()>,
}

impl StubPrometheus {
    /// Démarre le stub; sans règle, toute requête reçoit un vecteur vide
    pub async fn start() -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests

        let state = StubState::default();
        let app = Router::new()
            .route("/api/v1/query", get(handle_query))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("[stub-prometheus] server stopped: {}", e);
            }
        });

        log::info!("[stub-prometheus] listening on http://{}", addr);
        Ok(Self { addr, state, server })
    }

    /// URL de base à passer comme PROMETHEUS_URL
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Ajoute une règle: première règle dont `pattern` est contenu dans la requête
    pub fn respond_when(&self, pattern: impl Into<String>, answer: StubAnswer) -> &Self {
        self.state.rules.lock().push((pattern.into(), answer));
        self
    }

    /// Toutes les requêtes reçues, dans l'ordre d'arrivée
    pub fn received_queries(&self) -> Vec<ReceivedQuery> {
        self.state.received.lock().clone()
    }

    /// Reset règles et requêtes enregistrées
    pub fn clear(&self) {
        self.state.rules.lock().clear();
        self.state.received.lock().clear();
    }
}

impl Drop for StubPrometheus {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle_query(
    State(state): State<StubState>,
    Query(params): Query<ReceivedQuery>,
) -> StubAnswer {
    let answer = state
        .rules
        .lock()
        .iter()
        .find(|(pattern, _)| params.query.contains(pattern.as_str()))
        .map(|(_, answer)| answer.clone())
        .unwrap_or(StubAnswer::Empty);

    log::debug!("[stub-prometheus] {} -> {:?}", params.query, answer);
    state.received.lock().push(params);
    answer
}
