mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{manager::OnCallManager, Result};

pub use routes::{ActorRequest, CreateAlertRequest, CreateAlertResponse};

pub struct Server {
    manager: Arc<OnCallManager>,
}

impl Server {
    pub fn new(manager: Arc<OnCallManager>) -> Self {
        Self { manager }
    }

    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/health", get(routes::health))
            .route("/metrics", get(routes::metrics))
            .route("/alerts", post(routes::create_alert).get(routes::list_alerts))
            .route("/alerts/{id}", get(routes::get_alert))
            .route("/alerts/{id}/acknowledge", post(routes::acknowledge_alert))
            .route("/alerts/{id}/resolve", post(routes::resolve_alert))
            .route("/schedules/{id}/on-call", get(routes::current_on_call))
            .route("/schedules/{id}/next-rotation", get(routes::next_rotation))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.manager))
    }

    pub async fn start(self, addr: &str) -> Result<()> {
        let app = self.build_router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Listening on {}", addr);

        axum::serve(listener, app).await?;
        Ok(())
    }
}
