use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, header},
    response::Html,
    routing::get,
};
use chrono::Local;
use homeboard_core::service::DashboardService;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::ui::{self, PageContext};

#[derive(Clone)]
pub(crate) struct AppState {
    pub service: Arc<DashboardService>,
    pub page: Arc<PageContext>,
}

impl AppState {
    pub(crate) fn new(service: Arc<DashboardService>, page: PageContext) -> Self {
        Self {
            service,
            page: Arc::new(page),
        }
    }
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        // The page is embedded in a home-automation panel on another origin
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("ALLOWALL"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let board = state.service.board().await;
    Html(ui::render(&board, &state.page, Local::now().naive_local()))
}
