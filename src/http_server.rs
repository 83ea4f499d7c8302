// HTTP surface: order endpoints, Stripe webhook, health and static assets

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    handler::HandlerWithoutStateExt,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::notifier::Notifier;
use crate::order::{OrderError, OrderRequest, PriceTable};
use crate::report;
use crate::stripe::types::{CreatePaymentLinkRequest, HOSTED_CONFIRMATION_MESSAGE};
use crate::stripe::webhook::{order_confirmation, WebhookVerifier};
use crate::stripe::PaymentLinkIssuer;

#[derive(Clone)]
pub struct AppState {
    pub payment_links: Arc<dyn PaymentLinkIssuer>,
    pub prices: Arc<PriceTable>,
    pub webhook: Arc<WebhookVerifier>,
    pub notifier: Notifier,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Order fields missing or body undecodable
    #[error("{0}")]
    Validation(String),
    /// Webhook signature or payload rejected
    #[error("{0}")]
    BadRequest(String),
    /// Stripe call failed; message passed through
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
    #[error("Not found")]
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        };
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<OrderError> for ApiError {
    fn from(e: OrderError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinkResponse {
    pub success: bool,
    pub payment_link: String,
    pub payment_link_id: String,
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub success: bool,
    pub content: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

pub fn router(state: AppState, public_dir: &str) -> Router {
    let assets = ServeDir::new(public_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found.into_service());

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/payment/create-link", post(create_payment_link))
        .route("/api/webhook", post(handle_stripe_webhook))
        .route("/api/content/generate", post(generate_content))
        .method_not_allowed_fallback(not_found)
        .fallback_service(assets)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(port: u16, public_dir: &str, state: AppState) -> anyhow::Result<()> {
    let app = router(state, public_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

fn decode_order(
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<OrderRequest, ApiError> {
    let Json(order) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    order.validate()?;
    Ok(order)
}

async fn create_payment_link(
    State(state): State<AppState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<Json<PaymentLinkResponse>, ApiError> {
    let order = decode_order(payload)?;

    let request = CreatePaymentLinkRequest {
        price: state.prices.price_for(order.package()).to_string(),
        quantity: 1,
        confirmation_message: HOSTED_CONFIRMATION_MESSAGE.to_string(),
        metadata: order
            .link_metadata()
            .map_err(|e| ApiError::Internal(e.to_string()))?,
    };

    let link = state
        .payment_links
        .create_payment_link(&request)
        .await
        .map_err(|e| {
            error!(error = %e, package = %order.package_type, "Payment link creation failed");
            ApiError::Upstream(e.upstream_message())
        })?;

    info!(
        payment_link_id = %link.id,
        package = %order.package_type,
        price = %request.price,
        "Payment link created"
    );

    Ok(Json(PaymentLinkResponse {
        success: true,
        payment_link: link.url,
        payment_link_id: link.id,
    }))
}

async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let evt = state.webhook.parse_event(&body, &headers).map_err(|e| {
        warn!(error = %e, "Webhook rejected");
        ApiError::BadRequest(e.to_string())
    })?;

    debug!(
        event_id = evt.id.as_deref().unwrap_or(""),
        event_type = %evt.event_type,
        "Processing webhook event"
    );

    let confirmation =
        order_confirmation(&evt).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if let Some(confirmation) = confirmation {
        // Acknowledge now; delivery is reported on the notifier's channel.
        state.notifier.dispatch(confirmation);
    }

    Ok(Json(WebhookAck { received: true }))
}

async fn generate_content(
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<Json<ContentResponse>, ApiError> {
    let order = decode_order(payload)?;
    let report = report::generate(&order, Utc::now().date_naive());

    info!(topic = %order.topic, package = %order.package_type, "Report generated");

    Ok(Json(ContentResponse {
        success: true,
        content: report.content,
        title: report.title,
    }))
}
