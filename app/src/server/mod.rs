//! HTTP surface of the backend: health, reveal proxy and token listing.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::types::{
    ErrorResponse, HealthResponse, OwnedToken, OwnerTokensResponse, RevealRequest,
    RevealResponse,
};
use crate::app_state::AppContext;
use crate::blockchain_client::BlockchainClient;
use crate::config_store::ContractConfig;
use crate::errors::{WalletError, WalletResult};
use crate::metadata::{FormCounts, MetadataClient};
use crate::reveal::RevealProxy;
use crate::security::{Environment, SecurityConfig};
use crate::validation::InputValidator;

#[derive(Clone)]
pub struct ServerState {
    pub reveal: Arc<RevealProxy>,
    pub chain: Arc<BlockchainClient>,
    pub metadata: MetadataClient,
    pub contract: ContractConfig,
    pub validator: Arc<InputValidator>,
    pub environment: Environment,
    pub chain_id: u64,
}

impl ServerState {
    pub fn from_context(ctx: &AppContext, security: &SecurityConfig) -> WalletResult<Self> {
        let config = ctx.config();
        Ok(Self {
            reveal: Arc::new(RevealProxy::new(
                &config.api.reveal_upstream_url,
                security.reveal_passcode(),
                config.api.request_timeout(),
            )?),
            chain: Arc::new(ctx.blockchain_client()?),
            metadata: ctx.metadata_client()?,
            contract: config.contract.clone(),
            validator: Arc::new(InputValidator::new()?),
            environment: ctx.environment(),
            chain_id: config.network.chain_id.value(),
        })
    }
}

pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/reveal", post(reveal))
        .route("/api/owners/:address/tokens", get(owner_tokens))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(s): State<ServerState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        environment: s.environment.as_str().to_string(),
        chain_id: s.chain_id,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn reveal(State(s): State<ServerState>, body: Bytes) -> Response {
    let request: RevealRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            log::error!("Error in reveal API route: {}", err);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RevealResponse::failure("Internal server error")),
            )
                .into_response();
        }
    };

    let reply = s.reveal.handle(&request).await;
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(reply.body)).into_response()
}

async fn owner_tokens(
    State(s): State<ServerState>,
    Path(address): Path<String>,
) -> Result<Json<OwnerTokensResponse>, (StatusCode, Json<ErrorResponse>)> {
    let owner = s.validator.validate_address(&address).map_err(error_reply)?;
    if !s.contract.is_configured() {
        return Err(error_reply(WalletError::ConfigError(
            "NFT contract address is not configured".to_string(),
        )));
    }

    let ids = s
        .chain
        .tokens_of_owner(&s.contract.address, &owner)
        .await
        .map_err(error_reply)?;
    let metadata = s.metadata.fetch_many(&ids).await;

    let tokens = ids
        .iter()
        .map(|id| {
            let meta = metadata.get(id).and_then(Option::as_ref);
            OwnedToken {
                token_id: *id,
                form: meta.map(|m| m.form()),
                name: meta.map(|m| m.name.clone()),
                image_url: meta
                    .and_then(|m| m.image.as_deref())
                    .map(|url| s.metadata.resolve_asset_url(url)),
                animation_url: meta
                    .and_then(|m| m.animation_url.as_deref())
                    .map(|url| s.metadata.resolve_asset_url(url)),
            }
        })
        .collect();

    Ok(Json(OwnerTokensResponse {
        address: owner.to_hex(),
        tokens,
        counts: FormCounts::tally(ids.len(), &metadata),
    }))
}

fn error_reply(err: WalletError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        WalletError::ValidationError(_) | WalletError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
        WalletError::NotFound(_) => StatusCode::NOT_FOUND,
        WalletError::NetworkError(_)
        | WalletError::InvalidResponse(_)
        | WalletError::UpstreamApi { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        log::warn!("Request failed: {}", err);
    }
    let message = match err {
        WalletError::ConfigError(_) => "Server configuration error".to_string(),
        other => other.user_message(),
    };
    (status, Json(ErrorResponse::new(message)))
}
