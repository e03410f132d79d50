use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use portal_core::constants::routes;
use portal_core::remote::http::{
    FetchAccountRequest, FetchAccountResponse, LedgerErrorBody, SendInstructionRequest,
};
use portal_core::remote::{LedgerSnapshot, LedgerTransport, MemoryLedger, TransportError, TxReceipt};
use portal_core::FeedTarget;

/// Shared server state
#[derive(Clone)]
pub struct LedgerServerState {
    pub ledger: Arc<MemoryLedger>,
    /// Only requests for this program are served
    pub program_id: String,
    pub state_file: Option<PathBuf>,
    /// Orders snapshot writes so a later snapshot is never overwritten by an older one
    persist_lock: Arc<Mutex<()>>,
}

type ApiError = (StatusCode, Json<LedgerErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(LedgerErrorBody {
            error: message.into(),
        }),
    )
}

fn transport_error(err: TransportError) -> ApiError {
    match err {
        TransportError::Rejected(message) => api_error(StatusCode::BAD_REQUEST, message),
        other => api_error(StatusCode::SERVICE_UNAVAILABLE, other.to_string()),
    }
}

impl LedgerServerState {
    pub fn new(ledger: Arc<MemoryLedger>, program_id: impl Into<String>) -> Self {
        Self {
            ledger,
            program_id: program_id.into(),
            state_file: None,
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load accounts from `path` if it exists and persist there after each
    /// accepted instruction.
    pub fn with_state_file(program_id: impl Into<String>, path: PathBuf) -> Result<Self> {
        let ledger = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read ledger state: {}", path.display()))?;
            let snapshot: LedgerSnapshot = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse ledger state: {}", path.display()))?;
            MemoryLedger::from_snapshot(snapshot)
        } else {
            MemoryLedger::new()
        };
        Ok(Self {
            ledger: Arc::new(ledger),
            program_id: program_id.into(),
            state_file: Some(path),
            persist_lock: Arc::new(Mutex::new(())),
        })
    }

    fn check_program(&self, program_id: &str) -> Result<(), ApiError> {
        if program_id != self.program_id {
            return Err(api_error(
                StatusCode::NOT_FOUND,
                format!("unknown program {}", program_id),
            ));
        }
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.state_file else {
            return Ok(());
        };
        let _write = self.persist_lock.lock().await;
        let json = serde_json::to_string_pretty(&self.ledger.snapshot())
            .context("Failed to serialize ledger state")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write ledger state: {}", path.display()))
    }
}

pub fn router(state: LedgerServerState) -> Router {
    Router::new()
        .route(routes::FETCH_ACCOUNT, post(fetch_account))
        .route(routes::SEND_INSTRUCTION, post(send_instruction))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the ledger server
pub async fn run_server(bind_addr: &str, state: LedgerServerState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    eprintln!("Ledger server listening on http://{}", bind_addr);
    eprintln!("Program: {}", state.program_id);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Handler for POST /v1/accounts/fetch
async fn fetch_account(
    State(state): State<LedgerServerState>,
    Json(request): Json<FetchAccountRequest>,
) -> Result<Json<FetchAccountResponse>, ApiError> {
    state.check_program(&request.program_id)?;
    let target = FeedTarget::new(request.program_id, "", request.feed_account);
    let account = state
        .ledger
        .fetch_account(&target, &request.owner)
        .await
        .map_err(transport_error)?;
    Ok(Json(FetchAccountResponse { account }))
}

/// Handler for POST /v1/instructions
async fn send_instruction(
    State(state): State<LedgerServerState>,
    Json(request): Json<SendInstructionRequest>,
) -> Result<Json<TxReceipt>, ApiError> {
    state.check_program(&request.program_id)?;
    let target = FeedTarget::new(request.program_id, "", request.feed_account);
    let name = request.instruction.name();
    let receipt = state
        .ledger
        .send_instruction(&target, &request.signer, request.instruction)
        .await
        .map_err(|e| {
            tracing::info!(instruction = name, "instruction rejected: {}", e);
            transport_error(e)
        })?;

    if let Err(e) = state.persist().await {
        tracing::error!("Failed to persist ledger state: {:#}", e);
    }
    tracing::info!(
        instruction = name,
        signer = request.signer.short(),
        signature = %receipt.signature,
        "instruction accepted"
    );
    Ok(Json(receipt))
}
