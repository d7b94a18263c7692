mod requests;

pub use requests::{
    AfterTaxArgs, CompareArgs, ComparePayload, FireArgs, FirePayload, MixedArgs, MixedPayload,
    ProjectionArgs, ProjectionPayload, SustainabilityArgs, SustainabilityPayload, WithdrawalArgs,
    WithdrawalPayload, current_year, default_return_scenarios, fire_args_from_payload,
    mixed_args_from_payload, parse_leg, parse_rate_scenario, parse_return_scenario,
    projection_args_from_payload, sustainability_args_from_payload, withdrawal_args_from_payload,
};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::core::{
    ValidationError, analyze_sustainability, apply_after_tax_adjustment, compare_projections,
    plan_fire, simulate_compound_growth, simulate_mixed_allocation, simulate_withdrawal,
};
use crate::store::{CalculationStore, StoreError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    BadRequest(String),
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::InvalidImport | StoreError::Json(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Store(StoreError::Io { .. }) | ApiError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        error_response(status, &self.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<CalculationStore>>,
}

impl AppState {
    pub fn new(store: CalculationStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Runs a store operation that writes to disk on the blocking pool,
    /// holding the store lock until the write finishes.
    async fn write_store<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&mut CalculationStore) -> Result<T, StoreError> + Send + 'static,
    {
        let mut store = Arc::clone(&self.store).lock_owned().await;
        let result = tokio::task::spawn_blocking(move || op(&mut store)).await?;
        Ok(result?)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route(
            "/api/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .route(
            "/api/projection/after-tax",
            get(after_tax_get_handler).post(after_tax_post_handler),
        )
        .route("/api/mixed", post(mixed_handler))
        .route("/api/compare", post(compare_handler))
        .route("/api/fire", get(fire_get_handler).post(fire_post_handler))
        .route(
            "/api/withdrawal",
            get(withdrawal_get_handler).post(withdrawal_post_handler),
        )
        .route("/api/sustainability", post(sustainability_handler))
        .route(
            "/api/calculations",
            get(list_calculations_handler).post(save_calculation_handler),
        )
        .route("/api/calculations/export", get(export_calculations_handler))
        .route("/api/calculations/import", post(import_calculations_handler))
        .route(
            "/api/calculations/:id",
            get(get_calculation_handler).delete(delete_calculation_handler),
        )
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(addr: SocketAddr, store: CalculationStore) -> std::io::Result<()> {
    let data_file = store.path().display().to_string();
    let app = router(AppState::new(store));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, %data_file, "fireplan HTTP API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn health_handler(State(state): State<AppState>) -> Response {
    let calculations = state.store.lock().await.list().len();
    json_response(
        StatusCode::OK,
        json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "calculations": calculations,
        }),
    )
}

async fn projection_get_handler(Query(payload): Query<ProjectionPayload>) -> Response {
    projection_handler_impl(payload)
}

async fn projection_post_handler(Json(payload): Json<ProjectionPayload>) -> Response {
    projection_handler_impl(payload)
}

fn projection_handler_impl(payload: ProjectionPayload) -> Response {
    let input = projection_args_from_payload(payload).to_input();
    respond("/api/projection", simulate_compound_growth(&input))
}

async fn after_tax_get_handler(Query(payload): Query<ProjectionPayload>) -> Response {
    after_tax_handler_impl(payload)
}

async fn after_tax_post_handler(Json(payload): Json<ProjectionPayload>) -> Response {
    after_tax_handler_impl(payload)
}

fn after_tax_handler_impl(payload: ProjectionPayload) -> Response {
    let args = payload.into_after_tax_args();
    let result = simulate_compound_growth(&args.projection.to_input())
        .and_then(|projection| apply_after_tax_adjustment(&projection, args.tax_rate));
    respond("/api/projection/after-tax", result)
}

async fn mixed_handler(Json(payload): Json<MixedPayload>) -> Response {
    let input = mixed_args_from_payload(payload).to_input();
    respond("/api/mixed", simulate_mixed_allocation(&input))
}

async fn compare_handler(Json(payload): Json<ComparePayload>) -> Response {
    respond("/api/compare", compare_projections(&payload.into_scenarios()))
}

async fn fire_get_handler(Query(payload): Query<FirePayload>) -> Response {
    fire_handler_impl(payload)
}

async fn fire_post_handler(Json(payload): Json<FirePayload>) -> Response {
    fire_handler_impl(payload)
}

fn fire_handler_impl(payload: FirePayload) -> Response {
    let input = fire_args_from_payload(payload).to_input();
    respond("/api/fire", plan_fire(&input))
}

async fn withdrawal_get_handler(Query(payload): Query<WithdrawalPayload>) -> Response {
    withdrawal_handler_impl(payload)
}

async fn withdrawal_post_handler(Json(payload): Json<WithdrawalPayload>) -> Response {
    withdrawal_handler_impl(payload)
}

fn withdrawal_handler_impl(payload: WithdrawalPayload) -> Response {
    let result = withdrawal_args_from_payload(payload)
        .to_input()
        .and_then(|input| simulate_withdrawal(&input));
    respond("/api/withdrawal", result)
}

async fn sustainability_handler(Json(payload): Json<SustainabilityPayload>) -> Response {
    let input = sustainability_args_from_payload(payload).to_input();
    respond("/api/sustainability", analyze_sustainability(&input))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SavePayload {
    pub name: String,
    pub input_params: Value,
    pub results: Value,
}

async fn list_calculations_handler(State(state): State<AppState>) -> Response {
    let store = state.store.lock().await;
    json_response(StatusCode::OK, json!({ "calculations": store.list() }))
}

async fn save_calculation_handler(
    State(state): State<AppState>,
    Json(payload): Json<SavePayload>,
) -> Response {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return ApiError::BadRequest("name must not be empty".to_string()).into_response();
    }
    let saved = state
        .write_store(move |store| store.save(&name, payload.input_params, payload.results))
        .await;
    match saved {
        Ok(calculation) => json_response(StatusCode::CREATED, calculation),
        Err(e) => e.into_response(),
    }
}

async fn get_calculation_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let store = state.store.lock().await;
    match store.get(&id) {
        Some(calculation) => json_response(StatusCode::OK, calculation),
        None => ApiError::from(StoreError::NotFound(id)).into_response(),
    }
}

async fn delete_calculation_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let deleted = state.write_store(move |store| store.delete(&id)).await;
    match deleted {
        Ok(calculation) => json_response(StatusCode::OK, calculation),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub id: Option<String>,
}

async fn export_calculations_handler(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let exported = state.store.lock().await.export(query.id.as_deref());
    let body = match exported {
        Ok(body) => body,
        Err(e) => return ApiError::from(e).into_response(),
    };
    let filename = match &query.id {
        Some(id) => format!("calculation_{id}.json"),
        None => "all_calculations.json".to_string(),
    };
    let disposition = format!("attachment; filename=\"{filename}\"");
    let mut response = (
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        body,
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
    with_cache_control(response)
}

async fn import_calculations_handler(State(state): State<AppState>, body: String) -> Response {
    let imported = state.write_store(move |store| store.import(&body)).await;
    match imported {
        Ok(added) => json_response(StatusCode::OK, json!({ "imported": added })),
        Err(e) => e.into_response(),
    }
}

fn respond<T: Serialize, E: Into<ApiError>>(route: &'static str, result: Result<T, E>) -> Response {
    match result {
        Ok(body) => {
            debug!(route, "calculation completed");
            json_response(StatusCode::OK, body)
        }
        Err(e) => {
            let e: ApiError = e.into();
            debug!(route, error = %e, "calculation rejected");
            e.into_response()
        }
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    fn temp_state(dir: &TempDir) -> AppState {
        let store = CalculationStore::open(dir.path().join("calculations.json")).expect("store");
        AppState::new(store)
    }

    #[tokio::test]
    async fn projection_uses_defaults_and_sets_no_store() {
        let payload: ProjectionPayload =
            serde_json::from_str(r#"{"years": 2, "startYear": 2030}"#).expect("json");
        let response = projection_post_handler(Json(payload)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&HeaderValue::from_static("no-store"))
        );
        let body = body_json(response).await;
        let rows = body["yearlyProjections"].as_array().expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["year"], 2031);
        assert_approx(
            body["totalContributions"].as_f64().expect("number"),
            100_000.0 + 24_000.0,
        );
    }

    #[tokio::test]
    async fn invalid_years_is_a_bad_request_naming_the_problem() {
        let payload: ProjectionPayload = serde_json::from_str(r#"{"years": 0}"#).expect("json");
        let response = projection_get_handler(Query(payload)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        let message = body["error"].as_str().expect("error message");
        assert!(message.contains("years"), "unexpected message: {message}");
    }

    #[tokio::test]
    async fn out_of_range_start_year_is_a_bad_request_everywhere() {
        let payload: ProjectionPayload =
            serde_json::from_str(r#"{"startYear": 2147483647}"#).expect("json");
        let response = projection_get_handler(Query(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().expect("message").contains("startYear"));

        let payload: MixedPayload =
            serde_json::from_str(r#"{"startYear": 2147483647}"#).expect("json");
        assert_eq!(mixed_handler(Json(payload)).await.status(), StatusCode::BAD_REQUEST);

        let payload: FirePayload =
            serde_json::from_str(r#"{"startYear": 2147483647}"#).expect("json");
        assert_eq!(
            fire_post_handler(Json(payload)).await.status(),
            StatusCode::BAD_REQUEST
        );

        let payload: WithdrawalPayload =
            serde_json::from_str(r#"{"startYear": -2147483648}"#).expect("json");
        assert_eq!(
            withdrawal_post_handler(Json(payload)).await.status(),
            StatusCode::BAD_REQUEST
        );

        let payload: SustainabilityPayload =
            serde_json::from_str(r#"{"startYear": 2147483647}"#).expect("json");
        assert_eq!(
            sustainability_handler(Json(payload)).await.status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn after_tax_reports_tax_paid() {
        let payload: ProjectionPayload = serde_json::from_str(
            r#"{"principal": 1000, "monthlyContribution": 0, "annualRate": 12, "years": 1, "taxRate": 50}"#,
        )
        .expect("json");
        let body = body_json(after_tax_post_handler(Json(payload)).await).await;

        let final_value = body["finalInvestmentValue"].as_f64().expect("number");
        let growth = final_value - 1000.0;
        assert_approx(body["totalTaxPaid"].as_f64().expect("number"), growth / 2.0);
    }

    #[tokio::test]
    async fn fire_returns_timeline_and_drawdown() {
        let body = body_json(fire_post_handler(Json(FirePayload::default())).await).await;

        assert_approx(
            body["timeline"]["fireNumber"].as_f64().expect("number"),
            1_650_000.0,
        );
        assert_eq!(body["timeline"]["converged"], true);
        assert_eq!(body["retirement"]["strategy"], "percentageOfPortfolio");
    }

    #[tokio::test]
    async fn unknown_withdrawal_strategy_is_rejected() {
        let payload: WithdrawalPayload =
            serde_json::from_str(r#"{"strategy": "yolo"}"#).expect("json");
        let response = withdrawal_post_handler(Json(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().expect("message").contains("yolo"));
    }

    #[tokio::test]
    async fn mixed_allocation_rejects_bad_sum() {
        let payload: MixedPayload = serde_json::from_str(
            r#"{"legs": [{"type": "stocks", "percentage": 50, "expectedReturnPercent": 8}]}"#,
        )
        .expect("json");
        let response = mixed_handler(Json(payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn sustainability_defaults_produce_three_outcomes() {
        let response = sustainability_handler(Json(SustainabilityPayload::default())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["scenarioResults"].as_array().expect("outcomes").len(),
            3
        );
    }

    #[tokio::test]
    async fn compare_without_scenarios_is_rejected() {
        let response = compare_handler(Json(ComparePayload::default())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let response = not_found_handler().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Not found");
    }

    #[tokio::test]
    async fn calculations_save_get_export_delete() {
        let dir = TempDir::new().expect("temp dir");
        let state = temp_state(&dir);

        let payload = SavePayload {
            name: "  retire early ".to_string(),
            input_params: json!({"annualExpenses": 40000}),
            results: json!({"fireNumber": 1000000}),
        };
        let response = save_calculation_handler(State(state.clone()), Json(payload)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let saved = body_json(response).await;
        assert_eq!(saved["name"], "retire early");
        let id = saved["id"].as_str().expect("id").to_string();

        let listed = body_json(list_calculations_handler(State(state.clone())).await).await;
        assert_eq!(listed["calculations"].as_array().expect("list").len(), 1);

        let fetched =
            body_json(get_calculation_handler(State(state.clone()), Path(id.clone())).await).await;
        assert_eq!(fetched["inputParams"]["annualExpenses"], 40000);

        let export = export_calculations_handler(
            State(state.clone()),
            Query(ExportQuery {
                id: Some(id.clone()),
            }),
        )
        .await;
        assert_eq!(export.status(), StatusCode::OK);
        let disposition = export
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .expect("disposition header")
            .to_string();
        assert!(disposition.contains(&format!("calculation_{id}.json")));

        let deleted = delete_calculation_handler(State(state.clone()), Path(id.clone())).await;
        assert_eq!(deleted.status(), StatusCode::OK);
        let missing = get_calculation_handler(State(state), Path(id)).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_saves_are_all_persisted() {
        let dir = TempDir::new().expect("temp dir");
        let state = temp_state(&dir);

        let save = |name: &str| {
            save_calculation_handler(
                State(state.clone()),
                Json(SavePayload {
                    name: name.to_string(),
                    input_params: Value::Null,
                    results: Value::Null,
                }),
            )
        };
        let (a, b, c) = tokio::join!(save("a"), save("b"), save("c"));
        for response in [a, b, c] {
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let reopened =
            CalculationStore::open(dir.path().join("calculations.json")).expect("store");
        assert_eq!(reopened.list().len(), 3);
    }

    #[tokio::test]
    async fn save_requires_a_name() {
        let dir = TempDir::new().expect("temp dir");
        let response =
            save_calculation_handler(State(temp_state(&dir)), Json(SavePayload::default())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn import_counts_new_records_and_rejects_garbage() {
        let dir = TempDir::new().expect("temp dir");
        let state = temp_state(&dir);
        let record = r#"{"id": "calc_1", "name": "a", "timestamp": "2024-01-01T00:00:00.000Z"}"#;

        let response = import_calculations_handler(State(state.clone()), record.to_string()).await;
        assert_eq!(body_json(response).await["imported"], 1);

        let response = import_calculations_handler(State(state.clone()), "[]".to_string()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let health = body_json(health_handler(State(state)).await).await;
        assert_eq!(health["status"], "ok");
        assert_eq!(health["calculations"], 1);
    }
}
