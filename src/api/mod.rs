use axum::{
    Router,
    extract::{Json, Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;

use crate::core::{
    GlobalParamsPatch, MonthField, MonthPatch, Preset, Scenario, Store, export_csv, load_state,
    parse_csv, render_report, save_state, summary_metrics,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiPreset {
    #[serde(alias = "Optimistic")]
    Optimistic,
    #[serde(alias = "Conservative")]
    Conservative,
    #[serde(alias = "Custom")]
    Custom,
}

impl From<ApiPreset> for Preset {
    fn from(value: ApiPreset) -> Self {
        match value {
            ApiPreset::Optimistic => Preset::Optimistic,
            ApiPreset::Conservative => Preset::Conservative,
            ApiPreset::Custom => Preset::Custom,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddScenarioPayload {
    name: String,
    #[serde(default)]
    preset: Option<ApiPreset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenamePayload {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkUpdatePayload {
    month_indices: Vec<usize>,
    field: MonthField,
    value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportPayload {
    csv: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StateResponse {
    scenarios: Vec<Scenario>,
    active_scenario_id: String,
    dark_mode: bool,
    can_undo: bool,
    can_redo: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<Store>>,
    state_file: PathBuf,
}

pub async fn run_http_server(port: u16, state_file: PathBuf) -> std::io::Result<()> {
    let store = match load_state(&state_file)? {
        Some(saved) => Store::from_persisted(saved),
        None => Store::new(),
    };
    let app_state = AppState {
        store: Arc::new(Mutex::new(store)),
        state_file,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route("/api/state", get(state_handler))
        .route("/api/scenarios", post(add_scenario_handler))
        .route("/api/scenarios/:id", delete(delete_scenario_handler))
        .route("/api/scenarios/:id/activate", post(activate_handler))
        .route("/api/scenarios/:id/duplicate", post(duplicate_handler))
        .route("/api/scenarios/:id/rename", post(rename_handler))
        .route("/api/scenarios/:id/reset", post(reset_handler))
        .route("/api/scenarios/:id/params", post(update_params_handler))
        .route("/api/scenarios/:id/months", post(bulk_update_handler))
        .route("/api/scenarios/:id/months/:index", post(update_month_handler))
        .route("/api/scenarios/:id/import", post(import_handler))
        .route("/api/scenarios/:id/summary", get(summary_handler))
        .route("/api/scenarios/:id/export.csv", get(export_csv_handler))
        .route("/api/scenarios/:id/report.txt", get(report_handler))
        .route("/api/undo", post(undo_handler))
        .route("/api/redo", post(redo_handler))
        .route("/api/theme", post(toggle_theme_handler))
        .fallback(not_found_handler)
        .with_state(app_state);

    let listener = TcpListener::bind(addr).await?;
    println!("Disbursal simulator listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn state_handler(State(app): State<AppState>) -> Response {
    let store = lock_store(&app);
    json_response(StatusCode::OK, state_response(&store))
}

async fn add_scenario_handler(
    State(app): State<AppState>,
    Json(payload): Json<AddScenarioPayload>,
) -> Response {
    let preset = payload.preset.map(Preset::from).unwrap_or(Preset::Custom);
    let state = run_mutation(&app, |store| store.add_scenario(&payload.name, preset));
    json_response(StatusCode::OK, state)
}

async fn delete_scenario_handler(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let state = run_mutation(&app, |store| store.delete_scenario(&id));
    json_response(StatusCode::OK, state)
}

async fn activate_handler(State(app): State<AppState>, Path(id): Path<String>) -> Response {
    let state = run_mutation(&app, |store| store.set_active_scenario(&id));
    json_response(StatusCode::OK, state)
}

async fn duplicate_handler(State(app): State<AppState>, Path(id): Path<String>) -> Response {
    let state = run_mutation(&app, |store| store.duplicate_scenario(&id));
    json_response(StatusCode::OK, state)
}

async fn rename_handler(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RenamePayload>,
) -> Response {
    let state = run_mutation(&app, |store| store.rename_scenario(&id, &payload.name));
    json_response(StatusCode::OK, state)
}

async fn reset_handler(State(app): State<AppState>, Path(id): Path<String>) -> Response {
    let state = run_mutation(&app, |store| store.reset_scenario(&id));
    json_response(StatusCode::OK, state)
}

async fn update_params_handler(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<GlobalParamsPatch>,
) -> Response {
    let state = run_mutation(&app, |store| store.update_global_params(&id, patch));
    json_response(StatusCode::OK, state)
}

async fn update_month_handler(
    State(app): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
    Json(patch): Json<MonthPatch>,
) -> Response {
    let state = run_mutation(&app, |store| store.update_monthly_data(&id, index, patch));
    json_response(StatusCode::OK, state)
}

async fn bulk_update_handler(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<BulkUpdatePayload>,
) -> Response {
    let state = run_mutation(&app, |store| {
        store.bulk_update_monthly_data(&id, &payload.month_indices, payload.field, payload.value)
    });
    json_response(StatusCode::OK, state)
}

async fn import_handler(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ImportPayload>,
) -> Response {
    let rows = parse_csv(&payload.csv);
    let state = run_mutation(&app, |store| store.import_scenario_data(&id, rows));
    json_response(StatusCode::OK, state)
}

async fn summary_handler(State(app): State<AppState>, Path(id): Path<String>) -> Response {
    let store = lock_store(&app);
    match store.scenario(&id) {
        Some(scenario) => json_response(StatusCode::OK, summary_metrics(&scenario.monthly_data)),
        None => error_response(StatusCode::NOT_FOUND, "Unknown scenario id"),
    }
}

async fn export_csv_handler(State(app): State<AppState>, Path(id): Path<String>) -> Response {
    let store = lock_store(&app);
    match store.scenario(&id) {
        Some(scenario) => attachment_response(
            "text/csv; charset=utf-8",
            &export_filename(&scenario.name, "_data.csv"),
            export_csv(scenario),
        ),
        None => error_response(StatusCode::NOT_FOUND, "Unknown scenario id"),
    }
}

async fn report_handler(State(app): State<AppState>, Path(id): Path<String>) -> Response {
    let store = lock_store(&app);
    match store.scenario(&id) {
        Some(scenario) => attachment_response(
            "text/plain; charset=utf-8",
            &export_filename(&scenario.name, "_report.txt"),
            render_report(scenario),
        ),
        None => error_response(StatusCode::NOT_FOUND, "Unknown scenario id"),
    }
}

async fn undo_handler(State(app): State<AppState>) -> Response {
    let state = run_mutation(&app, Store::undo);
    json_response(StatusCode::OK, state)
}

async fn redo_handler(State(app): State<AppState>) -> Response {
    let state = run_mutation(&app, Store::redo);
    json_response(StatusCode::OK, state)
}

async fn toggle_theme_handler(State(app): State<AppState>) -> Response {
    let state = run_mutation(&app, Store::toggle_dark_mode);
    json_response(StatusCode::OK, state)
}

fn lock_store(app: &AppState) -> MutexGuard<'_, Store> {
    app.store.lock().expect("store mutex poisoned")
}

// Every mutation persists the whole repository before replying, so the
// state file always mirrors the last committed edit.
fn run_mutation<F: FnOnce(&mut Store)>(app: &AppState, op: F) -> StateResponse {
    let mut store = lock_store(app);
    op(&mut store);
    if let Err(e) = save_state(&app.state_file, &store.to_persisted()) {
        eprintln!(
            "Failed to persist state to {}: {e}",
            app.state_file.display()
        );
    }
    state_response(&store)
}

fn state_response(store: &Store) -> StateResponse {
    StateResponse {
        scenarios: store.scenarios().to_vec(),
        active_scenario_id: store.active_scenario_id().to_string(),
        dark_mode: store.dark_mode(),
        can_undo: store.can_undo(),
        can_redo: store.can_redo(),
    }
}

fn export_filename(name: &str, suffix: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{safe}{suffix}")
}

fn attachment_response(content_type: &str, filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
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

    fn temp_app() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().expect("temp dir");
        let app = AppState {
            store: Arc::new(Mutex::new(Store::new())),
            state_file: dir.path().join("state.json"),
        };
        (dir, app)
    }

    #[test]
    fn add_scenario_payload_parses_preset_aliases() {
        let payload: AddScenarioPayload =
            serde_json::from_str(r#"{"name": "Bull case", "preset": "optimistic"}"#)
                .expect("payload should parse");
        assert_eq!(payload.name, "Bull case");
        assert_eq!(payload.preset, Some(ApiPreset::Optimistic));

        let payload: AddScenarioPayload =
            serde_json::from_str(r#"{"name": "Plain", "preset": "Conservative"}"#)
                .expect("payload should parse");
        assert_eq!(payload.preset, Some(ApiPreset::Conservative));

        let payload: AddScenarioPayload =
            serde_json::from_str(r#"{"name": "No preset"}"#).expect("payload should parse");
        assert_eq!(payload.preset, None);
    }

    #[test]
    fn bulk_update_payload_parses_camel_case_fields() {
        let payload: BulkUpdatePayload = serde_json::from_str(
            r#"{"monthIndices": [0, 2, 5], "field": "loanPageRate", "value": 0.45}"#,
        )
        .expect("payload should parse");
        assert_eq!(payload.month_indices, vec![0, 2, 5]);
        assert_eq!(payload.field, MonthField::LoanPageRate);
        assert!((payload.value - 0.45).abs() < 1e-12);
    }

    #[test]
    fn month_patch_parses_partial_updates() {
        let patch: MonthPatch = serde_json::from_str(r#"{"downloads": 2500}"#)
            .expect("patch should parse");
        assert_eq!(patch.downloads, Some(2500.0));
        assert_eq!(patch.loan_page_rate, None);

        let patch: GlobalParamsPatch = serde_json::from_str(r#"{"numberOfMonths": 30}"#)
            .expect("patch should parse");
        assert_eq!(patch.number_of_months, Some(30));
        assert_eq!(patch.avg_ticket_size, None);
    }

    #[test]
    fn state_response_serializes_expected_keys() {
        let store = Store::new();
        let json =
            serde_json::to_string(&state_response(&store)).expect("response should serialize");
        assert!(json.contains("\"scenarios\""));
        assert!(json.contains("\"activeScenarioId\""));
        assert!(json.contains("\"darkMode\""));
        assert!(json.contains("\"canUndo\""));
        assert!(json.contains("\"canRedo\""));
        assert!(json.contains("\"monthlyData\""));
        assert!(json.contains("\"cumulativeNewUsers\""));
    }

    #[test]
    fn run_mutation_applies_the_edit_and_persists_it() {
        let (_dir, app) = temp_app();
        let state = run_mutation(&app, |store| store.add_scenario("Persisted", Preset::Custom));

        assert_eq!(state.scenarios.len(), 3);

        let saved = load_state(&app.state_file)
            .expect("load state")
            .expect("state file written");
        assert_eq!(saved.scenarios.len(), 3);
        assert_eq!(saved.active_scenario_id, state.active_scenario_id);
    }

    #[test]
    fn undo_after_mutation_restores_previous_scenario_set() {
        let (_dir, app) = temp_app();
        run_mutation(&app, |store| store.add_scenario("First", Preset::Custom));
        run_mutation(&app, |store| store.add_scenario("Second", Preset::Custom));
        let state = run_mutation(&app, Store::undo);

        assert_eq!(state.scenarios.len(), 3);
        assert!(state.can_redo);
        let saved = load_state(&app.state_file)
            .expect("load state")
            .expect("state file written");
        assert_eq!(saved.scenarios.len(), 3);
    }

    #[test]
    fn export_filename_sanitizes_awkward_names() {
        assert_eq!(export_filename("Base case", "_data.csv"), "Base case_data.csv");
        assert_eq!(
            export_filename("q3/q4 \"push\"", "_report.txt"),
            "q3_q4 _push__report.txt"
        );
    }
}
