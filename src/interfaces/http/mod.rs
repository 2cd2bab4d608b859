use crate::domain::error::{AppError, Result};
use crate::domain::saved_analysis::SavedAnalysis;
use crate::interfaces::state::AppState;
use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::{
    delete, dev::Server, get, post, put, web, App, HttpResponse, HttpServer, Responder,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex};
use validator::Validate;

/// Largest accepted CSV upload.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub app: Arc<AppState>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Deserialize, Validate)]
pub struct UploadQuery {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
}

#[derive(Deserialize, Validate)]
pub struct ApiKeyRequest {
    #[validate(length(min = 1, max = 512))]
    pub api_key: String,
}

#[derive(Deserialize, Validate)]
pub struct StoredApiKeyRequest {
    #[validate(length(min = 1, max = 64))]
    pub provider: String,
    #[validate(length(min = 1, max = 512))]
    pub api_key: String,
}

#[derive(Deserialize, Validate)]
pub struct AnalyzeRequest {
    #[validate(length(min = 1, max = 64))]
    pub team_number: String,
}

#[derive(Deserialize)]
pub struct ChoicesQuery {
    pub first: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct CompareRequest {
    #[validate(length(min = 1, max = 64))]
    pub first: String,
    #[validate(length(min = 1, max = 64))]
    pub second: String,
}

#[derive(Deserialize, Validate, Default)]
pub struct PicklistRequest {
    #[validate(length(max = 2000))]
    pub wanted: Option<String>,
    #[validate(length(max = 2000))]
    pub unwanted: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn validated<T: Validate>(request: &T) -> Result<()> {
    request
        .validate()
        .map_err(|e| AppError::InputError(e.to_string()))
}

/// An empty body means "use the stored preferences"; anything else must parse.
fn picklist_request(body: &[u8]) -> Result<PicklistRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(PicklistRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::InputError(format!("Invalid picklist request: {}", e)))
}

fn error_response(logs: &Mutex<Vec<LogEntry>>, source: &str, err: &AppError) -> HttpResponse {
    let level = if err.status_code() >= 500 { "ERROR" } else { "WARN" };
    add_log(logs, level, source, &err.to_string());
    tracing::warn!(source, error = %err, "Request failed");

    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(ErrorBody {
        error: err.to_string(),
    })
}

fn respond<T: Serialize>(
    logs: &Mutex<Vec<LogEntry>>,
    source: &str,
    result: Result<T>,
) -> HttpResponse {
    match result {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e) => error_response(logs, source, &e),
    }
}

// ---- sessions ----

#[post("/sessions")]
async fn create_session(data: web::Data<HttpState>) -> impl Responder {
    match data.app.sessions.create() {
        Ok(id) => {
            add_log(&data.logs, "INFO", "Session", &format!("Created session {}", id));
            HttpResponse::Created().json(json!({ "session_id": id }))
        }
        Err(e) => error_response(&data.logs, "Session", &e),
    }
}

#[get("/sessions/{id}")]
async fn get_session(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let result = match data.app.sessions.get(&path) {
        Ok(session) => Ok(data.app.snapshot(&session).await),
        Err(e) => Err(e),
    };
    respond(&data.logs, "Session", result)
}

#[delete("/sessions/{id}")]
async fn delete_session(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    if data.app.sessions.remove(&path) {
        HttpResponse::NoContent().finish()
    } else {
        error_response(
            &data.logs,
            "Session",
            &AppError::NotFound(format!("Session {}", path.as_str())),
        )
    }
}

#[put("/sessions/{id}/api-key")]
async fn set_session_api_key(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    req: web::Json<ApiKeyRequest>,
) -> impl Responder {
    let result: Result<_> = async {
        validated(&*req)?;
        let session = data.app.sessions.get(&path)?;
        session
            .lock()
            .await
            .set_api_key(Some(req.api_key.clone()));
        Ok(json!({ "status": "ok" }))
    }
    .await;
    respond(&data.logs, "Session", result)
}

// ---- upload ----

#[post("/sessions/{id}/upload")]
async fn upload(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "Upload",
        &format!("Uploading {} ({} bytes)", query.file_name, body.len()),
    );

    let result: Result<_> = async {
        validated(&*query)?;
        let session = data.app.sessions.get(&path)?;
        data.app
            .upload_use_case
            .execute(&session, &query.file_name, &body)
            .await
    }
    .await;

    if let Ok(summary) = &result {
        add_log(
            &data.logs,
            "INFO",
            "Upload",
            &format!(
                "Successfully uploaded {} ({} teams)",
                summary.file_name,
                summary.teams.len()
            ),
        );
    }
    respond(&data.logs, "Upload", result)
}

#[get("/sessions/{id}/teams")]
async fn list_teams(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let result: Result<_> = async {
        let session = data.app.sessions.get(&path)?;
        let snapshot = data.app.snapshot(&session).await;
        if snapshot.file_name.is_none() {
            return Err(AppError::PreconditionError(
                "Please upload a file first".to_string(),
            ));
        }
        Ok(snapshot.teams)
    }
    .await;
    respond(&data.logs, "Analysis", result)
}

// ---- analysis ----

#[post("/sessions/{id}/analyze")]
async fn analyze(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    req: web::Json<AnalyzeRequest>,
) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "Analysis",
        &format!("Analyzing team {}", req.team_number),
    );

    let result: Result<_> = async {
        validated(&*req)?;
        let session = data.app.sessions.get(&path)?;
        let config = data.app.llm_config_for(&session).await?;
        let response = data
            .app
            .analysis_use_case
            .analyze(session, &config, &req.team_number)
            .await?;
        Ok(json!({ "team_number": req.team_number, "response": response }))
    }
    .await;
    respond(&data.logs, "Analysis", result)
}

#[post("/sessions/{id}/analysis/save")]
async fn save_analysis(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let result: Result<_> = async {
        let session = data.app.sessions.get(&path)?;
        data.app.analysis_use_case.save(&session).await
    }
    .await;

    if let Ok(saved) = &result {
        add_log(
            &data.logs,
            "INFO",
            "Analysis",
            &format!("Successfully saved response for team {}", saved.team_number),
        );
    }
    respond(&data.logs, "Analysis", result)
}

#[post("/sessions/{id}/analysis/clear")]
async fn clear_analysis(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let result: Result<_> = async {
        let session = data.app.sessions.get(&path)?;
        data.app.analysis_use_case.clear(&session).await?;
        Ok(json!({ "status": "cleared" }))
    }
    .await;
    respond(&data.logs, "Analysis", result)
}

#[get("/sessions/{id}/analyses")]
async fn list_analyses(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let result: Result<Vec<SavedAnalysis>> = async {
        let session = data.app.sessions.get(&path)?;
        let state = session.lock().await;
        state.require_file()?;
        Ok(state.saved_analysis_list())
    }
    .await;
    respond(&data.logs, "Saved", result)
}

#[get("/sessions/{id}/analyses/{team}")]
async fn view_analysis(
    data: web::Data<HttpState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (id, team) = path.into_inner();
    let result: Result<_> = async {
        let session = data.app.sessions.get(&id)?;
        data.app.analysis_use_case.view(&session, &team).await
    }
    .await;
    respond(&data.logs, "Saved", result)
}

// ---- comparison ----

#[get("/sessions/{id}/compare/choices")]
async fn comparison_choices(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<ChoicesQuery>,
) -> impl Responder {
    let result: Result<_> = async {
        let session = data.app.sessions.get(&path)?;
        data.app
            .comparison_use_case
            .choices(&session, query.first.as_deref())
            .await
    }
    .await;
    respond(&data.logs, "Comparison", result)
}

#[post("/sessions/{id}/compare")]
async fn compare(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    req: web::Json<CompareRequest>,
) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "Comparison",
        &format!("Comparing team {} to team {}", req.first, req.second),
    );

    let result: Result<_> = async {
        validated(&*req)?;
        let session = data.app.sessions.get(&path)?;
        let config = data.app.llm_config_for(&session).await?;
        let response = data
            .app
            .comparison_use_case
            .compare(session, &config, &req.first, &req.second)
            .await?;
        Ok(json!({ "first": req.first, "second": req.second, "response": response }))
    }
    .await;
    respond(&data.logs, "Comparison", result)
}

// ---- picklist ----

#[post("/sessions/{id}/picklist")]
async fn generate_picklist(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    body: web::Bytes,
) -> impl Responder {
    let result: Result<_> = async {
        let req = picklist_request(&body)?;
        validated(&req)?;
        let session = data.app.sessions.get(&path)?;
        let config = data.app.llm_config_for(&session).await?;
        data.app
            .picklist_use_case
            .generate(session, &config, req.wanted, req.unwanted)
            .await
    }
    .await;

    if let Ok(picklist) = &result {
        add_log(
            &data.logs,
            "INFO",
            "Picklist",
            &format!("Generated picklist for teams {}", picklist.teams.join(", ")),
        );
    }
    respond(&data.logs, "Picklist", result)
}

// ---- history ----

#[post("/sessions/{id}/history/save")]
async fn save_history(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let result: Result<_> = async {
        let session = data.app.sessions.get(&path)?;
        let store = data.app.persistence_use_case.save_to_disk(&session).await?;
        Ok(json!({ "path": store }))
    }
    .await;

    if result.is_ok() {
        add_log(&data.logs, "INFO", "History", "Saved analyses to disk");
    }
    respond(&data.logs, "History", result)
}

#[post("/sessions/{id}/history/load")]
async fn load_history(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let result: Result<_> = async {
        let session = data.app.sessions.get(&path)?;
        data.app.persistence_use_case.load_history(&session).await
    }
    .await;
    respond(&data.logs, "History", result)
}

// ---- misc ----

#[post("/api-key")]
async fn store_api_key(
    data: web::Data<HttpState>,
    req: web::Json<StoredApiKeyRequest>,
) -> impl Responder {
    let result = validated(&*req).and_then(|_| {
        data.app
            .config_service
            .save_api_key(&req.provider.to_lowercase(), &req.api_key)
            .map(|_| json!({ "status": "ok" }))
    });
    respond(&data.logs, "Config", result)
}

#[get("/models")]
async fn list_models(data: web::Data<HttpState>) -> impl Responder {
    let result: Result<_> = async {
        let config = data.app.resolve_llm_config(None)?;
        data.app.llm_client.list_models(&config).await
    }
    .await;
    respond(&data.logs, "Config", result)
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data
        .logs
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    HttpResponse::Ok().json(&*logs)
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

/// Routes under `/api`, shared by the server and the route tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
            .service(create_session)
            .service(get_session)
            .service(delete_session)
            .service(set_session_api_key)
            .service(upload)
            .service(list_teams)
            .service(analyze)
            .service(save_analysis)
            .service(clear_analysis)
            .service(list_analyses)
            .service(view_analysis)
            .service(comparison_choices)
            .service(compare)
            .service(generate_picklist)
            .service(save_history)
            .service(load_history)
            .service(store_api_key)
            .service(list_models)
            .service(get_logs),
    );
}

pub fn start_server(
    app: Arc<AppState>,
    logs: Arc<Mutex<Vec<LogEntry>>>,
) -> std::io::Result<Server> {
    let host = app.config.server.host.clone();
    let port = app.config.server.port;
    let state = web::Data::new(HttpState { app, logs });

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Allow all origins for local tool

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((host.as_str(), port))?
    .run();

    Ok(server)
}
