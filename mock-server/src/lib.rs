use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

/// Input paths containing this marker make the job fail during conversion.
pub const FAILING_INPUT_MARKER: &str = "corrupt";

const STEPS: [&str; 4] = ["input", "convert", "output", "finished"];

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ProcessRequest {
    pub apikey: Option<String>,
    pub inputformat: Option<String>,
    pub outputformat: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct StartRequest {
    pub inputmethod: Option<String>,
    pub filepath: Option<String>,
    pub filename: Option<String>,
    pub outputformat: Option<String>,
    pub converteroptions: Map<String, Value>,
    pub wait: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub inputformat: String,
    pub outputformat: String,
    pub inputmethod: Option<String>,
    pub filename: Option<String>,
    pub options: Map<String, Value>,
    pub started: bool,
    pub failing: bool,
    pub step_index: usize,
    pub starttime: i64,
}

impl Job {
    fn step(&self) -> &'static str {
        if self.failing && self.step_index >= 1 {
            "error"
        } else {
            STEPS[self.step_index.min(STEPS.len() - 1)]
        }
    }

    fn advance(&mut self) {
        if self.step_index < STEPS.len() - 1 {
            self.step_index += 1;
        }
    }

    fn view(&self, host: &str) -> Value {
        let step = self.step();
        let finished = step == "finished";
        let (percent, message) = match step {
            "finished" => (100, "Conversion finished!".to_string()),
            "error" => (0, "Conversion failed: input file is corrupt".to_string()),
            other => (self.step_index * 25, format!("Step {other} running")),
        };
        let basename = self
            .filename
            .as_deref()
            .and_then(|f| f.rsplit_once('.').map(|(stem, _)| stem.to_string()))
            .unwrap_or_else(|| "output".to_string());

        let endtime = (finished || step == "error").then(|| now() + 1);
        let duration = if finished { 0.5 } else { 0.0 };
        let output = if finished {
            json!({
                "filename": format!("{basename}.{}", self.outputformat),
                "ext": self.outputformat,
                "size": 1024,
                "url": format!("//{host}/download/{}", self.id),
                "downloads": 0,
            })
        } else {
            Value::Null
        };

        json!({
            "id": self.id,
            "url": format!("//{host}/process/{}", self.id),
            "percent": percent.to_string(),
            "message": message,
            "step": step,
            "starttime": self.starttime,
            "endtime": endtime,
            "expire": self.starttime + 86_400,
            "input": {
                "type": self.inputmethod,
                "filename": self.filename,
                "name": basename,
                "ext": self.inputformat,
            },
            "converter": {
                "format": self.outputformat,
                "type": "mock",
                "options": self.options,
                "duration": duration,
            },
            "output": output,
        })
    }
}

pub struct ServiceState {
    pub api_key: String,
    pub jobs: RwLock<HashMap<String, Job>>,
}

pub type Db = Arc<ServiceState>;

pub fn app(api_key: &str) -> Router {
    let state: Db = Arc::new(ServiceState {
        api_key: api_key.to_string(),
        jobs: RwLock::new(HashMap::new()),
    });
    Router::new()
        .route("/process", post(negotiate))
        .route(
            "/process/{id}",
            post(start_conversion).get(status).delete(delete_process),
        )
        .route("/gateway-failure", any(gateway_failure))
        .with_state(state)
}

pub async fn run(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(api_key)).await
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn host(headers: &HeaderMap) -> String {
    headers
        .get("host")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost")
        .to_string()
}

fn error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "code": status.as_u16(), "error": message })),
    )
        .into_response()
}

fn authorized(state: &ServiceState, headers: &HeaderMap, body_key: Option<&str>) -> bool {
    let bearer = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));
    bearer == Some(state.api_key.as_str()) || body_key == Some(state.api_key.as_str())
}

async fn negotiate(
    State(state): State<Db>,
    headers: HeaderMap,
    Json(input): Json<ProcessRequest>,
) -> Response {
    if !authorized(&state, &headers, input.apikey.as_deref()) {
        return error(StatusCode::UNAUTHORIZED, "Invalid API key");
    }
    let (Some(inputformat), Some(outputformat)) = (input.inputformat, input.outputformat) else {
        return error(
            StatusCode::BAD_REQUEST,
            "inputformat and outputformat are required",
        );
    };

    let id = Uuid::new_v4().simple().to_string();
    let job = Job {
        id: id.clone(),
        inputformat,
        outputformat,
        inputmethod: None,
        filename: None,
        options: Map::new(),
        started: false,
        failing: false,
        step_index: 0,
        starttime: now(),
    };
    state.jobs.write().await.insert(id.clone(), job);
    info!(%id, "process created");

    let host = host(&headers);
    Json(json!({
        "url": format!("//{host}/process/{id}"),
        "id": id,
        "host": host,
        "expires": "2099-01-01 00:00:00",
        "maxtime": 18000,
        "minutes": 1000,
    }))
    .into_response()
}

async fn start_conversion(
    State(state): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<StartRequest>,
) -> Response {
    let mut jobs = state.jobs.write().await;
    let Some(job) = jobs.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, "Process not found");
    };
    if job.started {
        return error(StatusCode::CONFLICT, "Conversion already started");
    }
    if input.inputmethod.is_none() {
        return error(StatusCode::BAD_REQUEST, "inputmethod is required");
    }
    if let Some(format) = input.outputformat {
        job.outputformat = format;
    }
    job.started = true;
    job.inputmethod = input.inputmethod;
    job.filename = input
        .filename
        .or_else(|| input.filepath.as_deref().and_then(|p| p.rsplit('/').next()).map(String::from));
    job.options = input.converteroptions;
    job.failing = input
        .filepath
        .as_deref()
        .is_some_and(|p| p.contains(FAILING_INPUT_MARKER));
    if input.wait == Some(true) {
        job.step_index = if job.failing { 1 } else { STEPS.len() - 1 };
    }
    Json(job.view(&host(&headers))).into_response()
}

async fn status(State(state): State<Db>, Path(id): Path<String>, headers: HeaderMap) -> Response {
    let mut jobs = state.jobs.write().await;
    let Some(job) = jobs.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, "Process not found");
    };
    if job.started {
        job.advance();
    }
    Json(job.view(&host(&headers))).into_response()
}

async fn delete_process(State(state): State<Db>, Path(id): Path<String>) -> Response {
    match state.jobs.write().await.remove(&id) {
        Some(_) => Json(json!({ "message": "Process deleted" })).into_response(),
        None => error(StatusCode::NOT_FOUND, "Process not found"),
    }
}

async fn gateway_failure() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "Bad Gateway")
}
