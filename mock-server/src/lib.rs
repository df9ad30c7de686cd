//! In-memory stand-in for a project on the data-capture platform API.
//!
//! Everything is served from one endpoint, `POST /api/`, with a form-encoded
//! body. The `content` field picks the operation, as on the real platform.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Form, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

/// Token accepted by [`MockProject::demo`].
pub const DEMO_TOKEN: &str = "DEMO0000000000000000000000000000";

/// Path of the API endpoint.
pub const API_PATH: &str = "/api/";

pub type Record = Map<String, Value>;

/// Server-side state of one project.
#[derive(Clone, Debug)]
pub struct MockProject {
    pub token: String,
    pub info: Value,
    pub metadata: Vec<Value>,
    pub records: BTreeMap<String, Record>,
    pub users: Vec<Value>,
    /// Report id to the fields it shows.
    pub reports: BTreeMap<String, Vec<String>>,
}

impl MockProject {
    /// A small two-form project with two records and one report.
    pub fn demo() -> Self {
        let metadata = vec![
            field("enrollment", "record_id", "text", "Record ID"),
            field("enrollment", "enrolled_on", "text", "Enrollment date"),
            field("demographics", "age", "text", "Age"),
            field("demographics", "sex", "radio", "Sex"),
        ];
        let mut records = BTreeMap::new();
        for (id, age, sex) in [("1", "34", "0"), ("2", "58", "1")] {
            let record = json!({
                "record_id": id,
                "enrolled_on": "2023-02-07",
                "age": age,
                "sex": sex,
            });
            if let Value::Object(map) = record {
                records.insert(id.to_string(), map);
            }
        }
        Self {
            token: DEMO_TOKEN.to_string(),
            info: json!({
                "project_id": 14,
                "project_title": "Demo cohort",
                "is_longitudinal": 0,
                "record_autonumbering_enabled": 0,
            }),
            metadata,
            records,
            users: vec![json!({
                "username": "coordinator",
                "email": "coordinator@example.org",
                "api_export": 1,
                "api_import": 1,
            })],
            reports: BTreeMap::from([(
                "101".to_string(),
                vec!["record_id".to_string(), "age".to_string()],
            )]),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// The first metadata field names each record.
    fn id_field(&self) -> String {
        self.metadata
            .first()
            .and_then(|f| f["field_name"].as_str())
            .unwrap_or("record_id")
            .to_string()
    }

    fn forms(&self) -> Vec<String> {
        let mut forms: Vec<String> = Vec::new();
        for f in &self.metadata {
            if let Some(form) = f["form_name"].as_str() {
                if !forms.iter().any(|known| known == form) {
                    forms.push(form.to_string());
                }
            }
        }
        forms
    }

    fn fields_of_form(&self, form: &str) -> Vec<String> {
        self.metadata
            .iter()
            .filter(|f| f["form_name"] == form)
            .filter_map(|f| f["field_name"].as_str().map(str::to_string))
            .collect()
    }
}

fn field(form: &str, name: &str, field_type: &str, label: &str) -> Value {
    json!({
        "field_name": name,
        "form_name": form,
        "section_header": "",
        "field_type": field_type,
        "field_label": label,
        "select_choices_or_calculations": "",
        "required_field": "",
    })
}

/// Form fields of one request, in arrival order.
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self(fields)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Values sent as repeated `key` entries or as `key[n]` entries.
    fn list(&self, key: &str) -> Vec<String> {
        let prefix = format!("{key}[");
        let mut indexed: Vec<(usize, String)> = Vec::new();
        let mut plain = Vec::new();
        for (k, v) in &self.0 {
            if k == key {
                plain.push(v.clone());
            } else if let Some(index) = k
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(']'))
                .and_then(|n| n.parse().ok())
            {
                indexed.push((index, v.clone()));
            }
        }
        indexed.sort_by_key(|(n, _)| *n);
        plain.extend(indexed.into_iter().map(|(_, v)| v));
        plain
    }
}

/// Outcome of one API call.
#[derive(Debug, PartialEq)]
pub enum Reply {
    Json(StatusCode, Value),
    Pdf(Vec<u8>),
}

impl Reply {
    fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Reply::Json(status, json!({ "error": message.into() }))
    }

    fn ok(value: Value) -> Self {
        Reply::Json(StatusCode::OK, value)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Reply::Json(status, _) => *status,
            Reply::Pdf(_) => StatusCode::OK,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Json(status, value) => (status, axum::Json(value)).into_response(),
            Reply::Pdf(bytes) => ([(header::CONTENT_TYPE, "application/pdf")], bytes).into_response(),
        }
    }
}

/// Route one request against the project state.
pub fn handle(project: &mut MockProject, params: &Params) -> Reply {
    if params.get("token") != Some(project.token.as_str()) {
        return Reply::error(
            StatusCode::FORBIDDEN,
            "You do not have permissions to use the API",
        );
    }
    match params.get("content") {
        Some("metadata") => Reply::ok(Value::Array(project.metadata.clone())),
        Some("instrument") => export_instruments(project),
        Some("pdf") => export_pdf(project, params),
        Some("project") => Reply::ok(project.info.clone()),
        Some("record") if params.get("action") == Some("delete") => delete_records(project, params),
        Some("record") if params.get("data").is_some() => import_records(project, params),
        Some("record") => export_records(project, params),
        Some("report") => export_report(project, params),
        Some("user") => Reply::ok(Value::Array(project.users.clone())),
        Some(other) => Reply::error(
            StatusCode::BAD_REQUEST,
            format!("The value of the parameter \"content\" ({other}) is not valid"),
        ),
        None => Reply::error(StatusCode::BAD_REQUEST, "The parameter \"content\" is missing"),
    }
}

fn export_instruments(project: &MockProject) -> Reply {
    let instruments = project
        .forms()
        .into_iter()
        .map(|form| {
            let label = form.replace('_', " ");
            json!({ "instrument_name": form, "instrument_label": label })
        })
        .collect();
    Reply::ok(Value::Array(instruments))
}

fn export_pdf(project: &MockProject, params: &Params) -> Reply {
    let instrument = params.get("instrument").unwrap_or("all");
    if instrument != "all" && !project.forms().iter().any(|f| f == instrument) {
        return Reply::error(
            StatusCode::BAD_REQUEST,
            format!("The instrument \"{instrument}\" does not exist"),
        );
    }
    let scope = match (params.get("allRecords"), params.get("record")) {
        (Some(_), _) => "all records".to_string(),
        (None, Some(record)) if !project.records.contains_key(record) => {
            return Reply::error(
                StatusCode::BAD_REQUEST,
                format!("The record \"{record}\" does not exist"),
            );
        }
        (None, Some(record)) => format!("record {record}"),
        (None, None) => "blank".to_string(),
    };
    Reply::Pdf(format!("%PDF-1.4\n% {instrument} ({scope})\n%%EOF\n").into_bytes())
}

fn export_records(project: &MockProject, params: &Params) -> Reply {
    let ids = params.list("records");
    let mut wanted = params.list("fields");
    for form in params.list("forms") {
        wanted.extend(project.fields_of_form(&form));
    }
    if !wanted.is_empty() {
        wanted.push(project.id_field());
    }

    let rows: Vec<&Record> = project
        .records
        .iter()
        .filter(|(id, _)| ids.is_empty() || ids.contains(id))
        .map(|(_, record)| record)
        .collect();
    let keep = |name: &str| wanted.is_empty() || wanted.iter().any(|w| w == name);
    let keep = &keep;

    let id_field = project.id_field();
    let body = match params.get("type") {
        Some("eav") => rows
            .iter()
            .flat_map(|record| {
                let id = record.get(&id_field).cloned().unwrap_or(Value::Null);
                record
                    .iter()
                    .filter(move |(name, _)| keep(name.as_str()))
                    .map(move |(name, value)| {
                        json!({ "record": id, "field_name": name, "value": value })
                    })
            })
            .collect(),
        _ => rows
            .iter()
            .map(|record| {
                let filtered: Record = record
                    .iter()
                    .filter(|(name, _)| keep(name.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Value::Object(filtered)
            })
            .collect(),
    };
    Reply::ok(Value::Array(body))
}

fn import_records(project: &mut MockProject, params: &Params) -> Reply {
    let Some(data) = params.get("data") else {
        return Reply::error(StatusCode::BAD_REQUEST, "The parameter \"data\" is missing");
    };
    let incoming: Vec<Record> = match serde_json::from_str(data) {
        Ok(rows) => rows,
        Err(e) => return Reply::error(StatusCode::BAD_REQUEST, format!("The data is not valid JSON: {e}")),
    };

    let id_field = project.id_field();
    let mut ids = Vec::with_capacity(incoming.len());
    for row in &incoming {
        match row.get(&id_field).and_then(scalar) {
            Some(id) => ids.push(id),
            None => {
                return Reply::error(
                    StatusCode::BAD_REQUEST,
                    format!("Every record must include \"{id_field}\""),
                )
            }
        }
    }

    let overwrite = params.get("overwriteBehavior") == Some("overwrite");
    for (id, row) in ids.iter().zip(incoming) {
        let stored = project.records.entry(id.clone()).or_default();
        for (name, value) in row {
            // normal overwrite keeps stored values when the incoming one is blank
            if overwrite || value != "" {
                stored.insert(name, value);
            }
        }
    }

    match params.get("returnContent") {
        Some("ids") => Reply::ok(json!(ids)),
        _ => Reply::ok(json!({ "count": ids.len() })),
    }
}

fn delete_records(project: &mut MockProject, params: &Params) -> Reply {
    let ids = params.list("records");
    if ids.is_empty() {
        return Reply::error(StatusCode::BAD_REQUEST, "No records were provided to delete");
    }
    if let Some(missing) = ids.iter().find(|id| !project.records.contains_key(*id)) {
        return Reply::error(
            StatusCode::BAD_REQUEST,
            format!("The following records do not exist: {missing}"),
        );
    }
    for id in &ids {
        project.records.remove(id);
    }
    Reply::ok(json!(ids.len()))
}

fn export_report(project: &MockProject, params: &Params) -> Reply {
    let report_id = params.get("report_id").unwrap_or_default();
    let Some(fields) = project.reports.get(report_id) else {
        return Reply::error(
            StatusCode::BAD_REQUEST,
            "The value of the parameter \"report_id\" is not valid",
        );
    };
    let rows = project
        .records
        .values()
        .map(|record| {
            let row: Record = fields
                .iter()
                .map(|name| (name.clone(), record.get(name).cloned().unwrap_or(json!(""))))
                .collect();
            Value::Object(row)
        })
        .collect();
    Reply::ok(Value::Array(rows))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub type Db = Arc<RwLock<MockProject>>;

pub fn app() -> Router {
    app_with(MockProject::demo())
}

pub fn app_with(project: MockProject) -> Router {
    let db: Db = Arc::new(RwLock::new(project));
    Router::new().route(API_PATH, post(api)).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, project: MockProject) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(project)).await
}

async fn api(State(db): State<Db>, Form(fields): Form<Vec<(String, String)>>) -> Reply {
    let params = Params::new(fields);
    let mut project = db.write().await;
    let reply = handle(&mut project, &params);
    info!(
        content = params.get("content").unwrap_or("-"),
        status = reply.status().as_u16(),
        "handled api request"
    );
    reply
}
