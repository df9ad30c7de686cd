//! Blocking client for one project on the data-capture platform API.
//!
//! # Design
//! `ProjectClient` owns the project's credentials, a schema snapshot taken at
//! construction, and a `Transport`. Every operation is split the way the wire
//! contract is: a pure `build_*` method produces the form body, and the
//! operation method posts it and returns the response envelope. Only the
//! metadata probe during construction and the PDF export look at the status
//! code; everything else leaves interpretation to the caller.
//!
//! The token has no accessor and the schema is only reachable through a
//! shared borrow, so neither can change after `with_transport` returns.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{ApiError, Credential, Result};
use crate::http::{HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::schema::Schema;
use crate::types::{Content, PdfExport, RecordExport, RecordType};

const JSON: &str = "json";

struct Credentials {
    token: String,
    host: String,
}

impl Credentials {
    fn from_config(config: ClientConfig) -> Result<Self> {
        let token = present(config.api_token).ok_or(ApiError::MissingCredential(Credential::Token))?;
        let host = present(config.api_host).ok_or(ApiError::MissingCredential(Credential::Host))?;
        Ok(Self { token, host })
    }

    /// Start a request body with the fields every call carries.
    fn request(&self, content: Content) -> HttpRequest {
        let mut req = HttpRequest::new(&self.host);
        req.push("token", self.token.as_str());
        req.push("content", content.as_str());
        req
    }

    fn metadata_request(&self) -> HttpRequest {
        let mut req = self.request(Content::Metadata);
        req.push("format", JSON);
        req
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("host", &self.host)
            .finish()
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A ready-to-use connection to one project.
///
/// Construction validates the credentials, fetches the metadata and caches it
/// as a [`Schema`]; a failure at any of those steps yields no client.
#[derive(Debug)]
pub struct ProjectClient<T = UreqTransport> {
    credentials: Credentials,
    schema: Schema,
    transport: T,
}

impl ProjectClient<UreqTransport> {
    /// Connect with a token and endpoint URL. Blank strings count as missing.
    pub fn new(api_token: &str, api_host: &str) -> Result<Self> {
        Self::connect(ClientConfig::new().api_token(api_token).api_host(api_host))
    }

    /// Connect using the default blocking transport.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> ProjectClient<T> {
    /// Validate `config`, then fetch and cache the project schema through
    /// `transport`.
    ///
    /// # Errors
    /// - [`ApiError::MissingCredential`] before any network traffic when the
    ///   token or host is absent.
    /// - [`ApiError::HttpStatus`] when the metadata probe is not answered
    ///   with 200.
    /// - [`ApiError::Json`] / [`ApiError::SchemaParse`] when the metadata body
    ///   does not have the expected shape.
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        let credentials = Credentials::from_config(config)?;
        let response = send(&transport, &credentials.metadata_request())?;
        check_status(&response)?;
        let schema = Schema::from_metadata_json(&response.body)?;
        info!(
            fields = schema.len(),
            forms = schema.forms().len(),
            "cached project schema"
        );
        Ok(Self {
            credentials,
            schema,
            transport,
        })
    }

    /// The schema snapshot taken at construction.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    // -- request builders ---------------------------------------------------

    pub fn build_export_forms(&self) -> HttpRequest {
        let mut req = self.credentials.request(Content::Instrument);
        req.push("format", JSON);
        req.push("returnFormat", JSON);
        req
    }

    pub fn build_export_forms_pdf(&self, params: &PdfExport) -> HttpRequest {
        let mut req = self.credentials.request(Content::Pdf);
        req.push("returnFormat", JSON);
        if params.all_records {
            req.push("allRecords", "true");
        }
        req.push_opt("record", params.record.as_deref());
        req.push_opt("instrument", params.instrument.as_deref());
        req
    }

    pub fn build_export_metadata(&self) -> HttpRequest {
        self.credentials.metadata_request()
    }

    pub fn build_export_project_info(&self) -> HttpRequest {
        let mut req = self.credentials.request(Content::Project);
        req.push("format", JSON);
        req
    }

    pub fn build_export_records(&self, params: &RecordExport) -> HttpRequest {
        let mut req = self.credentials.request(Content::Record);
        req.push("format", JSON);
        req.push("type", params.record_type.as_str());
        for (key, values) in [
            ("records", &params.records),
            ("fields", &params.fields),
            ("forms", &params.forms),
        ] {
            for value in values.iter().flatten() {
                req.push(key, value.as_str());
            }
        }
        req
    }

    pub fn build_export_report(&self, report_id: &str) -> HttpRequest {
        let mut req = self.credentials.request(Content::Report);
        req.push("format", JSON);
        req.push("report_id", report_id);
        req
    }

    pub fn build_export_user(&self) -> HttpRequest {
        let mut req = self.credentials.request(Content::User);
        req.push("format", JSON);
        req
    }

    /// Body for a record import. `update` records the caller's intent but the
    /// server receives the same auto-numbering policy either way.
    pub fn build_import_record<R>(&self, records: &R, update: bool) -> Result<HttpRequest>
    where
        R: Serialize + ?Sized,
    {
        let data = serde_json::to_string(records)?;
        debug!(update, bytes = data.len(), "serialized import payload");

        let mut req = self.credentials.request(Content::Record);
        req.push("format", JSON);
        req.push("type", RecordType::Flat.as_str());
        req.push("overwriteBehavior", "normal");
        req.push("forceAutoNumber", "false");
        req.push("returnContent", "ids");
        req.push("data", data);
        Ok(req)
    }

    pub fn build_delete_record<S: AsRef<str>>(&self, records: &[S]) -> HttpRequest {
        let mut req = self.credentials.request(Content::Record);
        req.push("action", "delete");
        for (n, record) in records.iter().enumerate() {
            req.push(format!("records[{n}]"), record.as_ref());
        }
        req
    }

    // -- operations ---------------------------------------------------------

    /// List the project's instruments.
    pub fn export_forms(&self) -> Result<HttpResponse> {
        self.post(&self.build_export_forms())
    }

    /// Download instrument PDFs to `params.target_path()`, replacing any file
    /// already there. Returns the written path.
    ///
    /// # Errors
    /// [`ApiError::HttpStatus`] when the server does not answer 200; the
    /// target file is left untouched in that case.
    pub fn export_forms_pdf(&self, params: &PdfExport) -> Result<PathBuf> {
        let response = self.post(&self.build_export_forms_pdf(params))?;
        check_status(&response)?;

        let path = params.target_path();
        std::fs::write(&path, &response.body)?;
        info!(path = %path.display(), bytes = response.body.len(), "wrote pdf export");
        Ok(path)
    }

    /// Fetch the current metadata. The cached schema is not refreshed.
    pub fn export_metadata(&self) -> Result<HttpResponse> {
        self.post(&self.build_export_metadata())
    }

    pub fn export_project_info(&self) -> Result<HttpResponse> {
        self.post(&self.build_export_project_info())
    }

    pub fn export_records(&self, params: &RecordExport) -> Result<HttpResponse> {
        self.post(&self.build_export_records(params))
    }

    /// Run a saved report. An empty id is sent as-is.
    pub fn export_report(&self, report_id: &str) -> Result<HttpResponse> {
        self.post(&self.build_export_report(report_id))
    }

    pub fn export_user(&self) -> Result<HttpResponse> {
        self.post(&self.build_export_user())
    }

    /// Create or update records. The response body lists the affected ids.
    pub fn import_record<R>(&self, records: &R, update: bool) -> Result<HttpResponse>
    where
        R: Serialize + ?Sized,
    {
        self.post(&self.build_import_record(records, update)?)
    }

    /// Delete records by id. An empty slice is still sent.
    pub fn delete_record<S: AsRef<str>>(&self, records: &[S]) -> Result<HttpResponse> {
        self.post(&self.build_delete_record(records))
    }

    fn post(&self, request: &HttpRequest) -> Result<HttpResponse> {
        send(&self.transport, request)
    }
}

fn send<T: Transport>(transport: &T, request: &HttpRequest) -> Result<HttpResponse> {
    let content = request.field("content").unwrap_or_default();
    debug!(content, fields = request.fields.len(), "posting api request");
    let response = transport.post_form(request)?;
    debug!(content, status = response.status, "api request completed");
    Ok(response)
}

/// Anything other than 200 is a request error on the checked paths.
fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::HttpStatus {
        status: response.status,
        body: response.text(),
    })
}
