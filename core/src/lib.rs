//! Blocking API client for a single project on a clinical data-capture
//! platform.
//!
//! # Overview
//! [`ProjectClient`] authenticates with a project-scoped token, fetches the
//! project's field metadata once at construction and caches it as a
//! [`Schema`], then exposes one method per API operation: exporting metadata,
//! instruments, instrument PDFs, project info, records, reports and users, and
//! importing or deleting records.
//!
//! # Design
//! - Every call is one synchronous form-encoded POST to the project's API
//!   endpoint. No retries, no paging, no caching of record data.
//! - Request bodies come from pure `build_*` methods so their shape can be
//!   inspected without a network; a [`Transport`] performs the round trip
//!   (blocking `ureq` by default).
//! - Responses come back as an [`HttpResponse`] envelope. Only construction
//!   and the PDF export check the status code.
//! - The token is never readable after construction and the schema is only
//!   handed out as a shared borrow.
//!
//! ```no_run
//! use rcap_core::{ClientConfig, ProjectClient, RecordExport};
//!
//! # fn main() -> rcap_core::Result<()> {
//! let client = ProjectClient::connect(ClientConfig::from_env())?;
//! for entry in client.schema() {
//!     println!("{} / {}", entry.form_name, entry.field_name);
//! }
//! let response = client.export_records(&RecordExport::new().records(["1", "2"]))?;
//! println!("{} {}", response.status, response.text());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod schema;
pub mod types;

pub use client::ProjectClient;
pub use config::ClientConfig;
pub use error::{ApiError, Credential, Result};
pub use http::{HttpRequest, HttpResponse, Transport, UreqTransport};
pub use schema::{Schema, SchemaEntry};
pub use types::{Content, PdfExport, RecordExport, RecordType};
