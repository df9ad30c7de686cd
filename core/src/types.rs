//! Request parameter types for the platform API.
//!
//! # Design
//! Each operation with optional inputs gets a struct with named, typed
//! fields. `None` means the parameter is left out of the form body entirely,
//! which the server reads as "no filter".

use std::path::PathBuf;

/// Value of the `content` form field, which selects the server operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content {
    Metadata,
    Instrument,
    Pdf,
    Project,
    Record,
    Report,
    User,
}

impl Content {
    pub fn as_str(&self) -> &'static str {
        match self {
            Content::Metadata => "metadata",
            Content::Instrument => "instrument",
            Content::Pdf => "pdf",
            Content::Project => "project",
            Content::Record => "record",
            Content::Report => "report",
            Content::User => "user",
        }
    }
}

/// Shape of exported or imported records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordType {
    /// One object per record.
    #[default]
    Flat,
    /// One object per record/field/value triple.
    Eav,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Flat => "flat",
            RecordType::Eav => "eav",
        }
    }
}

/// Filters for `export_records`. The default exports every record in flat
/// format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordExport {
    pub record_type: RecordType,
    pub records: Option<Vec<String>>,
    pub fields: Option<Vec<String>>,
    pub forms: Option<Vec<String>>,
}

impl RecordExport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    pub fn records<I, S>(mut self, records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.records = Some(records.into_iter().map(Into::into).collect());
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn forms<I, S>(mut self, forms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forms = Some(forms.into_iter().map(Into::into).collect());
        self
    }
}

/// Inputs for `export_forms_pdf`.
///
/// With no record set the server renders blank instruments; `all_records`
/// renders every record in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfExport {
    pub output_folder: PathBuf,
    pub pdf_name: String,
    pub record: Option<String>,
    pub instrument: Option<String>,
    pub all_records: bool,
}

impl PdfExport {
    pub fn new(output_folder: impl Into<PathBuf>, pdf_name: impl Into<String>) -> Self {
        Self {
            output_folder: output_folder.into(),
            pdf_name: pdf_name.into(),
            record: None,
            instrument: None,
            all_records: false,
        }
    }

    pub fn record(mut self, record: impl Into<String>) -> Self {
        self.record = Some(record.into());
        self
    }

    pub fn instrument(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = Some(instrument.into());
        self
    }

    pub fn all_records(mut self, all_records: bool) -> Self {
        self.all_records = all_records;
        self
    }

    /// `output_folder/pdf_name`.
    pub fn target_path(&self) -> PathBuf {
        self.output_folder.join(&self.pdf_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_export_defaults_to_flat_without_filters() {
        let params = RecordExport::new();
        assert_eq!(params.record_type, RecordType::Flat);
        assert!(params.records.is_none());
        assert!(params.fields.is_none());
        assert!(params.forms.is_none());
    }

    #[test]
    fn record_export_builder_collects_filters() {
        let params = RecordExport::new()
            .records(["1", "2"])
            .forms(vec!["demographics".to_string()])
            .record_type(RecordType::Eav);
        assert_eq!(params.records, Some(vec!["1".to_string(), "2".to_string()]));
        assert_eq!(params.forms, Some(vec!["demographics".to_string()]));
        assert_eq!(params.record_type.as_str(), "eav");
    }

    #[test]
    fn pdf_target_joins_folder_and_name() {
        let params = PdfExport::new("/tmp/out", "forms.pdf").record("4");
        assert_eq!(params.target_path(), PathBuf::from("/tmp/out/forms.pdf"));
        assert_eq!(params.record.as_deref(), Some("4"));
        assert!(!params.all_records);
    }
}
