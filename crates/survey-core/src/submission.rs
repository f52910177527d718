//! Building and interpreting the one-shot survey submission.

use std::{collections::HashMap, path::Path};

use tracing::warn;

use crate::{
    domain::UserIdentifier,
    errors::Error,
    guard::{message_of, parse_body},
    messages,
    ports::BackendResponse,
    Result,
};

pub const DEFAULT_MAX_FILE_BYTES: u64 = 15 * 1024 * 1024;
pub const DEFAULT_FIELDS: &str = "salary,citizenship?";

/// Multipart names owned by the client itself.
const RESERVED_FIELDS: [&str; 3] = ["tg_id", "resume", "tg_init_data"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub required: bool,
}

/// Answer fields sent with a submission, in multipart order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSet {
    fields: Vec<FieldSpec>,
}

impl FieldSet {
    /// Parse `"salary,citizenship?"`: comma separated, `?` marks optional.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut fields: Vec<FieldSpec> = Vec::new();
        for raw in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (name, required) = match raw.strip_suffix('?') {
                Some(name) => (name.trim(), false),
                None => (raw, true),
            };
            if name.is_empty() {
                return Err(Error::Config(format!("empty field name in {spec:?}")));
            }
            if RESERVED_FIELDS.contains(&name) {
                return Err(Error::Config(format!("field name is reserved: {name}")));
            }
            if fields.iter().any(|f| f.name == name) {
                return Err(Error::Config(format!("duplicate field: {name}")));
            }
            fields.push(FieldSpec {
                name: name.to_string(),
                required,
            });
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }
}

impl Default for FieldSet {
    fn default() -> Self {
        Self {
            fields: vec![
                FieldSpec {
                    name: "salary".to_string(),
                    required: true,
                },
                FieldSpec {
                    name: "citizenship".to_string(),
                    required: false,
                },
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResumeFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ResumeFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a resume from disk, refusing oversize files before loading them.
    pub async fn read(path: &Path, limit: u64) -> Result<Self> {
        let size = tokio::fs::metadata(path).await?.len();
        check_resume_size(size, limit)?;

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("resume")
            .to_string();
        Ok(Self { file_name, bytes })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

pub fn check_resume_size(size: u64, limit: u64) -> Result<()> {
    if size > limit {
        return Err(Error::FileTooLarge { size, limit });
    }
    Ok(())
}

/// What the user has entered so far. Survives failed submissions untouched.
#[derive(Clone, Debug, Default)]
pub struct SurveyForm {
    answers: HashMap<String, String>,
    pub resume: Option<ResumeFile>,
}

impl SurveyForm {
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.answers.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.answers.get(field).map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub user_id: UserIdentifier,
    /// Answer fields, in field-set order.
    pub fields: Vec<(String, String)>,
    pub resume: ResumeFile,
    pub init_data: Option<String>,
}

/// Local validation; nothing here touches the network.
pub fn build_request(
    user: Option<&UserIdentifier>,
    form: &SurveyForm,
    fields: &FieldSet,
    max_file_bytes: u64,
    init_data: Option<String>,
) -> Result<SubmissionRequest> {
    let user = user.ok_or(Error::UnresolvedIdentity)?;
    let resume = form.resume.as_ref().ok_or(Error::MissingResume)?;
    check_resume_size(resume.size(), max_file_bytes)?;

    let mut out = Vec::with_capacity(fields.fields().len());
    for spec in fields.fields() {
        match form.get(&spec.name) {
            Some(v) if spec.required && v.trim().is_empty() => {
                return Err(Error::MissingField(spec.name.clone()))
            }
            Some(v) => out.push((spec.name.clone(), v.to_string())),
            None if spec.required => return Err(Error::MissingField(spec.name.clone())),
            None => {}
        }
    }

    Ok(SubmissionRequest {
        user_id: user.clone(),
        fields: out,
        resume: resume.clone(),
        init_data: init_data.filter(|s| !s.trim().is_empty()),
    })
}

/// Map the POST reply to the text shown on success.
pub fn interpret_submit(
    resp: &BackendResponse,
    resume_size: u64,
    max_file_bytes: u64,
) -> Result<String> {
    let data = parse_body(&resp.body);

    if resp.is_success() {
        return Ok(message_of(&data).unwrap_or_else(|| messages::SUBMIT_DONE.to_string()));
    }

    if resp.status == 413 {
        warn!(size = resume_size, "backend rejected resume as too large");
        return Err(Error::FileTooLarge {
            size: resume_size,
            limit: max_file_bytes,
        });
    }

    let msg = message_of(&data).unwrap_or_else(|| messages::submit_failed(resp.status));
    warn!(status = resp.status, "submission rejected: {msg}");
    Err(Error::SubmitFailed(msg))
}
