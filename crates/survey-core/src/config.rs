use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    errors::Error,
    identity::LaunchParams,
    page::PageSettings,
    submission::{FieldSet, DEFAULT_FIELDS, DEFAULT_MAX_FILE_BYTES},
    Result,
};

/// Typed configuration for the survey client.
#[derive(Clone, Debug)]
pub struct Config {
    // Backend
    pub backend_url: String,
    pub http_timeout: Option<Duration>,

    // Form
    pub fields: FieldSet,
    pub max_file_bytes: u64,

    // Launch context
    pub launch_params: LaunchParams,
    pub tg_init_data: Option<String>,

    // Terminal host input
    pub resume_path: Option<PathBuf>,
    /// Answer values keyed by field name, from `SURVEY_ANSWER_<FIELD>`.
    pub answers: HashMap<String, String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required
        let backend_url = get("SURVEY_BACKEND_URL").ok_or_else(|| {
            Error::Config("SURVEY_BACKEND_URL environment variable is required".to_string())
        })?;
        url::Url::parse(&backend_url)
            .map_err(|e| Error::Config(format!("SURVEY_BACKEND_URL is not a url: {e}")))?;

        // No timeout unless asked for: the transport default applies.
        let http_timeout = parse_u64(&get, "SURVEY_HTTP_TIMEOUT_MS")?.map(Duration::from_millis);

        let fields = match get("SURVEY_FIELDS") {
            Some(spec) => FieldSet::parse(&spec)?,
            None => FieldSet::parse(DEFAULT_FIELDS)?,
        };
        let max_file_bytes =
            parse_u64(&get, "SURVEY_MAX_FILE_BYTES")?.unwrap_or(DEFAULT_MAX_FILE_BYTES);

        let launch_params = match get("SURVEY_LAUNCH_URL") {
            Some(url) => LaunchParams::from_url(&url)?,
            None => LaunchParams::default(),
        };
        let tg_init_data = get("TG_INIT_DATA");

        let resume_path = get("SURVEY_RESUME_PATH").map(PathBuf::from);
        let answers = fields
            .fields()
            .iter()
            .filter_map(|f| lookup(answer_var(&f.name).as_str()).map(|v| (f.name.clone(), v)))
            .collect();

        Ok(Self {
            backend_url,
            http_timeout,
            fields,
            max_file_bytes,
            launch_params,
            tg_init_data,
            resume_path,
            answers,
        })
    }

    pub fn page_settings(&self) -> PageSettings {
        PageSettings {
            fields: self.fields.clone(),
            max_file_bytes: self.max_file_bytes,
        }
    }
}

/// Env var name holding the answer for `field` on the terminal host.
pub fn answer_var(field: &str) -> String {
    format!(
        "SURVEY_ANSWER_{}",
        field
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            })
            .collect::<String>()
    )
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn parse_u64(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    get(key)
        .map(|s| {
            s.trim()
                .parse::<u64>()
                .map_err(|_| Error::Config(format!("{key} must be a non-negative integer")))
        })
        .transpose()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
