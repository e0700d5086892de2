use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::ProfileError;
use crate::models::{CompetencyRecord, Student};

pub const DEFAULT_BACKEND_URL: &str = "http://backend:5000";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default)]
pub struct ProfilePayload {
    pub student: Student,
    pub competencies: Vec<CompetencyRecord>,
}

impl ProfilePayload {
    /// Accepts `{"user": {...}, "competences": [...]}` as well as a flat
    /// student object carrying its own `competences` array.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            warn!("profile payload is not a JSON object");
            return Self::default();
        };

        let competencies = map
            .remove("competences")
            .or_else(|| map.remove("compétences"))
            .map(parse_records)
            .unwrap_or_default();

        let student_value = match map.remove("user") {
            Some(user) => user,
            None => Value::Object(map),
        };

        let student = serde_json::from_value(student_value).unwrap_or_else(|err| {
            warn!(error = %err, "could not read student fields, leaving profile blank");
            Student::default()
        });

        Self {
            student,
            competencies,
        }
    }
}

fn parse_records(value: Value) -> Vec<CompetencyRecord> {
    let Value::Array(items) = value else {
        warn!("competences field is not an array");
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(error = %err, "skipping malformed competency record");
                None
            }
        })
        .collect()
}

pub struct ProfileClient {
    base_url: String,
    client: reqwest::Client,
}

impl ProfileClient {
    pub fn new(base_url: &str) -> Result<Self, ProfileError> {
        let base = if base_url.trim().is_empty() {
            DEFAULT_BACKEND_URL
        } else {
            base_url.trim()
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| ProfileError::Network(err.to_string()))?;

        Ok(Self {
            base_url: base.trim_end_matches('/').to_string(),
            client,
        })
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn fetch_profile(&self, student_id: i64) -> Result<ProfilePayload, ProfileError> {
        let url = format!("{}/api/utilisateur/{}/profil", self.base_url, student_id);
        debug!(%url, "requesting student profile");

        let response = self.client.get(&url).send().await.map_err(|err| {
            if err.is_timeout() {
                ProfileError::Timeout(REQUEST_TIMEOUT_SECS)
            } else {
                ProfileError::Network(err.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ProfileError::Network(err.to_string()))?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProfileError::NotFound(student_id));
        }

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            return Err(ProfileError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|err| ProfileError::Decode(err.to_string()))?;
        let payload = ProfilePayload::from_value(value);
        info!(
            competencies = payload.competencies.len(),
            "student profile received"
        );
        Ok(payload)
    }
}

pub fn load_json_file(path: &Path) -> anyhow::Result<ProfilePayload> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    Ok(ProfilePayload::from_value(value))
}

pub fn import_csv(csv_path: &Path) -> anyhow::Result<Vec<CompetencyRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut records = Vec::new();

    for (index, result) in reader.deserialize::<CompetencyRecord>().enumerate() {
        let record =
            result.with_context(|| format!("invalid competency row {}", index + 1))?;
        records.push(record);
    }

    Ok(records)
}

#[derive(Debug, Clone)]
pub enum ProfileSource {
    Backend { base_url: String, student_id: i64 },
    JsonFile(PathBuf),
    Csv(PathBuf),
}

impl ProfileSource {
    pub async fn load(&self) -> anyhow::Result<ProfilePayload> {
        match self {
            ProfileSource::Backend {
                base_url,
                student_id,
            } => {
                let client = ProfileClient::new(base_url)?;
                let payload = client
                    .fetch_profile(*student_id)
                    .await
                    .with_context(|| format!("failed to load profile of student {student_id}"))?;
                Ok(payload)
            }
            ProfileSource::JsonFile(path) => load_json_file(path),
            ProfileSource::Csv(path) => {
                let competencies = import_csv(path)?;
                info!(
                    competencies = competencies.len(),
                    "loaded competencies from {}",
                    path.display()
                );
                Ok(ProfilePayload {
                    student: Student::default(),
                    competencies,
                })
            }
        }
    }
}
