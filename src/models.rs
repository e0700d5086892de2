use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Student {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub nom: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub prenom: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub classe: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub specialite: Option<String>,
}

impl Student {
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.prenom.as_deref(), self.nom.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            "Élève".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// One student's measurement for one competency, as served by the profile
/// endpoint. A field of the wrong type reads as zero or absent instead of
/// rejecting the whole record.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CompetencyRecord {
    #[serde(rename = "competence_code", default, deserialize_with = "lenient_code")]
    pub competency_code: String,
    #[serde(rename = "competence_libelle", default, deserialize_with = "lenient_text")]
    pub label: Option<String>,
    #[serde(rename = "statut", default, deserialize_with = "lenient_text")]
    pub status_label: Option<String>,
    #[serde(rename = "niveau_moyen", default, deserialize_with = "lenient_f64")]
    pub average_level: f64,
    #[serde(rename = "nb_validations", default, deserialize_with = "lenient_count")]
    pub validation_count: i64,
    #[serde(rename = "total_niveaux", default, deserialize_with = "lenient_f64")]
    pub level_total: f64,
    /// Evaluations assigned to the Première class for this competency.
    #[serde(rename = "nb_eval_premiere", default, deserialize_with = "lenient_count")]
    pub first_year_evaluations: i64,
    /// Evaluations assigned to the Terminale class for this competency.
    #[serde(rename = "nb_eval_terminale", default, deserialize_with = "lenient_count")]
    pub final_year_evaluations: i64,
}

fn number_from(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn integer_from(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| number_from(value).map(|n| n.trunc() as i64))
}

fn text_from(value: Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(number_from(&Value::deserialize(deserializer)?).unwrap_or(0.0))
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(integer_from(&Value::deserialize(deserializer)?).unwrap_or(0))
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(integer_from(&Value::deserialize(deserializer)?))
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(text_from(Value::deserialize(deserializer)?))
}

fn lenient_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(text_from(Value::deserialize(deserializer)?).unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CompetencyStatus {
    Mastered,
    InProgress,
    ToWork,
    NotEvaluated,
}

impl CompetencyStatus {
    pub fn label(self) -> &'static str {
        match self {
            CompetencyStatus::Mastered => "Maîtrisé",
            CompetencyStatus::InProgress => "En cours",
            CompetencyStatus::ToWork => "À travailler",
            CompetencyStatus::NotEvaluated => "Non évalué",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTally {
    pub mastered: usize,
    pub in_progress: usize,
    pub to_work: usize,
    pub not_evaluated: usize,
}

impl StatusTally {
    pub fn record(&mut self, status: CompetencyStatus) {
        match status {
            CompetencyStatus::Mastered => self.mastered += 1,
            CompetencyStatus::InProgress => self.in_progress += 1,
            CompetencyStatus::ToWork => self.to_work += 1,
            CompetencyStatus::NotEvaluated => self.not_evaluated += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.mastered + self.in_progress + self.to_work + self.not_evaluated
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeScore {
    pub code: &'static str,
    pub coefficient: f64,
    /// `None` when no record carries this code.
    pub status: Option<CompetencyStatus>,
    #[serde(serialize_with = "two_decimals")]
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitGrade {
    pub unit: &'static str,
    pub scores: Vec<CodeScore>,
    #[serde(serialize_with = "two_decimals")]
    pub note_total: f64,
    #[serde(serialize_with = "one_decimal")]
    pub note_arrondie: f64,
    pub tally: StatusTally,
    #[serde(serialize_with = "one_decimal")]
    pub mastery_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub total: usize,
    pub mastered: usize,
    pub evaluated: usize,
    #[serde(serialize_with = "two_decimals")]
    pub general_average: f64,
}

pub fn format_two(value: f64) -> String {
    format!("{value:.2}")
}

pub fn format_one(value: f64) -> String {
    format!("{value:.1}")
}

fn two_decimals<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_two(*value))
}

fn one_decimal<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_one(*value))
}
