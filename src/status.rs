use crate::models::{CompetencyRecord, CompetencyStatus};

/// Lowercases, strips accents and collapses whitespace so that labels typed
/// by hand compare equal to the backend's canonical ones.
pub fn fold_label(label: &str) -> String {
    let lowered: String = label
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            '\u{0300}'..='\u{036f}' => None,
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => Some('a'),
            'ç' => Some('c'),
            'è' | 'é' | 'ê' | 'ë' => Some('e'),
            'ì' | 'í' | 'î' | 'ï' => Some('i'),
            'ñ' => Some('n'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => Some('o'),
            'ù' | 'ú' | 'û' | 'ü' => Some('u'),
            'ý' | 'ÿ' => Some('y'),
            other => Some(other),
        })
        .collect();

    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Maps a free-text status label onto a canonical status. Unknown labels fall
/// back to `NotEvaluated`.
pub fn normalize(label: &str) -> CompetencyStatus {
    let folded = fold_label(label);

    if folded.starts_with("non ") || folded.starts_with("non-") {
        CompetencyStatus::NotEvaluated
    } else if folded.contains("maitrise") {
        CompetencyStatus::Mastered
    } else if folded.contains("en cours") {
        CompetencyStatus::InProgress
    } else if folded.contains("travailler") {
        CompetencyStatus::ToWork
    } else {
        CompetencyStatus::NotEvaluated
    }
}

pub fn derive_status(average_level: f64) -> CompetencyStatus {
    if average_level >= 3.0 {
        CompetencyStatus::Mastered
    } else if average_level >= 2.0 {
        CompetencyStatus::InProgress
    } else if average_level > 0.0 {
        CompetencyStatus::ToWork
    } else {
        CompetencyStatus::NotEvaluated
    }
}

pub fn achievement_factor(status: CompetencyStatus) -> f64 {
    match status {
        CompetencyStatus::Mastered => 1.0,
        CompetencyStatus::InProgress => 0.66,
        CompetencyStatus::ToWork => 0.33,
        CompetencyStatus::NotEvaluated => 0.0,
    }
}

impl CompetencyRecord {
    /// The explicit label wins, even when it is unrecognized; a missing or
    /// empty one is derived from the average validation level.
    pub fn status(&self) -> CompetencyStatus {
        match self.status_label.as_deref() {
            Some(label) if !label.is_empty() => normalize(label),
            _ => derive_status(self.average_level),
        }
    }
}
