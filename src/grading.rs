use chrono::{Datelike, NaiveDate};

use crate::models::{
    CodeScore, CompetencyRecord, CompetencyStatus, ProfileSummary, StatusTally, UnitGrade,
};
use crate::status::achievement_factor;

const GRADE_SCALE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExamUnit {
    pub name: &'static str,
    pub weights: [(&'static str, f64); 3],
}

impl ExamUnit {
    pub fn contains(&self, code: &str) -> bool {
        self.weights.iter().any(|(unit_code, _)| *unit_code == code)
    }
}

pub const E2: ExamUnit = ExamUnit {
    name: "E2",
    weights: [("C03", 0.2), ("C07", 0.3), ("C11", 0.5)],
};

pub const E31: ExamUnit = ExamUnit {
    name: "E31",
    weights: [("C06", 0.25), ("C09", 0.5), ("C10", 0.25)],
};

pub const E32: ExamUnit = ExamUnit {
    name: "E32",
    weights: [("C01", 0.25), ("C04", 0.5), ("C08", 0.25)],
};

pub static EXAM_UNITS: [ExamUnit; 3] = [E2, E31, E32];

pub fn unit_for_code(code: &str) -> Option<&'static ExamUnit> {
    EXAM_UNITS.iter().find(|unit| unit.contains(code.trim()))
}

/// Rounds up to the next half point: `ceil(2x) / 2`.
pub fn round_up_half(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 0.0;
    }

    (value * 2.0).ceil() / 2.0
}

pub fn grade_unit(records: &[CompetencyRecord], unit: &ExamUnit) -> UnitGrade {
    let mut scores = Vec::with_capacity(unit.weights.len());

    for (code, coefficient) in unit.weights {
        let status = records
            .iter()
            .rev()
            .find(|record| record.competency_code.trim() == code)
            .map(CompetencyRecord::status);
        let factor = status.map(achievement_factor).unwrap_or(0.0);

        scores.push(CodeScore {
            code,
            coefficient,
            status,
            score: factor * coefficient * GRADE_SCALE,
        });
    }

    let mut tally = StatusTally::default();
    for record in records
        .iter()
        .filter(|record| unit.contains(record.competency_code.trim()))
    {
        tally.record(record.status());
    }

    let note_total: f64 = scores.iter().map(|score| score.score).sum();
    let mastery_rate = match tally.total() {
        0 => 0.0,
        total => tally.mastered as f64 / total as f64 * 100.0,
    };

    UnitGrade {
        unit: unit.name,
        scores,
        note_total,
        note_arrondie: round_up_half(note_total),
        tally,
        mastery_rate,
    }
}

pub fn grade_all_units(records: &[CompetencyRecord]) -> Vec<UnitGrade> {
    EXAM_UNITS
        .iter()
        .map(|unit| grade_unit(records, unit))
        .collect()
}

pub fn summarize_profile(records: &[CompetencyRecord]) -> ProfileSummary {
    let mut mastered = 0usize;
    let mut evaluated = 0usize;
    let mut level_sum = 0.0;

    for record in records {
        if record.validation_count > 0 {
            evaluated += 1;
            level_sum += record.level_total;
        }
        if record.status() == CompetencyStatus::Mastered {
            mastered += 1;
        }
    }

    ProfileSummary {
        total: records.len(),
        mastered,
        evaluated,
        general_average: if evaluated == 0 {
            0.0
        } else {
            level_sum / evaluated as f64
        },
    }
}

/// Certification session for a given day: from September onwards the
/// students sit the exam the following calendar year.
pub fn certification_year(today: NaiveDate) -> i32 {
    if today.month() >= 9 {
        today.year() + 1
    } else {
        today.year()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format_two;

    fn labelled(code: &str, status: &str) -> CompetencyRecord {
        CompetencyRecord {
            competency_code: code.to_string(),
            status_label: Some(status.to_string()),
            ..CompetencyRecord::default()
        }
    }

    fn validated(code: &str, validation_count: i64, level_total: f64) -> CompetencyRecord {
        CompetencyRecord {
            competency_code: code.to_string(),
            validation_count,
            level_total,
            average_level: if validation_count > 0 {
                level_total / validation_count as f64
            } else {
                0.0
            },
            ..CompetencyRecord::default()
        }
    }

    #[test]
    fn coefficients_sum_to_one_and_codes_are_unique() {
        let mut seen = Vec::new();
        for unit in EXAM_UNITS {
            let sum: f64 = unit.weights.iter().map(|(_, coefficient)| coefficient).sum();
            assert!((sum - 1.0).abs() < 1e-12, "{} sums to {sum}", unit.name);
            for (code, _) in unit.weights {
                assert!(!seen.contains(&code), "{code} belongs to two units");
                seen.push(code);
            }
        }
    }

    #[test]
    fn rounds_up_to_next_half_point() {
        assert_eq!(round_up_half(13.2), 13.5);
        assert_eq!(round_up_half(14.0), 14.0);
        assert_eq!(round_up_half(13.5), 13.5);
        assert_eq!(round_up_half(13.51), 14.0);
        assert_eq!(round_up_half(0.0), 0.0);
        assert_eq!(round_up_half(-1.0), 0.0);
        assert_eq!(round_up_half(f64::NAN), 0.0);
    }

    #[test]
    fn values_just_above_a_half_point_round_up() {
        for value in [13.5000000001, 10.000000000000002, 0.0001, 19.50001] {
            assert_eq!(round_up_half(value), (value * 2.0).ceil() / 2.0);
        }
        assert_eq!(round_up_half(13.5000000001), 14.0);
        assert_eq!(round_up_half(10.000000000000002), 10.5);
        assert_eq!(round_up_half(0.0001), 0.5);
    }

    #[test]
    fn e2_mixed_statuses() {
        let records = vec![
            labelled("C03", "Maîtrisé"),
            labelled("C07", "En cours"),
            labelled("C11", "À travailler"),
        ];

        let grade = grade_unit(&records, &E2);
        let scores: Vec<String> = grade.scores.iter().map(|s| format_two(s.score)).collect();
        assert_eq!(scores, vec!["4.00", "3.96", "3.30"]);
        assert_eq!(format_two(grade.note_total), "11.26");
        assert_eq!(grade.note_arrondie, 11.5);
        assert_eq!(grade.tally.mastered, 1);
        assert_eq!(grade.tally.in_progress, 1);
        assert_eq!(grade.tally.to_work, 1);
    }

    #[test]
    fn e31_without_evaluations_is_zero() {
        let records = vec![labelled("C06", "Non évalué"), labelled("C01", "Maîtrisé")];

        let grade = grade_unit(&records, &E31);
        assert_eq!(grade.note_total, 0.0);
        assert_eq!(grade.note_arrondie, 0.0);
        assert_eq!(grade.tally.not_evaluated, 1);
        assert_eq!(grade.tally.total(), 1);
        assert!(grade.scores[1].status.is_none());
    }

    #[test]
    fn e32_all_mastered_is_twenty() {
        let records = vec![
            labelled("C01", "Maîtrisé"),
            labelled("C04", "maitrise"),
            labelled("C08", "MAITRISÉ"),
        ];

        let grade = grade_unit(&records, &E32);
        assert_eq!(format_two(grade.note_total), "20.00");
        assert_eq!(grade.note_arrondie, 20.0);
        assert_eq!(grade.mastery_rate, 100.0);
    }

    #[test]
    fn missing_code_contributes_nothing() {
        let records = vec![labelled("C06", "Maîtrisé"), labelled("C09", "Maîtrisé")];

        let grade = grade_unit(&records, &E31);
        let c10 = grade.scores.iter().find(|s| s.code == "C10").unwrap();
        assert!(c10.status.is_none());
        assert_eq!(c10.score, 0.0);
        assert_eq!(format_two(grade.note_total), "15.00");
        assert_eq!(grade.note_arrondie, 15.0);
    }

    #[test]
    fn derived_statuses_feed_the_grade() {
        let records = vec![
            validated("C03", 4, 14.0),
            validated("C07", 2, 4.0),
            validated("C11", 0, 0.0),
        ];

        let grade = grade_unit(&records, &E2);
        assert_eq!(format_two(grade.note_total), "7.96");
        assert_eq!(grade.note_arrondie, 8.0);
    }

    #[test]
    fn later_duplicate_record_wins() {
        let records = vec![labelled("C11", "À travailler"), labelled("C11", "Maîtrisé")];

        let grade = grade_unit(&records, &E2);
        assert_eq!(grade.scores[2].status, Some(CompetencyStatus::Mastered));
        assert_eq!(format_two(grade.note_total), "10.00");
    }

    #[test]
    fn grades_units_in_fixed_order() {
        let names: Vec<&str> = grade_all_units(&[]).iter().map(|g| g.unit).collect();
        assert_eq!(names, vec!["E2", "E31", "E32"]);
    }

    #[test]
    fn general_average_counts_validated_records_only() {
        let records = vec![validated("C01", 2, 6.0), validated("C02", 0, 0.0)];

        let summary = summarize_profile(&records);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.evaluated, 1);
        assert_eq!(format_two(summary.general_average), "3.00");
        assert_eq!(summary.mastered, 1);
    }

    #[test]
    fn general_average_defaults_to_zero() {
        let summary = summarize_profile(&[validated("C05", 0, 0.0)]);
        assert_eq!(format_two(summary.general_average), "0.00");
        assert_eq!(summary.mastered, 0);
    }

    #[test]
    fn unit_lookup_by_code() {
        assert_eq!(unit_for_code("C09").map(|u| u.name), Some("E31"));
        assert_eq!(unit_for_code("C02"), None);
    }

    #[test]
    fn certification_year_switches_in_september() {
        let august = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        let september = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        assert_eq!(certification_year(august), 2026);
        assert_eq!(certification_year(september), 2027);
    }
}
