use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::grading;
use crate::models::{format_one, format_two, CompetencyRecord, StatusTally, UnitGrade};
use crate::source::ProfilePayload;

const DEFAULT_SPECIALITY: &str = "BAC PRO CIEL";
const NO_COMPETENCIES: &str = "Aucune compétence enregistrée pour cet élève.";

/// French decimal comma, as printed on the certification forms.
fn coefficient_label(coefficient: f64) -> String {
    coefficient.to_string().replace('.', ",")
}

pub fn tally_line(unit: &UnitGrade) -> String {
    let StatusTally {
        mastered,
        in_progress,
        to_work,
        not_evaluated,
    } = unit.tally;

    format!(
        "{} compétence(s) - {} maîtrisée(s), {} en cours, {} à travailler, {} non évaluée(s) - Taux de maîtrise: {}%",
        unit.tally.total(),
        mastered,
        in_progress,
        to_work,
        not_evaluated,
        format_one(unit.mastery_rate)
    )
}

fn unit_tag(record: &CompetencyRecord) -> &'static str {
    grading::unit_for_code(&record.competency_code)
        .map(|unit| unit.name)
        .unwrap_or("-")
}

fn write_unit_section(output: &mut String, unit: &UnitGrade) {
    let _ = writeln!(output, "## Épreuve {}", unit.unit);
    let _ = writeln!(output, "{}", tally_line(unit));
    let _ = writeln!(output);
    let _ = writeln!(output, "Calcul de la note sur 20:");

    for score in unit.scores.iter() {
        let status = score
            .status
            .map(|status| status.label())
            .unwrap_or("absente");
        let _ = writeln!(
            output,
            "- {} (coef {}, {}): {} points",
            score.code,
            coefficient_label(score.coefficient),
            status,
            format_two(score.score)
        );
    }

    let _ = writeln!(
        output,
        "- **Note finale: {} / 20** (calculée: {}, arrondie au demi-point supérieur)",
        format_one(unit.note_arrondie),
        format_two(unit.note_total)
    );
    let _ = writeln!(output);
}

fn write_profile(output: &mut String, payload: &ProfilePayload) {
    let student = &payload.student;
    let summary = grading::summarize_profile(&payload.competencies);

    let _ = writeln!(output, "## Profil");
    let _ = writeln!(output, "- Élève: {}", student.display_name());
    let _ = writeln!(
        output,
        "- Classe: {}",
        student.classe.as_deref().unwrap_or("Non spécifiée")
    );
    let _ = writeln!(output, "- Email: {}", student.email.as_deref().unwrap_or("-"));
    let _ = writeln!(
        output,
        "- Spécialité: {}",
        student.specialite.as_deref().unwrap_or(DEFAULT_SPECIALITY)
    );
    let _ = writeln!(output, "- Compétences suivies: {}", summary.total);
    let _ = writeln!(output, "- Compétences maîtrisées: {}", summary.mastered);
    let _ = writeln!(
        output,
        "- Moyenne générale: {}",
        format_two(summary.general_average)
    );
    let _ = writeln!(output);
}

fn label_or_default(record: &CompetencyRecord) -> &str {
    record.label.as_deref().unwrap_or("Libellé non disponible")
}

/// End-of-cycle bilan: competency table tagged by exam unit, then the
/// E2, E31 and E32 grade breakdowns.
pub fn build_report(payload: &ProfilePayload, generated_at: NaiveDateTime) -> String {
    let records = &payload.competencies;
    let mut output = String::new();

    let _ = writeln!(output, "# Bilan final - {}", DEFAULT_SPECIALITY);
    let _ = writeln!(
        output,
        "Session {} (généré le {})",
        grading::certification_year(generated_at.date()),
        generated_at.format("%d/%m/%Y %H:%M")
    );
    let _ = writeln!(output);
    write_profile(&mut output, payload);
    let _ = writeln!(output, "## Compétences");

    if records.is_empty() {
        let _ = writeln!(output, "{}", NO_COMPETENCIES);
    } else {
        let _ = writeln!(output, "| Code | Épreuve | Libellé | Statut |");
        let _ = writeln!(output, "|---|---|---|---|");
        for record in records.iter() {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} |",
                record.competency_code,
                unit_tag(record),
                label_or_default(record),
                record.status().label()
            );
        }
    }

    let _ = writeln!(output);
    for unit in grading::grade_all_units(records).iter() {
        write_unit_section(&mut output, unit);
    }

    output
}

/// Mid-cycle bilan: per-competency validation statistics and the number of
/// evaluations planned in Première and Terminale. No exam unit grades.
pub fn build_intermediate_report(
    payload: &ProfilePayload,
    generated_at: NaiveDateTime,
) -> String {
    let records = &payload.competencies;
    let mut output = String::new();

    let _ = writeln!(output, "# Bilan intermédiaire - {}", DEFAULT_SPECIALITY);
    let _ = writeln!(output, "Généré le {}", generated_at.format("%d/%m/%Y %H:%M"));
    let _ = writeln!(output);
    write_profile(&mut output, payload);
    let _ = writeln!(output, "## Compétences");

    if records.is_empty() {
        let _ = writeln!(output, "{}", NO_COMPETENCIES);
        return output;
    }

    let _ = writeln!(
        output,
        "| Code | Libellé | Niveau moyen | Validations | Total niveaux | Statut | Éval. Première | Éval. Terminale |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|---|");
    for record in records.iter() {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} | {} |",
            record.competency_code,
            label_or_default(record),
            format_two(record.average_level),
            record.validation_count,
            record.level_total,
            record.status().label(),
            record.first_year_evaluations,
            record.final_year_evaluations
        );
    }

    output
}
