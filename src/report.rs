use std::fmt::Write;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{Criterion, CriterionSubtotal, Evaluator, Grade, Student, Work};
use crate::strategy::{self, GradingStrategy, Verdict};

const RULE_WIDTH: usize = 64;

#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub institution: String,
    pub faculty: String,
    pub passing_grade: f64,
    pub issued_on: NaiveDate,
}

/// Builds the acta for a work. Section layout is fixed; only the scoring
/// policy varies.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    strategy: GradingStrategy,
    settings: ReportSettings,
}

impl ReportGenerator {
    pub fn new(strategy: GradingStrategy, settings: ReportSettings) -> Self {
        Self { strategy, settings }
    }

    pub fn strategy(&self) -> &GradingStrategy {
        &self.strategy
    }

    pub fn generate_report(
        &self,
        work: &Work,
        student: &Student,
        grades: &[Grade],
        evaluators: &[Evaluator],
        criteria: &[Criterion],
    ) -> String {
        let subtotals = strategy::criterion_subtotals(grades, criteria);
        let final_score = self.strategy.calculate(grades, criteria);

        let sections = [
            header(&self.settings, work, student),
            student_section(student),
            work_section(work),
            evaluator_section(evaluators),
            breakdown_section(&subtotals, grades, evaluators),
            final_grade_section(
                self.strategy.name(),
                final_score,
                self.settings.passing_grade,
            ),
            footer(evaluators, self.settings.issued_on),
        ];

        sections.join("\n")
    }
}

/// Stable certificate number for a (work, student) pair.
pub fn folio(work: &Work, student: &Student) -> Uuid {
    let key = format!("acta:work:{}:student:{}", work.id, student.id);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
}

pub fn header(settings: &ReportSettings, work: &Work, student: &Student) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{}", settings.institution);
    let _ = writeln!(output, "{}", settings.faculty);
    let _ = writeln!(output);
    let _ = writeln!(output, "ACTA DE EVALUACIÓN");
    let _ = writeln!(output, "Folio: {}", folio(work, student));
    let _ = writeln!(output, "{}", "=".repeat(RULE_WIDTH));
    output
}

pub fn student_section(student: &Student) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "ESTUDIANTE");
    let _ = writeln!(output, "Nombre: {}", student.name);
    let _ = writeln!(output, "RUT: {}", student.rut);
    let _ = writeln!(output, "Programa: {}", student.program);
    if let Some(email) = &student.email {
        let _ = writeln!(output, "Correo: {}", email);
    }
    output
}

pub fn work_section(work: &Work) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "TRABAJO");
    let _ = writeln!(output, "Título: {}", work.title);
    let _ = writeln!(output, "Tipo: {}", work.work_type);
    let _ = writeln!(output, "Descripción: {}", work.description);
    output
}

pub fn evaluator_section(evaluators: &[Evaluator]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "COMISIÓN EVALUADORA");

    if evaluators.is_empty() {
        let _ = writeln!(output, "Sin evaluadores registrados.");
    } else {
        for evaluator in evaluators {
            let _ = writeln!(
                output,
                "- {}, {} ({})",
                evaluator.name, evaluator.role, evaluator.affiliation
            );
        }
    }

    output
}

pub fn breakdown_section(
    subtotals: &[CriterionSubtotal],
    grades: &[Grade],
    evaluators: &[Evaluator],
) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "DETALLE DE CALIFICACIONES");

    if subtotals.is_empty() {
        let _ = writeln!(output, "Sin criterios de evaluación.");
        return output;
    }

    for subtotal in subtotals {
        let weight_pct = percent(subtotal.weight);
        match subtotal.average {
            Some(average) => {
                let max = subtotal
                    .max_score
                    .map(|max| format!(" / máx. {:.1}", max))
                    .unwrap_or_default();
                let _ = writeln!(
                    output,
                    "- {} (ponderación {}%): promedio {:.2}{} de {} nota(s), aporte {:.2}",
                    subtotal.name,
                    weight_pct,
                    average,
                    max,
                    subtotal.grade_count,
                    subtotal.contribution
                );
            }
            None => {
                let _ = writeln!(
                    output,
                    "- {} (ponderación {}%): sin calificaciones",
                    subtotal.name, weight_pct
                );
            }
        }

        let comments = grades.iter().filter(|grade| grade.criteria_id == subtotal.criterion_id);
        for grade in comments {
            let Some(comment) = grade.comments.as_deref().map(str::trim) else {
                continue;
            };
            if comment.is_empty() {
                continue;
            }
            let author = evaluators
                .iter()
                .find(|evaluator| evaluator.id == grade.evaluator_id)
                .map(|evaluator| evaluator.name.clone())
                .unwrap_or_else(|| format!("evaluador {}", grade.evaluator_id));
            let _ = writeln!(output, "    Observación ({}): {}", author, comment);
        }
    }

    output
}

/// Weight as a percentage with one decimal, dropping a trailing ".0".
fn percent(weight: f64) -> String {
    let formatted = format!("{:.1}", weight * 100.0);
    match formatted.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => formatted,
    }
}

pub fn final_grade_section(strategy_name: &str, score: f64, passing_grade: f64) -> String {
    let verdict = Verdict::classify(score, passing_grade);
    let mut output = String::new();
    let _ = writeln!(output, "NOTA FINAL");
    let _ = writeln!(output, "Método de cálculo: {}", strategy_name);
    let _ = writeln!(output, "Nota final: {:.2}", score);
    let _ = writeln!(output, "Nota de aprobación: {:.2}", passing_grade);
    let _ = writeln!(output, "Resultado: {}", verdict);
    output
}

pub fn footer(evaluators: &[Evaluator], issued_on: NaiveDate) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(
        output,
        "Se extiende la presente acta para los fines que se estime conveniente."
    );

    for evaluator in evaluators {
        let _ = writeln!(output);
        let _ = writeln!(output, "______________________________");
        let _ = writeln!(output, "{}", evaluator.name);
        let _ = writeln!(output, "{}", evaluator.role);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "Emitida el {}", issued_on.format("%d-%m-%Y"));
    output
}
