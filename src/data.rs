use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context};
use tracing::{debug, warn};

use crate::models::{Criterion, EvaluationBundle, Evaluator, Grade, Student, Work, WorkType};

pub fn load_bundle(path: &Path) -> anyhow::Result<EvaluationBundle> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bundle {}", path.display()))?;
    let bundle: EvaluationBundle = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid evaluation bundle", path.display()))?;
    debug!(
        evaluators = bundle.evaluators.len(),
        criteria = bundle.criteria.len(),
        grades = bundle.grades.len(),
        "loaded bundle"
    );
    Ok(bundle)
}

pub fn save_bundle(path: &Path, bundle: &EvaluationBundle) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(bundle)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Sample evaluation used for demos and first runs.
pub fn seed_bundle(criteria: Vec<Criterion>) -> EvaluationBundle {
    let work = Work {
        id: 1,
        title: "Sistema de alerta temprana para deserción universitaria".to_string(),
        description: "Modelo predictivo basado en registros académicos de primer año".to_string(),
        work_type: WorkType::Thesis,
        student_id: Some(1),
    };

    let student = Student {
        id: 1,
        name: "Avery Lee Moreno".to_string(),
        rut: "19.876.543-2".to_string(),
        program: "Ingeniería Civil en Computación".to_string(),
        email: Some("avery.lee@example.edu".to_string()),
    };

    let evaluators = vec![
        Evaluator {
            id: 1,
            name: "Dra. Kiara Patel".to_string(),
            role: "Profesora guía".to_string(),
            affiliation: "Departamento de Computación".to_string(),
            email: Some("kiara.patel@example.edu".to_string()),
        },
        Evaluator {
            id: 2,
            name: "Dr. Jules Moreno".to_string(),
            role: "Profesor informante".to_string(),
            affiliation: "Departamento de Estadística".to_string(),
            email: None,
        },
        Evaluator {
            id: 3,
            name: "Mg. Sofía Araya".to_string(),
            role: "Evaluadora externa".to_string(),
            affiliation: "Centro de Estudios Educacionales".to_string(),
            email: None,
        },
    ];

    let sheet: [(u64, usize, f64, Option<&str>); 10] = [
        (1, 0, 6.2, Some("Revisión bibliográfica completa")),
        (2, 0, 5.8, None),
        (3, 0, 6.0, None),
        (1, 1, 5.5, None),
        (2, 1, 5.0, Some("Validación cruzada insuficiente")),
        (3, 1, 5.6, None),
        (1, 2, 6.5, None),
        (2, 2, 6.1, None),
        (1, 3, 6.8, Some("Excelente manejo de preguntas")),
        (3, 3, 6.4, None),
    ];

    let grades = sheet
        .iter()
        .enumerate()
        .filter_map(|(idx, (evaluator_id, criterion_idx, score, comments))| {
            criteria.get(*criterion_idx).map(|criterion| Grade {
                id: idx as u64 + 1,
                work_id: work.id,
                evaluator_id: *evaluator_id,
                criteria_id: criterion.id,
                score: *score,
                comments: comments.map(str::to_string),
            })
        })
        .collect();

    EvaluationBundle {
        work,
        student,
        evaluators,
        criteria,
        grades,
    }
}

/// Merges a CSV grade sheet into `bundle`, returning how many grades were added.
///
/// Rows for another work or with an id already present are skipped.
pub fn import_csv(bundle: &mut EvaluationBundle, csv_path: &Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        id: Option<u64>,
        work_id: u64,
        evaluator_id: u64,
        criteria_id: u64,
        score: f64,
        comments: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut known_ids: HashSet<u64> = bundle.grades.iter().map(|grade| grade.id).collect();
    let mut next_id = match known_ids.iter().max() {
        Some(max) => max
            .checked_add(1)
            .context("bundle already uses the largest grade id")?,
        None => 1,
    };
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid grade row {}", line + 1))?;
        if !row.score.is_finite() {
            bail!("invalid grade row {}: score must be a finite number", line + 1);
        }

        if row.work_id != bundle.work.id {
            warn!(
                row = line + 1,
                work_id = row.work_id,
                expected = bundle.work.id,
                "skipping grade for another work"
            );
            continue;
        }

        // next_id stays above every known id
        let id = row.id.unwrap_or(next_id);

        if known_ids.contains(&id) {
            debug!(id, "grade already present");
            continue;
        }
        let following = id
            .checked_add(1)
            .with_context(|| format!("invalid grade row {}: grade id {} out of range", line + 1, id))?;
        known_ids.insert(id);
        next_id = next_id.max(following);

        bundle.grades.push(Grade {
            id,
            work_id: row.work_id,
            evaluator_id: row.evaluator_id,
            criteria_id: row.criteria_id,
            score: row.score,
            comments: row.comments.filter(|text| !text.trim().is_empty()),
        });
        inserted += 1;
    }

    Ok(inserted)
}

/// Describes grades whose criterion or evaluator is not part of the bundle.
pub fn audit_references(bundle: &EvaluationBundle, criteria: &[Criterion]) -> Vec<String> {
    let criterion_ids: HashSet<u64> = criteria.iter().map(|criterion| criterion.id).collect();
    let evaluator_ids: HashSet<u64> = bundle.evaluators.iter().map(|e| e.id).collect();
    let mut issues = Vec::new();

    for grade in &bundle.grades {
        if !criterion_ids.contains(&grade.criteria_id) {
            issues.push(format!(
                "grade {} references unknown criterion {}",
                grade.id, grade.criteria_id
            ));
        }
        if !evaluator_ids.contains(&grade.evaluator_id) {
            issues.push(format!(
                "grade {} references unknown evaluator {}",
                grade.id, grade.evaluator_id
            ));
        }
    }

    issues
}
