use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub id: u64,
    pub name: String,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: u64,
    pub work_id: u64,
    pub evaluator_id: u64,
    pub criteria_id: u64,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: u64,
    pub name: String,
    pub rut: String,
    pub program: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    pub id: u64,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub work_type: WorkType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<u64>,
}

/// Kind of work under evaluation. Unknown kinds are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkType {
    Thesis,
    FinalProject,
    Internship,
    Other(String),
}

impl WorkType {
    pub fn label(&self) -> &str {
        match self {
            WorkType::Thesis => "Tesis",
            WorkType::FinalProject => "Proyecto de Título",
            WorkType::Internship => "Práctica Profesional",
            WorkType::Other(label) => label,
        }
    }

    fn key(&self) -> &str {
        match self {
            WorkType::Thesis => "thesis",
            WorkType::FinalProject => "final_project",
            WorkType::Internship => "internship",
            WorkType::Other(label) => label,
        }
    }

    fn from_key(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "thesis" | "tesis" => WorkType::Thesis,
            "final_project" | "proyecto" => WorkType::FinalProject,
            "internship" | "practica" => WorkType::Internship,
            _ => WorkType::Other(value.to_string()),
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for WorkType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for WorkType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(WorkType::from_key(&value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluator {
    pub id: u64,
    pub name: String,
    pub role: String,
    pub affiliation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Everything needed to issue one acta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationBundle {
    pub work: Work,
    pub student: Student,
    #[serde(default)]
    pub evaluators: Vec<Evaluator>,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    #[serde(default)]
    pub grades: Vec<Grade>,
}

impl EvaluationBundle {
    /// Bundle criteria, or `defaults` when the bundle carries none.
    pub fn criteria_or(&self, defaults: Vec<Criterion>) -> Vec<Criterion> {
        if self.criteria.is_empty() {
            defaults
        } else {
            self.criteria.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionSubtotal {
    pub criterion_id: u64,
    pub name: String,
    pub weight: f64,
    pub max_score: Option<f64>,
    pub grade_count: usize,
    pub average: Option<f64>,
    pub contribution: f64,
}
