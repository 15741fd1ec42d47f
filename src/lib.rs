//! Grade aggregation and evaluation certificate ("acta") generation for
//! thesis works.
//!
//! [`strategy`] reduces a grade sheet to a final score, [`report`] lays the
//! acta out around it, and [`data`] moves bundles in and out of files.

pub mod config;
pub mod data;
pub mod models;
pub mod report;
pub mod strategy;
pub mod telemetry;
