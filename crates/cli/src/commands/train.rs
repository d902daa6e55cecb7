//! Local model training command

use anyhow::{bail, Result};
use mediscan_lib::artifacts::FileArtifactStore;
use mediscan_lib::predictor::FitConfig;
use mediscan_lib::training::train_and_save;
use mediscan_lib::Disease;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::output::{print_info, print_table, OutputFormat};

#[derive(Tabled)]
struct TrainRow {
    #[tabled(rename = "Model")]
    disease: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Rows")]
    rows: String,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
}

#[derive(Serialize)]
struct TrainSummary {
    disease: Disease,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    training_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    training_accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Train from `<data_dir>/<disease>.csv` and write artifacts to `models_dir`
pub fn train(
    data_dir: &Path,
    models_dir: &Path,
    disease: Option<Disease>,
    format: OutputFormat,
) -> Result<()> {
    let diseases: Vec<Disease> = match disease {
        Some(d) => vec![d],
        None => Disease::ALL.to_vec(),
    };
    if format == OutputFormat::Table {
        print_info(&format!(
            "Training {} model(s) from {}",
            diseases.len(),
            data_dir.display()
        ));
    }

    let store = FileArtifactStore::new(models_dir);
    let runs = train_and_save(data_dir, &store, &diseases, &FitConfig::default());

    let summaries: Vec<TrainSummary> = runs
        .iter()
        .map(|run| match &run.result {
            Ok(manifest) => TrainSummary {
                disease: run.disease,
                success: true,
                version: Some(manifest.version.clone()),
                training_rows: Some(manifest.training_rows),
                training_accuracy: Some(manifest.training_accuracy),
                error: None,
            },
            Err(e) => TrainSummary {
                disease: run.disease,
                success: false,
                version: None,
                training_rows: None,
                training_accuracy: None,
                error: Some(format!("{:#}", e)),
            },
        })
        .collect();

    let rows: Vec<TrainRow> = summaries.iter().map(train_row).collect();
    print_table(&rows, &summaries, format);

    let failed = summaries.iter().filter(|s| !s.success).count();
    if failed == summaries.len() {
        bail!("No model could be trained");
    }
    Ok(())
}

fn train_row(summary: &TrainSummary) -> TrainRow {
    let dash = || "-".to_string();
    TrainRow {
        disease: summary.disease.key().to_string(),
        result: if summary.success {
            "saved".to_string()
        } else {
            summary.error.clone().unwrap_or_else(|| "failed".to_string())
        },
        version: summary.version.clone().unwrap_or_else(dash),
        rows: summary.training_rows.map(|r| r.to_string()).unwrap_or_else(dash),
        accuracy: summary
            .training_accuracy
            .map(|a| format!("{:.2}%", a * 100.0))
            .unwrap_or_else(dash),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediscan_lib::artifacts::ArtifactStore;
    use tempfile::TempDir;

    const DIABETES_CSV: &str = "\
Glucose,BMI,Outcome
85,26.6,0
89,28.1,0
183,23.3,1
168,38,1
";

    #[test]
    fn test_train_writes_artifacts() {
        let data = TempDir::new().unwrap();
        let models = TempDir::new().unwrap();
        std::fs::write(data.path().join("diabetes.csv"), DIABETES_CSV).unwrap();

        train(data.path(), models.path(), Some(Disease::Diabetes), OutputFormat::Json).unwrap();
        assert!(FileArtifactStore::new(models.path())
            .load(Disease::Diabetes)
            .is_ok());
    }

    #[test]
    fn test_train_fails_without_any_dataset() {
        let data = TempDir::new().unwrap();
        let models = TempDir::new().unwrap();
        assert!(train(data.path(), models.path(), None, OutputFormat::Json).is_err());
    }
}
