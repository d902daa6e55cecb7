//! Model listing and input schema commands

use anyhow::Result;
use colored::Colorize;
use mediscan_lib::Disease;
use tabled::Tabled;

use crate::client::{ApiClient, FormField};
use crate::output::{color_availability, format_number, print_table, OutputFormat};

#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Model")]
    key: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Features")]
    features: String,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Range / Options")]
    range: String,
    #[tabled(rename = "Default")]
    default: String,
}

/// List the models the server knows about
pub async fn list_models(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let models = client.models().await?;

    let rows: Vec<ModelRow> = models
        .iter()
        .map(|m| ModelRow {
            key: m.disease.key().to_string(),
            name: m.display_name.clone(),
            status: color_availability(m.available),
            version: m.version.clone().unwrap_or_else(|| "-".to_string()),
            features: m
                .features
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    print_table(&rows, &models, format);

    if format == OutputFormat::Table {
        for m in models.iter().filter(|m| !m.available) {
            if let Some(error) = &m.error {
                println!("{} {}: {}", "•".dimmed(), m.disease.key(), error.dimmed());
            }
        }
    }
    Ok(())
}

/// Show the input fields for a disease
pub async fn show_schema(client: &ApiClient, disease: Disease, format: OutputFormat) -> Result<()> {
    let schema = client.schema(disease).await?;

    if format == OutputFormat::Table {
        println!("{}", format!("{} input fields", disease.display_name()).bold());
    }
    let rows: Vec<FieldRow> = schema.fields.iter().map(field_row).collect();
    print_table(&rows, &schema, format);
    Ok(())
}

fn field_row(field: &FormField) -> FieldRow {
    match field {
        FormField::Numeric {
            name,
            min,
            max,
            default,
        } => FieldRow {
            name: name.clone(),
            kind: "numeric".to_string(),
            range: format!("{} .. {}", format_number(*min), format_number(*max)),
            default: format_number(*default),
        },
        FormField::Categorical {
            name,
            options,
            default,
        } => FieldRow {
            name: name.clone(),
            kind: "categorical".cyan().to_string(),
            range: options
                .iter()
                .filter_map(|o| o.category_label())
                .collect::<Vec<_>>()
                .join(", "),
            default: default.category_label().unwrap_or_default(),
        },
    }
}
