//! Output rendering: table via `tabled`, JSON via serde.

use std::collections::HashMap;

use tabled::{Table, Tabled, settings::Style};

use mobilelink_api::Item;
use mobilelink_api::models::{ApparatusStatus, property_codes};

use crate::cli::OutputFormat;
use crate::error::CliError;

#[derive(Tabled)]
struct GeneratorRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Engine hours")]
    engine_hours: String,
    #[tabled(rename = "Last seen")]
    last_seen: String,
}

impl GeneratorRow {
    fn from_item(id: &str, item: &Item) -> Self {
        let detail = &item.apparatus_detail;
        let engine_hours = detail
            .property(property_codes::ENGINE_HOURS)
            .and_then(|value| value.as_f64())
            .map_or_else(|| "-".into(), |hours| format!("{hours:.1}"));
        Self {
            id: id.to_owned(),
            name: item.apparatus.name.clone().unwrap_or_default(),
            status: ApparatusStatus::from_code(detail.apparatus_status).label(),
            model: item.apparatus.model_number.clone().unwrap_or_default(),
            engine_hours,
            last_seen: detail.last_seen.clone().unwrap_or_default(),
        }
    }
}

/// Render the fetched generator map in the chosen format.
pub fn render_items(
    format: OutputFormat,
    items: &HashMap<String, Item>,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(items)?),
        OutputFormat::Table => {
            let mut rows: Vec<GeneratorRow> = items
                .iter()
                .map(|(id, item)| GeneratorRow::from_item(id, item))
                .collect();
            rows.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(Table::new(rows).with(Style::sharp()).to_string())
        }
    }
}
