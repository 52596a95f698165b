//! Server health command

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, format_timestamp, print_json, print_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Last Check")]
    last_check: String,
}

pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    if format == OutputFormat::Json {
        return print_json(&health);
    }

    let overall = serde_json::to_value(health.status)?
        .as_str()
        .unwrap_or_default()
        .to_string();
    println!("{} {}", "Server status:".bold(), color_status(&overall));
    println!();

    let mut rows: Vec<ComponentRow> = health
        .components
        .iter()
        .map(|(name, component)| {
            let status = serde_json::to_value(component.status)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            ComponentRow {
                component: name.clone(),
                status: color_status(&status),
                message: component.message.clone().unwrap_or_default(),
                last_check: format_timestamp(component.last_check_timestamp as f64),
            }
        })
        .collect();
    rows.sort_by(|a, b| a.component.cmp(&b.component));

    print_table(&rows, OutputFormat::Table);
    Ok(())
}
