//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use monitor_lib::{Metric, MetricResult, MetricValue, Point};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Parse a format name as stored in the config file
    pub fn from_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    if bytes >= GB {
        format!("{:.2}Gi", bytes / GB)
    } else if bytes >= MB {
        format!("{:.2}Mi", bytes / MB)
    } else if bytes >= KB {
        format!("{:.2}Ki", bytes / KB)
    } else {
        format!("{}B", bytes)
    }
}

/// Format a quantity in the unit reported by the server
pub fn format_quantity(value: f64, unit: Option<&str>) -> String {
    match unit {
        Some("bytes") if value.is_finite() => format_bytes(value),
        Some("cores") => format!("{:.3}", value),
        _ => format_sample(value),
    }
}

pub fn format_sample(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.4}", value)
    }
}

pub fn format_currency(amount: f64, currency: &str) -> String {
    match currency {
        "USD" => format!("${:.2}", amount),
        "EUR" => format!("€{:.2}", amount),
        "GBP" => format!("£{:.2}", amount),
        "CNY" => format!("¥{:.2}", amount),
        _ => format!("{:.2} {}", amount, currency),
    }
}

/// Unix seconds as UTC time
pub fn format_timestamp(ts: f64) -> String {
    chrono::DateTime::from_timestamp(ts.trunc() as i64, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ready" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "error" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// `k=v` pairs of a series, in label order
pub fn format_labels(value: &MetricValue) -> String {
    if value.labels.is_empty() {
        return "-".to_string();
    }
    value
        .labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Tabled, Serialize)]
struct SampleRow {
    #[tabled(rename = "Labels")]
    labels: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled, Serialize)]
struct SeriesRow {
    #[tabled(rename = "Labels")]
    labels: String,
    #[tabled(rename = "Points")]
    points: usize,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Last")]
    last: String,
}

#[derive(Tabled, Serialize)]
struct MeterRow {
    #[tabled(rename = "Labels")]
    labels: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Avg")]
    avg: String,
    #[tabled(rename = "Sum")]
    sum: String,
    #[tabled(rename = "Fee")]
    fee: String,
}

fn sample_row(value: &MetricValue) -> Option<SampleRow> {
    let point = value.sample?;
    Some(SampleRow {
        labels: format_labels(value),
        time: format_timestamp(point.timestamp),
        value: format_sample(point.value),
    })
}

fn series_row(value: &MetricValue) -> Option<SeriesRow> {
    let series: &[Point] = value.series.as_deref()?;
    let (first, last) = (series.first()?, series.last()?);
    Some(SeriesRow {
        labels: format_labels(value),
        points: series.len(),
        from: format_timestamp(first.timestamp),
        to: format_timestamp(last.timestamp),
        last: format_sample(last.value),
    })
}

fn meter_row(value: &MetricValue) -> Option<MeterRow> {
    let unit = value.resource_unit.as_deref();
    let quantity = |v: Option<f64>| v.map(|v| format_quantity(v, unit)).unwrap_or_default();
    let fee = match (value.fee, value.currency_unit.as_deref()) {
        (Some(fee), _) if fee < 0.0 => "n/a".to_string(),
        (Some(fee), Some(currency)) => format_currency(fee, currency),
        (Some(fee), None) => format!("{:.2}", fee),
        (None, _) => return None,
    };
    Some(MeterRow {
        labels: format_labels(value),
        min: quantity(value.min_value),
        max: quantity(value.max_value),
        avg: quantity(value.avg_value),
        sum: quantity(value.sum_value),
        fee,
    })
}

fn print_metric(metric: &Metric, meter: bool) {
    println!("{}", metric.metric_name.bold());

    if let Some(error) = metric.error.as_deref().filter(|e| !e.is_empty()) {
        print_error(error);
        return;
    }

    let values = &metric.data.result;
    if meter {
        print_table(&values.iter().filter_map(meter_row).collect::<Vec<_>>(), OutputFormat::Table);
    } else if values.iter().any(|v| v.series.is_some()) {
        print_table(&values.iter().filter_map(series_row).collect::<Vec<_>>(), OutputFormat::Table);
    } else {
        print_table(&values.iter().filter_map(sample_row).collect::<Vec<_>>(), OutputFormat::Table);
    }
}

/// Print a monitoring result; meters get statistics and fee columns
pub fn print_result(result: &MetricResult, format: OutputFormat, meter: bool) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(result);
    }

    if result.results.is_empty() {
        print_warning("No metrics matched the filter");
        return Ok(());
    }

    for metric in &result.results {
        print_metric(metric, meter);
        println!();
    }

    if result.total_pages > 0 {
        print_info(&format!(
            "Page {} of {} ({} items)",
            result.current_page, result.total_pages, result.total_items
        ));
    }

    Ok(())
}
