//! Meter (usage and fee) command

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use monitor_lib::{Level, MetricResult};

use super::query::QueryArgs;
use crate::client::ApiClient;
use crate::output::{format_currency, print_result, OutputFormat};

/// Unit prices overriding the server defaults
#[derive(Debug, Clone, Default, Args)]
pub struct PriceArgs {
    #[arg(long)]
    pub cpu_per_core_per_hour: Option<f64>,

    #[arg(long)]
    pub mem_per_gigabytes_per_hour: Option<f64>,

    #[arg(long)]
    pub ingress_network_traffic_per_megabytes_per_hour: Option<f64>,

    #[arg(long)]
    pub egress_network_traffic_per_megabytes_per_hour: Option<f64>,

    #[arg(long)]
    pub pvc_per_gigabytes_per_hour: Option<f64>,

    /// Currency reported with fees, e.g. USD
    #[arg(long)]
    pub currency_unit: Option<String>,
}

/// Sum of non-sentinel fees per metric, with the currency they were priced in
fn total_fees(result: &MetricResult) -> Vec<(String, f64, String)> {
    result
        .results
        .iter()
        .filter_map(|metric| {
            let priced: Vec<_> = metric
                .data
                .result
                .iter()
                .filter_map(|v| Some((v.fee.filter(|f| *f >= 0.0)?, v.currency_unit.clone()?)))
                .collect();
            let currency = priced.first()?.1.clone();
            let total = priced.iter().map(|(fee, _)| fee).sum();
            Some((metric.metric_name.clone(), total, currency))
        })
        .collect()
}

pub async fn run_meter(
    client: &ApiClient,
    level: Level,
    args: QueryArgs,
    prices: PriceArgs,
    format: OutputFormat,
) -> Result<()> {
    let mut request = args.into_request();
    request.meter = Some("true".to_string());
    request.cpu_per_core_per_hour = prices.cpu_per_core_per_hour.map(|p| p.to_string());
    request.mem_per_gigabytes_per_hour = prices.mem_per_gigabytes_per_hour.map(|p| p.to_string());
    request.ingress_network_traffic_per_megabytes_per_hour = prices
        .ingress_network_traffic_per_megabytes_per_hour
        .map(|p| p.to_string());
    request.egress_network_traffic_per_megabytes_per_hour = prices
        .egress_network_traffic_per_megabytes_per_hour
        .map(|p| p.to_string());
    request.pvc_per_gigabytes_per_hour = prices.pvc_per_gigabytes_per_hour.map(|p| p.to_string());
    request.currency_unit = prices.currency_unit;

    let result = client.query(level, &request).await?;
    print_result(&result, format, true)?;

    if format == OutputFormat::Table {
        let totals = total_fees(&result);
        if !totals.is_empty() {
            println!("{}", "Total Fees".bold());
            println!("{}", "-".repeat(50));
            for (name, total, currency) in totals {
                println!("{:<40} {}", name, format_currency(total, &currency).green());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_lib::{Metric, MetricData, MetricType, MetricValue};

    fn priced(fee: f64) -> MetricValue {
        MetricValue {
            fee: Some(fee),
            currency_unit: Some("USD".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_total_fees_skip_unpriced() {
        let result = MetricResult::new(vec![
            Metric::new(
                "meter_pod_cpu_usage",
                MetricData {
                    result_type: MetricType::Vector,
                    result: vec![priced(1.5), priced(2.0), priced(-1.0), MetricValue::default()],
                },
            ),
            Metric::empty("meter_pod_memory_usage_wo_cache", MetricType::Vector),
        ]);

        let totals = total_fees(&result);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].0, "meter_pod_cpu_usage");
        assert_eq!(totals[0].1, 3.5);
        assert_eq!(totals[0].2, "USD");
    }
}
