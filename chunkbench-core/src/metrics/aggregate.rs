//! Reduce per-query metric maps to summary statistics.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{AggregatedMetrics, MetricMap, MetricSummary};

/// Summarize each metric over the queries that report it.
///
/// Metric names need not be uniform: a query without a metric does not
/// contribute to it. The standard deviation is the population one. Values are
/// sorted before reduction so the result does not depend on input order.
pub fn aggregate<'a, I>(per_query: I) -> AggregatedMetrics
where
    I: IntoIterator<Item = &'a MetricMap>,
{
    let mut values: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for metrics in per_query {
        for (name, &value) in metrics {
            values.entry(name.as_str()).or_default().push(value);
        }
    }

    values
        .into_iter()
        .filter_map(|(name, mut vals)| summarize(&mut vals).map(|s| (name.to_string(), s)))
        .collect()
}

/// Metric names present in any of `per_query`.
pub fn metric_names<'a, I>(per_query: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a MetricMap>,
{
    per_query
        .into_iter()
        .flat_map(|m| m.keys().cloned())
        .collect()
}

fn summarize(values: &mut [f64]) -> Option<MetricSummary> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };
    Some(MetricSummary {
        mean,
        median,
        std: variance.sqrt(),
        min: values[0],
        max: values[values.len() - 1],
    })
}
