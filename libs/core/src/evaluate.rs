//! Retrieval-quality and latency evaluation for a workload batch.
//!
//! Scores an ordered batch of per-query result sets against ground truth and
//! folds per-query latencies into percentile/throughput metrics. Pure; the
//! orchestrator merges the output map with telemetry and timing fields.

use std::collections::{BTreeMap, HashMap, HashSet};

/// Relevant result identifiers per query index.
///
/// Loaded fresh per run from the dataset's ground-truth file; never persisted.
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    pub relevant: HashMap<usize, HashSet<u64>>,
}

impl GroundTruth {
    pub fn new(relevant: HashMap<usize, HashSet<u64>>) -> Self {
        GroundTruth { relevant }
    }
}

/// Flat metric map produced by evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub scores: BTreeMap<String, f64>,
}

/// Score retrieved ids against ground truth and summarize latencies.
///
/// `predictions[i]` is the ordered result id list for query `i`; queries whose
/// ground truth is empty or absent are skipped in the recall/precision means
/// rather than counted as zero. Latencies are in seconds.
pub fn evaluate(
    predictions: &[Vec<u64>],
    ground_truth: &GroundTruth,
    latencies: &[f64],
) -> EvaluationResult {
    let mut recall_scores = Vec::new();
    let mut precision_scores = Vec::new();

    for (i, retrieved) in predictions.iter().enumerate() {
        let Some(relevant) = ground_truth.relevant.get(&i) else {
            continue;
        };
        if relevant.is_empty() {
            continue;
        }

        let retrieved_ids: HashSet<u64> = retrieved.iter().copied().collect();
        let hits = retrieved_ids.intersection(relevant).count() as f64;

        recall_scores.push(hits / relevant.len() as f64);
        precision_scores.push(if retrieved_ids.is_empty() {
            0.0
        } else {
            hits / retrieved_ids.len() as f64
        });
    }

    let recall = mean(&recall_scores);
    let precision = mean(&precision_scores);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    let qps = if latencies.is_empty() {
        0.0
    } else {
        latencies.len() as f64 / latencies.iter().sum::<f64>()
    };

    let mut scores = BTreeMap::new();
    scores.insert("recall".to_string(), recall);
    scores.insert("precision".to_string(), precision);
    scores.insert("f1".to_string(), f1);
    scores.insert("p50_latency".to_string(), percentile(latencies, 50.0));
    scores.insert("p95_latency".to_string(), percentile(latencies, 95.0));
    scores.insert("p99_latency".to_string(), percentile(latencies, 99.0));
    scores.insert("qps".to_string(), qps);

    EvaluationResult { scores }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Linear-interpolation percentile over unsorted samples.
///
/// Matches the conventional `rank = p/100 * (n-1)` definition; returns 0.0 for
/// an empty sample set so an empty workload cannot divide by zero.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        return sorted[lower];
    }

    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}
