// Run reports and their export formats

use std::io::Write;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::{Error, Result};
use crate::scoring::{ratio, AccuracyAccumulator};
use crate::tensor::Shape;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Csv,
    Markdown,
}

/// Per-iteration latency summary in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub mean_ms: f64,
    pub std_dev_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub median_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
}

impl LatencyStats {
    /// Summarise recorded durations, `None` when nothing was recorded
    pub fn from_durations(durations: &[Duration]) -> Option<Self> {
        if durations.is_empty() {
            return None;
        }
        let mut latencies: Vec<f64> = durations.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        let n = latencies.len() as f64;

        let mean_ms = latencies.iter().sum::<f64>() / n;
        let variance = latencies.iter().map(|&x| (x - mean_ms).powi(2)).sum::<f64>() / n;
        latencies.sort_by(|a, b| a.total_cmp(b));

        let len = latencies.len();
        let median_ms = if len % 2 == 0 {
            (latencies[len / 2 - 1] + latencies[len / 2]) / 2.0
        } else {
            latencies[len / 2]
        };
        let percentile = |p: f64| {
            let idx = ((len as f64) * p / 100.0).ceil() as usize;
            latencies[idx.saturating_sub(1).min(len - 1)]
        };

        Some(Self {
            mean_ms,
            std_dev_ms: variance.sqrt(),
            min_ms: latencies[0],
            max_ms: latencies[len - 1],
            median_ms,
            p90_ms: percentile(90.0),
            p99_ms: percentile(99.0),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub iterations: usize,
    pub batch_size: usize,
    pub elapsed_secs: f64,
    /// Images per second
    pub throughput: f64,
    pub copy_arg: bool,
    pub latency: Option<LatencyStats>,
}

impl BenchmarkReport {
    pub fn new(iterations: usize, batch_size: usize, elapsed: Duration, copy_arg: bool) -> Self {
        let elapsed_secs = elapsed.as_secs_f64();
        let throughput = if elapsed_secs > 0.0 {
            (iterations * batch_size) as f64 / elapsed_secs
        } else {
            0.0
        };
        Self {
            iterations,
            batch_size,
            elapsed_secs,
            throughput,
            copy_arg,
            latency: None,
        }
    }
}

/// One ranked class of a single image classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub rank: usize,
    pub index: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub samples_seen: usize,
    pub top1_correct: usize,
    pub top5_correct: usize,
    pub top1_ratio: f64,
    pub top5_ratio: f64,
}

impl From<AccuracyAccumulator> for AccuracyReport {
    fn from(acc: AccuracyAccumulator) -> Self {
        Self {
            samples_seen: acc.samples_seen,
            top1_correct: acc.top1_correct,
            top5_correct: acc.top5_correct,
            top1_ratio: acc.top1_ratio(),
            top5_ratio: acc.top5_ratio(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnistReport {
    pub passed: usize,
    pub total: usize,
    pub accuracy: f64,
}

impl MnistReport {
    pub fn new(passed: usize, total: usize) -> Self {
        Self {
            passed,
            total,
            accuracy: ratio(passed, total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelListing {
    pub instructions: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalOutput {
    pub shape: Shape,
    pub values: Vec<f32>,
}

/// Outcome of one harness run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunReport {
    None,
    Benchmark(BenchmarkReport),
    PerfReport { iterations: usize },
    Classification(ClassificationReport),
    Accuracy(AccuracyReport),
    Mnist(MnistReport),
    ModelListing(ModelListing),
    Eval(EvalOutput),
    EvalAndPrint { listing: ModelListing, output: EvalOutput },
}

impl RunReport {
    pub fn name(&self) -> &'static str {
        match self {
            RunReport::None => "none",
            RunReport::Benchmark(_) => "benchmark",
            RunReport::PerfReport { .. } => "perf_report",
            RunReport::Classification(_) => "classification",
            RunReport::Accuracy(_) => "accuracy",
            RunReport::Mnist(_) => "mnist",
            RunReport::ModelListing(_) => "model_listing",
            RunReport::Eval(_) => "eval",
            RunReport::EvalAndPrint { .. } => "eval_and_print",
        }
    }

    /// Flattened (field, value) pairs used by the tabular exports
    fn fields(&self) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        let mut push = |key: &str, value: String| fields.push((key.to_string(), value));
        match self {
            RunReport::None => {}
            RunReport::Benchmark(b) => {
                push("iterations", b.iterations.to_string());
                push("batch_size", b.batch_size.to_string());
                push("elapsed_secs", format!("{:.6}", b.elapsed_secs));
                push("throughput", format!("{:.2}", b.throughput));
                push("copy_arg", b.copy_arg.to_string());
                if let Some(l) = &b.latency {
                    push("latency_mean_ms", format!("{:.3}", l.mean_ms));
                    push("latency_std_dev_ms", format!("{:.3}", l.std_dev_ms));
                    push("latency_min_ms", format!("{:.3}", l.min_ms));
                    push("latency_max_ms", format!("{:.3}", l.max_ms));
                    push("latency_median_ms", format!("{:.3}", l.median_ms));
                    push("latency_p90_ms", format!("{:.3}", l.p90_ms));
                    push("latency_p99_ms", format!("{:.3}", l.p99_ms));
                }
            }
            RunReport::PerfReport { iterations } => push("iterations", iterations.to_string()),
            RunReport::Classification(c) => {
                for p in &c.predictions {
                    push(&format!("top{}", p.rank), format!("{} {}", p.index, p.label));
                }
            }
            RunReport::Accuracy(a) => {
                push("samples_seen", a.samples_seen.to_string());
                push("top1_correct", a.top1_correct.to_string());
                push("top5_correct", a.top5_correct.to_string());
                push("top1_ratio", format!("{:.4}", a.top1_ratio));
                push("top5_ratio", format!("{:.4}", a.top5_ratio));
            }
            RunReport::Mnist(m) => {
                push("passed", m.passed.to_string());
                push("total", m.total.to_string());
                push("accuracy", format!("{:.4}", m.accuracy));
            }
            RunReport::ModelListing(l) => push("instructions", l.instructions.to_string()),
            RunReport::Eval(e) => {
                push("shape", e.shape.to_string());
                push("elements", e.values.len().to_string());
            }
            RunReport::EvalAndPrint { listing, output } => {
                push("instructions", listing.instructions.to_string());
                push("shape", output.shape.to_string());
                push("elements", output.values.len().to_string());
            }
        }
        fields
    }
}

/// Render a report in the requested format
pub fn export_report(report: &RunReport, format: ReportFormat) -> Result<Vec<u8>> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_vec_pretty(report)?),
        ReportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(["mode", "field", "value"])?;
            for (field, value) in report.fields() {
                writer.write_record([report.name(), field.as_str(), value.as_str()])?;
            }
            writer.flush()?;
            writer.into_inner().map_err(|e| Error::IoError(e.into_error()))
        }
        ReportFormat::Markdown => {
            let mut output = Vec::new();
            writeln!(&mut output, "# Inference Harness Report: {}\n", report.name())?;
            writeln!(&mut output, "| Field | Value |")?;
            writeln!(&mut output, "|-------|-------|")?;
            for (field, value) in report.fields() {
                writeln!(&mut output, "| {} | {} |", field, value.replace('|', "\\|"))?;
            }
            Ok(output)
        }
    }
}
