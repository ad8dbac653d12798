// Reporting tools

pub mod report;

pub use report::{
    export_report, AccuracyReport, BenchmarkReport, ClassificationReport, EvalOutput, LatencyStats,
    MnistReport, ModelListing, Prediction, ReportFormat, RunReport,
};
