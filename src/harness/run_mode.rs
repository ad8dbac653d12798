use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// What a harness run does with the compiled model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    None,
    /// Time repeated evaluations
    Benchmark,
    /// Delegate to the model's own per-instruction report
    PerfReport,
    /// Classify one image and print the top five
    SingleImage,
    /// Top-1 / top-5 accuracy over an indexed image directory
    ImageNetSweep,
    /// Digit accuracy over the MNIST test set
    MnistSweep,
    PrintModel,
    /// Evaluate once and print the raw result
    Eval,
    EvalAndPrint,
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::None
    }
}

impl RunMode {
    /// Combine the current selection with a newly requested mode.
    ///
    /// Printing and evaluating compose into `EvalAndPrint` in either order;
    /// every other request replaces the current mode.
    pub fn select(self, next: RunMode) -> RunMode {
        match (self, next) {
            (RunMode::PrintModel, RunMode::Eval) | (RunMode::Eval, RunMode::PrintModel) => RunMode::EvalAndPrint,
            (RunMode::EvalAndPrint, RunMode::Eval) | (RunMode::EvalAndPrint, RunMode::PrintModel) => {
                RunMode::EvalAndPrint
            }
            (_, next) => next,
        }
    }

    /// Fold a sequence of requests starting from `None`
    pub fn from_requests(requests: impl IntoIterator<Item = RunMode>) -> RunMode {
        requests.into_iter().fold(RunMode::None, RunMode::select)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_print_and_eval_compose() {
        assert_eq!(RunMode::PrintModel.select(RunMode::Eval), RunMode::EvalAndPrint);
        assert_eq!(RunMode::Eval.select(RunMode::PrintModel), RunMode::EvalAndPrint);
        assert_eq!(RunMode::EvalAndPrint.select(RunMode::Eval), RunMode::EvalAndPrint);
    }

    #[test]
    fn test_last_wins() {
        assert_eq!(RunMode::Benchmark.select(RunMode::MnistSweep), RunMode::MnistSweep);
        assert_eq!(RunMode::EvalAndPrint.select(RunMode::Benchmark), RunMode::Benchmark);
        assert_eq!(RunMode::PrintModel.select(RunMode::PrintModel), RunMode::PrintModel);
        assert_eq!(
            RunMode::from_requests([RunMode::Eval, RunMode::Benchmark, RunMode::PrintModel]),
            RunMode::PrintModel
        );
        assert_eq!(RunMode::from_requests([]), RunMode::None);
    }

    #[test]
    fn test_names() {
        assert_eq!(RunMode::from_str("image_net_sweep").unwrap(), RunMode::ImageNetSweep);
        assert_eq!(RunMode::EvalAndPrint.to_string(), "eval_and_print");
    }
}
