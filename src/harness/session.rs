// A bound model ready to run: parameter map, execution engine and input
// category. Each run mode is a method consuming the session's state.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use log::{debug, info, warn};

use crate::dataset::{
    read_image, render_ascii, DebugFloatReader, SampleReader, SingleImageReader, StreamingDataset,
};
use crate::error::{Error, Result};
use crate::execution::{DeviceAdapter, ExecutionEngine};
use crate::labels::{LabelTable, UNKNOWN_LABEL};
use crate::model::{CompiledModel, ImageCategory, ParameterMap};
use crate::scoring::{argmax, top5, AccuracyAccumulator, MNIST_CLASSES};
use crate::tensor::{generate_argument, stable_hash, Argument};
use crate::tools::report::{
    AccuracyReport, BenchmarkReport, ClassificationReport, EvalOutput, LatencyStats, MnistReport, Prediction,
    RunReport,
};

use super::binder::bind_parameters;
use super::config::{HarnessConfig, InputSource};

pub(crate) struct Session<'a> {
    config: &'a HarnessConfig,
    labels: &'a LabelTable,
    model: &'a dyn CompiledModel,
    engine: ExecutionEngine<'a>,
    params: ParameterMap,
    category: ImageCategory,
}

impl<'a> Session<'a> {
    pub(crate) fn bind(
        config: &'a HarnessConfig,
        labels: &'a LabelTable,
        model: &'a dyn CompiledModel,
        device: &'a dyn DeviceAdapter,
        out: &mut dyn Write,
    ) -> Result<Self> {
        let options = config.execution_options();
        if config.verbose {
            for name in model.parameter_shapes().keys() {
                writeln!(out, "parameter: {}", name)?;
            }
        }
        let params = bind_parameters(model, device, &options)?;
        let engine = ExecutionEngine::new(model, device, options)?;

        let shape = engine.input_shape();
        if config.verbose {
            writeln!(out, "model input {} {} elements", shape, shape.elements())?;
        }
        let category = ImageCategory::classify(shape);
        debug!("input {} classified as {}", shape, category);

        Ok(Self {
            config,
            labels,
            model,
            engine,
            params,
            category,
        })
    }

    pub(crate) fn category(&self) -> ImageCategory {
        self.category
    }

    /// Seeded random data for the bound input
    fn random_input(&self, salt: u64) -> Argument {
        let seed = stable_hash(self.engine.arg_name()).wrapping_add(salt);
        generate_argument(self.engine.input_shape(), seed)
    }

    /// Stage a sample, evaluate once and return the host copy of the result
    fn evaluate(&mut self, data: Vec<f32>) -> Result<Argument> {
        self.engine.stage_input(&mut self.params, data)?;
        self.engine.run_to_host(&self.params)
    }

    pub(crate) fn benchmark(&mut self, out: &mut dyn Write) -> Result<RunReport> {
        let iterations = self.config.iteration_count();
        let copy_arg = self.config.copy_arg;
        info!("running {} iterations", iterations);
        if self.config.verbose && iterations > 1 {
            writeln!(out, "running           {} iterations", iterations)?;
        }

        let input = self.random_input(0);
        self.engine.stage_argument(&mut self.params, input)?;

        let start = Instant::now();
        for i in 0..iterations {
            if copy_arg {
                let input = self.random_input(i as u64);
                self.engine.stage_argument(&mut self.params, input)?;
            }
            let result = self.engine.run(&self.params)?;
            if copy_arg {
                self.engine.to_host(result)?;
            }
        }
        let elapsed = start.elapsed();

        let batch_size = self.engine.input_shape().batch_size();
        let mut report = BenchmarkReport::new(iterations, batch_size, elapsed, copy_arg);
        report.latency = LatencyStats::from_durations(&self.engine.latencies());

        writeln!(out, "batch size        {}", batch_size)?;
        writeln!(out, "Elapsed time(ms): {:.3}", elapsed.as_secs_f64() * 1000.0)?;
        writeln!(out, "Images/sec:       {:.2}", report.throughput)?;
        if let Some(latency) = &report.latency {
            writeln!(
                out,
                "Latency(ms):      mean {:.3} median {:.3} p90 {:.3} p99 {:.3}",
                latency.mean_ms, latency.median_ms, latency.p90_ms, latency.p99_ms
            )?;
        }
        Ok(RunReport::Benchmark(report))
    }

    pub(crate) fn perf_report(&mut self, out: &mut dyn Write) -> Result<RunReport> {
        let iterations = self.config.iteration_count();
        info!("running {} iterations", iterations);
        if self.config.verbose && iterations > 1 {
            writeln!(out, "running           {} iterations", iterations)?;
        }
        let input = self.random_input(0);
        self.engine.stage_argument(&mut self.params, input)?;
        self.model.perf_report(out, iterations, &self.params)?;
        Ok(RunReport::PerfReport { iterations })
    }

    pub(crate) fn single_image(&mut self, path: &Path, out: &mut dyn Write) -> Result<RunReport> {
        let mut reader = SingleImageReader::new(path, self.category, self.config.normalization);
        let sample = reader
            .produce_sample()?
            .ok_or_else(|| Error::Input(format!("no data read from {}", path.display())))?;

        let result = self.evaluate(sample.data)?;
        let ranked = top5(result.data()?)?;

        if self.labels.is_empty() {
            warn!("no label file loaded, class names print as {}", UNKNOWN_LABEL);
        }
        let mut predictions = Vec::with_capacity(ranked.len());
        for (rank, &index) in ranked.iter().enumerate() {
            let label = self.labels.name(index);
            writeln!(out, "top{} = {} {}", rank + 1, index, label)?;
            predictions.push(Prediction {
                rank: rank + 1,
                index,
                label: label.to_string(),
            });
        }
        Ok(RunReport::Classification(ClassificationReport { predictions }))
    }

    pub(crate) fn imagenet_sweep(&mut self, reader: &mut dyn SampleReader, out: &mut dyn Write) -> Result<RunReport> {
        let interval = self.config.progress_interval.max(1);
        let mut accuracy = AccuracyAccumulator::new();

        while let Some(sample) = reader.produce_sample()? {
            let label = sample
                .label
                .ok_or_else(|| Error::Input("sweep sample has no label".to_string()))?;
            let result = self.evaluate(sample.data)?;
            accuracy.update(&top5(result.data()?)?, label);

            if accuracy.samples_seen % interval == 0 {
                writeln!(
                    out,
                    "{} top1: {} top5: {}",
                    accuracy.samples_seen, accuracy.top1_correct, accuracy.top5_correct
                )?;
            }
        }

        if accuracy.samples_seen == 0 {
            warn!("imagenet sweep read no samples");
        }
        writeln!(
            out,
            "Overall - top1: {} top5: {}",
            accuracy.top1_ratio(),
            accuracy.top5_ratio()
        )?;
        Ok(RunReport::Accuracy(AccuracyReport::from(accuracy)))
    }

    /// Score every MNIST sample. `finalize` runs exactly once whenever
    /// `initialize` was reached, whatever the outcome.
    pub(crate) fn mnist_sweep(
        &mut self,
        dataset: &mut dyn StreamingDataset,
        dir: &Path,
        out: &mut dyn Write,
    ) -> Result<RunReport> {
        if self.category != ImageCategory::Mnist28 {
            return Err(Error::Configuration(format!(
                "mnist sweep requires input size [1,28,28], model input is {}",
                self.engine.input_shape()
            )));
        }

        let outcome = match dataset.initialize(dir) {
            Ok(count) => self.score_mnist(dataset, count, out),
            Err(e) => Err(e),
        };
        dataset.finalize();
        outcome
    }

    fn score_mnist(&mut self, dataset: &mut dyn StreamingDataset, count: usize, out: &mut dyn Write) -> Result<RunReport> {
        info!("mnist images = {}", count);
        let mut passed = 0;
        for _ in 0..count {
            let (pixels, label) = dataset.next_sample()?;
            if self.config.verbose {
                debug!("\n{}", render_ascii(&pixels, 28, label));
            }

            let result = self.evaluate(pixels)?;
            let scores = result.data()?;
            let predicted = argmax(scores, MNIST_CLASSES)?;
            if predicted == label {
                passed += 1;
            }

            if self.config.verbose {
                let line: Vec<String> = scores
                    .iter()
                    .take(MNIST_CLASSES)
                    .enumerate()
                    .map(|(j, s)| format!("{}{}", if j == predicted { "*" } else { "" }, s))
                    .collect();
                debug!("{}", line.join(" "));
            }
        }

        let report = MnistReport::new(passed, count);
        writeln!(out, "MNIST results: {} / {} = {}", passed, count, report.accuracy)?;
        Ok(RunReport::Mnist(report))
    }

    /// Input for Eval: debug file, image, or seeded random data
    fn eval_input(&self) -> Result<Vec<f32>> {
        let required = self.engine.input_shape().elements();
        match &self.config.input {
            InputSource::DebugFile(path) => DebugFloatReader::new(path, required).read(),
            InputSource::Image(path) => {
                debug!("reading image: {}", path.display());
                read_image(path, self.category, self.config.normalization)
            }
            InputSource::None => {
                if !self.config.random_input {
                    warn!("no input file given, evaluating with seeded random input");
                }
                Ok(self.random_input(0).data()?.to_vec())
            }
        }
    }

    pub(crate) fn eval(&mut self, out: &mut dyn Write) -> Result<EvalOutput> {
        let input = self.eval_input()?;
        if self.config.verbose {
            writeln!(out, "Inputs: ")?;
            for value in &input {
                writeln!(out, "\t{}", value)?;
            }
        }

        let result = self.evaluate(input)?;
        writeln!(out, "{}", result)?;
        Ok(EvalOutput {
            shape: result.shape().clone(),
            values: result.data()?.to_vec(),
        })
    }
}
