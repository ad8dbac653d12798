#![allow(dead_code)]

use std::cell::Cell;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use inference_harness::{
    dataset::{Sample, SampleReader, StreamingDataset},
    Argument, CompiledModel, Error, ParameterMap, ParameterShapes, Result, Shape,
};

pub type Scorer = Rc<dyn Fn(&[f32]) -> Vec<f32>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Compiled model stand-in with a scripted output
#[derive(Clone)]
pub struct MockModel {
    pub input_name: String,
    pub shapes: ParameterShapes,
    pub output_len: usize,
    pub instructions: usize,
    pub scorer: Scorer,
    /// Shared with every clone so trimmed copies are counted too
    pub evals: Rc<Cell<usize>>,
}

impl MockModel {
    pub fn new(input_shape: &[usize], output_len: usize) -> Self {
        let mut shapes = ParameterShapes::new();
        shapes.insert("0".to_string(), Shape::from(input_shape));
        shapes.insert("conv1.weight".to_string(), Shape::new(vec![4, 2]));
        Self {
            input_name: "0".to_string(),
            shapes,
            output_len,
            instructions: 5,
            scorer: Rc::new(move |_| (0..output_len).map(|i| i as f32).collect()),
            evals: Rc::new(Cell::new(0)),
        }
    }

    pub fn with_scorer(mut self, scorer: impl Fn(&[f32]) -> Vec<f32> + 'static) -> Self {
        self.scorer = Rc::new(scorer);
        self
    }

    pub fn evals(&self) -> usize {
        self.evals.get()
    }
}

impl fmt::Display for MockModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.instructions {
            writeln!(f, "@{} = mock_op", i)?;
        }
        Ok(())
    }
}

impl CompiledModel for MockModel {
    fn parameter_shapes(&self) -> ParameterShapes {
        self.shapes.clone()
    }

    fn eval(&self, params: &ParameterMap) -> Result<Argument> {
        self.evals.set(self.evals.get() + 1);
        let input = params
            .get(&self.input_name)
            .ok_or_else(|| Error::Input("input not bound".to_string()))?;
        // device resident inputs are opaque to the mock
        let values = match input.data() {
            Ok(data) => (self.scorer)(data),
            Err(_) => (self.scorer)(&[]),
        };
        Argument::new(Shape::new(vec![values.len()]), values)
    }

    fn size(&self) -> usize {
        self.instructions
    }

    fn remove_instructions(&mut self, count: usize) -> Result<()> {
        self.instructions -= count;
        Ok(())
    }

    fn perf_report(&self, out: &mut dyn Write, iterations: usize, params: &ParameterMap) -> Result<()> {
        writeln!(out, "Summary: {} iterations, {} parameters", iterations, params.len())?;
        Ok(())
    }

    fn clone_model(&self) -> Box<dyn CompiledModel> {
        Box::new(self.clone())
    }
}

/// In-memory labelled samples
pub struct VecReader {
    samples: Vec<Sample>,
    position: usize,
}

impl VecReader {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples, position: 0 }
    }
}

impl SampleReader for VecReader {
    fn produce_sample(&mut self) -> Result<Option<Sample>> {
        let sample = self.samples.get(self.position).cloned();
        self.position += 1;
        Ok(sample)
    }

    fn rewind(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }
}

/// Streaming dataset recording how it was driven
#[derive(Debug, Default)]
pub struct ScriptedDataset {
    pub labels: Vec<usize>,
    /// Fail on this zero-based sample
    pub fail_at: Option<usize>,
    pub initialize_calls: usize,
    pub next_calls: usize,
    pub finalize_calls: usize,
}

impl ScriptedDataset {
    pub fn new(labels: Vec<usize>) -> Self {
        Self {
            labels,
            ..Self::default()
        }
    }
}

impl StreamingDataset for ScriptedDataset {
    fn initialize(&mut self, _dir: &Path) -> Result<usize> {
        self.initialize_calls += 1;
        Ok(self.labels.len())
    }

    fn next_sample(&mut self) -> Result<(Vec<f32>, usize)> {
        let index = self.next_calls;
        self.next_calls += 1;
        if self.fail_at == Some(index) {
            return Err(Error::Input(format!("corrupt sample {}", index)));
        }
        let label = self.labels[index];
        let mut pixels = vec![0.0; 28 * 28];
        pixels[label] = 1.0;
        Ok((pixels, label))
    }

    fn finalize(&mut self) {
        self.finalize_calls += 1;
    }
}

/// MNIST scorer: the digit is the index of the first lit pixel
pub fn first_lit_pixel(input: &[f32]) -> Vec<f32> {
    let digit = input.iter().take(10).position(|&p| p > 0.5).unwrap_or(0);
    let mut scores = vec![0.0; 10];
    scores[digit] = 1.0;
    scores
}

pub fn write_idx(dir: &Path, images: &[[u8; 784]], labels: &[u8]) {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&2051u32.to_be_bytes());
    bytes.extend_from_slice(&(images.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&28u32.to_be_bytes());
    bytes.extend_from_slice(&28u32.to_be_bytes());
    for image in images {
        bytes.extend_from_slice(image);
    }
    std::fs::write(dir.join("t10k-images-idx3-ubyte"), bytes).unwrap();

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&2049u32.to_be_bytes());
    bytes.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    bytes.extend_from_slice(labels);
    std::fs::write(dir.join("t10k-labels-idx1-ubyte"), bytes).unwrap();
}

pub fn output_text(out: Vec<u8>) -> String {
    String::from_utf8(out).unwrap()
}
