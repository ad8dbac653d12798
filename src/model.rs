use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Write;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::Result;
use crate::tensor::{Argument, Shape};

/// Parameter name to shape mapping, ordered by name
pub type ParameterShapes = BTreeMap<String, Shape>;

/// Semantic category of an image input, derived from its shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum ImageCategory {
    /// 3x224x224 ImageNet input
    ImageNet224,
    /// 3x299x299 ImageNet input (Inception family)
    ImageNet299,
    /// 1x28x28 MNIST digit
    Mnist28,
    Unknown,
}

impl ImageCategory {
    /// Classify a shape. Ranks other than 3 and 4 are `Unknown`.
    pub fn classify(shape: &Shape) -> Self {
        match shape.image_dims() {
            Some((c, h, w)) => Self::from_dims(c, h, w),
            None => ImageCategory::Unknown,
        }
    }

    pub fn from_dims(channels: usize, height: usize, width: usize) -> Self {
        match (channels, height, width) {
            (3, 224, 224) => ImageCategory::ImageNet224,
            (3, 299, 299) => ImageCategory::ImageNet299,
            (1, 28, 28) => ImageCategory::Mnist28,
            _ => ImageCategory::Unknown,
        }
    }

    /// (channels, height, width) of the category
    pub fn dims(&self) -> Option<(usize, usize, usize)> {
        match self {
            ImageCategory::ImageNet224 => Some((3, 224, 224)),
            ImageCategory::ImageNet299 => Some((3, 299, 299)),
            ImageCategory::Mnist28 => Some((1, 28, 28)),
            ImageCategory::Unknown => None,
        }
    }

    /// Number of floats one decoded image occupies
    pub fn sample_len(&self) -> Option<usize> {
        self.dims().map(|(c, h, w)| c * h * w)
    }
}

/// Name to buffer binding passed to a model evaluation
///
/// Built once per run; only the bound input entry is replaced between
/// iterations.
#[derive(Debug, Clone, Default)]
pub struct ParameterMap {
    arguments: HashMap<String, Argument>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, argument: Argument) -> Option<Argument> {
        self.arguments.insert(name.into(), argument)
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.arguments.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Argument> {
        self.arguments.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.arguments.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.arguments.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Argument)> {
        self.arguments.iter()
    }
}

/// A compiled, device-targeted model ready for repeated evaluation.
///
/// Implemented by the model compiler's backends. The harness only ever reads
/// through this trait; trimming works on a clone obtained from
/// [`CompiledModel::clone_model`].
pub trait CompiledModel: fmt::Display {
    /// All parameters the model expects
    fn parameter_shapes(&self) -> ParameterShapes;

    /// Shape of a single parameter
    fn parameter_shape(&self, name: &str) -> Option<Shape> {
        self.parameter_shapes().get(name).cloned()
    }

    /// Evaluate once. Device backends may return a device resident result.
    fn eval(&self, params: &ParameterMap) -> Result<Argument>;

    /// Instruction count
    fn size(&self) -> usize;

    /// Drop the last `count` instructions
    fn remove_instructions(&mut self, count: usize) -> Result<()>;

    /// Instrumented per-instruction timing report over `iterations` runs
    fn perf_report(&self, out: &mut dyn Write, iterations: usize, params: &ParameterMap) -> Result<()>;

    fn clone_model(&self) -> Box<dyn CompiledModel>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_rank4() {
        assert_eq!(ImageCategory::classify(&Shape::new(vec![1, 3, 224, 224])), ImageCategory::ImageNet224);
        assert_eq!(ImageCategory::classify(&Shape::new(vec![8, 3, 299, 299])), ImageCategory::ImageNet299);
        assert_eq!(ImageCategory::classify(&Shape::new(vec![64, 1, 28, 28])), ImageCategory::Mnist28);
        assert_eq!(ImageCategory::classify(&Shape::new(vec![1, 3, 28, 28])), ImageCategory::Unknown);
        assert_eq!(ImageCategory::classify(&Shape::new(vec![1, 224, 224, 3])), ImageCategory::Unknown);
    }

    #[test]
    fn test_classify_rank3() {
        assert_eq!(ImageCategory::classify(&Shape::new(vec![3, 224, 224])), ImageCategory::ImageNet224);
        assert_eq!(ImageCategory::classify(&Shape::new(vec![1, 28, 28])), ImageCategory::Mnist28);
        assert_eq!(ImageCategory::classify(&Shape::new(vec![3, 299, 300])), ImageCategory::Unknown);
    }

    #[test]
    fn test_classify_other_ranks_are_unknown() {
        assert_eq!(ImageCategory::classify(&Shape::new(vec![])), ImageCategory::Unknown);
        assert_eq!(ImageCategory::classify(&Shape::new(vec![784])), ImageCategory::Unknown);
        assert_eq!(ImageCategory::classify(&Shape::new(vec![1, 784])), ImageCategory::Unknown);
        assert_eq!(ImageCategory::classify(&Shape::new(vec![1, 1, 3, 224, 224])), ImageCategory::Unknown);
    }

    #[test]
    fn test_category_names() {
        assert_eq!(ImageCategory::Mnist28.to_string(), "mnist28");
        assert_eq!("imagenet224".parse::<ImageCategory>().unwrap(), ImageCategory::ImageNet224);
        assert_eq!(ImageCategory::ImageNet299.sample_len(), Some(3 * 299 * 299));
        assert_eq!(ImageCategory::Unknown.sample_len(), None);
    }

    #[test]
    fn test_parameter_map_replaces_entry() {
        let mut params = ParameterMap::new();
        let shape = Shape::new(vec![2]);
        assert!(params.insert("0", Argument::zeros(&shape)).is_none());
        let old = params.insert("0", Argument::new(shape, vec![1.0, 2.0]).unwrap());
        assert!(old.is_some());
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("0").unwrap().data().unwrap(), &[1.0, 2.0]);
    }
}
