use std::fmt;

use ndarray::{ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Shape of a model parameter or result
///
/// Rank 4 shapes read as (batch, channels, height, width), rank 3 as
/// (channels, height, width).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Shape {
    lens: Vec<usize>,
}

impl Shape {
    pub fn new(lens: Vec<usize>) -> Self {
        Self { lens }
    }

    pub fn lens(&self) -> &[usize] {
        &self.lens
    }

    pub fn rank(&self) -> usize {
        self.lens.len()
    }

    /// Total number of elements
    pub fn elements(&self) -> usize {
        self.lens.iter().product()
    }

    /// Leading batch dimension for rank 4 shapes, 1 otherwise
    pub fn batch_size(&self) -> usize {
        match self.lens.as_slice() {
            [batch, _, _, _] => *batch,
            _ => 1,
        }
    }

    /// (channels, height, width) when the shape has an image interpretation
    pub fn image_dims(&self) -> Option<(usize, usize, usize)> {
        match self.lens.as_slice() {
            [_, c, h, w] | [c, h, w] => Some((*c, *h, *w)),
            _ => None,
        }
    }
}

impl From<Vec<usize>> for Shape {
    fn from(lens: Vec<usize>) -> Self {
        Self::new(lens)
    }
}

impl From<&[usize]> for Shape {
    fn from(lens: &[usize]) -> Self {
        Self::new(lens.to_vec())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, len) in self.lens.iter().enumerate() {
            if i != 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", len)?;
        }
        write!(f, "]")
    }
}

/// Memory space an argument lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Residency {
    Host,
    Device,
}

/// A buffer handed to or returned from a compiled model
#[derive(Clone)]
pub struct Argument {
    shape: Shape,
    data: ArrayD<f32>,
    residency: Residency,
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Argument {{ shape: {}, residency: {:?} }}", self.shape, self.residency)
    }
}

impl Argument {
    /// Wrap host data; `data` must hold exactly `shape.elements()` values
    pub fn new(shape: Shape, data: Vec<f32>) -> Result<Self> {
        if data.len() != shape.elements() {
            return Err(Error::Input(format!(
                "shape {} requires {} elements, got {}",
                shape,
                shape.elements(),
                data.len()
            )));
        }
        let data = ArrayD::from_shape_vec(IxDyn(shape.lens()), data)
            .map_err(|e| Error::Input(format!("invalid shape {}: {}", shape, e)))?;
        Ok(Self {
            shape,
            data,
            residency: Residency::Host,
        })
    }

    /// Zero-filled host argument
    pub fn zeros(shape: &Shape) -> Self {
        Self {
            shape: shape.clone(),
            data: ArrayD::zeros(IxDyn(shape.lens())),
            residency: Residency::Host,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn residency(&self) -> Residency {
        self.residency
    }

    pub fn is_device(&self) -> bool {
        self.residency == Residency::Device
    }

    /// Host view of the values
    pub fn data(&self) -> Result<&[f32]> {
        if self.is_device() {
            return Err(Error::DeviceResident(self.shape.to_string()));
        }
        self.data
            .as_slice()
            .ok_or_else(|| Error::Input("argument data is not contiguous".to_string()))
    }

    /// The underlying array, for host arguments only
    pub fn array(&self) -> Result<&ArrayD<f32>> {
        if self.is_device() {
            return Err(Error::DeviceResident(self.shape.to_string()));
        }
        Ok(&self.data)
    }

    /// Retag the memory space. Only device adapters move arguments between spaces.
    pub(crate) fn with_residency(mut self, residency: Residency) -> Self {
        self.residency = residency;
        self
    }

    /// Raw access regardless of residency, for adapters performing a transfer
    pub(crate) fn raw(&self) -> &ArrayD<f32> {
        &self.data
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_device() {
            return write!(f, "<device argument {}>", self.shape);
        }
        for (i, value) in self.data.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

/// Stable 64-bit FNV-1a hash, identical across runs and platforms
pub fn stable_hash(name: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    name.bytes()
        .fold(OFFSET, |hash, byte| (hash ^ byte as u64).wrapping_mul(PRIME))
}

/// Deterministic pseudo-random host argument
pub fn generate_argument(shape: &Shape, seed: u64) -> Argument {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f32> = (0..shape.elements())
        .map(|_| rng.gen_range(-1.0f32..1.0))
        .collect();
    Argument {
        shape: shape.clone(),
        data: ArrayD::from_shape_vec(IxDyn(shape.lens()), data)
            .unwrap_or_else(|_| ArrayD::zeros(IxDyn(shape.lens()))),
        residency: Residency::Host,
    }
}
