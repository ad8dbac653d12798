use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};

/// Name printed for indices outside the table
pub const UNKNOWN_LABEL: &str = "<unknown>";

/// Largest class index accepted from a label file
pub const MAX_LABEL_INDEX: usize = 1 << 20;

/// Ordered class names, index to human readable label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    names: Vec<String>,
}

impl LabelTable {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// One class name per line, blank lines included so indices stay aligned
    pub fn from_lines(text: &str) -> Self {
        Self::new(text.lines().map(|line| line.trim().to_string()).collect())
    }

    /// JSON object mapping decimal indices to names, e.g. `{"0": "tench"}`
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: BTreeMap<String, String> = serde_json::from_str(text)?;
        let mut indexed = BTreeMap::new();
        for (key, name) in raw {
            let index = key
                .trim()
                .parse::<usize>()
                .map_err(|_| Error::Input(format!("label key {:?} is not an index", key)))?;
            if index > MAX_LABEL_INDEX {
                return Err(Error::Input(format!(
                    "label index {} exceeds the limit of {}",
                    index, MAX_LABEL_INDEX
                )));
            }
            indexed.insert(index, name);
        }

        let len = match indexed.keys().next_back() {
            Some(last) => last
                .checked_add(1)
                .ok_or_else(|| Error::Input(format!("label index {} is out of range", last)))?,
            None => 0,
        };
        let mut names = vec![String::new(); len];
        for (index, name) in indexed {
            names[index] = name;
        }
        Ok(Self::new(names))
    }

    /// Load from a `.json` file or a plain text file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let table = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(&text)?,
            _ => Self::from_lines(&text),
        };
        debug!("loaded {} labels from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Class name for `index`, or `<unknown>`
    pub fn name(&self, index: usize) -> &str {
        match self.names.get(index) {
            Some(name) if !name.is_empty() => name,
            _ => UNKNOWN_LABEL,
        }
    }
}
