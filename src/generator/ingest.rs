// src/generator/ingest.rs

//! Reading job records from YAML and JSON files.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::generator::{Generator, Substitutions};

impl Generator {
    /// Add every document of a YAML stream. A document holding a list
    /// contributes each of its entries; empty documents are skipped.
    ///
    /// A missing file is logged and ingests nothing. Returns the number of
    /// records added.
    pub fn ingest_yaml(&mut self, path: impl AsRef<Path>, strings: Option<&Substitutions>) -> Result<usize> {
        let path = path.as_ref();
        let Some(content) = self.read_spec_file(path)? else {
            return Ok(0);
        };

        let mut records = Vec::new();
        for document in serde_yaml::Deserializer::from_str(&content) {
            match Value::deserialize(document)? {
                Value::Null => {}
                Value::Array(items) => records.extend(items),
                other => records.push(other),
            }
        }

        self.ingest_records(path, records, strings)
    }

    /// Add the records of a JSON file holding a list of records or a single
    /// record. A missing file is logged and ingests nothing.
    pub fn ingest_json(&mut self, path: impl AsRef<Path>, strings: Option<&Substitutions>) -> Result<usize> {
        let path = path.as_ref();
        let Some(content) = self.read_spec_file(path)? else {
            return Ok(0);
        };

        let records = match serde_json::from_str::<Value>(&content)? {
            Value::Array(items) => items,
            other => vec![other],
        };

        self.ingest_records(path, records, strings)
    }

    fn read_spec_file(&self, path: &Path) -> Result<Option<String>> {
        let fs = self.filesystem();
        if !fs.exists(path) {
            warn!(path = ?path, "spec file does not exist; nothing ingested");
            return Ok(None);
        }
        debug!(path = ?path, "reading spec file");
        Ok(Some(fs.read_to_string(path)?))
    }

    fn ingest_records(
        &mut self,
        path: &Path,
        records: Vec<Value>,
        strings: Option<&Substitutions>,
    ) -> Result<usize> {
        let count = records.len();
        for record in records {
            self.add_spec(record, strings)?;
        }
        info!(path = ?path, jobs = count, "ingested job specs");
        Ok(count)
    }
}
