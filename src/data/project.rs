use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::loader::{raw_trace_from_records, records_from_raw_trace};
use super::model::{RawTrace, TraceMeta};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Project file
// ---------------------------------------------------------------------------

/// A saved trace: metadata plus its raw records, header first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub meta: TraceMeta,
    pub raw_trace: Vec<String>,
}

/// Project document:
///
/// ```json
/// {
///   "meta":  { ...free-form project details... },
///   "files": {
///     "span_a_1550.sor": { "meta": { "GenParams": {...}, "FxdParams": {...} },
///                          "raw_trace": ["distance\tlevel", "0.0\t-1.2", ...] }
///   }
/// }
/// ```
///
/// File order is significant (it is the trace load order) and is kept as
/// written.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Project {
    /// Free-form project details, carried through untouched.
    pub meta: JsonValue,
    pub files: Vec<(String, ProjectFile)>,
}

impl Project {
    pub fn from_json(text: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Document {
            #[serde(default)]
            meta: JsonValue,
            #[serde(default)]
            files: Map<String, JsonValue>,
        }

        let doc: Document = serde_json::from_str(text)?;
        let files = doc
            .files
            .into_iter()
            .map(|(name, value)| Ok((name, serde_json::from_value::<ProjectFile>(value)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Project {
            meta: doc.meta,
            files,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        let mut files = Map::new();
        for (name, file) in &self.files {
            files.insert(name.clone(), serde_json::to_value(file)?);
        }
        let mut doc = Map::new();
        doc.insert("meta".into(), self.meta.clone());
        doc.insert("files".into(), JsonValue::Object(files));
        Ok(serde_json::to_string_pretty(&JsonValue::Object(doc))?)
    }

    /// Rehydrate every file into a named [`RawTrace`], in file order.
    pub fn raw_traces(&self) -> Result<Vec<(String, RawTrace)>> {
        self.files
            .iter()
            .map(|(name, file)| {
                let trace = raw_trace_from_records(file.meta.clone(), &file.raw_trace)?;
                Ok((name.clone(), trace))
            })
            .collect()
    }

    /// Build a project from named traces, e.g. for saving.
    pub fn from_traces<'a, I>(meta: JsonValue, traces: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a RawTrace)>,
    {
        let files = traces
            .into_iter()
            .map(|(name, trace)| {
                let file = ProjectFile {
                    meta: trace.meta().clone(),
                    raw_trace: records_from_raw_trace(trace),
                };
                (name.to_string(), file)
            })
            .collect();
        Project { meta, files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
