use std::path::Path;

use anyhow::{Context, Result, bail};

use super::model::{RawTrace, TraceMeta};
use super::project::Project;
use crate::error::OtdrError;

/// Header written in front of serialized records. The first record of every
/// record list is skipped on parse, whatever it contains.
pub const RECORD_HEADER: &str = "distance\tlevel";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a project file. Dispatch by extension.
///
/// Supported formats:
/// * `.opro` / `.json` – project document (see [`Project`])
pub fn load_project(path: &Path) -> Result<Project> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "opro" | "json" => {
            let text = std::fs::read_to_string(path).context("reading project file")?;
            Project::from_json(&text)
                .with_context(|| format!("parsing project {}", path.display()))
        }
        other => bail!("Unsupported project extension: .{other}"),
    }
}

/// Write a project file, appending `.opro` when the path has no extension.
pub fn save_project(path: &Path, project: &Project) -> Result<()> {
    let path = if path.extension().is_none() {
        path.with_extension("opro")
    } else {
        path.to_path_buf()
    };
    let text = project.to_json().context("serializing project")?;
    std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    log::info!("saved project with {} traces to {}", project.len(), path.display());
    Ok(())
}

/// Load a tab-separated trace dump (header line, then `distance<TAB>level`
/// lines) with metadata supplied by the caller.
pub fn load_trace_dump(path: &Path, mut meta: TraceMeta) -> Result<RawTrace> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading trace dump {}", path.display()))?;
    let records: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    meta.url.get_or_insert_with(|| path.display().to_string());
    let trace = raw_trace_from_records(meta, &records)
        .with_context(|| format!("parsing trace dump {}", path.display()))?;
    log::debug!("loaded {} samples from {}", trace.len(), path.display());
    Ok(trace)
}

// ---------------------------------------------------------------------------
// Record parsing
// ---------------------------------------------------------------------------

/// Parse `distance<TAB>level` records into a [`RawTrace`].
///
/// The first record is a header and is discarded. Line numbers in errors are
/// 1-based positions in `records`, header included.
pub fn raw_trace_from_records<S: AsRef<str>>(
    meta: TraceMeta,
    records: &[S],
) -> Result<RawTrace, OtdrError> {
    let mut distances = Vec::with_capacity(records.len().saturating_sub(1));
    let mut levels = Vec::with_capacity(records.len().saturating_sub(1));

    for (i, rec) in records.iter().enumerate().skip(1) {
        let (d, l) = parse_record(rec.as_ref(), i + 1)?;
        distances.push(d);
        levels.push(l);
    }
    RawTrace::new(meta, distances, levels)
}

fn parse_record(record: &str, line: usize) -> Result<(f64, f64), OtdrError> {
    let malformed = |reason: String| OtdrError::MalformedRecord {
        line,
        record: record.to_string(),
        reason,
    };
    let clean = record.trim_end_matches(['\n', '\r']);
    let mut fields = clean.split('\t');
    let (Some(d), Some(l), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(malformed("expected two tab-separated fields".into()));
    };
    let parse = |tok: &str, what: &str| {
        tok.trim()
            .parse::<f64>()
            .map_err(|_| malformed(format!("{what} '{tok}' is not a number")))
    };
    Ok((parse(d, "distance")?, parse(l, "level")?))
}

/// Serialize a trace back into records, header first.
pub fn records_from_raw_trace(trace: &RawTrace) -> Vec<String> {
    std::iter::once(RECORD_HEADER.to_string())
        .chain(
            trace
                .distances()
                .iter()
                .zip(trace.levels())
                .map(|(d, l)| format!("{d}\t{l}")),
        )
        .collect()
}

/// Numeric part of a quantity carrying a unit suffix: `"0.01 km"` → 0.01,
/// `"1550nm"` → 1550.
pub fn parse_quantity(s: &str) -> Option<f64> {
    let s = s.trim();
    let end = s
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
        .unwrap_or(s.len());
    // A trailing 'e' may belong to the unit ("5 e" is not an exponent).
    (1..=end)
        .rev()
        .find_map(|n| s[..n].parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> TraceMeta {
        TraceMeta::new("1550nm", "0.01 km", 1.0)
    }

    #[test]
    fn test_parse_quantity_strips_units() {
        assert_eq!(parse_quantity("0.01 km"), Some(0.01));
        assert_eq!(parse_quantity("1550nm"), Some(1550.0));
        assert_eq!(parse_quantity(" 2.5e-3 ns"), Some(2.5e-3));
        assert_eq!(parse_quantity("5 events"), Some(5.0));
        assert_eq!(parse_quantity("km"), None);
        assert_eq!(parse_quantity(""), None);
    }

    #[test]
    fn test_records_skip_header() {
        let records = ["distance\tlevel", "0.0\t-1.5\n", "0.01\t-1.6\r\n"];
        let trace = raw_trace_from_records(meta(), &records).unwrap();
        assert_eq!(trace.distances(), &[0.0, 0.01]);
        assert_eq!(trace.levels(), &[-1.5, -1.6]);
        assert!((trace.sample_spacing() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_malformed_record_reports_line() {
        let records = ["header", "0.0\t-1.5", "0.01 -1.6"];
        let err = raw_trace_from_records(meta(), &records).unwrap_err();
        match err {
            OtdrError::MalformedRecord { line, record, .. } => {
                assert_eq!(line, 3);
                assert_eq!(record, "0.01 -1.6");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_numeric_field_is_malformed() {
        let records = ["header", "0.0\tabc"];
        assert!(matches!(
            raw_trace_from_records(meta(), &records),
            Err(OtdrError::MalformedRecord { line: 2, .. })
        ));
    }

    #[test]
    fn test_records_round_trip_through_text() {
        let trace = RawTrace::new(meta(), vec![0.0, 0.5, 1.0], vec![-0.25, -1.0, -3.125]).unwrap();
        let records = records_from_raw_trace(&trace);
        assert_eq!(records[0], RECORD_HEADER);
        assert_eq!(records[2], "0.5\t-1");
        let back = raw_trace_from_records(meta(), &records).unwrap();
        assert_eq!(back, trace);
    }
}
