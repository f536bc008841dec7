use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;

use open_otdr::color::{to_hex, Legend};
use open_otdr::data::loader::{load_project, load_trace_dump, save_project};
use open_otdr::{Analysis, Orchestrator, PipelineConfig, TraceMeta, TriggerOutcome};

/// Detect splices, connectors and breaks in OTDR traces.
#[derive(Parser, Debug)]
#[command(name = "open-otdr", version)]
struct Args {
    /// Project file (.opro / .json)
    project: Option<PathBuf>,

    /// Extra trace dump to add: PATH,WAVELENGTH,SAMPLE_SPACING,RESOLUTION
    /// e.g. `span.tsv,1550nm,0.01 km,1.0`
    #[arg(long = "trace", value_parser = parse_trace_arg)]
    traces: Vec<TraceArg>,

    /// Pipeline configuration (JSON); missing keys use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the event table here instead of stdout
    #[arg(long)]
    events: Option<PathBuf>,

    /// Write the normalized traces (decimated) as CSV
    #[arg(long)]
    series: Option<PathBuf>,

    /// Keep every Nth sample in --series output
    #[arg(long, default_value_t = 10)]
    decimate: usize,

    /// Save the loaded traces as a project file
    #[arg(long)]
    save: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct TraceArg {
    path: PathBuf,
    meta: TraceMeta,
}

fn parse_trace_arg(s: &str) -> Result<TraceArg, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [path, wavelength, spacing, resolution] = parts[..] else {
        return Err("expected PATH,WAVELENGTH,SAMPLE_SPACING,RESOLUTION".into());
    };
    let resolution = resolution
        .parse::<f64>()
        .map_err(|_| format!("resolution '{resolution}' is not a number"))?;
    Ok(TraceArg {
        path: PathBuf::from(path),
        meta: TraceMeta::new(wavelength, spacing, resolution),
    })
}

#[derive(Serialize)]
struct SeriesPoint<'a> {
    name: &'a str,
    wavelength: &'a str,
    color: String,
    distance: f64,
    level: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.project.is_none() && args.traces.is_empty() {
        bail!("nothing to analyse: pass a project file and/or --trace");
    }

    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).context("reading config file")?;
            PipelineConfig::from_json(&text).context("parsing config file")?
        }
        None => PipelineConfig::default(),
    };
    let orchestrator = Orchestrator::new(config);

    if let Some(path) = &args.project {
        let project = load_project(path)?;
        expect_published(orchestrator.load_project(&project)?)?;
    }
    if !args.traces.is_empty() {
        let traces = args
            .traces
            .iter()
            .map(|t| {
                let trace = load_trace_dump(&t.path, t.meta.clone())?;
                Ok((t.path.display().to_string(), trace))
            })
            .collect::<Result<Vec<_>>>()?;
        expect_published(orchestrator.add_traces(traces)?)?;
    }

    let analysis = orchestrator.published();
    for w in &analysis.warnings {
        eprintln!("warning: {}: {}", w.name, w.message);
    }
    let legend = Legend::new(analysis.series.iter().map(|s| s.trace.wavelength()));
    for (wavelength, hex) in legend.legend_entries() {
        log::info!("trace colour {wavelength}: {hex}");
    }

    match &args.events {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            write_events(&analysis, file)?;
        }
        None => write_events(&analysis, io::stdout().lock())?,
    }
    if let Some(path) = &args.series {
        write_series(&analysis, args.decimate, path)?;
    }
    if let Some(path) = &args.save {
        save_project(path, &orchestrator.to_project())?;
    }
    Ok(())
}

fn expect_published(outcome: TriggerOutcome) -> Result<()> {
    if outcome.is_dropped() {
        bail!("pipeline busy, trigger dropped");
    }
    Ok(())
}

fn write_events<W: Write>(analysis: &Analysis, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in analysis.rows() {
        writer.serialize(row).context("writing event row")?;
    }
    writer.flush()?;
    Ok(())
}

fn write_series(analysis: &Analysis, step: usize, path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for s in &analysis.series {
        let color = to_hex(s.color);
        for (distance, level) in s.trace.decimated(step) {
            writer.serialize(SeriesPoint {
                name: &s.name,
                wavelength: s.trace.wavelength(),
                color: color.clone(),
                distance,
                level,
            })?;
        }
    }
    writer.flush()?;
    log::info!("wrote {} series to {}", analysis.series.len(), path.display());
    Ok(())
}
