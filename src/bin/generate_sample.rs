use std::path::Path;

use anyhow::Result;
use serde_json::json;

use open_otdr::data::loader::save_project;
use open_otdr::data::project::Project;
use open_otdr::{RawTrace, TraceMeta};

/// Level drop (dB) at a distance (km).
struct Step {
    at_km: f64,
    loss_db: f64,
}

/// One synthetic acquisition.
struct Acquisition {
    file: &'static str,
    wavelength: &'static str,
    /// km per raw sample
    spacing_km: f64,
    resolution: f64,
    attenuation_db_per_km: f64,
    steps: Vec<Step>,
}

const FIBRE_KM: f64 = 20.0;
const BREAK_KM: f64 = 14.0;
const NOISE_FLOOR_DB: f64 = -32.0;

fn generate_trace(acq: &Acquisition, noise_level: f64, rng: &mut SimpleRng) -> (Vec<f64>, Vec<f64>) {
    let n = (FIBRE_KM / acq.spacing_km).round() as usize;
    let distances: Vec<f64> = (0..n).map(|i| i as f64 * acq.spacing_km).collect();
    let levels = distances
        .iter()
        .map(|&km| {
            if km >= BREAK_KM {
                return NOISE_FLOOR_DB + rng.gauss(0.0, noise_level * 10.0);
            }
            let steps: f64 = acq
                .steps
                .iter()
                .filter(|s| km >= s.at_km)
                .map(|s| s.loss_db)
                .sum();
            -acq.attenuation_db_per_km * km - steps + rng.gauss(0.0, noise_level)
        })
        .collect();
    (distances, levels)
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    // Connector at 2 km, splice at 7.5 km (bend-sensitive at 1625 nm), break at 14 km.
    let acquisitions = [
        Acquisition {
            file: "span_1310.sor",
            wavelength: "1310nm",
            spacing_km: 0.001,
            resolution: 1.0,
            attenuation_db_per_km: 0.35,
            steps: vec![
                Step { at_km: 2.0, loss_db: 0.6 },
                Step { at_km: 7.5, loss_db: 0.4 },
            ],
        },
        Acquisition {
            file: "span_1550.sor",
            wavelength: "1550nm",
            spacing_km: 0.001,
            resolution: 1.0,
            attenuation_db_per_km: 0.2,
            steps: vec![
                Step { at_km: 2.0, loss_db: 0.6 },
                Step { at_km: 7.5, loss_db: 0.5 },
            ],
        },
        Acquisition {
            file: "span_1625.sor",
            wavelength: "1625nm",
            spacing_km: 0.002,
            resolution: 2.0,
            attenuation_db_per_km: 0.23,
            steps: vec![
                Step { at_km: 2.0, loss_db: 0.6 },
                Step { at_km: 7.5, loss_db: 1.2 },
            ],
        },
    ];

    let mut traces = Vec::with_capacity(acquisitions.len());
    for acq in &acquisitions {
        let (distances, levels) = generate_trace(acq, 0.01, &mut rng);
        let meta = TraceMeta::new(acq.wavelength, &format!("{} km", acq.spacing_km), acq.resolution);
        traces.push((acq.file, RawTrace::new(meta, distances, levels)?));
    }

    let project = Project::from_traces(
        json!({ "name": "Synthetic span", "fibre_km": FIBRE_KM }),
        traces.iter().map(|(name, trace)| (*name, trace)),
    );

    let output_path = Path::new("sample_project.opro");
    save_project(output_path, &project)?;

    println!(
        "Wrote {} traces ({} km of fibre) to {}",
        project.len(),
        FIBRE_KM,
        output_path.display()
    );
    Ok(())
}
