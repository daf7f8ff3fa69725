use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use gazekit::data::model::ColumnType;
use gazekit::definition::{CategoryConfig, DatasetDefinition, Experiment};

const SAMPLING_RATE: f64 = 500.0;
const SAMPLES_PER_TRIAL: usize = 1000;

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

/// Fixations at random screen locations joined by instantaneous saccades,
/// with Gaussian jitter on every sample.
fn generate_trial(rng: &mut SimpleRng, experiment: &Experiment) -> Vec<(i64, f64, f64)> {
    let width = f64::from(experiment.screen_width_px);
    let height = f64::from(experiment.screen_height_px);
    let step_ms = 1000.0 / SAMPLING_RATE;

    let mut samples = Vec::with_capacity(SAMPLES_PER_TRIAL);
    let mut target = (width / 2.0, height / 2.0);
    let mut remaining = 0usize;
    for i in 0..SAMPLES_PER_TRIAL {
        if remaining == 0 {
            target = (rng.next_f64() * width, rng.next_f64() * height);
            // 100 - 400 ms fixations
            remaining = 50 + (rng.next_f64() * 150.0) as usize;
        }
        remaining -= 1;
        let time = (i as f64 * step_ms) as i64;
        samples.push((time, rng.gauss(target.0, 2.0), rng.gauss(target.1, 2.0)));
    }
    samples
}

fn main() -> Result<()> {
    env_logger::init();
    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_dataset"));

    let experiment = Experiment {
        screen_width_px: 1280,
        screen_height_px: 1024,
        screen_width_cm: 38.0,
        screen_height_cm: 30.2,
        distance_cm: Some(68.0),
        origin: "upper left".to_string(),
        sampling_rate: SAMPLING_RATE,
    };

    let mut gaze = CategoryConfig {
        filename_format: Some("{subject_id:d}/{session}_{trial:d}.csv".to_string()),
        ..CategoryConfig::default()
    };
    gaze.schema_overrides.insert("subject_id".into(), ColumnType::Int64);
    gaze.schema_overrides.insert("trial".into(), ColumnType::Int64);

    let definition = DatasetDefinition {
        name: "sample".to_string(),
        gaze,
        time_column: Some("timestamp".to_string()),
        pixel_columns: Some(vec!["x_pix".to_string(), "y_pix".to_string()]),
        experiment: Some(experiment.clone()),
        ..DatasetDefinition::default()
    };

    let mut rng = SimpleRng::new(42);
    let subjects = [1, 2, 3];
    let sessions = ["morning", "evening"];
    let trials = [1, 2];

    let mut n_files = 0;
    for subject in subjects {
        let dir = root.join("raw").join(subject.to_string());
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

        for session in sessions {
            for trial in trials {
                let path = dir.join(format!("{session}_{trial}.csv"));
                let mut writer = csv::Writer::from_path(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                writer.write_record(["timestamp", "x_pix", "y_pix"])?;
                for (time, x, y) in generate_trial(&mut rng, &experiment) {
                    writer.write_record(&[time.to_string(), format!("{x:.2}"), format!("{y:.2}")])?;
                }
                writer.flush()?;
                n_files += 1;
            }
        }
    }

    let definition_path = root.join("definition.json");
    fs::write(&definition_path, serde_json::to_string_pretty(&definition)?)
        .with_context(|| format!("writing {}", definition_path.display()))?;

    println!(
        "Wrote {n_files} gaze files ({SAMPLES_PER_TRIAL} samples each) and {} to {}",
        definition_path.display(),
        root.display()
    );
    Ok(())
}
