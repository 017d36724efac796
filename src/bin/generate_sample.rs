use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser)]
#[command(name = "generate-sample")]
#[command(about = "Write a small synthetic timeseries, one delimited text file per timestep")]
struct Args {
    /// Output directory
    #[arg(short, long, default_value = "sample_timeseries")]
    output: PathBuf,

    /// Number of timestep files
    #[arg(short, long, default_value_t = 5)]
    timesteps: usize,

    /// Points per file
    #[arg(short, long, default_value_t = 200)]
    points: usize,
}

/// Site coordinates and measurement noise from a seeded splitmix64 stream,
/// so every run writes the same survey.
struct SurveyRng(u64);

impl SurveyRng {
    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z >> 11) as f64 / (1u64 << 53) as f64
    }

    /// A site in the 100 x 100 survey area, up to 30 below the surface.
    fn site(&mut self) -> (f64, f64, f64) {
        (self.unit() * 100.0, self.unit() * 100.0, -self.unit() * 30.0)
    }
}

/// Temperature plume drifting east over time.
fn temperature(x: f64, y: f64, t: usize) -> f64 {
    let cx = 20.0 + 10.0 * t as f64;
    let r2 = (x - cx).powi(2) + (y - 50.0).powi(2);
    15.0 + 40.0 * (-r2 / 400.0).exp()
}

/// One timestep file: a comment, the title line, one row per site.
fn survey_text(sites: &[(f64, f64, f64)], t: usize, rng: &mut SurveyRng) -> Result<String> {
    let mut text = String::new();
    writeln!(text, "! synthetic survey, timestep {t}")?;
    writeln!(text, "x y z temperature")?;
    for &(x, y, z) in sites {
        let noise = (rng.unit() - 0.5) * 0.2;
        writeln!(text, "{x:.3} {y:.3} {z:.3} {:.3}", temperature(x, y, t) + noise)?;
    }
    Ok(text)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let mut rng = SurveyRng(42);
    let sites: Vec<(f64, f64, f64)> = (0..args.points).map(|_| rng.site()).collect();

    for t in 0..args.timesteps {
        let text = survey_text(&sites, t, &mut rng)?;
        let path = args.output.join(format!("survey_t{t:03}.txt"));
        std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
        log::info!("wrote {}", path.display());
    }

    println!(
        "Wrote {} timesteps ({} points each) to {}",
        args.timesteps,
        args.points,
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use timestep_reader::{ColumnValues, DelimitedTextReader};

    #[test]
    fn same_seed_same_sites() {
        let mut a = SurveyRng(7);
        let mut b = SurveyRng(7);
        for _ in 0..100 {
            let (x, y, z) = a.site();
            assert_eq!((x, y, z), b.site());
            assert!((0.0..100.0).contains(&x) && (0.0..100.0).contains(&y));
            assert!((-30.0..=0.0).contains(&z));
        }
    }

    #[test]
    fn plume_moves_east() {
        assert!(temperature(20.0, 50.0, 0) > temperature(30.0, 50.0, 0));
        assert!(temperature(30.0, 50.0, 1) > temperature(20.0, 50.0, 1));
        assert!((temperature(40.0, 50.0, 2) - 55.0).abs() < 1e-9);
    }

    #[test]
    fn written_files_read_back() {
        let tmp = tempfile::tempdir().unwrap();
        let mut rng = SurveyRng(42);
        let sites: Vec<_> = (0..3).map(|_| rng.site()).collect();
        let files: Vec<_> = (0..2)
            .map(|t| {
                let path = tmp.path().join(format!("survey_t{t:03}.txt"));
                std::fs::write(&path, survey_text(&sites, t, &mut rng).unwrap()).unwrap();
                path
            })
            .collect();

        let mut reader = DelimitedTextReader::new(&files);
        reader.set_split_on_whitespace(true);
        let frame = reader.get_frame(1).unwrap();
        assert_eq!(frame.column_names(), vec!["x", "y", "z", "temperature"]);
        assert_eq!(frame.num_rows(), 3);
        assert!(matches!(frame.column("temperature"), Some(ColumnValues::Numeric(_))));
    }
}
