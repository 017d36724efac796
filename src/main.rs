use std::path::PathBuf;

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::{Parser, ValueEnum};
use timestep_reader::{DelimitedTextReader, HeaderExtractor, PointsReader, ReadConfig};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Layout {
    /// Titles on the first line, split like the data
    Generic,
    /// Comma separated titles over delimited data
    Xyz,
    /// GSLIB / GeoEAS header block
    Gslib,
    /// UBC topography (always shown as points)
    Topo,
    /// UBC gravity observations (always shown as points)
    GravObs,
    /// UBC gravity gradiometry (always shown as points)
    GravGrad,
    /// UBC magnetic observations (always shown as points)
    MagObs,
}

#[derive(Parser)]
#[command(name = "timestep-reader")]
#[command(about = "Inspect a series of delimited text files, one file per timestep")]
struct Args {
    /// Files in timestep order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// JSON file with read parameters; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Header layout of every file
    #[arg(long, value_enum, default_value = "generic")]
    layout: Layout,

    #[arg(short, long)]
    delimiter: Option<char>,

    /// Split fields on runs of whitespace
    #[arg(short, long)]
    whitespace: bool,

    #[arg(long)]
    skip_rows: Option<usize>,

    #[arg(long)]
    comment: Option<char>,

    /// Files have no title line; use Field 0, Field 1, ...
    #[arg(long)]
    no_titles: bool,

    /// Timestep to show
    #[arg(short, long, default_value_t = 0)]
    timestep: usize,

    /// Show point coordinates instead of the table
    #[arg(long)]
    points: bool,

    /// With --points, also carry Z as an Elevation attribute
    #[arg(long)]
    copy_z: bool,
}

impl Args {
    fn read_config(&self, base: &ReadConfig) -> Result<ReadConfig> {
        let mut cfg = match &self.config {
            Some(path) => ReadConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => base.clone(),
        };
        if let Some(d) = self.delimiter {
            cfg.delimiter = d;
        }
        if self.whitespace {
            cfg.split_on_whitespace = true;
        }
        if let Some(skip) = self.skip_rows {
            cfg.skip_rows = skip;
        }
        if let Some(c) = self.comment {
            cfg.comment = c;
        }
        if self.no_titles {
            cfg.has_titles = false;
        }
        Ok(cfg)
    }
}

fn show_table<H: HeaderExtractor>(mut reader: DelimitedTextReader<H>, args: &Args) -> Result<()> {
    let cfg = args.read_config(reader.config())?;
    reader.set_config(cfg);

    let count = reader.file_names().len();
    let frame = reader
        .get_frame(args.timestep)
        .with_context(|| format!("reading timestep {}", args.timestep))?;
    println!("timestep {} of {count}: {frame}", args.timestep);
    let batches: Vec<RecordBatch> = vec![frame.to_record_batch()?];
    println!("{}", pretty_format_batches(&batches)?);
    Ok(())
}

fn show_points<H: HeaderExtractor>(mut reader: PointsReader<H>, args: &Args) -> Result<()> {
    let cfg = args.read_config(reader.reader().config())?;
    reader.reader_mut().set_config(cfg);
    if args.copy_z {
        reader.set_copy_z(true);
    }

    let points = reader
        .get_points(args.timestep)
        .with_context(|| format!("reading points for timestep {}", args.timestep))?;
    println!(
        "{} points from columns {:?}",
        points.len(),
        points.coordinate_columns
    );
    for p in points.points.iter().take(20) {
        println!("{:>14.4} {:>14.4} {:>14.4}", p[0], p[1], p[2]);
    }
    for attr in &points.attributes {
        println!("attribute {}", attr.name);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match (args.layout, args.points) {
        (Layout::Generic, false) => show_table(DelimitedTextReader::new(args.files.clone()), &args),
        (Layout::Xyz, false) => show_table(DelimitedTextReader::xyz_text(args.files.clone()), &args),
        (Layout::Gslib, false) => {
            let mut reader = DelimitedTextReader::gslib(args.files.clone());
            let cfg = args.read_config(reader.config())?;
            reader.set_config(cfg);
            reader.get_frame(args.timestep)?;
            if let Some(header) = reader.file_header() {
                println!("GSLIB title: {header}");
            }
            show_table(reader, &args)
        }
        (Layout::Generic, true) => show_points(PointsReader::new(args.files.clone()), &args),
        (Layout::Xyz, true) => show_points(PointsReader::xyz_text(args.files.clone()), &args),
        (Layout::Gslib, true) => show_points(
            PointsReader::with_extractor(args.files.clone(), timestep_reader::GsLibHeader::default()),
            &args,
        ),
        (Layout::Topo, _) => show_points(PointsReader::topo(args.files.clone()), &args),
        (Layout::GravObs, _) => show_points(PointsReader::grav_obs(args.files.clone()), &args),
        (Layout::GravGrad, _) => show_points(PointsReader::grav_grad(args.files.clone()), &args),
        (Layout::MagObs, _) => show_points(PointsReader::mag_obs(args.files.clone()), &args),
    }
}
