use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use particle_kd::io::HeaderFormat;
use particle_kd::synthetic::PointSource;
use particle_kd::{
    AxisPolicy, BuildOptions, ParticleSet, PkdBuilder, PkdError, PkdWriter, Result, WriteOptions,
};

/// partikd - build an implicit k-d tree over a particle set and write it out
#[derive(Parser, Debug)]
#[command(name = "partikd", version, about)]
struct Cli {
    /// Point sources to load, e.g. `1000000.random` or `100.regular`
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Header file to write; the payload goes to the same path with "bin" appended
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Render radius of the particles
    #[arg(long)]
    radius: Option<f32>,

    /// Write positions as 64-bit quantized values
    #[arg(long)]
    quantize: bool,

    /// Cycle split axes by depth instead of splitting the longest side
    #[arg(long)]
    round_robin: bool,

    /// Skip re-checking every node after selection
    #[arg(long)]
    no_validate: bool,

    /// Write the header as JSON instead of XML
    #[arg(long)]
    json_header: bool,

    /// Seed for random point sources
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            eprintln!("partikd (fatal): {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut particles = ParticleSet::new();
    if let Some(radius) = cli.radius {
        particles.radius = radius;
    } else {
        log::warn!("no radius specified on command line");
    }

    for input in cli.inputs.iter() {
        log::info!("loading {}", input);
        let source: PointSource = input.parse()?;
        source.load_into(&mut particles, cli.seed);
    }
    particles.cull();

    if particles.radius <= 0.0 {
        return Err(PkdError::MissingRadius);
    }

    let axis_policy = if cli.round_robin {
        AxisPolicy::RoundRobin
    } else {
        AxisPolicy::GreatestExtent
    };
    let build_options = BuildOptions::default()
        .with_axis_policy(axis_policy)
        .with_validation(!cli.no_validate);
    let tree = PkdBuilder::with_options(build_options).build(particles)?;

    let header_format = if cli.json_header {
        HeaderFormat::Json
    } else {
        HeaderFormat::Xml
    };
    let write_options = WriteOptions::default()
        .with_quantize(cli.quantize)
        .with_header_format(header_format);
    PkdWriter::with_options(write_options).save(&tree, &cli.output)?;
    log::info!("done.");
    Ok(())
}
