//! smoothimage - smooths an image with a Gaussian or anisotropic diffusion filter.
//!
//! Demonstrates the cmdline crate: the filters themselves are not part of
//! this program, it prints the smoothing job it would run as JSON.

use anyhow::{Context, Result};
use cmdline::{Arg, ArgId, CmdLine, Matches, SpecError, ValueType};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const DESCRIPTION: &str = "This program smooths an input image using either a Gaussian \
                           filter or an anisotropic diffusion filter.";

/// Handles of the registered arguments.
struct SmoothArgs {
    gaussian: ArgId,
    anisotropic: ArgId,
    std: ArgId,
    radius: ArgId,
    image: ArgId,
}

/// The smoothing job selected on the command line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "filter", rename_all = "lowercase")]
enum SmoothJob {
    Gaussian {
        image: String,
        std: f64,
        radius: [u32; 3],
    },
    Anisotropic {
        image: String,
    },
}

fn build_cmdline() -> Result<(CmdLine, SmoothArgs), SpecError> {
    let name = env!("CARGO_BIN_NAME");
    let mut cmd = CmdLine::new(name)
        .version(env!("CARGO_PKG_VERSION"))
        .description(DESCRIPTION)
        .example(format!(
            "{name} --gaussian --std 3.5 --radius 5 5 3 brain.nii\n\
             Smooths the image brain.nii using a Gaussian with standard deviation 3.5 voxel \
             units and 5 voxels in-slice radius and 3 voxels radius across slices."
        ))
        .example(format!(
            "{name} --anisotropic brain.nii\n\
             Smooths the image brain.nii using an anisotropic diffusion filter."
        ));

    let (gaussian, anisotropic) = cmd.xor_add(
        Arg::switch("gaussian")
            .short('g')
            .long("gaussian")
            .help("Smooth image using a Gaussian filter."),
        Arg::switch("anisotropic")
            .short('a')
            .long("anisotropic")
            .help("Smooth image using anisotropic diffusion filter."),
    )?;
    let std = cmd.add(
        Arg::float("std")
            .short('s')
            .long("std")
            .value_name("float")
            .default_value("2.0")
            .help("Standard deviation of Gaussian in voxel units."),
    )?;
    let radius = cmd.add(
        Arg::multi("radius", ValueType::UInt, 3)
            .short('r')
            .long("radius")
            .value_names(["r_x", "r_y", "r_z"])
            .default_values(["2", "2", "2"])
            .help("Radius of Gaussian kernel in each dimension."),
    )?;
    let image = cmd.add(
        Arg::positional("image", ValueType::String)
            .required(true)
            .help("Image to be smoothed."),
    )?;

    Ok((
        cmd,
        SmoothArgs {
            gaussian,
            anisotropic,
            std,
            radius,
            image,
        },
    ))
}

impl SmoothJob {
    fn from_matches(matches: &Matches<'_>, ids: &SmoothArgs) -> Result<Self> {
        let image: String = matches.get_one(ids.image).context("missing image")?;

        if matches.get_flag(ids.anisotropic) {
            return Ok(SmoothJob::Anisotropic { image });
        }

        debug_assert!(matches.get_flag(ids.gaussian));
        let std: f64 = matches.get_one(ids.std).context("missing --std")?;
        let radius: Vec<u32> = matches
            .get_many(ids.radius)
            .context("--radius values out of range")?;
        let radius: [u32; 3] = radius
            .try_into()
            .map_err(|r: Vec<u32>| anyhow::anyhow!("expected 3 radius values, got {}", r.len()))?;

        Ok(SmoothJob::Gaussian { image, std, radius })
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();

    let (cmd, ids) = build_cmdline().context("invalid command-line specification")?;

    let matches = match cmd.parse_env() {
        Ok(matches) => matches,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!();
            eprintln!("{}", cmd.render_usage());
            eprintln!("For more information, try '--help'.");
            std::process::exit(1);
        }
    };
    let snapshot = matches.to_json()?;
    debug!(values = %snapshot, "parsed command line");

    let job = SmoothJob::from_matches(&matches, &ids)?;
    info!(?job, "selected smoothing job");
    println!("{}", serde_json::to_string_pretty(&job)?);

    Ok(())
}
