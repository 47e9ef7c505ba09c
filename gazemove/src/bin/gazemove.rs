//! Parse an EyeLink ASC file and run the configured event detectors.
//!
//! ## Usage
//! ```
//! gazemove 0.1.0
//! Detect fixations, saccades and gaps in an EyeLink ASC file.
//!
//! USAGE:
//!     gazemove [OPTIONS] <ASC>
//!
//! FLAGS:
//!     -h, --help       Prints help information
//!     -V, --version    Prints version information
//!
//! OPTIONS:
//!     -c, --config <config>        TOML settings file
//!     -e, --encoding <encoding>    Text encoding of the ASC file, e.g. latin1
//!
//! ARGS:
//!     <ASC>    The ASC file to parse
//! ```

use std::path::PathBuf;

use anyhow::Result;
use gazemove::config::Settings;
use gazemove::Gaze;
use log::{debug, info, warn};
use structopt::clap::AppSettings;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name("gazemove"),
    about("Detect fixations, saccades and gaps in an EyeLink ASC file."),
    setting(AppSettings::ColoredHelp),
    setting(AppSettings::ColorAuto)
)]
struct Opt {
    /// TOML settings file.
    ///
    /// Without one, the file is parsed with default options and no detectors run.
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Text encoding of the ASC file, e.g. latin1.
    ///
    /// Overrides the encoding in the settings file. Defaults to UTF-8.
    #[structopt(short, long)]
    encoding: Option<String>,

    /// The ASC file to parse.
    #[structopt(name = "ASC", parse(from_os_str))]
    asc: PathBuf,
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    debug!("{:?}", opt);

    let settings = match &opt.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    debug!("{:?}", settings);

    let mut options = settings.parse.to_options()?;
    if opt.encoding.is_some() {
        options.encoding = opt.encoding.clone();
    }

    let mut gaze =
        Gaze::from_asc(&opt.asc, &options)?.with_trial_columns(settings.parse.trial_columns.clone())?;
    if let Some(rate) = settings.sampling_rate {
        gaze = gaze.with_sampling_rate(rate)?;
    }

    for method in &settings.detect {
        info!("Running {}", method);
        gaze.detect(method)?;
    }

    if let Some(metadata) = gaze.metadata() {
        println!("model:              {} ({})", metadata.model, metadata.version_number);
        if let Some(vendor) = &metadata.vendor {
            println!("vendor:             {}", vendor);
        }
        if let Some(datetime) = metadata.datetime {
            println!("recorded:           {}", datetime);
        }
        match metadata.sampling_rate {
            Some(rate) => println!("sampling rate:      {} Hz", rate),
            None => warn!("No consistent sampling rate."),
        }
        if let Some(eye) = &metadata.tracked_eye {
            println!("tracked eye:        {}", eye);
        }
        println!(
            "recording duration: {} ms",
            metadata.total_recording_duration_ms
        );
        println!("data loss:          {:.4}", metadata.data_loss_ratio);
        println!("data loss (blinks): {:.4}", metadata.data_loss_ratio_blinks);
        println!("warnings:           {}", metadata.warnings.len());
    }
    println!("samples:            {}", gaze.samples().len());
    for (name, count) in gaze.event_counts() {
        println!("{:<20}{}", format!("{}:", name), count);
    }

    Ok(())
}
