use clap::Parser;
use cqprep_core::cli::report::{
    ConversionTextReport, FetchTextReport, JobTextReport, TextReport,
};
use cqprep_core::cli::{Cli, Command, OutputFormat, SelectArgs};
use cqprep_core::{
    Dcm2NiixConverter, DatasetFetcher, EstimationKind, HttpDownloader, PrepError,
    RegistrationRequest, Result, VolumeConverter, VolumeSelector,
};
use log::{error, info};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

fn main() {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    let result = match cli.command {
        Command::Fetch { url, dest, timeout } => fetch(&url, dest, timeout),
        Command::Convert {
            input,
            output,
            dcm2niix,
            overwrite,
        } => convert(input, output, dcm2niix, overwrite),
        Command::Select(args) => select(&args),
        Command::Plan {
            template,
            dataset,
            atlas,
            output,
            overrides,
            format,
        } => plan(template, dataset, atlas, output, overrides, format),
    };

    if let Err(e) = result {
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}

fn fetch(url: &str, dest: PathBuf, timeout: Option<u64>) -> Result<()> {
    let downloader = HttpDownloader::new(timeout.map(Duration::from_secs))?;
    let report = DatasetFetcher::new(downloader).fetch(url, &dest)?;
    println!("{}", FetchTextReport::new(&report));
    Ok(())
}

fn convert(
    input: PathBuf,
    output: Option<PathBuf>,
    dcm2niix: PathBuf,
    overwrite: bool,
) -> Result<()> {
    let converter = Dcm2NiixConverter::new(dcm2niix);
    if !converter.is_available() {
        return Err(PrepError::ConversionError(
            "dcm2niix not found; install it or pass --dcm2niix".to_string(),
        ));
    }

    let mut volumes = VolumeConverter::with_converter(converter);
    if overwrite {
        volumes = volumes.with_overwrite(cqprep_core::OverwritePolicy::Always);
    }
    let report = volumes.run(&input, output.as_deref())?;
    println!("{}", ConversionTextReport::new(&report));
    Ok(())
}

fn select(args: &SelectArgs) -> Result<()> {
    let config = args.selector_config()?;
    info!("Processing directory: {}", args.images.display());

    let report = VolumeSelector::new(config).run(&args.images, args.output.as_deref())?;

    match args.format {
        OutputFormat::Text => println!("{}", TextReport::new(&report)),
        OutputFormat::Paths => {
            for path in report.selected().values() {
                println!("{}", path.display());
            }
        }
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(())
}

fn plan(
    template: PathBuf,
    dataset: Vec<PathBuf>,
    atlas: bool,
    output: Option<PathBuf>,
    overrides: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let kind = if atlas {
        EstimationKind::DeterministicAtlas
    } else {
        EstimationKind::Registration
    };

    let mut request = RegistrationRequest::new(template, dataset);
    if let Some(dir) = output {
        request = request.with_output_dir(dir);
    }
    if let Some(path) = overrides {
        request = request.with_overrides(load_overrides(&path)?);
    }
    let job = request.assemble(kind);

    match format {
        OutputFormat::Text => println!("{}", JobTextReport::new(kind, &job)),
        OutputFormat::Paths => println!("{}", job.output_dir.display()),
        OutputFormat::Json => print_json(&job)?,
    }
    Ok(())
}

#[cfg(feature = "json")]
fn load_overrides(path: &std::path::Path) -> Result<cqprep_core::JobOverrides> {
    let content = std::fs::read_to_string(path)?;
    cqprep_core::JobOverrides::from_json_str(&content)
}

#[cfg(not(feature = "json"))]
fn load_overrides(_path: &std::path::Path) -> Result<cqprep_core::JobOverrides> {
    Err(json_required())
}

#[cfg(feature = "json")]
fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(not(feature = "json"))]
fn print_json<T>(_value: &T) -> Result<()> {
    Err(json_required())
}

#[cfg(not(feature = "json"))]
fn json_required() -> PrepError {
    PrepError::InvalidConfig(
        "JSON support requires the 'json' feature (cargo build --features json)".to_string(),
    )
}
