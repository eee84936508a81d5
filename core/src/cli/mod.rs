pub mod report;

use crate::error::Result;
use crate::types::{
    read_token_file, ListingOrder, OverrideLists, OverwritePolicy, SelectorConfig,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for cqprep
#[derive(Parser, Debug)]
#[command(name = "cqprep")]
#[command(about = "CQ500 head CT preparation: fetch, convert, select and plan registration")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download the manifest and every listed archive, then extract them
    Fetch {
        /// URL of the manifest listing one resource URL per line
        #[arg(value_name = "URL")]
        url: String,

        /// Destination folder
        #[arg(value_name = "DEST")]
        dest: PathBuf,

        /// Request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Convert every DICOM series of a dataset tree to NIfTI
    Convert {
        /// Root of the extracted dataset
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output folder (default: INPUT/converted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// dcm2niix executable
        #[arg(long, default_value = "dcm2niix")]
        dcm2niix: PathBuf,

        /// Convert again even if the output volume exists
        #[arg(long)]
        overwrite: bool,
    },

    /// Pick one volume per subject and copy it to the output folder
    Select(SelectArgs),

    /// Print the registration job assembled from defaults and overrides
    Plan {
        /// Template object file
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        /// Subject object files
        #[arg(value_name = "DATASET", required = true)]
        dataset: Vec<PathBuf>,

        /// Plan a deterministic atlas estimation instead of a registration
        #[arg(long)]
        atlas: bool,

        /// Output folder (default: next to the template)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// JSON file with template, dataset, model or estimator overrides
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Arguments of the `select` command
#[derive(Args, Debug, Default)]
pub struct SelectArgs {
    /// Folder holding one directory per subject
    #[arg(value_name = "IMAGES")]
    pub images: PathBuf,

    /// Output folder (default: IMAGES/selected)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only subjects whose name starts with this prefix (empty: all)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Only subjects whose name matches this regular expression
    #[arg(long)]
    pub pattern: Option<String>,

    /// File name chosen regardless of slice count
    #[arg(long = "preselect", value_name = "NAME")]
    pub preselected: Vec<String>,

    /// File name under observation, chosen like a preselected one
    #[arg(long = "observe", value_name = "NAME")]
    pub in_observation: Vec<String>,

    /// Subject or file name to skip
    #[arg(long = "exclude", value_name = "NAME")]
    pub excluded: Vec<String>,

    /// File with one preselected name per line
    #[arg(long, value_name = "FILE")]
    pub preselected_file: Option<PathBuf>,

    /// File with one in-observation name per line
    #[arg(long, value_name = "FILE")]
    pub observation_file: Option<PathBuf>,

    /// File with one excluded name per line
    #[arg(long, value_name = "FILE")]
    pub excluded_file: Option<PathBuf>,

    /// Highest slice count (exclusive) accepted by the heuristic
    #[arg(long)]
    pub threshold: Option<u16>,

    /// Keep files already present in the output folder
    #[arg(long)]
    pub skip_existing: bool,

    /// Visit directory entries in filesystem order instead of by name
    #[arg(long)]
    pub native_order: bool,

    /// JSON configuration file, applied before the other options
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format
    Json,
    /// File paths only (one per line)
    Paths,
}

impl SelectArgs {
    /// Builds the selector configuration
    ///
    /// Starts from the config file (or defaults), then applies list files,
    /// inline names and flags on top.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or the pattern is invalid
    pub fn selector_config(&self) -> Result<SelectorConfig> {
        let mut config = self.base_config()?;

        let mut overrides = std::mem::take(&mut config.overrides);
        overrides = with_list(overrides, &self.preselected, &self.preselected_file, |o, t| {
            o.with_preselected(t)
        })?;
        overrides = with_list(
            overrides,
            &self.in_observation,
            &self.observation_file,
            |o, t| o.with_in_observation(t),
        )?;
        overrides = with_list(overrides, &self.excluded, &self.excluded_file, |o, t| {
            o.with_excluded(t)
        })?;
        config.overrides = overrides;

        if let Some(prefix) = &self.prefix {
            config.subject_filter.prefix = if prefix.is_empty() {
                None
            } else {
                Some(prefix.clone())
            };
        }
        if let Some(pattern) = &self.pattern {
            config.subject_filter = config.subject_filter.with_pattern(pattern)?;
        }
        if let Some(threshold) = self.threshold {
            config.slice_threshold = threshold;
        }
        if self.skip_existing {
            config.overwrite = OverwritePolicy::SkipExisting;
        }
        if self.native_order {
            config.listing_order = ListingOrder::Native;
        }

        Ok(config)
    }

    #[cfg(feature = "json")]
    fn base_config(&self) -> Result<SelectorConfig> {
        match &self.config {
            Some(path) => SelectorConfig::from_json_file(path),
            None => Ok(SelectorConfig::default()),
        }
    }

    #[cfg(not(feature = "json"))]
    fn base_config(&self) -> Result<SelectorConfig> {
        match &self.config {
            Some(_) => Err(crate::error::PrepError::InvalidConfig(
                "configuration files require the 'json' feature".to_string(),
            )),
            None => Ok(SelectorConfig::default()),
        }
    }
}

fn with_list<F>(
    overrides: OverrideLists,
    inline: &[String],
    file: &Option<PathBuf>,
    add: F,
) -> Result<OverrideLists>
where
    F: Fn(OverrideLists, Vec<String>) -> OverrideLists,
{
    let mut tokens = inline.to_vec();
    if let Some(path) = file {
        tokens.extend(read_token_file(path)?);
    }
    Ok(add(overrides, tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_SLICE_THRESHOLD;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_select() {
        let cli = parse(&[
            "cqprep",
            "select",
            "/data/images",
            "--preselect",
            "a.nii.gz",
            "--preselect",
            "b.nii.gz",
            "--exclude",
            "CQ500CT9",
            "--threshold",
            "250",
            "--format",
            "paths",
            "-v",
        ]);

        assert!(cli.verbose);
        let Command::Select(args) = cli.command else {
            panic!("expected select");
        };
        assert_eq!(args.images, PathBuf::from("/data/images"));
        assert_eq!(args.preselected, vec!["a.nii.gz", "b.nii.gz"]);
        assert_eq!(args.format, OutputFormat::Paths);

        let config = args.selector_config().unwrap();
        assert!(config.overrides.is_forced("b.nii.gz"));
        assert!(config.overrides.is_excluded("CQ500CT9", &[] as &[&str]));
        assert_eq!(config.slice_threshold, 250);
        assert_eq!(config.overwrite, OverwritePolicy::Always);
    }

    #[test]
    fn test_select_defaults() {
        let config = SelectArgs::default().selector_config().unwrap();

        assert_eq!(config.slice_threshold, DEFAULT_SLICE_THRESHOLD);
        assert_eq!(config.listing_order, ListingOrder::Sorted);
        assert!(config.subject_filter.accepts("CQ500CT1 CQ500CT1"));
        assert!(!config.subject_filter.accepts("other"));
        assert!(config.overrides.is_empty());
    }

    #[test]
    fn test_select_flags_and_list_files() {
        let temp_dir = TempDir::new().unwrap();
        let list = temp_dir.path().join("observation.txt");
        std::fs::write(&list, "# under review\nCQ500CT4_CT 5mm.nii.gz\n\n").unwrap();

        let args = SelectArgs {
            prefix: Some(String::new()),
            observation_file: Some(list),
            skip_existing: true,
            native_order: true,
            ..Default::default()
        };
        let config = args.selector_config().unwrap();

        assert!(config.overrides.is_forced("CQ500CT4_CT 5mm.nii.gz"));
        assert!(config.subject_filter.accepts("other"));
        assert_eq!(config.overwrite, OverwritePolicy::SkipExisting);
        assert_eq!(config.listing_order, ListingOrder::Native);
    }

    #[test]
    fn test_invalid_pattern() {
        let args = SelectArgs {
            pattern: Some("(".to_string()),
            ..Default::default()
        };

        assert!(args.selector_config().is_err());
    }

    #[test]
    fn test_parse_plan_requires_dataset() {
        assert!(Cli::try_parse_from(["cqprep", "plan", "skull.vtk"]).is_err());

        let cli = parse(&["cqprep", "plan", "skull.vtk", "s1.vtk", "s2.vtk", "--atlas"]);
        match cli.command {
            Command::Plan { dataset, atlas, .. } => {
                assert_eq!(dataset.len(), 2);
                assert!(atlas);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
