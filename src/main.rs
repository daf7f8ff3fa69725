use std::path::PathBuf;

use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use clap::{Args, Parser, Subcommand};
use log::info;

use gazekit::{
    load_gaze_files, save_preprocessed, scan_dataset, subset_from_json, take_subset,
    DatasetDefinition, DatasetPaths, GazeLoadOptions,
};

#[derive(Parser, Debug)]
#[command(name = "gazekit", version, about = "Eye-tracking dataset discovery and conversion")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct DatasetArgs {
    /// Dataset definition (JSON)
    #[arg(long, value_name = "FILE")]
    definition: PathBuf,
    /// Directory holding the dataset directory
    #[arg(long, value_name = "DIR")]
    root: PathBuf,
    /// Dataset directory name under the root; "." uses the root itself
    #[arg(long, value_name = "NAME", default_value = ".")]
    dataset_dirname: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match the raw files and print the fileinfo tables
    Scan {
        #[command(flatten)]
        dataset: DatasetArgs,
    },
    /// Load raw gaze files and save them preprocessed
    Convert {
        #[command(flatten)]
        dataset: DatasetArgs,
        /// Keep only matching files, e.g. '{"subject_id": [1, 2]}'
        #[arg(long, value_name = "JSON")]
        subset: Option<String>,
        /// Output format: feather or csv
        #[arg(long, default_value = "feather")]
        format: String,
        /// Write into this directory instead of `preprocessed`
        #[arg(long, value_name = "NAME")]
        preprocessed_dirname: Option<String>,
        /// -v shows progress, -vv also every written file
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },
}

impl DatasetArgs {
    fn load(&self) -> Result<(DatasetDefinition, DatasetPaths)> {
        let definition = DatasetDefinition::from_json_file(&self.definition)
            .with_context(|| format!("reading definition {}", self.definition.display()))?;
        let paths = DatasetPaths::new(&self.root, &self.dataset_dirname);
        Ok((definition, paths))
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Scan { dataset } => {
            let (definition, paths) = dataset.load()?;
            let fileinfo = scan_dataset(&definition, &paths).context("scanning dataset")?;
            for (category, table) in fileinfo.iter() {
                let batch = table.to_record_batch()?;
                println!("{category} ({} files)", table.len());
                println!("{}", pretty_format_batches(&[batch])?);
            }
        }
        Command::Convert {
            dataset,
            subset,
            format,
            preprocessed_dirname,
            verbose,
        } => {
            let (definition, paths) = dataset.load()?;
            let fileinfo = scan_dataset(&definition, &paths).context("scanning dataset")?;

            let subset = subset
                .map(|text| -> Result<_> {
                    let value: serde_json::Value =
                        serde_json::from_str(&text).context("parsing --subset")?;
                    Ok(subset_from_json(value)?)
                })
                .transpose()?;
            let fileinfo = take_subset(fileinfo, subset.as_ref())?;
            let gaze_fileinfo = fileinfo
                .gaze()
                .context("definition declares no gaze files")?;

            let gaze = load_gaze_files(
                &definition,
                gaze_fileinfo,
                &paths,
                GazeLoadOptions {
                    show_progress: verbose >= 1,
                    ..GazeLoadOptions::default()
                },
            )
            .context("loading gaze files")?;

            save_preprocessed(
                &gaze,
                gaze_fileinfo,
                &paths,
                preprocessed_dirname.as_deref(),
                verbose,
                &format,
            )
            .context("saving preprocessed files")?;
            info!("converted {} gaze files to {format}", gaze.len());
        }
    }

    Ok(())
}
