// SPDX-License-Identifier: AGPL-3.0-or-later

use std::convert::TryFrom;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{crate_version, Args, Parser};
use colored::Colorize;
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use formwork::{Configuration, FormId, InsertIdRetrieval};
use serde::{Deserialize, Serialize};

use crate::utils::absolute_path;

const CONFIG_FILE_NAME: &str = "formwork.toml";

const ENV_PREFIX: &str = "FORMWORK_";

type ConfigFilePath = Option<PathBuf>;

/// Get configuration from 1. .toml file, 2. environment variables and 3. command line arguments
/// (in that order, meaning that later configuration sources take precedence over the earlier
/// ones).
///
/// Returns the unchecked configuration next to the arguments describing what should be compiled.
pub fn load_config() -> Result<(ConfigFilePath, ConfigFile, RunArgs)> {
    load_config_from(Cli::parse())
}

/// Same as [`load_config`] but with already parsed command line arguments.
pub fn load_config_from(cli: Cli) -> Result<(ConfigFilePath, ConfigFile, RunArgs)> {
    // Determine if a config file path was provided or if we should look for it in common locations
    let config_file_path: ConfigFilePath = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("Config file '{}' does not exist", path.display());
            }

            Some(path.clone())
        }
        None => try_determine_config_file_path(),
    };

    let run = cli.run.clone();

    let mut figment = Figment::from(Serialized::defaults(ConfigFile::default()));
    if let Some(path) = &config_file_path {
        figment = figment.merge(Toml::file(path));
    }

    let config = figment
        .merge(Env::prefixed(ENV_PREFIX))
        .merge(Serialized::defaults(cli))
        .extract()?;

    Ok((config_file_path, config, run))
}

/// Command line arguments.
///
/// Configuration arguments are optional and don't get serialized to Figment when they're None,
/// so they don't overwrite values of the config file or the environment which have been set.
#[derive(Parser, Serialize, Debug)]
#[command(
    name = "formwork",
    about = "Assemble a metadata-driven form and print the statements it compiles to",
    long_about = None,
    version
)]
pub struct Cli {
    /// Path to an optional "formwork.toml" file for further configuration.
    ///
    /// When not set the program will try to find a `formwork.toml` file in the same folder the
    /// program is executed in and otherwise in the regarding operation systems XDG config
    /// directory ("$HOME/.config/formwork/formwork.toml" on Linux).
    #[arg(short = 'c', long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<PathBuf>,

    #[command(flatten)]
    #[serde(skip)]
    run: RunArgs,

    /// How primary keys of inserted rows are read back, either "select_generated_id" or
    /// "output_into". Derived from the backend version when not set.
    #[arg(short = 'i', long, value_name = "MODE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    insert_id_retrieval: Option<String>,

    /// Version string of the backend, for example "4.19.2".
    #[arg(short = 'b', long, value_name = "VERSION")]
    #[serde(skip_serializing_if = "Option::is_none")]
    backend_version: Option<String>,

    /// Reload the form after a successful save. Enabled by default.
    #[arg(
        long,
        value_name = "BOOL",
        default_missing_value = "true",
        num_args = 0..=1,
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    reload_after_save: Option<bool>,

    /// Fetch option lists of link columns while assembling the form. Enabled by default.
    #[arg(
        long,
        value_name = "BOOL",
        default_missing_value = "true",
        num_args = 0..=1,
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    load_link_options: Option<bool>,

    /// Set log verbosity.
    ///
    /// Possible log levels are: ERROR, WARN, INFO, DEBUG, TRACE. They are scoped to "formwork" by
    /// default. Use a filter value like "formwork=TRACE,formwork_cli=DEBUG" to adjust the scope.
    #[arg(short = 'l', long, value_name = "LEVEL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
}

/// Arguments selecting the form and the edits to compile.
#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Path to a JSON file holding form, section, field and column metadata.
    #[arg(short = 'm', long, value_name = "PATH")]
    pub metadata: PathBuf,

    /// Id of the form to assemble.
    #[arg(short = 'f', long, value_name = "ID")]
    pub form_id: FormId,

    /// Primary key of the record to edit. A new record is created when not set.
    #[arg(short = 'r', long, value_name = "ID")]
    pub row_id: Option<i64>,

    /// Path to a JSON object used as the record the backend returns for `--row-id`.
    #[arg(long, value_name = "PATH")]
    pub record: Option<PathBuf>,

    /// Field edits in the form of "Column=value". Multi-value links take comma-separated ids.
    #[arg(short = 's', long = "set", value_name = "COLUMN=VALUE", num_args = 0..)]
    pub values: Vec<String>,
}

/// Configuration values collected from all sources, not yet validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_id_retrieval: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_version: Option<String>,

    pub reload_after_save: bool,

    pub load_link_options: bool,

    pub log_level: String,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            insert_id_retrieval: None,
            backend_version: None,
            reload_after_save: true,
            load_link_options: true,
            log_level: "off".into(),
        }
    }
}

impl TryFrom<ConfigFile> for Configuration {
    type Error = anyhow::Error;

    fn try_from(value: ConfigFile) -> Result<Self, Self::Error> {
        let insert_id_retrieval = match value.insert_id_retrieval.as_deref() {
            None => None,
            Some("select_generated_id") => Some(InsertIdRetrieval::SelectGeneratedId),
            Some("output_into") => Some(InsertIdRetrieval::OutputInto),
            Some(other) => bail!(
                "Unknown insert id retrieval '{}', expected 'select_generated_id' or 'output_into'",
                other
            ),
        };

        Ok(Configuration {
            insert_id_retrieval,
            backend_version: value.backend_version,
            reload_after_save: value.reload_after_save,
            load_link_options: value.load_link_options,
        })
    }
}

fn try_determine_config_file_path() -> Option<PathBuf> {
    // Find config file in current folder
    let current_dir = std::env::current_dir()
        .ok()
        .map(|dir| dir.join(CONFIG_FILE_NAME));

    // Find config file in XDG config folder
    let xdg_config_dir = ProjectDirs::from("", "", "formwork")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME));

    [current_dir, xdg_config_dir]
        .into_iter()
        .flatten()
        .find(|path| path.exists())
}

pub fn print_config(
    config_file_path: ConfigFilePath,
    args: &RunArgs,
    config: &Configuration,
) -> String {
    println!("{} v{}\n", "formwork".underline(), crate_version!());

    match config_file_path {
        Some(path) => {
            println!(
                "Loading config file from {}",
                absolute_path(path).display().to_string().blue()
            );
        }
        None => {
            println!("No config file provided");
        }
    }

    println!();
    println!("{}\n", "Configuration".underline());

    let insert_id_retrieval = match config.insert_id_retrieval() {
        InsertIdRetrieval::SelectGeneratedId => "SELECT @cinchyid",
        InsertIdRetrieval::OutputInto => "OUTPUT INSERTED INTO temporary table",
    };

    let record = match args.row_id {
        Some(row_id) => format!("{row_id}"),
        None => "new record".into(),
    };

    let enabled = |flag: bool| if flag { "enabled" } else { "disabled" };

    format!(
        r"Metadata: {}
Form: {}
Record: {}
Insert id retrieval: {}
Reload after save: {}
Link options: {}
",
        absolute_path(&args.metadata).display().to_string().blue(),
        args.form_id.to_string().blue(),
        record.blue(),
        insert_id_retrieval.blue(),
        enabled(config.reload_after_save).blue(),
        enabled(config.load_link_options).blue(),
    )
}
