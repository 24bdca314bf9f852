// SPDX-License-Identifier: AGPL-3.0-or-later

#![allow(clippy::uninlined_format_args)]
mod config;
mod executor;
mod utils;

use std::convert::TryFrom;

use anyhow::{anyhow, bail, Context as _, Result};
use colored::Colorize;
use formwork::{
    AssemblyRequest, Configuration, Context, Form, LogNotifier, SaveOrchestrator, SaveOutcome,
    StaticMetadataProvider, Value,
};
use log::warn;

use crate::config::{load_config, print_config};
use crate::executor::DryRunExecutor;
use crate::utils::{log_filter, parse_assignment, read_bundle, read_record};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from command line arguments, environment variables and .toml file
    let (config_file_path, config_file, args) = load_config().context("Could not load config")?;

    // Set log verbosity based on config. By default scope it always to the "formwork" module.
    env_logger::Builder::new()
        .parse_filters(&log_filter(&config_file.log_level))
        .init();

    // Convert the unchecked configuration into the one the form engine works with
    let config = Configuration::try_from(config_file).context("Invalid configuration")?;
    println!("{}", print_config(config_file_path, &args, &config));

    let bundle = read_bundle(&args.metadata)?;
    let record = args.record.as_deref().map(read_record).transpose()?;
    let edits = args
        .values
        .iter()
        .map(|assignment| parse_assignment(assignment))
        .collect::<Result<Vec<_>>>()?;

    let context = Context::new(
        config,
        StaticMetadataProvider::from_bundle(bundle),
        DryRunExecutor::new(record),
        LogNotifier,
    );
    let mut orchestrator = SaveOrchestrator::new(context);

    let request = match args.row_id {
        Some(row_id) => AssemblyRequest::record(args.form_id, row_id),
        None => AssemblyRequest::new_record(args.form_id),
    };

    println!("{}\n", "Load".underline());
    orchestrator.load(request).await?;

    let form = orchestrator
        .form_mut()
        .ok_or_else(|| anyhow!("Form {} could not be loaded", args.form_id))?;

    for (column, value) in edits {
        apply_edit(form, &column, &value)?;
    }

    println!("{}\n", "Values".underline());
    println!("{}\n", serde_json::to_string_pretty(&form.to_row())?);

    println!("{}\n", "Save".underline());
    match orchestrator.save().await {
        Ok(SaveOutcome::NothingToSave) => println!("Nothing to save"),
        Ok(SaveOutcome::Saved { row_id, child_rows }) => println!(
            "Saved record {} with {} child rows",
            row_id.to_string().green(),
            child_rows
        ),
        Err(err) => {
            warn!("Save failed: {}", err);
            println!("{}", err.to_string().red());
        }
    }

    Ok(())
}

/// Writes a command line edit into the field bound to the column.
fn apply_edit(form: &mut Form, column: &str, value: &str) -> Result<()> {
    let path = *form
        .fields_by_column_name()
        .get(column)
        .ok_or_else(|| anyhow!("Form has no field for column '{}'", column))?;

    let field = form.field(path.section, path.field)?;
    if !field.is_writable() {
        bail!("Field '{}' can not be edited", column);
    }

    let value = if value.is_empty() {
        Value::Null
    } else if field.column.is_multi_link() {
        Value::List(value.split(',').map(|id| id.trim().to_string()).collect())
    } else {
        Value::from(value)
    };

    form.update_field_value(path.section, path.field, value, Vec::new())?;

    Ok(())
}
