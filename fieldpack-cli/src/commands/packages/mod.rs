//! Package commands.
//!
//! Commands that start a pipeline follow its event stream to the terminal
//! event, so the process never exits under a running download or removal.

mod args;
mod output;

pub use args::PrepareArgs;

use std::fs;
use std::path::{Path, PathBuf};

use console::style;
use dialoguer::Confirm;
use fieldpack::controller::{PackageEvent, PackageEvents, PrepareRequest};
use fieldpack::PackageStatus;

use super::common::Session;
use crate::error::CliError;

/// Download a package and report how it ended.
pub fn prepare(config_path: Option<&Path>, args: PrepareArgs) -> Result<(), CliError> {
    let request = build_request(args)?;
    let session = Session::open(config_path)?;

    let last = session.block_on(async {
        let ticket = session.service.prepare_package(request).await?;
        if ticket.record.status == PackageStatus::UpdateAvailable {
            println!(
                "{} is already downloaded; fetching a fresh copy",
                style(&ticket.record.package_id).bold()
            );
        }
        Ok::<_, CliError>(follow(ticket.events).await)
    })?;

    report_download(last)
}

/// List every stored package.
pub fn list(config_path: Option<&Path>, json: bool) -> Result<(), CliError> {
    let session = Session::open(config_path)?;
    let records = session.service.list_packages()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        output::print_table(&records);
    }
    Ok(())
}

/// Show one package in detail.
pub fn show(config_path: Option<&Path>, package_id: &str, json: bool) -> Result<(), CliError> {
    let session = Session::open(config_path)?;
    let record = session
        .service
        .get_package(package_id)?
        .ok_or_else(|| CliError::NotFound(package_id.to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        output::print_record(&record);
    }
    Ok(())
}

/// Counts plus the package table.
pub fn status(config_path: Option<&Path>, json: bool) -> Result<(), CliError> {
    let session = Session::open(config_path)?;
    let summary = session.service.get_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        output::print_summary(&summary);
    }
    Ok(())
}

/// Delete a package's assets and record.
pub fn remove(config_path: Option<&Path>, package_id: &str, yes: bool) -> Result<(), CliError> {
    let session = Session::open(config_path)?;
    if session.service.get_package(package_id)?.is_none() {
        return Err(CliError::NotFound(package_id.to_string()));
    }

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Remove package '{}' and its downloaded map data?",
                package_id
            ))
            .default(false)
            .interact()
            .map_err(|e| CliError::Prompt(e.to_string()))?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let last = session.block_on(async {
        let ticket = session.service.remove_package(package_id).await?;
        match ticket.events {
            Some(events) => Ok::<_, CliError>(follow(events).await),
            None => Err(CliError::NotFound(package_id.to_string())),
        }
    })?;

    match last {
        Some(event) if event.status == PackageStatus::Removed => {
            println!("{} removed", style(package_id).bold());
            Ok(())
        }
        Some(event) => Err(CliError::PipelineFailed {
            package_id: event.package_id,
            status: event.status,
            message: event.error_message.unwrap_or_default(),
        }),
        None => Err(interrupted(package_id)),
    }
}

/// Re-check a package against what is on disk.
pub fn validate(config_path: Option<&Path>, package_id: &str) -> Result<(), CliError> {
    let session = Session::open(config_path)?;
    let record = session.block_on(session.service.revalidate(package_id))?;

    println!(
        "{}: {}",
        style(&record.package_id).bold(),
        output::status_label(record.status)
    );
    if let Some(message) = &record.error_message {
        println!("  {}", message);
    }
    Ok(())
}

/// Report what startup recovery settled.
pub fn recover(config_path: Option<&Path>) -> Result<(), CliError> {
    let session = Session::open(config_path)?;
    let report = &session.recovered;

    if report.is_empty() {
        println!("Nothing to recover.");
        return Ok(());
    }
    for (package_id, status) in &report.revalidated {
        println!("{:<24} {}", package_id, output::status_label(*status));
    }
    for package_id in &report.removed {
        println!("{:<24} {}", package_id, style("removal finished").green());
    }
    for package_id in &report.skipped {
        println!(
            "{:<24} {}",
            package_id,
            style("skipped: asset stores did not answer").yellow()
        );
    }
    Ok(())
}

fn build_request(args: PrepareArgs) -> Result<PrepareRequest, CliError> {
    Ok(PrepareRequest {
        package_id: args.package_id,
        region_name: args.name,
        company_id: args.company,
        farm_id: args.farm,
        style_reference: args.style,
        bounds: args.bounds,
        min_zoom: args.min_zoom,
        max_zoom: args.max_zoom,
        boundary_geojson: read_optional(args.boundary)?,
        trap_geojson: read_optional(args.traps)?,
    })
}

fn read_optional(path: Option<PathBuf>) -> Result<Option<String>, CliError> {
    path.map(|path| fs::read_to_string(&path).map_err(|error| CliError::FileRead { path, error }))
        .transpose()
}

/// Drive a progress bar until the terminal event.
async fn follow(mut events: PackageEvents) -> Option<PackageEvent> {
    let bar = output::progress_bar(events.package_id());
    let mut last = None;

    while let Some(event) = events.next().await {
        output::update_bar(&bar, &event);
        if event.terminal {
            last = Some(event);
            break;
        }
    }

    bar.finish_and_clear();
    last
}

fn report_download(last: Option<PackageEvent>) -> Result<(), CliError> {
    let Some(event) = last else {
        return Err(interrupted("package"));
    };

    match event.status {
        PackageStatus::Ready => {
            println!(
                "{} {}",
                style(&event.package_id).bold(),
                output::status_label(event.status)
            );
            Ok(())
        }
        PackageStatus::Incomplete => {
            println!(
                "{} {}: {}",
                style(&event.package_id).bold(),
                output::status_label(event.status),
                event.error_message.as_deref().unwrap_or("")
            );
            Ok(())
        }
        status => Err(CliError::PipelineFailed {
            package_id: event.package_id,
            status,
            message: event.error_message.unwrap_or_default(),
        }),
    }
}

fn interrupted(package_id: &str) -> CliError {
    CliError::PipelineFailed {
        package_id: package_id.to_string(),
        status: PackageStatus::Error,
        message: "pipeline stopped without a final status".to_string(),
    }
}
