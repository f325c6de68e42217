//! Terminal rendering for package commands.

use console::{style, StyledObject};
use fieldpack::controller::PackageEvent;
use fieldpack::service::StatusSummary;
use fieldpack::{PackageRecord, PackageStatus};
use indicatif::{ProgressBar, ProgressStyle};

/// Colored status label.
pub fn status_label(status: PackageStatus) -> StyledObject<&'static str> {
    let label = style(status.as_str());
    match status {
        PackageStatus::Ready | PackageStatus::Removed => label.green(),
        PackageStatus::Incomplete | PackageStatus::UpdateAvailable => label.yellow(),
        PackageStatus::Error => label.red(),
        _ => label.cyan(),
    }
}

/// Percent bar for one pipeline.
pub fn progress_bar(package_id: &str) -> ProgressBar {
    let bar = ProgressBar::new(100);
    let template = ProgressStyle::with_template(
        "{prefix:.bold} [{bar:40.cyan/blue}] {pos:>3}% {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");
    bar.set_style(template);
    bar.set_prefix(package_id.to_string());
    bar
}

/// Apply one event to a bar.
pub fn update_bar(bar: &ProgressBar, event: &PackageEvent) {
    bar.set_position(u64::from(event.progress));
    bar.set_message(event.status.as_str());
}

/// One line per package.
pub fn print_table(records: &[PackageRecord]) {
    if records.is_empty() {
        println!("No packages.");
        return;
    }

    println!(
        "{:<24} {:<18} {:<7} {:<16} {}",
        style("ID").bold(),
        style("STATUS").bold(),
        style("ZOOM").bold(),
        style("UPDATED").bold(),
        style("DETAIL").bold()
    );
    for record in records {
        println!(
            "{:<24} {:<18} {:<7} {:<16} {}",
            record.package_id,
            status_label(record.status),
            format!("{}-{}", record.min_zoom, record.max_zoom),
            format_time(record.updated_at),
            record.error_message.as_deref().unwrap_or("")
        );
    }
}

/// Full detail for one package.
pub fn print_record(record: &PackageRecord) {
    println!("{}", style(&record.package_id).bold());
    println!("  Region:     {}", record.region_name);
    if let Some(company) = &record.company_id {
        println!("  Company:    {}", company);
    }
    if let Some(farm) = &record.farm_id {
        println!("  Farm:       {}", farm);
    }
    println!("  Status:     {}", status_label(record.status));
    if let Some(message) = &record.error_message {
        println!("  Problem:    {}", message);
    }
    println!("  Style:      {}", record.style_reference);
    println!(
        "  Bounds:     {}, {}, {}, {}",
        record.bounds.west, record.bounds.south, record.bounds.east, record.bounds.north
    );
    println!("  Zoom:       {}-{}", record.min_zoom, record.max_zoom);
    println!("  Created:    {}", format_time(record.created_at));
    println!("  Updated:    {}", format_time(record.updated_at));
    println!("  Validated:  {}", format_time(record.last_validated_at));

    let flags = &record.readiness;
    println!("  Readiness:");
    println!("    style asset    {}", check(flags.has_style_asset));
    println!("    tile asset     {}", check(flags.has_tile_asset));
    println!("    boundary data  {}", check(flags.has_boundary_data));
    println!("    trap data      {}", check(flags.has_trap_data));
}

pub fn print_summary(summary: &StatusSummary) {
    print_table(&summary.packages);
    println!();
    println!(
        "{} of {} package(s) ready for offline use",
        style(summary.ready_count).bold(),
        summary.total_count
    );
}

fn check(present: bool) -> StyledObject<&'static str> {
    if present {
        style("yes").green()
    } else {
        style("no").red()
    }
}

/// Local time for an epoch-millisecond timestamp, `-` when unset.
fn format_time(millis: i64) -> String {
    if millis <= 0 {
        return "-".to_string();
    }
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string())
}
