//! Terminal report and JSON export.

use std::path::Path;

use anyhow::{Context, Result};
use colored::*;

use crate::geo::Coordinate;
use crate::recommend::Recommendation;
use crate::run::AnalysisReport;

/// Formats a distance in metres below 1 km, kilometres above.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else {
        format!("{:.0} km", km)
    }
}

fn place(coordinate: Option<&Coordinate>) -> String {
    coordinate
        .map(Coordinate::place_label)
        .unwrap_or_else(|| "Unknown".to_string())
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
    format!("{} {}", count, if count == 1 { singular } else { plural })
}

/// Renders the summary and one table row per recommendation to stdout.
pub fn print_report(report: &AnalysisReport) {
    println!();
    println!("{}", "━━━ Analysis Summary ━━━".green().bold());
    println!(
        "  📊 Total connections: {}",
        report.total_connections.to_string().bold()
    );
    println!(
        "  🌐 Unique addresses:  {} ({} located)",
        report.unique_addresses.to_string().bold(),
        report.resolved_addresses
    );
    println!(
        "  📍 Peer clusters:     {}",
        plural(report.clusters.len(), "cluster", "clusters").bold()
    );
    if report.cancelled {
        println!("  {}", "Run was interrupted; results are partial".yellow());
    }
    println!();

    if !report.has_locations() {
        println!("{}", "No resolvable locations among the peers.".yellow());
        return;
    }

    if let Some(own) = &report.reference_location {
        println!("{} {}", "📍 Your location:".yellow(), own.place_label());
    }
    if let Some(best) = report.best_overall() {
        println!(
            "{} {} {}",
            "⭐ Best overall choice:".green().bold(),
            best.server.identifier.blue().bold(),
            format!("({} peers in nearby cluster)", best.cluster.total_weight()).dimmed()
        );
    }
    println!();

    if report.recommendations.is_empty() {
        println!(
            "{}",
            format!(
                "No eligible server among {} candidates.",
                report.candidates_considered
            )
            .yellow()
        );
        return;
    }

    println!(
        "{:<8} {:<28} {:>7}  {:<16} {:<28} {:>9} {:>9}",
        "Priority".magenta().bold(),
        "Peer cluster".magenta().bold(),
        "Peers".magenta().bold(),
        "Server".magenta().bold(),
        "Server location".magenta().bold(),
        "Distance".magenta().bold(),
        "Load".magenta().bold()
    );
    for (index, recommendation) in report.recommendations.iter().enumerate() {
        print_row(index, recommendation);
    }
}

fn print_row(index: usize, recommendation: &Recommendation) {
    let priority = if index == 0 {
        "★".to_string()
    } else {
        (index + 1).to_string()
    };
    println!(
        "{:<8} {:<28} {:>7}  {:<16} {:<28} {:>9} {:>8.0}%",
        priority.cyan(),
        place(Some(recommendation.cluster.centroid())).yellow(),
        recommendation.cluster.total_weight().to_string().green(),
        recommendation.server.identifier.blue().bold(),
        place(recommendation.server.coordinate.as_ref()),
        format_distance(recommendation.distance_km).red(),
        recommendation.server.load * 100.0
    );
}

/// Writes the report as pretty-printed JSON.
pub fn export_json(report: &AnalysisReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create output directory")?;
    }
    let content = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    log::info!("Report written to {}", path.display());
    Ok(())
}
