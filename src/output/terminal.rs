// Colored terminal output for drift rankings.
//
// This module handles all terminal-specific formatting. The table is
// already sorted descending by the affinity propagation divergence when
// it gets here; high-divergence words are the interesting ones, so they
// are colored by how close they sit to the ln 2 ceiling.

use colored::Colorize;

use crate::results::DriftRow;

/// Fraction of ln 2 above which a divergence is flagged as strong drift.
const STRONG_DRIFT: f64 = 0.5;
/// Fraction of ln 2 above which a divergence is flagged as moderate drift.
const MODERATE_DRIFT: f64 = 0.25;

/// Display the ranked drift table, truncated to `top` rows.
pub fn display_drift_table(rows: &[DriftRow], top: usize) {
    if rows.is_empty() {
        println!("No words analyzed yet. Run `lexdrift analyze` first.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Semantic drift ranking ({} words) ===", rows.len()).bold()
    );
    println!();
    println!(
        "  {:>4}  {:<20} {:>9}  {:>9}  {:>9}  {:>9}  {:>8}",
        "Rank".dimmed(),
        "Word".dimmed(),
        "AffProp".dimmed(),
        "KMeans5".dimmed(),
        "KMeans7".dimmed(),
        "AvgDist".dimmed(),
        "Senses".dimmed(),
    );
    println!("  {}", "-".repeat(78).dimmed());

    for (i, row) in rows.iter().take(top).enumerate() {
        println!(
            "  {:>4}. {:<20} {}  {:>9.4}  {:>9.4}  {:>9.4}  {:>8}",
            i + 1,
            row.word,
            colorize_divergence(row.aff_prop),
            row.kmeans_5,
            row.kmeans_7,
            row.averaging,
            row.aff_prop_clusters,
        );
    }

    if rows.len() > top {
        println!("  {}", format!("... and {} more", rows.len() - top).dimmed());
    }
    println!();

    let ceiling = std::f64::consts::LN_2;
    let strong = rows.iter().filter(|r| r.aff_prop > STRONG_DRIFT * ceiling).count();
    let moderate = rows
        .iter()
        .filter(|r| {
            r.aff_prop > MODERATE_DRIFT * ceiling && r.aff_prop <= STRONG_DRIFT * ceiling
        })
        .count();

    if strong > 0 {
        println!("  {} {} words show strong drift", "!!".red().bold(), strong);
    }
    if moderate > 0 {
        println!("  {} {} words show moderate drift", "~".yellow(), moderate);
    }
}

/// Display the end-of-run summary.
pub fn display_run_summary(processed: usize, skipped: usize) {
    println!();
    println!("Processed {processed} words ({skipped} skipped).");
    if skipped > 0 {
        println!(
            "{}",
            "Skip reasons are recorded in the skipped_<language>.json artifact.".dimmed()
        );
    }
}

fn colorize_divergence(value: f64) -> String {
    let ceiling = std::f64::consts::LN_2;
    let text = format!("{value:>9.4}");
    if value > STRONG_DRIFT * ceiling {
        text.red().bold().to_string()
    } else if value > MODERATE_DRIFT * ceiling {
        text.yellow().to_string()
    } else {
        text.normal().to_string()
    }
}
