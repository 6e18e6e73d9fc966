//! GDP Trends - batch run over the two World Bank tables.

use anyhow::{Context, Result};
use clap::Parser;
use gdp_trends::config::{Args, Config};
use gdp_trends::pipeline;
use gdp_trends::stats::Report;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();
    let config = Config::resolve(&args).context("reading configuration")?;
    info!(
        "GDP: {}, population: {}, output: {}",
        config.gdp_path.display(),
        config.population_path.display(),
        config.output_dir.display()
    );

    let output = pipeline::run(&config).context("analysis run failed")?;
    info!(
        "saved merged table to {} and {} charts",
        output.merged_path.display(),
        output.charts.len()
    );

    print_report(&output.report, config.top_n);
    Ok(())
}

fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.2}", v)
    }
}

fn print_report(report: &Report, top_n: usize) {
    let (Some(max_year), Some(growth_from), Some(trend_from)) =
        (report.max_year, report.growth_from, report.trend_from)
    else {
        println!("No joined records: nothing to report.");
        return;
    };

    println!();
    match report.best() {
        Some(best) => println!(
            "Best performing country {}-{} (GDP per capita growth): {} ({}%)",
            growth_from,
            max_year,
            best.country,
            fmt_value(best.growth_pct)
        ),
        None => println!(
            "No country has a defined GDP per capita growth for {}-{}",
            growth_from, max_year
        ),
    }

    println!();
    println!("Top {} countries by GDP per capita growth:", top_n);
    println!(
        "{:<40} {:>14} {:>14} {:>10}",
        "Country", "First", "Last", "Growth %"
    );
    for g in report.growth.iter().take(top_n) {
        println!(
            "{:<40} {:>14} {:>14} {:>10}",
            g.country,
            fmt_value(g.first),
            fmt_value(g.last),
            fmt_value(g.growth_pct)
        );
    }

    println!();
    println!(
        "Average GDP per capita trend {}-{}:",
        trend_from, max_year
    );
    for (year, avg) in &report.trend {
        println!("{:<6} {:>14}", year, fmt_value(*avg));
    }
}
