use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use matrixci::{expand, is_acceptable, validate, PipelineDescriptor, Severity};

/// Validate a CI pipeline descriptor and expand its job matrix
#[derive(Parser)]
#[command(name = "matrixci")]
#[command(about = "Validate a CI pipeline descriptor and expand its job matrix", long_about = None)]
struct Args {
    /// Path to the descriptor YAML file
    descriptor: PathBuf,

    /// Emit the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let descriptor = PipelineDescriptor::from_file(&args.descriptor)
        .with_context(|| format!("failed to load descriptor from {}", args.descriptor.display()))?;
    let jobs = expand(&descriptor);
    let findings = validate(&descriptor);

    if args.json {
        let report = json!({
            "file": args.descriptor,
            "jobs": jobs,
            "findings": findings,
            "acceptable": is_acceptable(&findings),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{}: {} jobs across {} stages",
            args.descriptor.display(),
            jobs.len(),
            descriptor.stages.len()
        );
        for job in &jobs {
            let marker = if job.allow_failure { " (allowed to fail)" } else { "" };
            println!(
                "  [{}] {} os={} python={}{}",
                job.stage,
                job.env.canonical(),
                job.os,
                job.python.as_deref().unwrap_or("-"),
                marker,
            );
        }
        for finding in &findings {
            println!("{finding}");
        }
    }

    let errors = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count();
    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}
