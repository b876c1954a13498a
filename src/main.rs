use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use release_plan::cli::orchestration::{run_plan_workflow, write_manifest, CommitFeed, PlanWorkflowArgs};
use release_plan::manifest::DEFAULT_MANIFEST_FILE;
use release_plan::ui;

#[derive(clap::Parser)]
#[command(
    name = "release-plan",
    version,
    about = "Compute component versions and changelogs from conventional commits"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = DEFAULT_MANIFEST_FILE, help = "Manifest of released versions")]
    manifest: PathBuf,

    #[arg(long, help = "JSON file with the commit feed, most recent first")]
    commits: Option<PathBuf>,

    #[arg(long, conflicts_with = "commits", help = "Repository to read commits from [default: .]")]
    repo: Option<PathBuf>,

    #[arg(long, conflicts_with = "commits", help = "Revision of the last release (tag or sha)")]
    since: Option<String>,

    #[arg(long, help = "Release date as YYYY-MM-DD [default: today]")]
    date: Option<NaiveDate>,

    #[arg(long, help = "Print the plan as JSON")]
    json: bool,

    #[arg(long, help = "Only print the summary, not the changelog entries")]
    no_changelog: bool,

    #[arg(long, help = "Record the planned versions in the manifest")]
    write_manifest: bool,

    #[arg(short, long, help = "Skip confirmation prompts")]
    yes: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "More log output (-v, -vv)")]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("release_plan={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let feed = match &args.commits {
        Some(path) => CommitFeed::File(path.clone()),
        None => CommitFeed::Repository {
            path: args.repo.clone().unwrap_or_else(|| PathBuf::from(".")),
            since: args.since.clone(),
        },
    };

    let workflow_args = PlanWorkflowArgs {
        config_path: args.config.clone(),
        manifest_path: args.manifest.clone(),
        feed,
        date: args.date.unwrap_or_else(|| Local::now().date_naive()),
    };

    let result = match run_plan_workflow(&workflow_args) {
        Ok(result) => result,
        Err(e) => {
            ui::display_error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.plan)?);
    } else {
        ui::display_plan(&result.plan, !args.no_changelog);
    }

    if args.write_manifest && !result.plan.is_empty() {
        let prompt = format!(
            "Record {} release(s) in {}?",
            result.plan.candidates.len(),
            args.manifest.display()
        );
        if args.yes || ui::confirm_action(&prompt)? {
            write_manifest(&result, &args.manifest)?;
            if !args.json {
                ui::display_success(&format!("Updated {}", args.manifest.display()));
            }
        } else {
            ui::display_status("Manifest left unchanged");
        }
    }

    Ok(())
}
