use std::path::PathBuf;
use std::process;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;

use crate::enums::{IssueEndpoint, Profile};
use crate::env::Environment;
use crate::error::{FetchError, PolarisError};
use crate::output::handlers::console::{
    print_issue_summary_to_console, print_projects_to_console, print_sarif_summary_to_console,
};
use crate::output::handlers::json::export_issues_json;
use crate::output::handlers::sarif::export_sarif;
use crate::output::sarif::{convert_issues, convert_values, ConvertOptions, Invocation};
use crate::polaris_api::PolarisApi;
use crate::structs::{Issue, Project, ProjectSelector};
use crate::utils::file::{read_issue_records, remove_if_exists};

mod enums;
mod env;
mod error;
mod macros;
mod output;
mod polaris_api;
mod structs;
mod utils;

const SENTRY_DSN: Option<&str> = option_env!("POLARIS_SARIF_SENTRY_DSN");
const DEFAULT_ISSUES_OUTPUT: &str = "issues_output.json";
const DEFAULT_SARIF_OUTPUT: &str = "polaris_issues.sarif";

#[derive(Debug, Parser)]
#[command(name = "polaris-sarif", version, arg_required_else_help = true)]
/// Export Polaris application-security findings as SARIF
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Print debug output
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    debug: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch a project's issues and write them as JSON and SARIF
    Export(ExportArguments),
    /// List the projects of a portfolio
    Projects(ConnectionArguments),
    /// Convert a previously exported issues file to SARIF
    Convert(ConvertArguments),
    Info,
}

#[derive(Args, Debug)]
struct ConnectionArguments {
    /// Polaris base URL, e.g. https://eu.polaris.blackduck.com
    base_url: String,
    /// Polaris API token
    api_token: String,
    /// Portfolio to list projects from [default: $POLARIS_PORTFOLIO_ID, else the first portfolio]
    #[arg(long, value_name = "ID")]
    portfolio_id: Option<String>,
    /// Maximum number of projects requested per page
    #[arg(long, default_value_t = 100)]
    limit: usize,
}

#[derive(Args, Debug)]
struct ExportArguments {
    #[command(flatten)]
    connection: ConnectionArguments,
    /// Project index (as listed by `projects`) or project ID [default: first project]
    project: Option<ProjectSelector>,
    /// Only fetch issues of this branch
    #[arg(long)]
    branch: Option<String>,
    /// Issue API to read from
    #[arg(long, value_enum, default_value_t = IssueEndpoint::IssueFamilies)]
    endpoint: IssueEndpoint,
    /// SARIF conversion profile
    #[arg(long, value_enum, default_value_t = Profile::Findings)]
    profile: Profile,
    /// Tool name reported in the SARIF driver
    #[arg(long)]
    tool_name: Option<String>,
    /// Raw issues output file
    #[arg(long, default_value = DEFAULT_ISSUES_OUTPUT)]
    issues_output: PathBuf,
    /// SARIF output file
    #[arg(long, default_value = DEFAULT_SARIF_OUTPUT)]
    sarif_output: PathBuf,
}

#[derive(Args, Debug)]
struct ConvertArguments {
    /// Issues file written by `export`
    #[arg(long, default_value = DEFAULT_ISSUES_OUTPUT)]
    input: PathBuf,
    /// SARIF output file
    #[arg(long, default_value = DEFAULT_SARIF_OUTPUT)]
    output: PathBuf,
    /// SARIF conversion profile
    #[arg(long, value_enum, default_value_t = Profile::Findings)]
    profile: Profile,
    /// Tool name reported in the SARIF driver
    #[arg(long)]
    tool_name: Option<String>,
    /// Link used for rule help and the driver's information URI
    #[arg(long)]
    help_uri: Option<String>,
}

fn connect(env: &Environment, args: &ConnectionArguments) -> Result<PolarisApi> {
    Ok(PolarisApi::new(&args.base_url, &args.api_token, env.http_timeout)?.with_progress(true))
}

fn resolve_portfolio_id(
    env: &Environment,
    args: &ConnectionArguments,
    api: &PolarisApi,
    is_debug: bool,
) -> Result<String> {
    if let Some(id) = args.portfolio_id.as_deref().filter(|id| !id.trim().is_empty()) {
        return Ok(id.trim().to_string());
    }
    if !env.portfolio_id.is_empty() {
        return Ok(env.portfolio_id.clone());
    }
    print_dbg!(is_debug, "No portfolio configured. Looking up the first portfolio ...");
    let portfolio_id = api.get_portfolio_id()?;
    print_dbg!(is_debug, "Using portfolio {}", portfolio_id);
    Ok(portfolio_id)
}

fn fetch_projects(
    env: &Environment,
    args: &ConnectionArguments,
    api: &PolarisApi,
    is_debug: bool,
) -> Result<Vec<Project>> {
    let portfolio_id = resolve_portfolio_id(env, args, api, is_debug)?;
    let projects = api.get_projects(&portfolio_id, args.limit)?;
    if projects.is_empty() {
        return Err(err!("No projects found."));
    }
    print_dbg!(is_debug, "Found {} projects in portfolio {}", projects.len(), portfolio_id);
    Ok(projects)
}

fn select_project<'p>(
    projects: &'p [Project],
    selector: Option<&ProjectSelector>,
) -> Result<&'p Project> {
    let Some(selector) = selector else {
        return projects.first().ok_or_else(|| err!("No projects found."));
    };
    selector.select(projects).ok_or_else(|| match selector {
        ProjectSelector::Index(index) => err!(
            "Invalid project index {index}. Valid indexes are 0 to {}.",
            projects.len().saturating_sub(1)
        ),
        ProjectSelector::Id(id) => {
            err!("Invalid project_id {id}. Not found in available projects.")
        }
    })
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn export(env: &Environment, args: &ExportArguments, is_debug: bool) -> Result<()> {
    let started_at = timestamp();
    let api = connect(env, &args.connection)?;
    let projects = fetch_projects(env, &args.connection, &api, is_debug)?;
    let project = select_project(&projects, args.project.as_ref())?;
    print_dbg!(is_debug, "Selected project '{}' ({})", project.name, project.id);

    for path in [&args.issues_output, &args.sarif_output] {
        if remove_if_exists(path)? {
            print_dbg!(is_debug, "Removed previous {}", path.display());
        }
    }

    let raw_issues = match args.endpoint {
        IssueEndpoint::IssueFamilies => {
            let branch_id = match &args.branch {
                Some(name) => Some(api.get_branch_id(&project.id, name)?.ok_or_else(|| {
                    err!("Branch {name} not found in project '{}'.", project.name)
                })?),
                None => None,
            };
            api.get_issue_families(&project.id, branch_id.as_deref())?
        }
        IssueEndpoint::Findings => {
            if args.branch.is_some() {
                print_warn!("--branch is ignored by the findings endpoint.");
            }
            api.get_findings_issues(&project.id)?
        }
    };
    if raw_issues.is_empty() {
        return Err(err!("No issues found for project '{}'.", project.name));
    }
    println!("\nFound {} issues for project '{}':", raw_issues.len(), project.name);
    export_issues_json(&args.issues_output, &raw_issues)?;

    let issues: Vec<Issue> = raw_issues.iter().map(Issue::from_value).collect();
    let options = ConvertOptions::for_profile(args.profile)
        .with_help_uri(api.base_url())
        .with_tool_name(args.tool_name.as_deref());
    let mut sarif = convert_issues(&issues, &options);
    sarif.record_invocation(Invocation {
        execution_successful: true,
        start_time_utc: Some(started_at),
        end_time_utc: Some(timestamp()),
    });
    print_dbg!(
        is_debug,
        "Kept {} of {} issues after filtering",
        sarif.results().len(),
        issues.len()
    );
    export_sarif(&args.sarif_output, &sarif)?;

    print_issue_summary_to_console(project, &issues);
    print_sarif_summary_to_console(&sarif);
    Ok(())
}

fn list_projects(env: &Environment, args: &ConnectionArguments, is_debug: bool) -> Result<()> {
    let api = connect(env, args)?;
    let projects = fetch_projects(env, args, &api, is_debug)?;
    print_projects_to_console(&projects);
    Ok(())
}

fn convert(args: &ConvertArguments, is_debug: bool) -> Result<()> {
    let started_at = timestamp();
    let raw_issues = read_issue_records(&args.input)?;
    print_dbg!(is_debug, "Read {} issues from {}", raw_issues.len(), args.input.display());

    let mut options =
        ConvertOptions::for_profile(args.profile).with_tool_name(args.tool_name.as_deref());
    if let Some(help_uri) = &args.help_uri {
        options = options.with_help_uri(help_uri);
    }
    let mut sarif = convert_values(&raw_issues, &options);
    sarif.record_invocation(Invocation {
        execution_successful: true,
        start_time_utc: Some(started_at),
        end_time_utc: Some(timestamp()),
    });
    export_sarif(&args.output, &sarif)?;
    print_sarif_summary_to_console(&sarif);
    Ok(())
}

fn print_info() -> Result<()> {
    println!("polaris-sarif {}", env!("CARGO_PKG_VERSION"));
    println!("Exports Polaris issues as SARIF {}", output::sarif::SARIF_VERSION);
    println!("Environment: POLARIS_DEBUG, POLARIS_PORTFOLIO_ID, POLARIS_HTTP_TIMEOUT_SECS");
    Ok(())
}

fn should_report(err: &anyhow::Error) -> bool {
    if let Some(polaris_err) = err.downcast_ref::<PolarisError>() {
        return polaris_err.sentry;
    }
    err.downcast_ref::<FetchError>().map_or(false, FetchError::is_reportable)
}

fn main() -> Result<()> {
    let env = env::load_env();
    let cli = Cli::parse();
    let is_debug = env.debug || cli.debug;

    let sentry_guard = sentry::init((
        SENTRY_DSN.unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    let command_result = match &cli.command {
        Command::Export(args) => export(&env, args, is_debug),
        Command::Projects(args) => list_projects(&env, args, is_debug),
        Command::Convert(args) => convert(args, is_debug),
        Command::Info => print_info(),
    };
    match command_result {
        Ok(()) => Ok(()),
        Err(err) => {
            if should_report(&err) {
                sentry_anyhow::capture_anyhow(&err);
            }
            if let Some(status) = err.downcast_ref::<FetchError>().and_then(FetchError::status) {
                print_dbg!(is_debug, "Polaris answered with HTTP {}", status);
            }
            if is_debug {
                print_err!("{:?}", err);
            } else {
                print_err!("{}", err);
            }
            drop(sentry_guard);
            process::exit(1);
        }
    }
}
