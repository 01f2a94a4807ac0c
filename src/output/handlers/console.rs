use colored::Colorize;

use crate::output::common::{
    get_issue_summary, get_issue_summary_table_rows, get_project_table_rows, get_sarif_table_rows,
    get_severity_breakdown,
};
use crate::output::sarif::SarifLog;
use crate::structs::{Issue, Project};
use crate::utils::table::print_table;
use crate::{console_label, console_note, print_header};

pub fn print_projects_to_console(projects: &[Project]) {
    print_header!("Available Projects");
    print_table(&["Index", "Name", "ID"], &get_project_table_rows(projects));
    println!(
        "{}",
        console_note!("Pass an index or an ID as the PROJECT argument of the export command")
    );
}

pub fn print_issue_summary_to_console(project: &Project, issues: &[Issue]) {
    println!();
    print_header!("Issues for '{}'", project.name);
    print_table(
        &["Critical", "High", "Medium", "Low", "Info", "Unrated", "Dismissed", "Total"],
        &get_issue_summary_table_rows(&get_issue_summary(issues)),
    );
    for (severity, count) in get_severity_breakdown(issues) {
        println!("{} {}", console_label!(severity: severity), count);
    }
}

pub fn print_sarif_summary_to_console(sarif: &SarifLog) {
    println!();
    print_header!("SARIF");
    print_table(&["Rules", "Artifacts", "Results"], &get_sarif_table_rows(sarif));
}
