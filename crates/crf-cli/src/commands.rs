use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, info_span};

use crf_model::{SubjectIdentifier, VisitCode};
use crf_rules::bcpp_registry;

use crf_cli::logging::redact_value;
use crf_cli::session::{Selection, Session, load_config};

use crate::cli::{EvaluateArgs, StatusArgs};
use crate::summary::{print_evaluation, print_groups, print_statuses};

const VISIT_SOURCE: &str = "subjectvisit";

pub fn run_groups(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let registry = bcpp_registry(&config.app_label).context("build rule registry")?;
    info!(
        app_label = %config.app_label,
        groups = registry.len(),
        "listing rule groups"
    );
    print_groups(&registry);
    Ok(())
}

pub fn run_evaluate(config_path: Option<&Path>, args: &EvaluateArgs) -> Result<()> {
    let subject = SubjectIdentifier::new(args.history.subject.as_str())?;
    let visit_code = VisitCode::new(args.visit.as_str())?;
    let selection = match (&args.group, &args.source) {
        (Some(group), _) => Selection::Group(group.clone()),
        (None, Some(source)) => Selection::Source(source.clone()),
        (None, None) => Selection::Source(VISIT_SOURCE.to_string()),
    };
    let span = info_span!(
        "evaluate",
        subject = %redact_value(subject.as_str()),
        visit_code = %visit_code
    );
    let _guard = span.enter();

    let session = Session::load(config_path, &args.history.history)?;
    let evaluation = session.evaluate(&subject, &visit_code, &selection)?;
    info!(
        entries = evaluation.entries.len(),
        rules = evaluation.fired.len(),
        "evaluation complete"
    );
    if args.json {
        let json = serde_json::to_string_pretty(&evaluation.entries)
            .context("serialize metadata entries")?;
        println!("{json}");
    } else {
        print_evaluation(&evaluation);
    }
    Ok(())
}

pub fn run_status(config_path: Option<&Path>, args: &StatusArgs) -> Result<()> {
    let subject = SubjectIdentifier::new(args.history.subject.as_str())?;
    let span = info_span!("status", subject = %redact_value(subject.as_str()));
    let _guard = span.enter();

    let session = Session::load(config_path, &args.history.history)?;
    let statuses = session.statuses(&subject)?;
    info!(visits = statuses.len(), "status resolved");
    if args.json {
        let json = serde_json::to_string_pretty(&statuses).context("serialize statuses")?;
        println!("{json}");
    } else {
        print_statuses(subject.as_str(), &statuses);
    }
    Ok(())
}
