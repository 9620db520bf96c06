use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crf_model::RequiredState;
use crf_rules::RuleRegistry;

use crf_cli::logging::redact_value;
use crf_cli::session::{Evaluation, VisitStatus};

pub fn print_groups(registry: &RuleRegistry) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Group"),
        header_cell("Source"),
        header_cell("Kind"),
        header_cell("Rules"),
        header_cell("Targets"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    for group in registry.iter() {
        let name = if group.is_abstract() {
            dim_cell(format!("{} (abstract)", group.name()))
        } else {
            Cell::new(group.name())
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold)
        };
        table.add_row(vec![
            name,
            Cell::new(group.source_model().unwrap_or("(visit)")),
            Cell::new(group.kind()),
            Cell::new(group.rules().len()),
            Cell::new(group.targets().join(", ")),
        ]);
    }
    println!("{table}");
}

pub fn print_evaluation(evaluation: &Evaluation) {
    println!(
        "Subject: {}",
        redact_value(evaluation.subject_identifier.as_str())
    );
    println!(
        "Visit: {} ({})",
        evaluation.visit_code, evaluation.report_datetime
    );

    let mut table = Table::new();
    table.set_header(vec![header_cell("Target"), header_cell("State")]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    for entry in &evaluation.entries {
        table.add_row(vec![
            Cell::new(&entry.target),
            state_cell(entry.entry_status),
        ]);
    }
    let required = evaluation
        .entries
        .iter()
        .filter(|entry| entry.entry_status.is_required())
        .count();
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!("{required}/{} required", evaluation.entries.len()))
            .add_attribute(Attribute::Bold),
    ]);
    println!("{table}");

    let mut rules = Table::new();
    rules.set_header(vec![
        header_cell("Group"),
        header_cell("Rule"),
        header_cell("Predicate"),
        header_cell("Result"),
        header_cell("State"),
    ]);
    apply_table_style(&mut rules);
    align_column(&mut rules, 3, CellAlignment::Center);
    for fired in &evaluation.fired {
        rules.add_row(vec![
            dim_cell(&fired.group),
            Cell::new(&fired.rule),
            Cell::new(&fired.predicate),
            Cell::new(fired.result),
            state_cell(fired.state),
        ]);
    }
    println!("{rules}");
}

pub fn print_statuses(subject: &str, statuses: &[VisitStatus]) {
    println!("Subject: {}", redact_value(subject));
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Visit"),
        header_cell("Schedule"),
        header_cell("Today"),
        header_cell("HIV"),
        header_cell("ARV"),
        header_cell("Known POS"),
        header_cell("Naive T0"),
        header_cell("Defaulter T0"),
    ]);
    apply_summary_table_style(&mut table);
    for column in 2..8 {
        align_column(&mut table, column, CellAlignment::Center);
    }
    for visit in statuses {
        let status = &visit.status;
        table.add_row(vec![
            Cell::new(&visit.visit_code)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(&visit.survey_schedule),
            option_cell(
                status
                    .current_hiv_result
                    .map(|r| r.as_code())
                    .or(status.todays_result_recorded.then_some("other")),
            ),
            option_cell(status.final_hiv_status.map(|r| r.as_code())),
            option_cell(status.final_arv_status.map(|s| s.as_str())),
            flag_cell(status.known_positive),
            flag_cell(status.naive_at_baseline),
            flag_cell(status.defaulter_at_baseline),
        ]);
    }
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn state_cell(state: RequiredState) -> Cell {
    match state {
        RequiredState::Required => Cell::new(state)
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        RequiredState::NotRequired => dim_cell(state),
    }
}

fn option_cell(value: Option<&str>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
    }
}

fn flag_cell(flag: bool) -> Cell {
    if flag {
        Cell::new("yes").fg(Color::Yellow)
    } else {
        dim_cell("no")
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
