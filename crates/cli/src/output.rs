use crate::error::CliError;
use engine_core::progress::ProgressStatus;
use serde_json::Value as Json;

pub fn print_status(status: &ProgressStatus, as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(status)?);
    } else {
        print!("{}", status_table(status));
    }
    Ok(())
}

fn status_table(status: &ProgressStatus) -> String {
    let counter = |value: Option<u64>| value.map_or_else(|| "n/a".to_string(), |v| v.to_string());

    let mut rows = vec![
        ("Stage".to_string(), status.stage.to_string()),
        ("Count".to_string(), counter(status.count)),
        ("Total".to_string(), counter(status.total)),
        ("Page".to_string(), counter(status.page)),
        (format!("Cursor ({})", status.cursor_field), plain(&status.cursor)),
        ("Queued".to_string(), status.queued.to_string()),
    ];
    for (name, value) in &status.identifiers {
        rows.push((name.clone(), plain(value)));
    }
    if let Some(record) = &status.last_record {
        rows.push(("Last record".to_string(), record.to_string()));
    }

    let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    let mut table = format!("Progress of task '{}':\n", status.task);
    table.push_str(&"-".repeat(width + 20));
    table.push('\n');
    for (name, value) in &rows {
        table.push_str(&format!("{name:<width$}  {value}\n"));
    }
    table
}

fn plain(value: &Json) -> String {
    match value {
        Json::Null => "n/a".to_string(),
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}
