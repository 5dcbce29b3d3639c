use crate::{error::ConfigError, settings::task::ReaderKind};

const MYSQL: &str = include_str!("../templates/mysql.yaml");
const MONGO: &str = include_str!("../templates/mongo.yaml");
const FILE: &str = include_str!("../templates/file.yaml");
const CSV: &str = include_str!("../templates/csv.yaml");
const JSON: &str = include_str!("../templates/json.yaml");

/// Commented starter task file for `reader`.
pub fn template_for(reader: ReaderKind) -> &'static str {
    match reader {
        ReaderKind::Mysql => MYSQL,
        ReaderKind::Mongo => MONGO,
        ReaderKind::File => FILE,
        ReaderKind::Csv => CSV,
        ReaderKind::Json => JSON,
    }
}

pub fn template_named(name: &str) -> Result<&'static str, ConfigError> {
    let reader = match name.to_lowercase().as_str() {
        "mysql" => ReaderKind::Mysql,
        "mongo" => ReaderKind::Mongo,
        "file" => ReaderKind::File,
        "csv" => ReaderKind::Csv,
        "json" => ReaderKind::Json,
        other => return Err(ConfigError::UnknownTemplate(other.to_string())),
    };
    Ok(template_for(reader))
}
