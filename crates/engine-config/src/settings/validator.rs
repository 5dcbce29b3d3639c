use crate::{
    error::ConfigError,
    settings::task::{ReaderKind, StateBackend, TaskConfig},
};
use model::transform::appendix::Appendix;
use std::path::Path;
use tracing::{debug, info};

/// Checks a task configuration before anything connects. Every failed check
/// is collected so one run reports them all.
pub struct TaskValidator<'a> {
    config: &'a TaskConfig,
}

impl<'a> TaskValidator<'a> {
    pub fn new(config: &'a TaskConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        self.validate_reader(&mut errors);
        self.validate_appendices(&mut errors);
        self.validate_sync(&mut errors);
        self.validate_state(&mut errors);

        if !errors.is_empty() {
            return Err(ConfigError::ValidationFailed(errors));
        }
        info!("Task config for reader '{}' validated", self.config.reader);
        Ok(())
    }

    fn validate_reader(&self, errors: &mut Vec<String>) {
        let config = self.config;
        match config.reader {
            ReaderKind::Mysql => {
                require(errors, "mysql.db", &config.mysql.db);
                require(errors, "mysql.table", &config.mysql.table);
                // key-range paging needs a primary key
                require(errors, "mysql.pk", &config.mysql.pk);
            }
            ReaderKind::Mongo => {
                require(errors, "mongo.db", &config.mongo.db);
                require(errors, "mongo.collection", &config.mongo.collection);
                require(errors, "mongo.pk", &config.mongo.pk);
            }
            ReaderKind::File | ReaderKind::Csv => {
                require_path(errors, "file.path", config.file.path.as_deref());
                let delimiter = &config.file.delimiter;
                let mut chars = delimiter.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii() => {}
                    _ => errors.push(format!(
                        "file.delimiter must be a single ASCII character, got {delimiter:?}"
                    )),
                }
            }
            ReaderKind::Json => {
                require_path(errors, "json.path", config.json.path.as_deref());
            }
        }
    }

    fn validate_appendices(&self, errors: &mut Vec<String>) {
        if !self.config.keyed_records() {
            debug!("headerless file, appendices are taken verbatim");
            return;
        }
        for raw in self.config.raw_appendices() {
            debug!("check appendices: {raw}");
            if let Err(e) = raw.parse::<Appendix>() {
                errors.push(e.to_string());
            }
        }
    }

    fn validate_sync(&self, errors: &mut Vec<String>) {
        if self.config.sync.limit == 0 {
            errors.push("sync.limit must be at least 1".into());
        }
        if self.config.sync.scale == 0 {
            errors.push("sync.scale must be at least 1".into());
        }
    }

    fn validate_state(&self, errors: &mut Vec<String>) {
        let state = &self.config.state;
        require(errors, "state.key", &state.key);
        match state.backend {
            StateBackend::Redis => require(errors, "state.url", &state.url),
            StateBackend::Sled => require_path(errors, "state.path", Some(&state.path)),
        }
    }
}

fn require(errors: &mut Vec<String>, name: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(format!("{name} is required"));
    }
}

fn require_path(errors: &mut Vec<String>, name: &str, path: Option<&Path>) {
    if path.is_none_or(|p| p.as_os_str().is_empty()) {
        errors.push(format!("{name} is required"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_of(yaml: &str) -> Vec<String> {
        match TaskConfig::from_yaml(yaml) {
            Err(ConfigError::ValidationFailed(errors)) => errors,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn relational_reader_needs_primary_key() {
        let errors = errors_of("reader: mysql\nmysql:\n  db: shop\n  table: t\n  pk: ''\n");
        assert_eq!(errors, vec!["mysql.pk is required".to_string()]);
    }

    #[test]
    fn malformed_appendix_is_rejected() {
        let errors = errors_of(
            "reader: mongo\nmongo:\n  db: app\n  collection: users\n  appendices: [region]\n",
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("region"));
    }

    #[test]
    fn all_failures_are_reported() {
        let errors = errors_of("reader: file\nfile:\n  delimiter: ';;'\nsync:\n  limit: 0\n");
        assert_eq!(errors.len(), 3, "{errors:?}");
    }

    #[test]
    fn headerless_file_takes_any_appendix() {
        let config = TaskConfig::from_yaml(
            "reader: file\nfile:\n  path: /tmp/x\n  header: false\n  appendices: [plain]\n",
        );
        assert!(config.is_ok());
    }
}
