use connectors::source::DataSource;
use model::{error::ModelError, records::record::Record, transform::appendix::Appendix};

/// Per-page projection and appendices, applied through the source so that
/// each source variant decides how an appendix lands on its records.
#[derive(Debug, Clone, Default)]
pub struct PageTransformer {
    columns: Vec<String>,
    appendices: Vec<Appendix>,
}

impl PageTransformer {
    pub fn new(columns: Vec<String>, appendices: Vec<Appendix>) -> Self {
        Self {
            columns,
            appendices,
        }
    }

    pub fn apply(&self, source: &dyn DataSource, records: Vec<Record>) -> Vec<Record> {
        let records = source.project(records, &self.columns);
        source.decorate(records, &self.appendices)
    }

    /// Queue items in page order.
    pub fn serialize(records: &[Record]) -> Result<Vec<String>, ModelError> {
        records.iter().map(Record::to_queue_item).collect()
    }
}
