use crate::{
    document::{
        client::{DocumentClient, PageRequest},
        error::DocumentError,
    },
    error::AdapterError,
    source::DataSource,
};
use async_trait::async_trait;
use model::{
    core::value::Value,
    pagination::{
        cursor::{Cursor, CursorKind},
        page::FetchResult,
    },
    records::{record::Record, row::RowData},
};
use std::time::Instant;
use tracing::{debug, info};

pub const DEFAULT_ID_FIELD: &str = "_id";

/// A document collection paged by ascending identifier.
pub struct CollectionSource<C: DocumentClient> {
    client: C,
    id_field: String,
    columns: Vec<String>,
}

impl<C: DocumentClient> CollectionSource<C> {
    pub fn new(client: C, id_field: impl Into<String>, columns: Vec<String>) -> Result<Self, AdapterError> {
        let id_field = id_field.into();
        if id_field.trim().is_empty() {
            return Err(AdapterError::MissingProperty("pk".into()));
        }
        Ok(CollectionSource {
            client,
            id_field,
            columns,
        })
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

#[async_trait]
impl<C: DocumentClient> DataSource for CollectionSource<C> {
    fn describe(&self) -> String {
        format!("{}.{}", self.client.database(), self.client.collection())
    }

    fn cursor_kind(&self) -> CursorKind {
        CursorKind::Key
    }

    fn cursor_field(&self) -> &str {
        &self.id_field
    }

    async fn count(&mut self) -> Result<u64, AdapterError> {
        let total = self.client.count().await?;
        info!(source = %self.describe(), total, "counted documents");
        Ok(total)
    }

    async fn next_page(
        &mut self,
        cursor: &Cursor,
        page_size: usize,
    ) -> Result<FetchResult, AdapterError> {
        let start = Instant::now();
        let after = match cursor {
            Cursor::None => None,
            Cursor::Key { value, .. } => Some(value.to_json()),
            other => {
                return Err(DocumentError::InvalidId(format!("{other:?}")).into());
            }
        };
        let request = PageRequest {
            id_field: self.id_field.clone(),
            after,
            fields: self.columns.clone(),
            limit: page_size,
        };
        debug!(?request, "fetching documents");

        let documents = self.client.find_page(&request).await?;
        let next_cursor = match documents.last() {
            Some(doc) => {
                let id = doc
                    .get(&self.id_field)
                    .ok_or_else(|| DocumentError::MissingId(self.id_field.clone()))?;
                Cursor::key(self.id_field.clone(), Value::from_json(id.clone()))
            }
            None => Cursor::None,
        };

        let entity = self.client.collection().to_string();
        let records = documents
            .into_iter()
            .map(|doc| Record::Row(RowData::from_json(&entity, doc)))
            .collect();

        Ok(FetchResult::new(
            records,
            next_cursor,
            page_size,
            start.elapsed().as_millis(),
        ))
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        self.client.close().await?;
        info!(source = %self.describe(), "connection released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value as Json, json};
    use std::sync::Mutex;

    /// Documents keyed by ObjectId-like hex strings wrapped as `{"$oid": ..}`.
    struct ScriptedCollection {
        docs: Vec<Json>,
        requests: Mutex<Vec<PageRequest>>,
    }

    fn oid(n: u8) -> Json {
        json!({ "$oid": format!("{:024x}", n) })
    }

    fn oid_hex(id: &Json) -> String {
        id["$oid"].as_str().unwrap_or_default().to_string()
    }

    #[async_trait]
    impl DocumentClient for ScriptedCollection {
        fn database(&self) -> &str {
            "app"
        }

        fn collection(&self) -> &str {
            "users"
        }

        async fn count(&self) -> Result<u64, DocumentError> {
            Ok(self.docs.len() as u64)
        }

        async fn find_page(
            &self,
            request: &PageRequest,
        ) -> Result<Vec<Map<String, Json>>, DocumentError> {
            self.requests.lock().unwrap().push(request.clone());
            let after = request.after.as_ref().map(oid_hex);
            Ok(self
                .docs
                .iter()
                .filter(|doc| match &after {
                    Some(after) => oid_hex(&doc["_id"]) > *after,
                    None => true,
                })
                .take(request.limit)
                .filter_map(|doc| doc.as_object().cloned())
                .collect())
        }

        async fn close(&mut self) -> Result<(), DocumentError> {
            Ok(())
        }
    }

    fn collection() -> ScriptedCollection {
        ScriptedCollection {
            docs: (1..=3)
                .map(|n| json!({ "_id": oid(n), "name": format!("user{n}") }))
                .collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn pages_after_last_identifier() {
        let mut source = CollectionSource::new(collection(), DEFAULT_ID_FIELD, vec![]).unwrap();
        assert_eq!(source.count().await.unwrap(), 3);

        let page = source.next_page(&Cursor::None, 2).await.unwrap();
        assert_eq!(page.row_count, 2);
        assert_eq!(page.next_cursor, Cursor::key("_id", Value::Json(oid(2))));

        // the cursor is stored and re-read as plain JSON
        let stored = page.next_cursor.to_json();
        let resumed = Cursor::from_checkpoint(CursorKind::Key, "_id", Some(stored));
        let page = source.next_page(&resumed, 2).await.unwrap();
        assert_eq!(page.records[0].to_json()["name"], json!("user3"));
        assert!(page.reached_end);

        let requests = source.client().requests.lock().unwrap();
        assert_eq!(requests[1].after, Some(oid(2)));
    }

    #[tokio::test]
    async fn exhausted_collection_yields_no_cursor() {
        let mut source = CollectionSource::new(collection(), "_id", vec![]).unwrap();
        let page = source
            .next_page(&Cursor::key("_id", Value::Json(oid(3))), 10)
            .await
            .unwrap();
        assert!(page.is_empty());
        assert_eq!(page.next_cursor, Cursor::None);
    }

    #[test]
    fn identifier_is_required() {
        assert!(CollectionSource::new(collection(), " ", vec![]).is_err());
    }
}
