use crate::{
    document::{
        client::{DocumentClient, PageRequest},
        error::DocumentError,
    },
    error::ConnectorError,
};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    Client, Collection,
    bson::{Bson, Document, doc},
    options::{ClientOptions, Credential, FindOptions, ServerAddress},
};
use serde_json::{Map, Value as Json};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct MongoSettings {
    pub host: String,
    pub port: u16,
    pub db: String,
    pub user: String,
    pub password: String,
    pub collection: String,
}

pub struct MongoClient {
    client: Option<Client>,
    collection: Collection<Document>,
    db: String,
    name: String,
}

impl MongoClient {
    /// Authenticates against `db` when a user is configured, and pings the
    /// server so an unreachable store fails before any paging starts.
    pub async fn connect(settings: &MongoSettings) -> Result<Self, ConnectorError> {
        let mut options = ClientOptions::builder()
            .hosts(vec![ServerAddress::Tcp {
                host: settings.host.clone(),
                port: Some(settings.port),
            }])
            .build();
        if !settings.user.is_empty() {
            options.credential = Some(
                Credential::builder()
                    .username(settings.user.clone())
                    .password(settings.password.clone())
                    .source(settings.db.clone())
                    .build(),
            );
        }

        let client = Client::with_options(options)?;
        let database = client.database(&settings.db);
        database.run_command(doc! { "ping": 1 }, None).await?;
        info!(
            "Connected to MongoDB {}:{}/{}",
            settings.host, settings.port, settings.db
        );

        Ok(MongoClient {
            collection: database.collection::<Document>(&settings.collection),
            client: Some(client),
            db: settings.db.clone(),
            name: settings.collection.clone(),
        })
    }

    fn ensure_open(&self) -> Result<(), DocumentError> {
        match self.client {
            Some(_) => Ok(()),
            None => Err(DocumentError::Closed(format!("{}.{}", self.db, self.name))),
        }
    }
}

#[async_trait]
impl DocumentClient for MongoClient {
    fn database(&self) -> &str {
        &self.db
    }

    fn collection(&self) -> &str {
        &self.name
    }

    async fn count(&self) -> Result<u64, DocumentError> {
        self.ensure_open()?;
        Ok(self.collection.count_documents(None, None).await?)
    }

    async fn find_page(&self, request: &PageRequest) -> Result<Vec<Map<String, Json>>, DocumentError> {
        self.ensure_open()?;
        let id_field = request.id_field.as_str();
        let filter = match &request.after {
            Some(after) => {
                let after = Bson::try_from(after.clone())
                    .map_err(|e| DocumentError::InvalidId(format!("{after}: {e}")))?;
                doc! { id_field: { "$gt": after } }
            }
            None => Document::new(),
        };

        let projection = if request.fields.is_empty() {
            None
        } else {
            let mut projection = Document::new();
            for field in &request.fields {
                projection.insert(field.as_str(), 1);
            }
            // the identifier is needed to advance the cursor
            projection.insert(id_field, 1);
            Some(projection)
        };

        let options = FindOptions::builder()
            .sort(doc! { id_field: 1 })
            .limit(request.limit as i64)
            .projection(projection)
            .build();

        debug!(?filter, "find");
        let documents: Vec<Document> = self
            .collection
            .find(filter, options)
            .await?
            .try_collect()
            .await?;
        Ok(documents.into_iter().map(document_to_json).collect())
    }

    async fn close(&mut self) -> Result<(), DocumentError> {
        if let Some(client) = self.client.take() {
            client.shutdown().await;
            info!("Disconnected from MongoDB database {}", self.db);
        }
        Ok(())
    }
}

fn document_to_json(document: Document) -> Map<String, Json> {
    match Bson::Document(document).into_relaxed_extjson() {
        Json::Object(map) => map,
        _ => Map::new(),
    }
}
