use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, Result};

/// Default database name when `MONGO_DB` is not provided.
const DEFAULT_DATABASE: &str = "trailhunt";

/// Connection settings for the MongoDB hunt store.
#[derive(Clone)]
pub struct MongoConfig {
    pub options: ClientOptions,
    pub database_name: String,
}

impl MongoConfig {
    /// Parse a connection URI, optionally overriding the database name.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> Result<Self> {
        let database_name = db_name.unwrap_or(DEFAULT_DATABASE).to_owned();
        let options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;

        Ok(Self {
            options,
            database_name,
        })
    }

    /// Build the config from `MONGO_URI` and the optional `MONGO_DB` variable.
    pub async fn from_env() -> Result<Self> {
        let uri = std::env::var("MONGO_URI")
            .map_err(|_| MongoDaoError::MissingEnvVar { var: "MONGO_URI" })?;
        let db = std::env::var("MONGO_DB").ok();
        Self::from_uri(&uri, db.as_deref()).await
    }
}
