use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MongoDaoError>;

/// Failures that can occur while interacting with MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save document in collection `{collection}`")]
    SaveDocument {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to load document from collection `{collection}`")]
    LoadDocument {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete document from collection `{collection}`")]
    DeleteDocument {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to list documents in collection `{collection}`")]
    ListDocuments {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
}
