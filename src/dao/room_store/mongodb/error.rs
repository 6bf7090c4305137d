use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Server code for a write conflict between concurrent operations.
const WRITE_CONFLICT: i32 = 112;
/// Server code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
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
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to load room state")]
    LoadRoom {
        #[source]
        source: MongoError,
    },
    #[error("room state document is missing")]
    MissingRoom,
    #[error("failed to update room state")]
    UpdateRoom {
        #[source]
        source: MongoError,
    },
    #[error("failed to save participant `{username}`")]
    SaveParticipant {
        username: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load participants")]
    LoadParticipants {
        #[source]
        source: MongoError,
    },
    #[error("failed to save response of `{username}` for question {question_id}")]
    SaveResponse {
        question_id: u32,
        username: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load responses for question {question_id}")]
    LoadResponses {
        question_id: u32,
        #[source]
        source: MongoError,
    },
    #[error("failed to award points for question {question_id}")]
    AwardPoints {
        question_id: u32,
        #[source]
        source: MongoError,
    },
    #[error("failed to purge collection `{collection}`")]
    Purge {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
}

impl MongoDaoError {
    fn source_error(&self) -> Option<&MongoError> {
        match self {
            MongoDaoError::MissingEnvVar { .. } | MongoDaoError::MissingRoom => None,
            MongoDaoError::InvalidUri { source, .. }
            | MongoDaoError::ClientConstruction { source }
            | MongoDaoError::InitialPing { source, .. }
            | MongoDaoError::HealthPing { source }
            | MongoDaoError::EnsureIndex { source, .. }
            | MongoDaoError::LoadRoom { source }
            | MongoDaoError::UpdateRoom { source }
            | MongoDaoError::SaveParticipant { source, .. }
            | MongoDaoError::LoadParticipants { source }
            | MongoDaoError::SaveResponse { source, .. }
            | MongoDaoError::LoadResponses { source, .. }
            | MongoDaoError::AwardPoints { source, .. }
            | MongoDaoError::Purge { source, .. } => Some(source),
        }
    }

    /// Whether the failure is lock/write contention that a retry can resolve.
    pub fn is_contention(&self) -> bool {
        self.source_error().is_some_and(is_write_conflict)
    }
}

/// Two upserts racing on the same unique key surface as a duplicate key error;
/// the loser succeeds when retried.
pub(super) fn is_duplicate_key(err: &MongoError) -> bool {
    server_code(err) == Some(DUPLICATE_KEY)
}

fn is_write_conflict(err: &MongoError) -> bool {
    matches!(server_code(err), Some(WRITE_CONFLICT) | Some(DUPLICATE_KEY))
        || err.contains_label(mongodb::error::TRANSIENT_TRANSACTION_ERROR)
}

fn server_code(err: &MongoError) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => Some(write_error.code),
        ErrorKind::Command(command_error) => Some(command_error.code),
        _ => None,
    }
}
