use crate::data_store::StoreError;
use crate::setup::SetupError;
use std::path::PathBuf;

/// Errors of the `rezervari` command line interface. Each one is reported once with the log's
/// error level and ends the process with the [CliError::exit_code].
#[derive(Debug)]
pub enum CliError {
    /// An environment variable of the application setup is missing or invalid
    SetupError(String),
    /// Could not connect to the database server
    CouldNotConnectToDatabase(String),
    /// A data store transaction failed for reasons not caused by the user's input
    UnexpectedStoreError(String),
    /// Binding the web server to the requested port failed
    BindError(std::io::Error),
    /// The web server stopped with an io error
    ServerError(std::io::Error),
    /// Applying the database schema migrations failed
    DatabaseMigrationError(String),
    /// The server refuses to start while database schema migrations are pending
    DatabaseMigrationRequired {
        /// Names of the pending migrations
        missing_migrations: Vec<String>,
    },
    /// A locations file could not be opened, read or written
    FileError { path: PathBuf, error: String },
    /// The contents of a locations file are not a consistent club configuration
    InvalidLocations(String),
    /// No member account exists for the given email address
    UnknownMember { email: String },
    /// The given role name is none of `member`, `coach` and `founder`
    InvalidRole(String),
    /// The data store rejected the provided data
    DataError(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::SetupError(_)
            | CliError::FileError { .. }
            | CliError::InvalidLocations(_)
            | CliError::UnknownMember { .. }
            | CliError::InvalidRole(_)
            | CliError::DataError(_) => 1,
            CliError::UnexpectedStoreError(_) => 2,
            CliError::BindError(_) | CliError::ServerError(_) => 3,
            CliError::CouldNotConnectToDatabase(_) | CliError::DatabaseMigrationError(_) => 4,
            CliError::DatabaseMigrationRequired { .. } => 5,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::SetupError(e) => write!(f, "Setup invalid: {}", e),
            CliError::CouldNotConnectToDatabase(e) => {
                write!(f, "Could not connect to database: {}", e)
            }
            CliError::UnexpectedStoreError(e) => write!(f, "Unexpected error in data store: {}", e),
            CliError::BindError(e) => {
                write!(f, "Could not bind web server socket to TCP port: {}", e)
            }
            CliError::ServerError(e) => write!(f, "Web server failed: {}", e),
            CliError::DatabaseMigrationError(e) => {
                write!(f, "Error while applying database migrations: {}", e)
            }
            CliError::DatabaseMigrationRequired { missing_migrations } => write!(
                f,
                "Database migration required (run `rezervari migrate-database`). Missing migrations: {}",
                missing_migrations.join(", ")
            ),
            CliError::FileError { path, error } => write!(f, "{:?}: {}", path, error),
            CliError::InvalidLocations(e) => write!(f, "Invalid location configuration: {}", e),
            CliError::UnknownMember { email } => {
                write!(f, "No member with email address {}", email)
            }
            CliError::InvalidRole(e) => f.write_str(e),
            CliError::DataError(e) => write!(f, "Provided data is invalid: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConnectionError(e) => Self::CouldNotConnectToDatabase(e),
            StoreError::QueryError(e) => Self::UnexpectedStoreError(e.to_string()),
            StoreError::TransactionConflict => {
                Self::UnexpectedStoreError("Concurrent transaction conflict".to_string())
            }
            StoreError::InvalidDataInDatabase(e) => Self::UnexpectedStoreError(e),
            StoreError::RandomnessUnavailable => {
                Self::UnexpectedStoreError("Could not generate random bytes".to_string())
            }
            StoreError::PermissionDenied { required_privilege } => Self::UnexpectedStoreError(
                format!("Command line lacks privilege {:?}", required_privilege),
            ),
            StoreError::NotExisting => Self::DataError("Item not existing".to_string()),
            StoreError::ConflictEntityExists => {
                Self::DataError("A member with this email address exists already".to_string())
            }
            StoreError::AuthenticationFailed => {
                Self::DataError("Authentication failed".to_string())
            }
            StoreError::ReservationRejected(reason) => Self::DataError(reason.to_string()),
            StoreError::CancellationRejected(reason) => Self::DataError(reason.to_string()),
            StoreError::InvalidInputData(e) => Self::DataError(e),
        }
    }
}

impl From<SetupError> for CliError {
    fn from(value: SetupError) -> Self {
        Self::SetupError(value.to_string())
    }
}

impl From<diesel::ConnectionError> for CliError {
    fn from(value: diesel::ConnectionError) -> Self {
        Self::CouldNotConnectToDatabase(value.to_string())
    }
}
