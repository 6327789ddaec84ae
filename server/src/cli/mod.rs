//! Functions behind the subcommands of the command line interface
pub mod database_migration;
pub mod file_io;
pub mod manage_members;
mod util;

/// A key for creating [crate::data_store::auth_token::AuthToken]s with founder privileges
/// without a member session. Only the cli functions create it.
pub struct CliAuthTokenKey {
    _private: (),
}

impl CliAuthTokenKey {
    #[allow(clippy::new_without_default)] // We always want to explicitly create these objects
    pub fn new() -> Self {
        Self { _private: () }
    }
}
