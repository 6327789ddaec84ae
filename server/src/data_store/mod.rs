//! The backend part of the backend: the database interface
//!
//! The primary entry point to this module is the function [get_store_from_env], which returns an
//! object implementing the [ReservationStore] trait. This object can be shared between threads in
//! a global application state and be used to create [ReservationStoreFacade] instances for
//! interaction with the database. These provide a CRUD-like interface, using the data models from
//! the [models] module.
//!
//! The primary implementation of [ReservationStore] ([postgres::PgDataStore]) wraps a PostgreSQL
//! connection pool and its corresponding [ReservationStoreFacade] objects hold one pooled
//! connection each, using the Diesel query DSL for implementing the database interaction.
//!
//! The booking rules themselves are pure functions in [crate::booking::rules]. The store's job is
//! to gather a consistent snapshot of the slot (within a serializable transaction) and apply the
//! rules' verdict.
//!
//! There is also a mock implementation for unittests.

use crate::auth_session::SessionToken;
use crate::booking::rules::{CancellationRejection, ReservationRejection};
use crate::cli_error::CliError;
use crate::cli_error::CliError::UnexpectedStoreError;
use crate::setup;
use crate::setup::ClubSettings;
use auth_token::{AuthToken, Privilege};
use chrono::NaiveDate;
use std::fmt::Debug;

pub mod auth_token;
pub mod models;
pub mod passwords;
mod postgres;
mod schema;
#[cfg(test)]
pub mod store_mock;

/// Get a [ReservationStore] instance, according to the "DATABASE_URL" environment variable.
///
/// The DATABASE_URL must be a PostgreSQL connection url, following the schema
/// "postgres://{user}:{password}@{host}/{database}".
pub fn get_store_from_env() -> Result<impl ReservationStore, CliError> {
    postgres::PgDataStore::new(&setup::get_database_url_from_env()?)
        .map_err(|err| UnexpectedStoreError(err.to_string()))
}

pub type ProfileId = uuid::Uuid;
pub type LocationId = i32;
pub type TableId = i32;
pub type ReservationId = uuid::Uuid;
pub type GuestInviteId = uuid::Uuid;
pub type RestrictionId = uuid::Uuid;

pub trait ReservationStoreFacade {
    /// Create a new member profile (signup). New members get the role `Member` and no key.
    ///
    /// Returns `Err(StoreError::ConflictEntityExists)` if a profile with the same email address
    /// exists already.
    fn create_profile(&mut self, profile: models::NewProfile) -> Result<models::Profile, StoreError>;

    /// Check the given credentials and create a new session token for the member on success.
    ///
    /// Returns `Err(StoreError::AuthenticationFailed)` for unknown email addresses and wrong
    /// passwords alike.
    fn authenticate_with_password(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<SessionToken, StoreError>;

    /// Get an [AuthToken] instance for a client, representing the logged-in member's role.
    ///
    /// Returns `Err(StoreError::AuthenticationFailed)` if the member does not exist anymore or the
    /// session has been revoked by a password change.
    fn get_auth_token_for_session(
        &mut self,
        session_token: &SessionToken,
    ) -> Result<AuthToken, StoreError>;

    fn get_profile(
        &mut self,
        auth_token: &AuthToken,
        profile_id: ProfileId,
    ) -> Result<models::Profile, StoreError>;

    /// Get all member profiles, ordered by name
    fn get_profiles(&mut self, auth_token: &AuthToken) -> Result<Vec<models::Profile>, StoreError>;

    fn update_profile(
        &mut self,
        auth_token: &AuthToken,
        profile_id: ProfileId,
        patch: models::ProfilePatch,
    ) -> Result<models::Profile, StoreError>;

    /// Change the password of the logged-in member after checking the current password.
    ///
    /// All other sessions of the member are invalidated. A new session token for the current
    /// client is returned.
    fn update_password(
        &mut self,
        auth_token: &AuthToken,
        current_password: &str,
        new_password: &str,
    ) -> Result<SessionToken, StoreError>;

    /// Set the password of any member, without knowing the current one (administrative action).
    /// All sessions of the member are invalidated.
    fn set_password(
        &mut self,
        auth_token: &AuthToken,
        profile_id: ProfileId,
        new_password: &str,
    ) -> Result<(), StoreError>;

    /// Create a password reset token for the member with the given email address.
    ///
    /// Returns `Ok(None)` if no such member exists. The token is returned in plain text only
    /// once; the database only stores its digest.
    fn create_password_reset_token(
        &mut self,
        email: &str,
    ) -> Result<Option<(models::Profile, String)>, StoreError>;

    /// Set a new password using a password reset token. The token is consumed and all sessions of
    /// the member are invalidated.
    ///
    /// Returns `Err(StoreError::NotExisting)` if the token is unknown or has expired.
    fn reset_password_with_token(
        &mut self,
        token: &str,
        new_password: &str,
    ) -> Result<ProfileId, StoreError>;

    /// Get all locations, ordered by their sort key
    fn get_locations(&mut self, auth_token: &AuthToken) -> Result<Vec<models::Location>, StoreError>;

    fn get_location(
        &mut self,
        auth_token: &AuthToken,
        location_id: LocationId,
    ) -> Result<models::Location, StoreError>;

    fn get_tables(
        &mut self,
        auth_token: &AuthToken,
        location_id: LocationId,
    ) -> Result<Vec<models::ClubTable>, StoreError>;

    /// Create or update the given locations and their tables. Tables of the given locations that
    /// are not included anymore are removed, unless they are referenced by reservations.
    fn import_locations(
        &mut self,
        auth_token: &AuthToken,
        locations: Vec<models::LocationWithTables>,
    ) -> Result<(), StoreError>;

    /// Get all reservations of the location on the given day, joined with the members' names.
    ///
    /// Active reservations come first, each group ordered by start hour and creation time.
    fn get_reservations_for_day(
        &mut self,
        auth_token: &AuthToken,
        location_id: LocationId,
        date: NaiveDate,
    ) -> Result<Vec<models::FullReservation>, StoreError>;

    /// Get the reservations of a member, starting at `from_date`, in chronological order
    fn get_reservations_of_member(
        &mut self,
        auth_token: &AuthToken,
        profile_id: ProfileId,
        from_date: NaiveDate,
    ) -> Result<Vec<models::Reservation>, StoreError>;

    /// Book a slot for the logged-in member.
    ///
    /// All booking rules of [crate::booking::rules::evaluate_reservation_request] are checked
    /// within one serializable transaction. A violated rule results in
    /// `Err(StoreError::ReservationRejected(_))`. Pending reservations of the slot are approved
    /// when a key holder joins.
    fn create_reservation(
        &mut self,
        auth_token: &AuthToken,
        settings: &ClubSettings,
        request: models::ReservationRequest,
    ) -> Result<models::ReservationUpdate, StoreError>;

    /// Cancel a reservation. Approved reservations of the slot fall back to pending when the last
    /// key holder leaves.
    fn cancel_reservation(
        &mut self,
        auth_token: &AuthToken,
        settings: &ClubSettings,
        reservation_id: ReservationId,
    ) -> Result<models::ReservationUpdate, StoreError>;

    /// Get the guest invites matching the filter, ordered by (date, hour, guest_name)
    fn get_guest_invites(
        &mut self,
        auth_token: &AuthToken,
        filter: SlotFilter,
    ) -> Result<Vec<models::GuestInvite>, StoreError>;

    fn create_guest_invite(
        &mut self,
        auth_token: &AuthToken,
        guest_invite: models::NewGuestInvite,
    ) -> Result<models::GuestInvite, StoreError>;

    fn delete_guest_invite(
        &mut self,
        auth_token: &AuthToken,
        guest_invite_id: GuestInviteId,
    ) -> Result<(), StoreError>;

    /// Get the restrictions matching the filter, ordered by (date, hour)
    fn get_restrictions(
        &mut self,
        auth_token: &AuthToken,
        filter: SlotFilter,
    ) -> Result<Vec<models::ReservationRestriction>, StoreError>;

    fn create_restriction(
        &mut self,
        auth_token: &AuthToken,
        restriction: models::NewReservationRestriction,
    ) -> Result<models::ReservationRestriction, StoreError>;

    fn delete_restriction(
        &mut self,
        auth_token: &AuthToken,
        restriction_id: RestrictionId,
    ) -> Result<(), StoreError>;

    /// Get the free days, optionally starting at `from_date`, in chronological order
    fn get_free_days(
        &mut self,
        auth_token: &AuthToken,
        from_date: Option<NaiveDate>,
    ) -> Result<Vec<models::FreeDay>, StoreError>;

    /// Create a new free day or update the description of the existing one at the same date.
    ///
    /// # return value
    /// - `Ok(true)` if the free day has been created
    /// - `Ok(false)` if an existing free day has been updated
    fn create_or_update_free_day(
        &mut self,
        auth_token: &AuthToken,
        free_day: models::FreeDay,
    ) -> Result<bool, StoreError>;

    fn delete_free_day(&mut self, auth_token: &AuthToken, date: NaiveDate)
        -> Result<(), StoreError>;

    fn get_global_vars(&mut self, auth_token: &AuthToken) -> Result<models::GlobalVars, StoreError>;

    fn update_global_vars(
        &mut self,
        auth_token: &AuthToken,
        global_vars: models::GlobalVars,
    ) -> Result<(), StoreError>;
}

/// Filter options for retrieving slot-bound entities (guest invites and restrictions) from the
/// store
///
/// Can be constructed through the [SlotFilterBuilder]
#[derive(Default, Clone, Debug)]
pub struct SlotFilter {
    /// Only include entities at this location
    pub location_id: Option<LocationId>,
    /// Only include entities on exactly this date
    pub date: Option<NaiveDate>,
    /// Only include entities on or after this date
    pub from_date: Option<NaiveDate>,
    /// Only include entities starting at this hour
    pub start_hour: Option<i32>,
}

impl SlotFilter {
    pub fn builder() -> SlotFilterBuilder {
        SlotFilterBuilder::new()
    }

    /// Checks if an entity at the given slot matches the filter
    ///
    /// Usually, filtering should be done by the database. This function can be used for separate
    /// checks of individual entries in software.
    pub fn matches(&self, location_id: LocationId, date: NaiveDate, start_hour: i32) -> bool {
        if let Some(l) = self.location_id {
            if l != location_id {
                return false;
            }
        }
        if let Some(d) = self.date {
            if d != date {
                return false;
            }
        }
        if let Some(from) = self.from_date {
            if date < from {
                return false;
            }
        }
        if let Some(h) = self.start_hour {
            if h != start_hour {
                return false;
            }
        }
        true
    }
}

/// Builder for constructing [SlotFilter] objects
pub struct SlotFilterBuilder {
    result: SlotFilter,
}

impl SlotFilterBuilder {
    pub fn new() -> Self {
        Self {
            result: SlotFilter::default(),
        }
    }

    pub fn at_location(mut self, location_id: LocationId) -> Self {
        self.result.location_id = Some(location_id);
        self
    }

    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.result.date = Some(date);
        self
    }

    pub fn from_date(mut self, date: NaiveDate) -> Self {
        self.result.from_date = Some(date);
        self
    }

    pub fn at_hour(mut self, start_hour: i32) -> Self {
        self.result.start_hour = Some(start_hour);
        self
    }

    pub fn build(self) -> SlotFilter {
        self.result
    }
}

pub trait ReservationStore: Send + Sync {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn ReservationStoreFacade + 'a>, StoreError>;
}

#[derive(Debug)]
pub enum StoreError {
    /// Connection the database failed. See string description for details.
    ConnectionError(String),
    /// The query could not be executed because of some error not covered by the other members (see
    /// string description)
    QueryError(diesel::result::Error),
    /// Database transaction could not be committed due to a conflicting concurrent transaction
    TransactionConflict,
    /// The requested entity does not exist
    NotExisting,
    /// The entity could not be created because it already exists
    ConflictEntityExists,
    /// The client is not authorized for this action. It would need to be logged in as a member
    /// with a role qualifying for the `required_privilege`.
    PermissionDenied { required_privilege: Privilege },
    /// The provided credentials or session are not valid
    AuthenticationFailed,
    /// The reservation request violates one of the booking rules
    ReservationRejected(ReservationRejection),
    /// The reservation cannot be cancelled
    CancellationRejected(CancellationRejection),
    /// The provided data is invalid, i.e. it does not match the expected ranges or violates a
    /// SQL constraint. See string description for details.
    InvalidInputData(String),
    /// Some data queried from the database could not be deserialized. See string description for
    /// details.
    InvalidDataInDatabase(String),
    /// The system's random number generator failed while creating a salt or token
    RandomnessUnavailable,
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => Self::NotExisting,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => Self::ConflictEntityExists,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::SerializationFailure,
                _,
            ) => Self::TransactionConflict,
            diesel::result::Error::DatabaseError(
                e @ diesel::result::DatabaseErrorKind::ForeignKeyViolation
                | e @ diesel::result::DatabaseErrorKind::CheckViolation,
                info,
            ) => Self::InvalidInputData(
                info.constraint_name()
                    .and_then(postgres::description_for_postgres_constraint)
                    .map(|d| d.to_owned())
                    .unwrap_or_else(|| format!("{:?}", e)),
            ),
            diesel::result::Error::SerializationError(e) => Self::InvalidInputData(e.to_string()),
            diesel::result::Error::DeserializationError(e) => {
                Self::InvalidDataInDatabase(e.to_string())
            }
            _ => Self::QueryError(error),
        }
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(error: r2d2::Error) -> Self {
        Self::ConnectionError(error.to_string())
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Error connecting to database: {}", e),
            Self::QueryError(e) => write!(f, "Error while executing database query: {}", e),
            Self::TransactionConflict => f.write_str("Database transaction could not be committed due to a conflicting concurrent transaction"),
            Self::NotExisting => f.write_str("Database record does not exist."),
            Self::ConflictEntityExists => f.write_str("Database record exists already."),
            Self::PermissionDenied { required_privilege } => {
                write!(f, "Client is not authorized to perform this action. {:?} privilege required.", required_privilege)
            }
            Self::AuthenticationFailed => f.write_str("Authentication failed."),
            Self::ReservationRejected(reason) => write!(f, "Reservation rejected: {}", reason),
            Self::CancellationRejected(reason) => write!(f, "Cancellation rejected: {}", reason),
            Self::InvalidInputData(e) => {
                write!(f, "Data to be stored in database is not valid: {}", e)
            }
            Self::InvalidDataInDatabase(e) => {
                write!(f, "Data queried from database could not be deserialized: {}", e)
            }
            Self::RandomnessUnavailable => f.write_str("Could not generate random bytes."),
        }
    }
}

impl std::error::Error for StoreError {}
