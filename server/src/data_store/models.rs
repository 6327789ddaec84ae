use crate::data_store::auth_token::{EnumMemberNotExistingError, MemberRole};
use crate::data_store::{LocationId, ProfileId, ReservationId, TableId};
use chrono::{naive::NaiveDate, DateTime, Utc};
use diesel::deserialize::FromSql;
use diesel::prelude::*;
use diesel::query_builder::bind_collector::RawBytesBindCollector;
use diesel::serialize::ToSql;
use diesel::{AsExpression, FromSqlRow};
use uuid::Uuid;

#[derive(Clone, Debug, Queryable, Selectable)]
#[diesel(table_name=super::schema::profiles)]
pub struct Profile {
    pub id: ProfileId,
    pub email: String,
    pub name: String,
    pub role: MemberRole,
    pub has_key: bool,
    pub password_hash: String,
    pub sessions_valid_after: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Profile> for rezervari_api_types::Profile {
    fn from(value: Profile) -> Self {
        Self {
            id: value.id,
            email: value.email,
            name: value.name,
            role: value.role.into(),
            has_key: value.has_key,
            created_at: value.created_at,
        }
    }
}

/// Data of a new member profile, as entered at signup. The password is hashed by the data_store.
pub struct NewProfile {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Insertable)]
#[diesel(table_name=super::schema::profiles)]
pub struct ProfileInsert {
    pub id: ProfileId,
    pub email: String,
    pub name: String,
    pub role: MemberRole,
    pub has_key: bool,
    pub password_hash: String,
    pub sessions_valid_after: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, AsChangeset)]
#[diesel(table_name=super::schema::profiles)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub role: Option<MemberRole>,
    pub has_key: Option<bool>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.role.is_none() && self.has_key.is_none()
    }
}

impl From<rezervari_api_types::ProfilePatch> for ProfilePatch {
    fn from(value: rezervari_api_types::ProfilePatch) -> Self {
        Self {
            name: value.name,
            role: value.role.map(|r| r.into()),
            has_key: value.has_key,
        }
    }
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name=super::schema::locations)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub weekday_open_hour: i32,
    pub weekday_close_hour: i32,
    pub weekend_open_hour: i32,
    pub weekend_close_hour: i32,
    /// Length of a reservation slot in hours
    pub slot_duration: i32,
    pub sort_key: i32,
}

impl Location {
    pub fn into_api(self, tables: Vec<ClubTable>) -> rezervari_api_types::Location {
        rezervari_api_types::Location {
            id: self.id,
            name: self.name,
            weekday_open_hour: self.weekday_open_hour,
            weekday_close_hour: self.weekday_close_hour,
            weekend_open_hour: self.weekend_open_hour,
            weekend_close_hour: self.weekend_close_hour,
            slot_duration: self.slot_duration,
            sort_key: self.sort_key,
            tables: tables.into_iter().map(|t| t.into()).collect(),
        }
    }
}

/// A location together with its tables, as used for importing and exporting the club's static
/// configuration
pub struct LocationWithTables {
    pub location: Location,
    pub tables: Vec<ClubTable>,
}

impl LocationWithTables {
    pub fn from_api(value: rezervari_api_types::Location) -> Self {
        let location_id = value.id;
        Self {
            location: Location {
                id: value.id,
                name: value.name,
                weekday_open_hour: value.weekday_open_hour,
                weekday_close_hour: value.weekday_close_hour,
                weekend_open_hour: value.weekend_open_hour,
                weekend_close_hour: value.weekend_close_hour,
                slot_duration: value.slot_duration,
                sort_key: value.sort_key,
            },
            tables: value
                .tables
                .into_iter()
                .map(|t| ClubTable {
                    id: t.id,
                    location_id,
                    name: t.name,
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name=super::schema::club_tables)]
pub struct ClubTable {
    pub id: TableId,
    pub location_id: LocationId,
    pub name: String,
}

impl From<ClubTable> for rezervari_api_types::ClubTable {
    fn from(value: ClubTable) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

#[derive(Debug, PartialEq, FromSqlRow, AsExpression, Eq, Clone, Copy)]
#[diesel(sql_type = diesel::sql_types::Integer)]
#[repr(i32)]
pub enum ReservationStatus {
    Pending = 0,
    Approved = 1,
    Cancelled = 2,
}

impl ReservationStatus {
    /// Active reservations occupy a seat in their slot
    pub fn is_active(&self) -> bool {
        *self != ReservationStatus::Cancelled
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "în așteptare",
            ReservationStatus::Approved => "confirmată",
            ReservationStatus::Cancelled => "anulată",
        }
    }
}

impl TryFrom<i32> for ReservationStatus {
    type Error = EnumMemberNotExistingError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReservationStatus::Pending),
            1 => Ok(ReservationStatus::Approved),
            2 => Ok(ReservationStatus::Cancelled),
            _ => Err(EnumMemberNotExistingError {
                member_value: value,
                enum_name: "ReservationStatus",
            }),
        }
    }
}

impl From<ReservationStatus> for i32 {
    fn from(value: ReservationStatus) -> Self {
        value as i32
    }
}

impl From<ReservationStatus> for rezervari_api_types::ReservationStatus {
    fn from(value: ReservationStatus) -> Self {
        match value {
            ReservationStatus::Pending => Self::Pending,
            ReservationStatus::Approved => Self::Approved,
            ReservationStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl<DB> ToSql<diesel::sql_types::Integer, DB> for ReservationStatus
where
    DB: diesel::backend::Backend,
    for<'c> DB: diesel::backend::Backend<BindCollector<'c> = RawBytesBindCollector<DB>>,
    i32: ToSql<diesel::sql_types::Integer, DB>,
{
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, DB>,
    ) -> diesel::serialize::Result {
        let value: i32 = (*self).into();
        value.to_sql(&mut out.reborrow())
    }
}

impl<DB> FromSql<diesel::sql_types::Integer, DB> for ReservationStatus
where
    DB: diesel::backend::Backend,
    i32: FromSql<diesel::sql_types::Integer, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
        let x = i32::from_sql(bytes)?;
        x.try_into()
            .map_err(|e: EnumMemberNotExistingError| e.to_string().into())
    }
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name=super::schema::reservations)]
pub struct Reservation {
    pub id: ReservationId,
    pub created_at: DateTime<Utc>,
    pub user_id: ProfileId,
    pub location_id: LocationId,
    pub table_id: Option<TableId>,
    pub start_date: NaiveDate,
    pub start_hour: i32,
    pub duration: i32,
    pub status: ReservationStatus,
}

impl From<Reservation> for rezervari_api_types::Reservation {
    fn from(value: Reservation) -> Self {
        Self {
            id: value.id,
            created_at: value.created_at,
            user_id: value.user_id,
            user_name: None,
            location_id: value.location_id,
            table_id: value.table_id,
            start_date: value.start_date,
            start_hour: value.start_hour,
            duration: value.duration,
            status: value.status.into(),
        }
    }
}

/// A reservation joined with the name of the member holding it, for showing the roster of a day
#[derive(Clone, Debug)]
pub struct FullReservation {
    pub reservation: Reservation,
    pub user_name: String,
}

impl From<FullReservation> for rezervari_api_types::Reservation {
    fn from(value: FullReservation) -> Self {
        let mut result: rezervari_api_types::Reservation = value.reservation.into();
        result.user_name = Some(value.user_name);
        result
    }
}

/// Parameters of a reservation request by a member
#[derive(Clone, Debug)]
pub struct ReservationRequest {
    pub location_id: LocationId,
    pub table_id: Option<TableId>,
    pub date: NaiveDate,
    pub hour: i32,
}

impl From<rezervari_api_types::CreateReservationRequest> for ReservationRequest {
    fn from(value: rezervari_api_types::CreateReservationRequest) -> Self {
        Self {
            location_id: value.location_input,
            table_id: value.table_id_input,
            date: value.start_date_input,
            hour: value.start_hour_input,
        }
    }
}

/// Result of creating or cancelling a reservation: the affected reservation plus the ids of other
/// reservations in the same slot, whose status has been changed as a consequence.
#[derive(Clone, Debug)]
pub struct ReservationUpdate {
    pub reservation: Reservation,
    pub changed_status: Vec<ReservationId>,
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name=super::schema::guest_invites)]
pub struct GuestInvite {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user_id: ProfileId,
    pub location_id: LocationId,
    pub guest_name: String,
    pub start_date: NaiveDate,
    pub start_hour: i32,
    /// A special invite occupies the whole slot
    pub special: bool,
}

impl From<GuestInvite> for rezervari_api_types::GuestInvite {
    fn from(value: GuestInvite) -> Self {
        Self {
            id: value.id,
            created_at: value.created_at,
            user_id: value.user_id,
            location_id: value.location_id,
            guest_name: value.guest_name,
            start_date: value.start_date,
            start_hour: value.start_hour,
            special: value.special,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewGuestInvite {
    pub location_id: LocationId,
    pub guest_name: String,
    pub start_date: NaiveDate,
    pub start_hour: i32,
    pub special: bool,
}

impl From<rezervari_api_types::NewGuestInvite> for NewGuestInvite {
    fn from(value: rezervari_api_types::NewGuestInvite) -> Self {
        Self {
            location_id: value.location_id,
            guest_name: value.guest_name,
            start_date: value.start_date,
            start_hour: value.start_hour,
            special: value.special,
        }
    }
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name=super::schema::reservation_restrictions)]
pub struct ReservationRestriction {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub location_id: LocationId,
    pub date: NaiveDate,
    pub start_hour: i32,
    pub message: String,
    pub user_id: ProfileId,
}

impl From<ReservationRestriction> for rezervari_api_types::ReservationRestriction {
    fn from(value: ReservationRestriction) -> Self {
        Self {
            id: value.id,
            location_id: value.location_id,
            date: value.date,
            start_hour: value.start_hour,
            message: value.message,
            user_id: value.user_id,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewReservationRestriction {
    pub location_id: LocationId,
    pub date: NaiveDate,
    pub start_hour: i32,
    pub message: String,
}

impl From<rezervari_api_types::NewReservationRestriction> for NewReservationRestriction {
    fn from(value: rezervari_api_types::NewReservationRestriction) -> Self {
        Self {
            location_id: value.location_id,
            date: value.date,
            start_hour: value.start_hour,
            message: value.message,
        }
    }
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name=super::schema::free_days)]
pub struct FreeDay {
    pub date: NaiveDate,
    pub description: String,
}

impl From<FreeDay> for rezervari_api_types::FreeDay {
    fn from(value: FreeDay) -> Self {
        Self {
            date: value.date,
            description: value.description,
        }
    }
}

impl From<rezervari_api_types::FreeDay> for FreeDay {
    fn from(value: rezervari_api_types::FreeDay) -> Self {
        Self {
            date: value.date,
            description: value.description,
        }
    }
}

#[derive(Clone, Debug, Default, Queryable, Selectable, AsChangeset)]
#[diesel(table_name=super::schema::global_vars)]
pub struct GlobalVars {
    /// While set, no reservations can be created
    pub maintenance: bool,
    /// Code of the entrance door, only shown to members with an approved reservation for today
    pub entrance_code: String,
}

impl From<GlobalVars> for rezervari_api_types::GlobalVars {
    fn from(value: GlobalVars) -> Self {
        Self {
            maintenance: value.maintenance,
            entrance_code: value.entrance_code,
        }
    }
}

impl From<rezervari_api_types::GlobalVars> for GlobalVars {
    fn from(value: rezervari_api_types::GlobalVars) -> Self {
        Self {
            maintenance: value.maintenance,
            entrance_code: value.entrance_code,
        }
    }
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name=super::schema::password_reset_tokens)]
pub struct PasswordResetToken {
    /// Digest of the token. The token itself is only handed out once.
    pub token_hash: String,
    pub profile_id: ProfileId,
    pub expires_at: DateTime<Utc>,
}
