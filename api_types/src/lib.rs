use chrono::{naive::NaiveDate, DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn not(v: &bool) -> bool {
    !v
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Founder,
    Coach,
    Member,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: MemberRole,
    pub has_key: bool,
    pub created_at: DateTime<Utc>,
}

/// Partial update of a member profile by an administrator. Missing fields are left unchanged.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MemberRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_key: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SignupRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PasswordUpdateRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SessionInfo {
    pub profile: Profile,
    #[serde(rename = "sessionToken")]
    pub session_token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Location {
    pub id: i32,
    pub name: String,
    pub weekday_open_hour: i32,
    pub weekday_close_hour: i32,
    pub weekend_open_hour: i32,
    pub weekend_close_hour: i32,
    pub slot_duration: i32,
    #[serde(default)]
    pub sort_key: i32,
    #[serde(default)]
    pub tables: Vec<ClubTable>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClubTable {
    pub id: i32,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Approved,
    Cancelled,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Reservation {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub location_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<i32>,
    pub start_date: NaiveDate,
    pub start_hour: i32,
    pub duration: i32,
    pub status: ReservationStatus,
}

/// Parameters of the `create_reservation` remote procedure
#[derive(Serialize, Deserialize, Debug)]
pub struct CreateReservationRequest {
    pub location_input: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id_input: Option<i32>,
    pub start_date_input: NaiveDate,
    pub start_hour_input: i32,
}

/// Result of the `create_reservation` remote procedure: either `error` is `None` and the created
/// reservation is given, or `error` holds the human-readable rejection reason.
#[derive(Serialize, Deserialize, Debug)]
pub struct CreateReservationResult {
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation: Option<Reservation>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GuestInvite {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub location_id: i32,
    pub guest_name: String,
    pub start_date: NaiveDate,
    pub start_hour: i32,
    #[serde(default, skip_serializing_if = "not")]
    pub special: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NewGuestInvite {
    pub location_id: i32,
    pub guest_name: String,
    pub start_date: NaiveDate,
    pub start_hour: i32,
    #[serde(default)]
    pub special: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReservationRestriction {
    pub id: Uuid,
    pub location_id: i32,
    pub date: NaiveDate,
    pub start_hour: i32,
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NewReservationRestriction {
    pub location_id: i32,
    pub date: NaiveDate,
    pub start_hour: i32,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FreeDay {
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GlobalVars {
    pub maintenance: bool,
    pub entrance_code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single event of the live reservation change feed
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReservationChange {
    pub kind: ChangeKind,
    pub reservation_id: Uuid,
    pub location_id: i32,
    pub date: NaiveDate,
}
