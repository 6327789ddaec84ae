use crate::booking::schedule::{date_to_iso_string, slot_start};
use crate::data_store::auth_token::{AuthToken, MemberRole, Privilege};
use crate::data_store::models::{
    ClubTable, FreeDay, GuestInvite, Location, Reservation, ReservationRequest,
    ReservationRestriction, ReservationStatus,
};
use crate::data_store::ProfileId;
use crate::setup::ClubSettings;
use chrono::{DateTime, Utc};
use std::fmt::{Display, Formatter};

/// The member requesting a reservation
#[derive(Debug, Clone)]
pub struct Requester {
    pub profile_id: ProfileId,
    pub role: MemberRole,
    pub has_key: bool,
}

/// An existing reservation of the requested slot, together with the key holder flag of the member
/// holding it
#[derive(Debug, Clone)]
pub struct SlotHolder {
    pub reservation: Reservation,
    pub has_key: bool,
}

/// Everything that is known about a slot (and the requesting member) at the time of a reservation
/// request. The data_store collects this within the reservation's database transaction.
pub struct SlotSnapshot<'a> {
    pub request: &'a ReservationRequest,
    pub requester: &'a Requester,
    pub settings: &'a ClubSettings,
    /// Maintenance flag of the global vars
    pub maintenance: bool,
    pub location: &'a Location,
    /// All tables of the requested location
    pub tables: &'a [ClubTable],
    /// The free day at the requested date, if any
    pub free_day: Option<&'a FreeDay>,
    /// The restriction of the requested slot, if any
    pub restriction: Option<&'a ReservationRestriction>,
    /// Guest invites of the requested slot
    pub guests: &'a [GuestInvite],
    /// Reservations of the requested slot. Cancelled reservations are ignored.
    pub slot_reservations: &'a [SlotHolder],
    /// Reservations of the requesting member at the requested date, at any location. Cancelled
    /// reservations are ignored.
    pub requester_reservations_of_day: &'a [Reservation],
}

/// Reason for rejecting a reservation request. The [Display] representation is the message shown
/// to the member.
#[derive(Debug, Clone, PartialEq)]
pub enum ReservationRejection {
    Maintenance,
    TableNotInLocation,
    SlotInPast,
    BeyondBookingWindow { days_ahead: u32 },
    FreeDay { description: String },
    InvalidSlot,
    Restricted { message: String },
    AlreadyBooked,
    DailyLimitReached { limit: u32 },
    BlockedBySpecialGuest,
    SlotFull,
    TableTaken,
}

impl Display for ReservationRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Maintenance => {
                f.write_str("Rezervările sunt suspendate temporar din cauza lucrărilor de întreținere.")
            }
            Self::TableNotInLocation => f.write_str("Masa aleasă nu aparține acestei locații."),
            Self::SlotInPast => f.write_str("Nu se pot face rezervări pentru intervale trecute."),
            Self::BeyondBookingWindow { days_ahead } => write!(
                f,
                "Rezervările se pot face cu cel mult {} zile în avans.",
                days_ahead
            ),
            Self::FreeDay { description } => {
                write!(f, "Clubul este închis în această zi: {}", description)
            }
            Self::InvalidSlot => f.write_str("Ora aleasă nu este începutul unui interval de rezervare."),
            Self::Restricted { message } => {
                write!(f, "Intervalul nu poate fi rezervat: {}", message)
            }
            Self::AlreadyBooked => f.write_str("Ai deja o rezervare la această oră."),
            Self::DailyLimitReached { limit } => write!(
                f,
                "Ai atins numărul maxim de {} rezervări pe zi.",
                limit
            ),
            Self::BlockedBySpecialGuest => {
                f.write_str("Intervalul este rezervat integral pentru un invitat special.")
            }
            Self::SlotFull => f.write_str("Nu mai sunt locuri libere în acest interval."),
            Self::TableTaken => f.write_str("Masa aleasă este deja rezervată în acest interval."),
        }
    }
}

/// Evaluate the booking rules for a reservation request, in their defined order. The first
/// violated rule determines the rejection.
///
/// If the request is accepted, the status of the new reservation is returned: `Approved` if the
/// requester or any other active holder of the slot has a key, `Pending` otherwise.
pub fn evaluate_reservation_request(
    snapshot: &SlotSnapshot,
    now: DateTime<Utc>,
) -> Result<ReservationStatus, ReservationRejection> {
    let request = snapshot.request;
    let settings = snapshot.settings;

    if snapshot.maintenance {
        return Err(ReservationRejection::Maintenance);
    }
    if let Some(table_id) = request.table_id {
        if !snapshot
            .tables
            .iter()
            .any(|t| t.id == table_id && t.location_id == snapshot.location.id)
        {
            return Err(ReservationRejection::TableNotInLocation);
        }
    }
    if let Some(start) = slot_start(request.date, request.hour, &settings.timezone) {
        if start <= now {
            return Err(ReservationRejection::SlotInPast);
        }
    }
    let today = now.with_timezone(&settings.timezone).date_naive();
    if request.date > settings.last_bookable_date(today) {
        return Err(ReservationRejection::BeyondBookingWindow {
            days_ahead: settings.booking_days_ahead,
        });
    }
    if let Some(free_day) = snapshot.free_day {
        return Err(ReservationRejection::FreeDay {
            description: free_day.description.clone(),
        });
    }
    if !snapshot.location.is_valid_slot(request.date, request.hour) {
        return Err(ReservationRejection::InvalidSlot);
    }
    if let Some(restriction) = snapshot.restriction {
        return Err(ReservationRejection::Restricted {
            message: restriction.message.clone(),
        });
    }

    let own_reservations = || {
        snapshot
            .requester_reservations_of_day
            .iter()
            .filter(|r| r.status.is_active() && r.user_id == snapshot.requester.profile_id)
    };
    if own_reservations().any(|r| r.start_hour == request.hour) {
        return Err(ReservationRejection::AlreadyBooked);
    }
    if snapshot.requester.role == MemberRole::Member
        && own_reservations().count() >= settings.max_reservations_per_day as usize
    {
        return Err(ReservationRejection::DailyLimitReached {
            limit: settings.max_reservations_per_day,
        });
    }

    if snapshot.guests.iter().any(|g| g.special) {
        return Err(ReservationRejection::BlockedBySpecialGuest);
    }
    let active_holders: Vec<&SlotHolder> = snapshot
        .slot_reservations
        .iter()
        .filter(|h| h.reservation.status.is_active())
        .collect();
    if snapshot.guests.len() + active_holders.len() >= snapshot.tables.len() {
        return Err(ReservationRejection::SlotFull);
    }
    if let Some(table_id) = request.table_id {
        if active_holders
            .iter()
            .any(|h| h.reservation.table_id == Some(table_id))
        {
            return Err(ReservationRejection::TableTaken);
        }
    }

    Ok(slot_status(
        active_holders
            .iter()
            .map(|h| h.has_key)
            .chain(std::iter::once(snapshot.requester.has_key)),
    ))
}

/// Status of all active reservations of a slot, given the key holder flags of their members
pub fn slot_status(key_flags: impl IntoIterator<Item = bool>) -> ReservationStatus {
    if key_flags.into_iter().any(|k| k) {
        ReservationStatus::Approved
    } else {
        ReservationStatus::Pending
    }
}

/// Reason for rejecting the cancellation of a reservation
#[derive(Debug, Clone, PartialEq)]
pub enum CancellationRejection {
    AlreadyCancelled,
    NotOwner,
    SlotStarted,
}

impl Display for CancellationRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyCancelled => f.write_str("Rezervarea este deja anulată."),
            Self::NotOwner => f.write_str("Poți anula doar propriile rezervări."),
            Self::SlotStarted => {
                f.write_str("Rezervarea nu mai poate fi anulată după începerea intervalului.")
            }
        }
    }
}

/// Check if the holder of `auth_token` may cancel the given reservation now.
///
/// Members may cancel their own reservations until the slot begins. Members with the
/// [Privilege::ManageReservations] may cancel any reservation at any time.
pub fn evaluate_cancellation(
    reservation: &Reservation,
    auth_token: &AuthToken,
    settings: &ClubSettings,
    now: DateTime<Utc>,
) -> Result<(), CancellationRejection> {
    if !reservation.status.is_active() {
        return Err(CancellationRejection::AlreadyCancelled);
    }
    if auth_token.has_privilege(Privilege::ManageReservations) {
        return Ok(());
    }
    if auth_token.profile_id() != Some(reservation.user_id) {
        return Err(CancellationRejection::NotOwner);
    }
    let started = slot_start(
        reservation.start_date,
        reservation.start_hour,
        &settings.timezone,
    )
    .map_or(true, |start| start <= now);
    if started {
        return Err(CancellationRejection::SlotStarted);
    }
    Ok(())
}

/// Short description of a slot for log messages, e.g. "2025-03-03 10:00 @ location 1"
pub fn slot_description(location_id: i32, date: chrono::NaiveDate, hour: i32) -> String {
    format!("{} {:02}:00 @ location {}", date_to_iso_string(date), hour, location_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliAuthTokenKey;
    use chrono::NaiveDate;
    use uuid::Uuid;

    const LOCATION_ID: i32 = 1;

    fn location() -> Location {
        Location {
            id: LOCATION_ID,
            name: "Sala mare".to_string(),
            weekday_open_hour: 8,
            weekday_close_hour: 22,
            weekend_open_hour: 10,
            weekend_close_hour: 18,
            slot_duration: 2,
            sort_key: 0,
        }
    }

    fn tables(n: i32) -> Vec<ClubTable> {
        (1..=n)
            .map(|i| ClubTable {
                id: i,
                location_id: LOCATION_ID,
                name: format!("Masa {}", i),
            })
            .collect()
    }

    // Monday, 2025-03-03 09:00 in Bucharest
    fn now() -> DateTime<Utc> {
        "2025-03-03T07:00:00+00:00".parse().unwrap()
    }

    fn request(date: &str, hour: i32) -> ReservationRequest {
        ReservationRequest {
            location_id: LOCATION_ID,
            table_id: None,
            date: date.parse().unwrap(),
            hour,
        }
    }

    fn requester(role: MemberRole, has_key: bool) -> Requester {
        Requester {
            profile_id: Uuid::now_v7(),
            role,
            has_key,
        }
    }

    fn reservation(user_id: Uuid, date: &str, hour: i32, status: ReservationStatus) -> Reservation {
        Reservation {
            id: Uuid::now_v7(),
            created_at: now(),
            user_id,
            location_id: LOCATION_ID,
            table_id: None,
            start_date: date.parse().unwrap(),
            start_hour: hour,
            duration: 2,
            status,
        }
    }

    fn guest(special: bool) -> GuestInvite {
        GuestInvite {
            id: Uuid::now_v7(),
            created_at: now(),
            user_id: Uuid::now_v7(),
            location_id: LOCATION_ID,
            guest_name: "Ion Invitatul".to_string(),
            start_date: "2025-03-04".parse().unwrap(),
            start_hour: 10,
            special,
        }
    }

    struct Fixture {
        request: ReservationRequest,
        requester: Requester,
        settings: ClubSettings,
        maintenance: bool,
        location: Location,
        tables: Vec<ClubTable>,
        free_day: Option<FreeDay>,
        restriction: Option<ReservationRestriction>,
        guests: Vec<GuestInvite>,
        slot_reservations: Vec<SlotHolder>,
        requester_reservations_of_day: Vec<Reservation>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                request: request("2025-03-04", 10),
                requester: requester(MemberRole::Member, false),
                settings: ClubSettings::default(),
                maintenance: false,
                location: location(),
                tables: tables(3),
                free_day: None,
                restriction: None,
                guests: vec![],
                slot_reservations: vec![],
                requester_reservations_of_day: vec![],
            }
        }

        fn evaluate(&self) -> Result<ReservationStatus, ReservationRejection> {
            evaluate_reservation_request(
                &SlotSnapshot {
                    request: &self.request,
                    requester: &self.requester,
                    settings: &self.settings,
                    maintenance: self.maintenance,
                    location: &self.location,
                    tables: &self.tables,
                    free_day: self.free_day.as_ref(),
                    restriction: self.restriction.as_ref(),
                    guests: &self.guests,
                    slot_reservations: &self.slot_reservations,
                    requester_reservations_of_day: &self.requester_reservations_of_day,
                },
                now(),
            )
        }

        fn add_holder(&mut self, has_key: bool, status: ReservationStatus) {
            self.slot_reservations.push(SlotHolder {
                reservation: reservation(Uuid::now_v7(), "2025-03-04", 10, status),
                has_key,
            });
        }
    }

    #[test]
    fn test_accept_pending_and_approved() {
        let mut fixture = Fixture::new();
        assert_eq!(fixture.evaluate(), Ok(ReservationStatus::Pending));

        fixture.requester.has_key = true;
        assert_eq!(fixture.evaluate(), Ok(ReservationStatus::Approved));

        fixture.requester.has_key = false;
        fixture.add_holder(true, ReservationStatus::Approved);
        assert_eq!(fixture.evaluate(), Ok(ReservationStatus::Approved));
    }

    #[test]
    fn test_cancelled_holders_are_ignored() {
        let mut fixture = Fixture::new();
        fixture.tables = tables(1);
        fixture.add_holder(true, ReservationStatus::Cancelled);
        assert_eq!(fixture.evaluate(), Ok(ReservationStatus::Pending));
    }

    #[test]
    fn test_maintenance() {
        let mut fixture = Fixture::new();
        fixture.maintenance = true;
        // maintenance is checked before everything else
        fixture.request = request("2020-01-01", 3);
        assert_eq!(fixture.evaluate(), Err(ReservationRejection::Maintenance));
    }

    #[test]
    fn test_table_not_in_location() {
        let mut fixture = Fixture::new();
        fixture.request.table_id = Some(42);
        assert_eq!(fixture.evaluate(), Err(ReservationRejection::TableNotInLocation));
        fixture.request.table_id = Some(2);
        assert_eq!(fixture.evaluate(), Ok(ReservationStatus::Pending));
    }

    #[test]
    fn test_slot_in_past() {
        let mut fixture = Fixture::new();
        fixture.request = request("2025-03-03", 8);
        assert_eq!(fixture.evaluate(), Err(ReservationRejection::SlotInPast));
        fixture.request = request("2025-03-03", 10);
        assert_eq!(fixture.evaluate(), Ok(ReservationStatus::Pending));
        fixture.request = request("2025-03-02", 20);
        assert_eq!(fixture.evaluate(), Err(ReservationRejection::SlotInPast));
    }

    #[test]
    fn test_booking_window() {
        let mut fixture = Fixture::new();
        fixture.request = request("2025-03-17", 10);
        assert_eq!(fixture.evaluate(), Ok(ReservationStatus::Pending));
        fixture.request = request("2025-03-18", 10);
        assert_eq!(
            fixture.evaluate(),
            Err(ReservationRejection::BeyondBookingWindow { days_ahead: 14 })
        );

        fixture.settings.booking_days_ahead = u32::MAX;
        assert_eq!(fixture.evaluate(), Ok(ReservationStatus::Pending));
    }

    #[test]
    fn test_free_day() {
        let mut fixture = Fixture::new();
        fixture.free_day = Some(FreeDay {
            date: "2025-03-04".parse().unwrap(),
            description: "Curățenie generală".to_string(),
        });
        let result = fixture.evaluate();
        assert_eq!(
            result,
            Err(ReservationRejection::FreeDay {
                description: "Curățenie generală".to_string()
            })
        );
        assert!(result.unwrap_err().to_string().contains("Curățenie generală"));
    }

    #[test]
    fn test_invalid_slot() {
        let mut fixture = Fixture::new();
        fixture.request = request("2025-03-04", 11);
        assert_eq!(fixture.evaluate(), Err(ReservationRejection::InvalidSlot));
        fixture.request = request("2025-03-04", 22);
        assert_eq!(fixture.evaluate(), Err(ReservationRejection::InvalidSlot));
        // Saturday: opens at 10
        fixture.request = request("2025-03-08", 8);
        assert_eq!(fixture.evaluate(), Err(ReservationRejection::InvalidSlot));
        fixture.request = request("2025-03-04", i32::MAX);
        assert_eq!(fixture.evaluate(), Err(ReservationRejection::InvalidSlot));
    }

    #[test]
    fn test_restriction() {
        let mut fixture = Fixture::new();
        fixture.restriction = Some(ReservationRestriction {
            id: Uuid::now_v7(),
            created_at: now(),
            location_id: LOCATION_ID,
            date: "2025-03-04".parse().unwrap(),
            start_hour: 10,
            message: "Turneu intern".to_string(),
            user_id: Uuid::now_v7(),
        });
        assert_eq!(
            fixture.evaluate(),
            Err(ReservationRejection::Restricted {
                message: "Turneu intern".to_string()
            })
        );
    }

    #[test]
    fn test_already_booked() {
        let mut fixture = Fixture::new();
        let own_id = fixture.requester.profile_id;
        let mut elsewhere = reservation(own_id, "2025-03-04", 10, ReservationStatus::Pending);
        elsewhere.location_id = 2;
        fixture.requester_reservations_of_day = vec![elsewhere];
        assert_eq!(fixture.evaluate(), Err(ReservationRejection::AlreadyBooked));

        fixture.requester_reservations_of_day[0].status = ReservationStatus::Cancelled;
        assert_eq!(fixture.evaluate(), Ok(ReservationStatus::Pending));
    }

    #[test]
    fn test_daily_limit() {
        let mut fixture = Fixture::new();
        let own_id = fixture.requester.profile_id;
        fixture.requester_reservations_of_day = vec![
            reservation(own_id, "2025-03-04", 12, ReservationStatus::Pending),
            reservation(own_id, "2025-03-04", 14, ReservationStatus::Approved),
        ];
        assert_eq!(
            fixture.evaluate(),
            Err(ReservationRejection::DailyLimitReached { limit: 2 })
        );

        // the limit only applies to members
        fixture.requester.role = MemberRole::Coach;
        assert_eq!(fixture.evaluate(), Ok(ReservationStatus::Pending));

        fixture.requester.role = MemberRole::Member;
        fixture.requester_reservations_of_day[1].status = ReservationStatus::Cancelled;
        assert_eq!(fixture.evaluate(), Ok(ReservationStatus::Pending));
    }

    #[test]
    fn test_special_guest_blocks_slot() {
        let mut fixture = Fixture::new();
        fixture.guests = vec![guest(true)];
        assert_eq!(
            fixture.evaluate(),
            Err(ReservationRejection::BlockedBySpecialGuest)
        );
    }

    #[test]
    fn test_guests_take_seats_first() {
        let mut fixture = Fixture::new();
        fixture.guests = vec![guest(false), guest(false)];
        assert_eq!(fixture.evaluate(), Ok(ReservationStatus::Pending));
        fixture.add_holder(false, ReservationStatus::Pending);
        assert_eq!(fixture.evaluate(), Err(ReservationRejection::SlotFull));
    }

    #[test]
    fn test_slot_full() {
        let mut fixture = Fixture::new();
        fixture.add_holder(false, ReservationStatus::Pending);
        fixture.add_holder(false, ReservationStatus::Pending);
        assert_eq!(fixture.evaluate(), Ok(ReservationStatus::Pending));
        fixture.add_holder(true, ReservationStatus::Approved);
        assert_eq!(fixture.evaluate(), Err(ReservationRejection::SlotFull));

        fixture.tables = vec![];
        fixture.slot_reservations.clear();
        assert_eq!(fixture.evaluate(), Err(ReservationRejection::SlotFull));
    }

    #[test]
    fn test_table_taken() {
        let mut fixture = Fixture::new();
        fixture.add_holder(false, ReservationStatus::Pending);
        fixture.slot_reservations[0].reservation.table_id = Some(2);
        fixture.request.table_id = Some(2);
        assert_eq!(fixture.evaluate(), Err(ReservationRejection::TableTaken));
        fixture.request.table_id = Some(3);
        assert_eq!(fixture.evaluate(), Ok(ReservationStatus::Pending));
    }

    #[test]
    fn test_slot_status() {
        assert_eq!(slot_status(Vec::new()), ReservationStatus::Pending);
        assert_eq!(slot_status([false, false]), ReservationStatus::Pending);
        assert_eq!(slot_status([false, true]), ReservationStatus::Approved);
    }

    #[test]
    fn test_evaluate_cancellation() {
        let settings = ClubSettings::default();
        let owner = Uuid::now_v7();
        let founder = AuthToken::create_for_cli(&CliAuthTokenKey::new());
        let member = AuthToken::create_for_session(owner, MemberRole::Member, false);
        let other_member = AuthToken::create_for_session(Uuid::now_v7(), MemberRole::Coach, true);
        let upcoming = reservation(owner, "2025-03-04", 10, ReservationStatus::Approved);
        let started = reservation(owner, "2025-03-03", 8, ReservationStatus::Approved);

        assert_eq!(evaluate_cancellation(&upcoming, &member, &settings, now()), Ok(()));
        assert_eq!(
            evaluate_cancellation(&started, &member, &settings, now()),
            Err(CancellationRejection::SlotStarted)
        );
        assert_eq!(
            evaluate_cancellation(&upcoming, &other_member, &settings, now()),
            Err(CancellationRejection::NotOwner)
        );

        // founders may cancel anything active
        assert_eq!(evaluate_cancellation(&upcoming, &founder, &settings, now()), Ok(()));
        assert_eq!(evaluate_cancellation(&started, &founder, &settings, now()), Ok(()));

        let mut cancelled = upcoming.clone();
        cancelled.status = ReservationStatus::Cancelled;
        assert_eq!(
            evaluate_cancellation(&cancelled, &founder, &settings, now()),
            Err(CancellationRejection::AlreadyCancelled)
        );
    }

    #[test]
    fn test_slot_description() {
        assert_eq!(
            slot_description(3, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(), 8),
            "2025-03-04 08:00 @ location 3"
        );
    }
}
