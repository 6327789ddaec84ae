use super::{
    models, passwords, schema, GuestInviteId, LocationId, ProfileId, ReservationId,
    ReservationStore, ReservationStoreFacade, RestrictionId, SlotFilter, StoreError,
};
use crate::auth_session::SessionToken;
use crate::booking::rules;
use crate::data_store::auth_token::{AuthToken, MemberRole, Privilege};
use crate::data_store::models::ReservationStatus;
use crate::setup::ClubSettings;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::dsl::exists;
use diesel::expression::AsExpression;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgDataStore {
    pool: diesel::r2d2::Pool<diesel::r2d2::ConnectionManager<PgConnection>>,
}

impl PgDataStore {
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        let connection_manager = diesel::r2d2::ConnectionManager::<PgConnection>::new(database_url);
        Ok(Self {
            pool: diesel::r2d2::Pool::builder()
                .test_on_check_out(true)
                .min_idle(Some(2))
                .build(connection_manager)?,
        })
    }
}

impl ReservationStore for PgDataStore {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn ReservationStoreFacade + 'a>, StoreError> {
        Ok(Box::new(PgDataStoreFacade::with_pooled_connection(
            self.pool.get()?,
        )))
    }
}

pub struct PgDataStoreFacade {
    connection: diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>,
}

impl PgDataStoreFacade {
    pub fn with_pooled_connection(
        connection: diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>,
    ) -> Self {
        Self { connection }
    }
}

/// Create an Sql expression to check if a row has been created or updated by a Postgres "upsert"
/// statement
fn sql_upsert_is_updated() -> diesel::expression::SqlLiteral<diesel::sql_types::Bool> {
    // See https://stackoverflow.com/q/34762732 and https://stackoverflow.com/q/49597793
    diesel::dsl::sql("xmax::text <> '0'")
}

/// Current time, truncated to whole seconds, as stored in `sessions_valid_after`. Session tokens
/// only carry whole seconds, so a token issued in the same second stays valid.
fn session_epoch_now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
}

impl ReservationStoreFacade for PgDataStoreFacade {
    fn create_profile(
        &mut self,
        profile: models::NewProfile,
    ) -> Result<models::Profile, StoreError> {
        use schema::profiles;

        let now = session_epoch_now();
        let insert = models::ProfileInsert {
            id: Uuid::now_v7(),
            email: passwords::normalize_email(&profile.email),
            name: profile.name.trim().to_owned(),
            role: MemberRole::Member,
            has_key: false,
            password_hash: passwords::hash_password(&profile.password)?,
            sessions_valid_after: now,
            created_at: now,
        };
        Ok(diesel::insert_into(profiles::table)
            .values(&insert)
            .returning(models::Profile::as_returning())
            .get_result::<models::Profile>(&mut self.connection)?)
    }

    fn authenticate_with_password(
        &mut self,
        the_email: &str,
        password: &str,
    ) -> Result<SessionToken, StoreError> {
        use schema::profiles::dsl::*;

        let profile = profiles
            .filter(email.eq(passwords::normalize_email(the_email)))
            .select(models::Profile::as_select())
            .first::<models::Profile>(&mut self.connection)
            .optional()?
            .ok_or(StoreError::AuthenticationFailed)?;
        if passwords::verify_password(&profile.password_hash, password) {
            Ok(SessionToken::new(profile.id))
        } else {
            Err(StoreError::AuthenticationFailed)
        }
    }

    fn get_auth_token_for_session(
        &mut self,
        session_token: &SessionToken,
    ) -> Result<AuthToken, StoreError> {
        use schema::profiles::dsl::*;

        let (the_role, the_has_key, valid_after) = profiles
            .filter(id.eq(session_token.profile_id()))
            .select((role, has_key, sessions_valid_after))
            .first::<(MemberRole, bool, DateTime<Utc>)>(&mut self.connection)
            .optional()?
            .ok_or(StoreError::AuthenticationFailed)?;
        if session_token.issued_at() < valid_after {
            return Err(StoreError::AuthenticationFailed);
        }
        Ok(AuthToken::create_for_session(
            session_token.profile_id(),
            the_role,
            the_has_key,
        ))
    }

    fn get_profile(
        &mut self,
        auth_token: &AuthToken,
        profile_id: ProfileId,
    ) -> Result<models::Profile, StoreError> {
        use schema::profiles::dsl::*;
        auth_token.check_owner_or_privilege(profile_id, Privilege::ManageMembers)?;

        Ok(profiles
            .filter(id.eq(profile_id))
            .select(models::Profile::as_select())
            .first::<models::Profile>(&mut self.connection)?)
    }

    fn get_profiles(&mut self, auth_token: &AuthToken) -> Result<Vec<models::Profile>, StoreError> {
        use schema::profiles::dsl::*;
        auth_token.check_privilege(Privilege::ManageMembers)?;

        Ok(profiles
            .select(models::Profile::as_select())
            .order_by((name.asc(), email.asc()))
            .load::<models::Profile>(&mut self.connection)?)
    }

    fn update_profile(
        &mut self,
        auth_token: &AuthToken,
        profile_id: ProfileId,
        patch: models::ProfilePatch,
    ) -> Result<models::Profile, StoreError> {
        use schema::profiles::dsl::*;
        auth_token.check_privilege(Privilege::ManageMembers)?;

        if patch.is_empty() {
            return self.get_profile(auth_token, profile_id);
        }
        Ok(diesel::update(profiles)
            .filter(id.eq(profile_id))
            .set(&patch)
            .returning(models::Profile::as_returning())
            .get_result::<models::Profile>(&mut self.connection)?)
    }

    fn update_password(
        &mut self,
        auth_token: &AuthToken,
        current_password: &str,
        new_password: &str,
    ) -> Result<SessionToken, StoreError> {
        use schema::profiles::dsl::*;
        let profile_id = auth_token
            .profile_id()
            .ok_or(StoreError::AuthenticationFailed)?;
        let new_hash = passwords::hash_password(new_password)?;

        self.connection.transaction(|connection| {
            let current_hash = profiles
                .filter(id.eq(profile_id))
                .select(password_hash)
                .first::<String>(connection)?;
            if !passwords::verify_password(&current_hash, current_password) {
                return Err(StoreError::AuthenticationFailed);
            }
            let now = session_epoch_now();
            diesel::update(profiles)
                .filter(id.eq(profile_id))
                .set((password_hash.eq(new_hash), sessions_valid_after.eq(now)))
                .execute(connection)?;
            Ok(SessionToken::with_issue_time(profile_id, now))
        })
    }

    fn set_password(
        &mut self,
        auth_token: &AuthToken,
        profile_id: ProfileId,
        new_password: &str,
    ) -> Result<(), StoreError> {
        use schema::profiles::dsl::*;
        auth_token.check_privilege(Privilege::ManageMembers)?;

        let count = diesel::update(profiles)
            .filter(id.eq(profile_id))
            .set((
                password_hash.eq(passwords::hash_password(new_password)?),
                sessions_valid_after.eq(session_epoch_now()),
            ))
            .execute(&mut self.connection)?;
        if count == 0 {
            return Err(StoreError::NotExisting);
        }
        Ok(())
    }

    fn create_password_reset_token(
        &mut self,
        the_email: &str,
    ) -> Result<Option<(models::Profile, String)>, StoreError> {
        use schema::password_reset_tokens;
        use schema::profiles;

        self.connection.transaction(|connection| {
            let profile = profiles::table
                .filter(profiles::email.eq(passwords::normalize_email(the_email)))
                .select(models::Profile::as_select())
                .first::<models::Profile>(connection)
                .optional()?;
            let Some(profile) = profile else {
                return Ok(None);
            };

            let now = Utc::now();
            diesel::delete(
                password_reset_tokens::table.filter(password_reset_tokens::expires_at.lt(now)),
            )
            .execute(connection)?;

            let (token, token_hash) = passwords::generate_reset_token()?;
            diesel::insert_into(password_reset_tokens::table)
                .values(&models::PasswordResetToken {
                    token_hash,
                    profile_id: profile.id,
                    expires_at: now + passwords::RESET_TOKEN_VALIDITY,
                })
                .execute(connection)?;
            Ok(Some((profile, token)))
        })
    }

    fn reset_password_with_token(
        &mut self,
        token: &str,
        new_password: &str,
    ) -> Result<ProfileId, StoreError> {
        use schema::password_reset_tokens;
        use schema::profiles;

        let new_hash = passwords::hash_password(new_password)?;
        self.connection.transaction(|connection| {
            let profile_id = diesel::delete(
                password_reset_tokens::table
                    .filter(password_reset_tokens::token_hash.eq(passwords::reset_token_hash(token)))
                    .filter(password_reset_tokens::expires_at.gt(Utc::now())),
            )
            .returning(password_reset_tokens::profile_id)
            .get_result::<ProfileId>(connection)?;

            diesel::update(profiles::table)
                .filter(profiles::id.eq(profile_id))
                .set((
                    profiles::password_hash.eq(new_hash),
                    profiles::sessions_valid_after.eq(session_epoch_now()),
                ))
                .execute(connection)?;
            Ok(profile_id)
        })
    }

    fn get_locations(
        &mut self,
        auth_token: &AuthToken,
    ) -> Result<Vec<models::Location>, StoreError> {
        use schema::locations::dsl::*;
        auth_token.check_privilege(Privilege::ShowReservations)?;

        Ok(locations
            .select(models::Location::as_select())
            .order_by((sort_key.asc(), id.asc()))
            .load::<models::Location>(&mut self.connection)?)
    }

    fn get_location(
        &mut self,
        auth_token: &AuthToken,
        location_id: LocationId,
    ) -> Result<models::Location, StoreError> {
        use schema::locations::dsl::*;
        auth_token.check_privilege(Privilege::ShowReservations)?;

        Ok(locations
            .filter(id.eq(location_id))
            .select(models::Location::as_select())
            .first::<models::Location>(&mut self.connection)?)
    }

    fn get_tables(
        &mut self,
        auth_token: &AuthToken,
        the_location_id: LocationId,
    ) -> Result<Vec<models::ClubTable>, StoreError> {
        use schema::club_tables::dsl::*;
        auth_token.check_privilege(Privilege::ShowReservations)?;

        self.connection.transaction(|connection| {
            // Distinguish an empty location from a missing one
            schema::locations::table
                .find(the_location_id)
                .select(schema::locations::id)
                .first::<LocationId>(connection)?;
            Ok(club_tables
                .filter(location_id.eq(the_location_id))
                .select(models::ClubTable::as_select())
                .order_by(id.asc())
                .load::<models::ClubTable>(connection)?)
        })
    }

    fn import_locations(
        &mut self,
        auth_token: &AuthToken,
        the_locations: Vec<models::LocationWithTables>,
    ) -> Result<(), StoreError> {
        use diesel::dsl::not;
        use schema::club_tables;
        use schema::locations;
        auth_token.check_privilege(Privilege::ManageGlobalVars)?;

        self.connection.transaction(|connection| {
            for location in the_locations.iter() {
                diesel::insert_into(locations::table)
                    .values(&location.location)
                    .on_conflict(locations::id)
                    .do_update()
                    .set(&location.location)
                    .execute(connection)?;

                diesel::delete(
                    club_tables::table
                        .filter(club_tables::location_id.eq(location.location.id))
                        .filter(club_tables::id.ne_all(location.tables.iter().map(|t| t.id)))
                        .filter(not(exists(
                            schema::reservations::table
                                .select(0.as_sql::<diesel::sql_types::Integer>())
                                .filter(
                                    schema::reservations::table_id
                                        .eq(club_tables::id.nullable()),
                                ),
                        ))),
                )
                .execute(connection)?;

                for table in location.tables.iter() {
                    diesel::insert_into(club_tables::table)
                        .values(table)
                        .on_conflict(club_tables::id)
                        .do_update()
                        .set(table)
                        .execute(connection)?;
                }
            }
            Ok(())
        })
    }

    fn get_reservations_for_day(
        &mut self,
        auth_token: &AuthToken,
        the_location_id: LocationId,
        date: NaiveDate,
    ) -> Result<Vec<models::FullReservation>, StoreError> {
        use schema::profiles;
        use schema::reservations;
        auth_token.check_privilege(Privilege::ShowReservations)?;

        let mut result: Vec<models::FullReservation> = reservations::table
            .inner_join(profiles::table)
            .filter(reservations::location_id.eq(the_location_id))
            .filter(reservations::start_date.eq(date))
            .order_by((
                reservations::start_hour.asc(),
                reservations::created_at.asc(),
            ))
            .select((models::Reservation::as_select(), profiles::name))
            .load::<(models::Reservation, String)>(&mut self.connection)?
            .into_iter()
            .map(|(reservation, user_name)| models::FullReservation {
                reservation,
                user_name,
            })
            .collect();
        // stable sort keeps the (hour, creation time) order within both groups
        result.sort_by_key(|r| !r.reservation.status.is_active());
        Ok(result)
    }

    fn get_reservations_of_member(
        &mut self,
        auth_token: &AuthToken,
        profile_id: ProfileId,
        from_date: NaiveDate,
    ) -> Result<Vec<models::Reservation>, StoreError> {
        use schema::reservations::dsl::*;
        auth_token.check_owner_or_privilege(profile_id, Privilege::ManageReservations)?;

        Ok(reservations
            .filter(user_id.eq(profile_id))
            .filter(start_date.ge(from_date))
            .order_by((start_date.asc(), start_hour.asc(), created_at.asc()))
            .select(models::Reservation::as_select())
            .load::<models::Reservation>(&mut self.connection)?)
    }

    fn create_reservation(
        &mut self,
        auth_token: &AuthToken,
        settings: &ClubSettings,
        request: models::ReservationRequest,
    ) -> Result<models::ReservationUpdate, StoreError> {
        use schema::reservations;
        auth_token.check_privilege(Privilege::CreateReservation)?;
        let profile_id = auth_token
            .profile_id()
            .ok_or(StoreError::PermissionDenied {
                required_privilege: Privilege::CreateReservation,
            })?;

        let now = Utc::now();
        self.connection
            .build_transaction()
            .serializable()
            .run(|connection| {
                let maintenance = schema::global_vars::table
                    .select(schema::global_vars::maintenance)
                    .first::<bool>(connection)
                    .optional()?
                    .unwrap_or(false);
                let (role, has_key) = schema::profiles::table
                    .filter(schema::profiles::id.eq(profile_id))
                    .select((schema::profiles::role, schema::profiles::has_key))
                    .first::<(MemberRole, bool)>(connection)?;
                let location = schema::locations::table
                    .filter(schema::locations::id.eq(request.location_id))
                    .select(models::Location::as_select())
                    .first::<models::Location>(connection)?;
                let tables = schema::club_tables::table
                    .filter(schema::club_tables::location_id.eq(request.location_id))
                    .select(models::ClubTable::as_select())
                    .load::<models::ClubTable>(connection)?;
                let free_day = schema::free_days::table
                    .filter(schema::free_days::date.eq(request.date))
                    .select(models::FreeDay::as_select())
                    .first::<models::FreeDay>(connection)
                    .optional()?;
                let slot_filter = SlotFilter::builder()
                    .at_location(request.location_id)
                    .on_date(request.date)
                    .at_hour(request.hour)
                    .build();
                let restriction = load_restrictions(slot_filter.clone(), connection)?
                    .into_iter()
                    .next();
                let guests = load_guest_invites(slot_filter, connection)?;
                let slot_reservations = load_slot_holders(
                    request.location_id,
                    request.date,
                    request.hour,
                    connection,
                )?;
                let requester_reservations_of_day = reservations::table
                    .filter(reservations::user_id.eq(profile_id))
                    .filter(reservations::start_date.eq(request.date))
                    .filter(reservations::status.ne(ReservationStatus::Cancelled))
                    .select(models::Reservation::as_select())
                    .load::<models::Reservation>(connection)?;

                let new_status = rules::evaluate_reservation_request(
                    &rules::SlotSnapshot {
                        request: &request,
                        requester: &rules::Requester {
                            profile_id,
                            role,
                            has_key,
                        },
                        settings,
                        maintenance,
                        location: &location,
                        tables: &tables,
                        free_day: free_day.as_ref(),
                        restriction: restriction.as_ref(),
                        guests: &guests,
                        slot_reservations: &slot_reservations,
                        requester_reservations_of_day: &requester_reservations_of_day,
                    },
                    now,
                )
                .map_err(StoreError::ReservationRejected)?;

                let reservation = models::Reservation {
                    id: Uuid::now_v7(),
                    created_at: now,
                    user_id: profile_id,
                    location_id: request.location_id,
                    table_id: request.table_id,
                    start_date: request.date,
                    start_hour: request.hour,
                    duration: location.slot_duration,
                    status: new_status,
                };
                diesel::insert_into(reservations::table)
                    .values(&reservation)
                    .execute(connection)?;

                let changed_status = update_slot_status(
                    request.location_id,
                    request.date,
                    request.hour,
                    new_status,
                    connection,
                )?
                .into_iter()
                .filter(|changed_id| *changed_id != reservation.id)
                .collect();

                Ok(models::ReservationUpdate {
                    reservation,
                    changed_status,
                })
            })
    }

    fn cancel_reservation(
        &mut self,
        auth_token: &AuthToken,
        settings: &ClubSettings,
        reservation_id: ReservationId,
    ) -> Result<models::ReservationUpdate, StoreError> {
        use schema::reservations;
        auth_token.check_privilege(Privilege::ShowReservations)?;

        let now = Utc::now();
        self.connection
            .build_transaction()
            .serializable()
            .run(|connection| {
                let reservation = reservations::table
                    .filter(reservations::id.eq(reservation_id))
                    .select(models::Reservation::as_select())
                    .first::<models::Reservation>(connection)?;
                rules::evaluate_cancellation(&reservation, auth_token, settings, now)
                    .map_err(StoreError::CancellationRejected)?;

                let reservation = diesel::update(reservations::table)
                    .filter(reservations::id.eq(reservation_id))
                    .set(reservations::status.eq(ReservationStatus::Cancelled))
                    .returning(models::Reservation::as_returning())
                    .get_result::<models::Reservation>(connection)?;

                let remaining_holders = load_slot_holders(
                    reservation.location_id,
                    reservation.start_date,
                    reservation.start_hour,
                    connection,
                )?;
                let changed_status = update_slot_status(
                    reservation.location_id,
                    reservation.start_date,
                    reservation.start_hour,
                    rules::slot_status(remaining_holders.iter().map(|h| h.has_key)),
                    connection,
                )?;

                Ok(models::ReservationUpdate {
                    reservation,
                    changed_status,
                })
            })
    }

    fn get_guest_invites(
        &mut self,
        auth_token: &AuthToken,
        filter: SlotFilter,
    ) -> Result<Vec<models::GuestInvite>, StoreError> {
        auth_token.check_privilege(Privilege::ShowReservations)?;

        load_guest_invites(filter, &mut self.connection)
    }

    fn create_guest_invite(
        &mut self,
        auth_token: &AuthToken,
        guest_invite: models::NewGuestInvite,
    ) -> Result<models::GuestInvite, StoreError> {
        use schema::guest_invites;
        auth_token.check_privilege(Privilege::ManageGuests)?;
        let creator = auth_token
            .profile_id()
            .ok_or(StoreError::PermissionDenied {
                required_privilege: Privilege::ManageGuests,
            })?;

        let invite = models::GuestInvite {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            user_id: creator,
            location_id: guest_invite.location_id,
            guest_name: guest_invite.guest_name.trim().to_owned(),
            start_date: guest_invite.start_date,
            start_hour: guest_invite.start_hour,
            special: guest_invite.special,
        };
        Ok(diesel::insert_into(guest_invites::table)
            .values(&invite)
            .returning(models::GuestInvite::as_returning())
            .get_result::<models::GuestInvite>(&mut self.connection)?)
    }

    fn delete_guest_invite(
        &mut self,
        auth_token: &AuthToken,
        guest_invite_id: GuestInviteId,
    ) -> Result<(), StoreError> {
        use schema::guest_invites::dsl::*;
        auth_token.check_privilege(Privilege::ManageGuests)?;

        let count = diesel::delete(guest_invites.filter(id.eq(guest_invite_id)))
            .execute(&mut self.connection)?;
        if count == 0 {
            return Err(StoreError::NotExisting);
        }
        Ok(())
    }

    fn get_restrictions(
        &mut self,
        auth_token: &AuthToken,
        filter: SlotFilter,
    ) -> Result<Vec<models::ReservationRestriction>, StoreError> {
        auth_token.check_privilege(Privilege::ShowReservations)?;

        load_restrictions(filter, &mut self.connection)
    }

    fn create_restriction(
        &mut self,
        auth_token: &AuthToken,
        restriction: models::NewReservationRestriction,
    ) -> Result<models::ReservationRestriction, StoreError> {
        use schema::reservation_restrictions;
        auth_token.check_privilege(Privilege::ManageRestrictions)?;
        let creator = auth_token
            .profile_id()
            .ok_or(StoreError::PermissionDenied {
                required_privilege: Privilege::ManageRestrictions,
            })?;

        let restriction = models::ReservationRestriction {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            location_id: restriction.location_id,
            date: restriction.date,
            start_hour: restriction.start_hour,
            message: restriction.message.trim().to_owned(),
            user_id: creator,
        };
        Ok(diesel::insert_into(reservation_restrictions::table)
            .values(&restriction)
            .returning(models::ReservationRestriction::as_returning())
            .get_result::<models::ReservationRestriction>(&mut self.connection)?)
    }

    fn delete_restriction(
        &mut self,
        auth_token: &AuthToken,
        restriction_id: RestrictionId,
    ) -> Result<(), StoreError> {
        use schema::reservation_restrictions::dsl::*;
        auth_token.check_privilege(Privilege::ManageRestrictions)?;

        let count = diesel::delete(reservation_restrictions.filter(id.eq(restriction_id)))
            .execute(&mut self.connection)?;
        if count == 0 {
            return Err(StoreError::NotExisting);
        }
        Ok(())
    }

    fn get_free_days(
        &mut self,
        auth_token: &AuthToken,
        from_date: Option<NaiveDate>,
    ) -> Result<Vec<models::FreeDay>, StoreError> {
        use schema::free_days::dsl::*;
        auth_token.check_privilege(Privilege::ShowReservations)?;

        let mut query = free_days
            .select(models::FreeDay::as_select())
            .order_by(date.asc())
            .into_boxed();
        if let Some(from_date) = from_date {
            query = query.filter(date.ge(from_date));
        }
        Ok(query.load::<models::FreeDay>(&mut self.connection)?)
    }

    fn create_or_update_free_day(
        &mut self,
        auth_token: &AuthToken,
        free_day: models::FreeDay,
    ) -> Result<bool, StoreError> {
        use schema::free_days::dsl::*;
        auth_token.check_privilege(Privilege::ManageFreeDays)?;

        let is_updated = diesel::insert_into(free_days)
            .values(&free_day)
            .on_conflict(date)
            .do_update()
            .set(&free_day)
            .returning(sql_upsert_is_updated())
            .get_result::<bool>(&mut self.connection)?;
        Ok(!is_updated)
    }

    fn delete_free_day(
        &mut self,
        auth_token: &AuthToken,
        the_date: NaiveDate,
    ) -> Result<(), StoreError> {
        use schema::free_days::dsl::*;
        auth_token.check_privilege(Privilege::ManageFreeDays)?;

        let count =
            diesel::delete(free_days.filter(date.eq(the_date))).execute(&mut self.connection)?;
        if count == 0 {
            return Err(StoreError::NotExisting);
        }
        Ok(())
    }

    fn get_global_vars(
        &mut self,
        auth_token: &AuthToken,
    ) -> Result<models::GlobalVars, StoreError> {
        use schema::global_vars::dsl::*;
        auth_token.check_privilege(Privilege::ShowReservations)?;

        Ok(global_vars
            .select(models::GlobalVars::as_select())
            .first::<models::GlobalVars>(&mut self.connection)
            .optional()?
            .unwrap_or_default())
    }

    fn update_global_vars(
        &mut self,
        auth_token: &AuthToken,
        the_global_vars: models::GlobalVars,
    ) -> Result<(), StoreError> {
        use schema::global_vars::dsl::*;
        auth_token.check_privilege(Privilege::ManageGlobalVars)?;

        let count = diesel::update(global_vars)
            .filter(id.eq(GLOBAL_VARS_ROW_ID))
            .set(&the_global_vars)
            .execute(&mut self.connection)?;
        if count == 0 {
            return Err(StoreError::InvalidDataInDatabase(
                "global_vars row is missing".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Primary key of the single row of the `global_vars` table
const GLOBAL_VARS_ROW_ID: i32 = 1;

/// Load the active reservations of a slot, together with the key holder flags of their members
fn load_slot_holders(
    the_location_id: LocationId,
    the_date: NaiveDate,
    the_hour: i32,
    connection: &mut PgConnection,
) -> Result<Vec<rules::SlotHolder>, StoreError> {
    use schema::reservations::dsl::*;

    Ok(reservations
        .inner_join(schema::profiles::table)
        .filter(location_id.eq(the_location_id))
        .filter(start_date.eq(the_date))
        .filter(start_hour.eq(the_hour))
        .filter(status.ne(ReservationStatus::Cancelled))
        .order_by(created_at.asc())
        .select((models::Reservation::as_select(), schema::profiles::has_key))
        .load::<(models::Reservation, bool)>(connection)?
        .into_iter()
        .map(|(reservation, has_key)| rules::SlotHolder {
            reservation,
            has_key,
        })
        .collect())
}

/// Set the status of all active reservations of the slot to `new_status`. Returns the ids of the
/// reservations, which actually changed.
fn update_slot_status(
    the_location_id: LocationId,
    the_date: NaiveDate,
    the_hour: i32,
    new_status: ReservationStatus,
    connection: &mut PgConnection,
) -> Result<Vec<ReservationId>, StoreError> {
    use schema::reservations::dsl::*;

    Ok(diesel::update(reservations)
        .filter(location_id.eq(the_location_id))
        .filter(start_date.eq(the_date))
        .filter(start_hour.eq(the_hour))
        .filter(status.ne(ReservationStatus::Cancelled))
        .filter(status.ne(new_status))
        .set(status.eq(new_status))
        .returning(id)
        .load::<ReservationId>(connection)?)
}

fn load_guest_invites(
    filter: SlotFilter,
    connection: &mut PgConnection,
) -> Result<Vec<models::GuestInvite>, StoreError> {
    use schema::guest_invites::dsl::*;

    Ok(guest_invites
        .filter(guest_invite_filter_to_sql(filter))
        .order_by((start_date.asc(), start_hour.asc(), guest_name.asc()))
        .select(models::GuestInvite::as_select())
        .load::<models::GuestInvite>(connection)?)
}

fn load_restrictions(
    filter: SlotFilter,
    connection: &mut PgConnection,
) -> Result<Vec<models::ReservationRestriction>, StoreError> {
    use schema::reservation_restrictions::dsl::*;

    Ok(reservation_restrictions
        .filter(restriction_filter_to_sql(filter))
        .order_by((date.asc(), start_hour.asc()))
        .select(models::ReservationRestriction::as_select())
        .load::<models::ReservationRestriction>(connection)?)
}

type BoxedBoolExpression<'a, Table> =
    Box<dyn BoxableExpression<Table, diesel::pg::Pg, SqlType = diesel::sql_types::Bool> + 'a>;

fn guest_invite_filter_to_sql<'a>(
    filter: SlotFilter,
) -> BoxedBoolExpression<'a, schema::guest_invites::table> {
    use schema::guest_invites::dsl::*;

    let mut expression: BoxedBoolExpression<'a, schema::guest_invites::table> =
        Box::new(diesel::dsl::sql::<diesel::sql_types::Bool>("TRUE"));
    if let Some(the_location_id) = filter.location_id {
        expression = Box::new(
            expression
                .as_expression()
                .and(location_id.eq(the_location_id)),
        );
    }
    if let Some(the_date) = filter.date {
        expression = Box::new(expression.as_expression().and(start_date.eq(the_date)));
    }
    if let Some(from_date) = filter.from_date {
        expression = Box::new(expression.as_expression().and(start_date.ge(from_date)));
    }
    if let Some(hour) = filter.start_hour {
        expression = Box::new(expression.as_expression().and(start_hour.eq(hour)));
    }
    expression
}

fn restriction_filter_to_sql<'a>(
    filter: SlotFilter,
) -> BoxedBoolExpression<'a, schema::reservation_restrictions::table> {
    use schema::reservation_restrictions::dsl::*;

    let mut expression: BoxedBoolExpression<'a, schema::reservation_restrictions::table> =
        Box::new(diesel::dsl::sql::<diesel::sql_types::Bool>("TRUE"));
    if let Some(the_location_id) = filter.location_id {
        expression = Box::new(
            expression
                .as_expression()
                .and(location_id.eq(the_location_id)),
        );
    }
    if let Some(the_date) = filter.date {
        expression = Box::new(expression.as_expression().and(date.eq(the_date)));
    }
    if let Some(from_date) = filter.from_date {
        expression = Box::new(expression.as_expression().and(date.ge(from_date)));
    }
    if let Some(hour) = filter.start_hour {
        expression = Box::new(expression.as_expression().and(start_hour.eq(hour)));
    }
    expression
}

/// Get a human-readable description of the consistency expectation that is checked by a specific
/// constraint in our Postgres database schema by the constraint's name.
///
/// These are visible to the user when creating or updating entities inconsistently via the REST
/// API.
///
/// Returns None, when no human-readable description is present of the given constraint name. This
/// may be the case when we don't expect this constraint to be violated by a user interaction.
pub fn description_for_postgres_constraint(constraint_name: &str) -> Option<&'static str> {
    match constraint_name {
        "club_tables_location_id_fkey" => Some("Table's location_id must reference an existing location."),
        "guest_invites_location_id_fkey" => Some("Guest invite's location_id must reference an existing location."),
        "guest_invites_start_hour_range" => Some("Guest invite's start_hour must be between 0 and 23."),
        "locations_opening_hours" => Some("Location's opening hours must be between 0 and 24, with the opening hour before the closing hour."),
        "locations_slot_duration" => Some("Location's slot_duration must be positive."),
        "reservation_restrictions_location_id_fkey" => Some("Restriction's location_id must reference an existing location."),
        "reservation_restrictions_start_hour_range" => Some("Restriction's start_hour must be between 0 and 23."),
        "reservations_table_id_fkey" => Some("Reservation's table_id must reference an existing table."),
        "global_vars_single_row" => Some("There is only a single row of global vars."),
        _ => None,
    }
}
