use crate::auth_session::SessionToken;
use crate::booking::rules;
use crate::data_store::auth_token::{AuthToken, MemberRole, Privilege};
use crate::data_store::models::{
    ClubTable, FreeDay, FullReservation, GlobalVars, GuestInvite, Location, Profile, Reservation,
    ReservationRestriction, ReservationStatus,
};
use crate::data_store::{
    models, passwords, GuestInviteId, LocationId, ProfileId, ReservationId, ReservationStore,
    ReservationStoreFacade, RestrictionId, SlotFilter, StoreError,
};
use crate::setup::ClubSettings;
use chrono::{NaiveDate, Utc};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/**
 * A mock [ReservationStore] implementation for testing.
 *
 * The simulated database consists of the [StoreMockData] structure with vectors of entities. These
 * can be directly modified by the tests.
 *
 * Privileges are checked like in the real store, and reservations are evaluated with the same
 * booking rules. Transactions and SQL constraints are not simulated. Instead, the
 * [StoreMockData.next_error] attribute can be set to simulate a database error.
 */
#[derive(Default)]
pub struct StoreMock {
    pub data: Mutex<StoreMockData>,
}

impl ReservationStore for StoreMock {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn ReservationStoreFacade + 'a>, StoreError> {
        Ok(Box::new(StoreMockFacade { store: self }))
    }
}

#[derive(Default)]
pub struct StoreMockData {
    pub profiles: Vec<Profile>,
    pub locations: Vec<Location>,
    pub tables: Vec<ClubTable>,
    pub reservations: Vec<Reservation>,
    pub guest_invites: Vec<GuestInvite>,
    pub restrictions: Vec<ReservationRestriction>,
    pub free_days: Vec<FreeDay>,
    pub global_vars: GlobalVars,
    /// Issued password reset tokens (plain token, profile id)
    pub reset_tokens: Vec<(String, ProfileId)>,
    /// If not none, the next call to a store facade method will return this error.
    pub next_error: Option<StoreError>,
}

struct StoreMockFacade<'a> {
    store: &'a StoreMock,
}

impl StoreMockFacade<'_> {
    fn data(&self) -> Result<MutexGuard<'_, StoreMockData>, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        Ok(data)
    }
}

impl ReservationStoreFacade for StoreMockFacade<'_> {
    fn create_profile(&mut self, profile: models::NewProfile) -> Result<Profile, StoreError> {
        let mut data = self.data()?;
        let email = passwords::normalize_email(&profile.email);
        if data.profiles.iter().any(|p| p.email == email) {
            return Err(StoreError::ConflictEntityExists);
        }
        let now = Utc::now();
        let result = Profile {
            id: Uuid::now_v7(),
            email,
            name: profile.name.trim().to_owned(),
            role: MemberRole::Member,
            has_key: false,
            password_hash: passwords::hash_password(&profile.password)?,
            sessions_valid_after: now - chrono::Duration::seconds(1),
            created_at: now,
        };
        data.profiles.push(result.clone());
        Ok(result)
    }

    fn authenticate_with_password(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<SessionToken, StoreError> {
        let data = self.data()?;
        let email = passwords::normalize_email(email);
        data.profiles
            .iter()
            .find(|p| p.email == email && passwords::verify_password(&p.password_hash, password))
            .map(|p| SessionToken::new(p.id))
            .ok_or(StoreError::AuthenticationFailed)
    }

    fn get_auth_token_for_session(
        &mut self,
        session_token: &SessionToken,
    ) -> Result<AuthToken, StoreError> {
        let data = self.data()?;
        data.profiles
            .iter()
            .find(|p| {
                p.id == session_token.profile_id()
                    && session_token.issued_at() >= p.sessions_valid_after
            })
            .map(|p| AuthToken::create_for_session(p.id, p.role, p.has_key))
            .ok_or(StoreError::AuthenticationFailed)
    }

    fn get_profile(
        &mut self,
        auth_token: &AuthToken,
        profile_id: ProfileId,
    ) -> Result<Profile, StoreError> {
        auth_token.check_owner_or_privilege(profile_id, Privilege::ManageMembers)?;
        let data = self.data()?;
        data.profiles
            .iter()
            .find(|p| p.id == profile_id)
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn get_profiles(&mut self, auth_token: &AuthToken) -> Result<Vec<Profile>, StoreError> {
        auth_token.check_privilege(Privilege::ManageMembers)?;
        let data = self.data()?;
        let mut result = data.profiles.clone();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    fn update_profile(
        &mut self,
        auth_token: &AuthToken,
        profile_id: ProfileId,
        patch: models::ProfilePatch,
    ) -> Result<Profile, StoreError> {
        auth_token.check_privilege(Privilege::ManageMembers)?;
        let mut data = self.data()?;
        let profile = data
            .profiles
            .iter_mut()
            .find(|p| p.id == profile_id)
            .ok_or(StoreError::NotExisting)?;
        if let Some(name) = patch.name {
            profile.name = name;
        }
        if let Some(role) = patch.role {
            profile.role = role;
        }
        if let Some(has_key) = patch.has_key {
            profile.has_key = has_key;
        }
        Ok(profile.clone())
    }

    fn update_password(
        &mut self,
        auth_token: &AuthToken,
        current_password: &str,
        new_password: &str,
    ) -> Result<SessionToken, StoreError> {
        let profile_id = auth_token
            .profile_id()
            .ok_or(StoreError::AuthenticationFailed)?;
        let mut data = self.data()?;
        let profile = data
            .profiles
            .iter_mut()
            .find(|p| p.id == profile_id)
            .ok_or(StoreError::NotExisting)?;
        if !passwords::verify_password(&profile.password_hash, current_password) {
            return Err(StoreError::AuthenticationFailed);
        }
        let token = SessionToken::new(profile_id);
        profile.password_hash = passwords::hash_password(new_password)?;
        profile.sessions_valid_after = token.issued_at();
        Ok(token)
    }

    fn set_password(
        &mut self,
        auth_token: &AuthToken,
        profile_id: ProfileId,
        new_password: &str,
    ) -> Result<(), StoreError> {
        auth_token.check_privilege(Privilege::ManageMembers)?;
        let mut data = self.data()?;
        let profile = data
            .profiles
            .iter_mut()
            .find(|p| p.id == profile_id)
            .ok_or(StoreError::NotExisting)?;
        profile.password_hash = passwords::hash_password(new_password)?;
        profile.sessions_valid_after = SessionToken::new(profile.id).issued_at();
        Ok(())
    }

    fn create_password_reset_token(
        &mut self,
        email: &str,
    ) -> Result<Option<(Profile, String)>, StoreError> {
        let mut data = self.data()?;
        let email = passwords::normalize_email(email);
        let Some(profile) = data.profiles.iter().find(|p| p.email == email).cloned() else {
            return Ok(None);
        };
        let (token, _) = passwords::generate_reset_token()?;
        data.reset_tokens.push((token.clone(), profile.id));
        Ok(Some((profile, token)))
    }

    fn reset_password_with_token(
        &mut self,
        token: &str,
        new_password: &str,
    ) -> Result<ProfileId, StoreError> {
        let mut data = self.data()?;
        let index = data
            .reset_tokens
            .iter()
            .position(|(t, _)| t == token)
            .ok_or(StoreError::NotExisting)?;
        let (_, profile_id) = data.reset_tokens.remove(index);
        let profile = data
            .profiles
            .iter_mut()
            .find(|p| p.id == profile_id)
            .ok_or(StoreError::NotExisting)?;
        profile.password_hash = passwords::hash_password(new_password)?;
        profile.sessions_valid_after = SessionToken::new(profile.id).issued_at();
        Ok(profile_id)
    }

    fn get_locations(&mut self, auth_token: &AuthToken) -> Result<Vec<Location>, StoreError> {
        auth_token.check_privilege(Privilege::ShowReservations)?;
        let data = self.data()?;
        let mut result = data.locations.clone();
        result.sort_by_key(|l| (l.sort_key, l.id));
        Ok(result)
    }

    fn get_location(
        &mut self,
        auth_token: &AuthToken,
        location_id: LocationId,
    ) -> Result<Location, StoreError> {
        auth_token.check_privilege(Privilege::ShowReservations)?;
        let data = self.data()?;
        data.locations
            .iter()
            .find(|l| l.id == location_id)
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn get_tables(
        &mut self,
        auth_token: &AuthToken,
        location_id: LocationId,
    ) -> Result<Vec<ClubTable>, StoreError> {
        auth_token.check_privilege(Privilege::ShowReservations)?;
        let data = self.data()?;
        if !data.locations.iter().any(|l| l.id == location_id) {
            return Err(StoreError::NotExisting);
        }
        Ok(data
            .tables
            .iter()
            .filter(|t| t.location_id == location_id)
            .cloned()
            .collect())
    }

    fn import_locations(
        &mut self,
        auth_token: &AuthToken,
        locations: Vec<models::LocationWithTables>,
    ) -> Result<(), StoreError> {
        auth_token.check_privilege(Privilege::ManageGlobalVars)?;
        let mut data = self.data()?;
        for location in locations {
            let location_id = location.location.id;
            data.locations.retain(|l| l.id != location_id);
            data.locations.push(location.location);
            data.tables.retain(|t| t.location_id != location_id);
            data.tables.extend(location.tables);
        }
        Ok(())
    }

    fn get_reservations_for_day(
        &mut self,
        auth_token: &AuthToken,
        location_id: LocationId,
        date: NaiveDate,
    ) -> Result<Vec<FullReservation>, StoreError> {
        auth_token.check_privilege(Privilege::ShowReservations)?;
        let data = self.data()?;
        let mut result: Vec<FullReservation> = data
            .reservations
            .iter()
            .filter(|r| r.location_id == location_id && r.start_date == date)
            .map(|r| FullReservation {
                reservation: r.clone(),
                user_name: data
                    .profiles
                    .iter()
                    .find(|p| p.id == r.user_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
            })
            .collect();
        result.sort_by_key(|r| {
            (
                !r.reservation.status.is_active(),
                r.reservation.start_hour,
                r.reservation.created_at,
            )
        });
        Ok(result)
    }

    fn get_reservations_of_member(
        &mut self,
        auth_token: &AuthToken,
        profile_id: ProfileId,
        from_date: NaiveDate,
    ) -> Result<Vec<Reservation>, StoreError> {
        auth_token.check_owner_or_privilege(profile_id, Privilege::ManageReservations)?;
        let data = self.data()?;
        let mut result: Vec<Reservation> = data
            .reservations
            .iter()
            .filter(|r| r.user_id == profile_id && r.start_date >= from_date)
            .cloned()
            .collect();
        result.sort_by_key(|r| (r.start_date, r.start_hour, r.created_at));
        Ok(result)
    }

    fn create_reservation(
        &mut self,
        auth_token: &AuthToken,
        settings: &ClubSettings,
        request: models::ReservationRequest,
    ) -> Result<models::ReservationUpdate, StoreError> {
        auth_token.check_privilege(Privilege::CreateReservation)?;
        let profile_id = auth_token
            .profile_id()
            .ok_or(StoreError::PermissionDenied {
                required_privilege: Privilege::CreateReservation,
            })?;
        let mut data = self.data()?;

        let profile = data
            .profiles
            .iter()
            .find(|p| p.id == profile_id)
            .ok_or(StoreError::NotExisting)?;
        let location = data
            .locations
            .iter()
            .find(|l| l.id == request.location_id)
            .ok_or(StoreError::NotExisting)?;
        let tables: Vec<ClubTable> = data
            .tables
            .iter()
            .filter(|t| t.location_id == request.location_id)
            .cloned()
            .collect();
        let slot_filter = SlotFilter::builder()
            .at_location(request.location_id)
            .on_date(request.date)
            .at_hour(request.hour)
            .build();
        let guests: Vec<GuestInvite> = data
            .guest_invites
            .iter()
            .filter(|g| slot_filter.matches(g.location_id, g.start_date, g.start_hour))
            .cloned()
            .collect();
        let slot_reservations: Vec<rules::SlotHolder> = data
            .reservations
            .iter()
            .filter(|r| {
                r.status.is_active()
                    && slot_filter.matches(r.location_id, r.start_date, r.start_hour)
            })
            .map(|r| rules::SlotHolder {
                reservation: r.clone(),
                has_key: data
                    .profiles
                    .iter()
                    .any(|p| p.id == r.user_id && p.has_key),
            })
            .collect();
        let requester_reservations_of_day: Vec<Reservation> = data
            .reservations
            .iter()
            .filter(|r| r.user_id == profile_id && r.start_date == request.date)
            .cloned()
            .collect();

        let new_status = rules::evaluate_reservation_request(
            &rules::SlotSnapshot {
                request: &request,
                requester: &rules::Requester {
                    profile_id,
                    role: profile.role,
                    has_key: profile.has_key,
                },
                settings,
                maintenance: data.global_vars.maintenance,
                location,
                tables: &tables,
                free_day: data.free_days.iter().find(|f| f.date == request.date),
                restriction: data
                    .restrictions
                    .iter()
                    .find(|r| slot_filter.matches(r.location_id, r.date, r.start_hour)),
                guests: &guests,
                slot_reservations: &slot_reservations,
                requester_reservations_of_day: &requester_reservations_of_day,
            },
            Utc::now(),
        )
        .map_err(StoreError::ReservationRejected)?;

        let reservation = Reservation {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            user_id: profile_id,
            location_id: request.location_id,
            table_id: request.table_id,
            start_date: request.date,
            start_hour: request.hour,
            duration: location.slot_duration,
            status: new_status,
        };
        let changed_status = set_slot_status(&mut data, &slot_filter, new_status);
        data.reservations.push(reservation.clone());
        Ok(models::ReservationUpdate {
            reservation,
            changed_status,
        })
    }

    fn cancel_reservation(
        &mut self,
        auth_token: &AuthToken,
        settings: &ClubSettings,
        reservation_id: ReservationId,
    ) -> Result<models::ReservationUpdate, StoreError> {
        auth_token.check_privilege(Privilege::ShowReservations)?;
        let mut data = self.data()?;
        let reservation = data
            .reservations
            .iter_mut()
            .find(|r| r.id == reservation_id)
            .ok_or(StoreError::NotExisting)?;
        rules::evaluate_cancellation(reservation, auth_token, settings, Utc::now())
            .map_err(StoreError::CancellationRejected)?;
        reservation.status = ReservationStatus::Cancelled;
        let reservation = reservation.clone();

        let slot_filter = SlotFilter::builder()
            .at_location(reservation.location_id)
            .on_date(reservation.start_date)
            .at_hour(reservation.start_hour)
            .build();
        let remaining_keys: Vec<bool> = data
            .reservations
            .iter()
            .filter(|r| {
                r.status.is_active()
                    && slot_filter.matches(r.location_id, r.start_date, r.start_hour)
            })
            .map(|r| data.profiles.iter().any(|p| p.id == r.user_id && p.has_key))
            .collect();
        let changed_status =
            set_slot_status(&mut data, &slot_filter, rules::slot_status(remaining_keys));
        Ok(models::ReservationUpdate {
            reservation,
            changed_status,
        })
    }

    fn get_guest_invites(
        &mut self,
        auth_token: &AuthToken,
        filter: SlotFilter,
    ) -> Result<Vec<GuestInvite>, StoreError> {
        auth_token.check_privilege(Privilege::ShowReservations)?;
        let data = self.data()?;
        let mut result: Vec<GuestInvite> = data
            .guest_invites
            .iter()
            .filter(|g| filter.matches(g.location_id, g.start_date, g.start_hour))
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            (a.start_date, a.start_hour, &a.guest_name).cmp(&(
                b.start_date,
                b.start_hour,
                &b.guest_name,
            ))
        });
        Ok(result)
    }

    fn create_guest_invite(
        &mut self,
        auth_token: &AuthToken,
        guest_invite: models::NewGuestInvite,
    ) -> Result<GuestInvite, StoreError> {
        auth_token.check_privilege(Privilege::ManageGuests)?;
        let mut data = self.data()?;
        let result = GuestInvite {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            user_id: auth_token.profile_id().unwrap_or_default(),
            location_id: guest_invite.location_id,
            guest_name: guest_invite.guest_name,
            start_date: guest_invite.start_date,
            start_hour: guest_invite.start_hour,
            special: guest_invite.special,
        };
        data.guest_invites.push(result.clone());
        Ok(result)
    }

    fn delete_guest_invite(
        &mut self,
        auth_token: &AuthToken,
        guest_invite_id: GuestInviteId,
    ) -> Result<(), StoreError> {
        auth_token.check_privilege(Privilege::ManageGuests)?;
        let mut data = self.data()?;
        let length_before = data.guest_invites.len();
        data.guest_invites.retain(|g| g.id != guest_invite_id);
        if data.guest_invites.len() == length_before {
            return Err(StoreError::NotExisting);
        }
        Ok(())
    }

    fn get_restrictions(
        &mut self,
        auth_token: &AuthToken,
        filter: SlotFilter,
    ) -> Result<Vec<ReservationRestriction>, StoreError> {
        auth_token.check_privilege(Privilege::ShowReservations)?;
        let data = self.data()?;
        let mut result: Vec<ReservationRestriction> = data
            .restrictions
            .iter()
            .filter(|r| filter.matches(r.location_id, r.date, r.start_hour))
            .cloned()
            .collect();
        result.sort_by_key(|r| (r.date, r.start_hour));
        Ok(result)
    }

    fn create_restriction(
        &mut self,
        auth_token: &AuthToken,
        restriction: models::NewReservationRestriction,
    ) -> Result<ReservationRestriction, StoreError> {
        auth_token.check_privilege(Privilege::ManageRestrictions)?;
        let mut data = self.data()?;
        if data.restrictions.iter().any(|r| {
            r.location_id == restriction.location_id
                && r.date == restriction.date
                && r.start_hour == restriction.start_hour
        }) {
            return Err(StoreError::ConflictEntityExists);
        }
        let result = ReservationRestriction {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            location_id: restriction.location_id,
            date: restriction.date,
            start_hour: restriction.start_hour,
            message: restriction.message,
            user_id: auth_token.profile_id().unwrap_or_default(),
        };
        data.restrictions.push(result.clone());
        Ok(result)
    }

    fn delete_restriction(
        &mut self,
        auth_token: &AuthToken,
        restriction_id: RestrictionId,
    ) -> Result<(), StoreError> {
        auth_token.check_privilege(Privilege::ManageRestrictions)?;
        let mut data = self.data()?;
        let length_before = data.restrictions.len();
        data.restrictions.retain(|r| r.id != restriction_id);
        if data.restrictions.len() == length_before {
            return Err(StoreError::NotExisting);
        }
        Ok(())
    }

    fn get_free_days(
        &mut self,
        auth_token: &AuthToken,
        from_date: Option<NaiveDate>,
    ) -> Result<Vec<FreeDay>, StoreError> {
        auth_token.check_privilege(Privilege::ShowReservations)?;
        let data = self.data()?;
        let mut result: Vec<FreeDay> = data
            .free_days
            .iter()
            .filter(|f| from_date.map_or(true, |from| f.date >= from))
            .cloned()
            .collect();
        result.sort_by_key(|f| f.date);
        Ok(result)
    }

    fn create_or_update_free_day(
        &mut self,
        auth_token: &AuthToken,
        free_day: FreeDay,
    ) -> Result<bool, StoreError> {
        auth_token.check_privilege(Privilege::ManageFreeDays)?;
        let mut data = self.data()?;
        if let Some(existing) = data.free_days.iter_mut().find(|f| f.date == free_day.date) {
            existing.description = free_day.description;
            Ok(false)
        } else {
            data.free_days.push(free_day);
            Ok(true)
        }
    }

    fn delete_free_day(&mut self, auth_token: &AuthToken, date: NaiveDate) -> Result<(), StoreError> {
        auth_token.check_privilege(Privilege::ManageFreeDays)?;
        let mut data = self.data()?;
        let length_before = data.free_days.len();
        data.free_days.retain(|f| f.date != date);
        if data.free_days.len() == length_before {
            return Err(StoreError::NotExisting);
        }
        Ok(())
    }

    fn get_global_vars(&mut self, auth_token: &AuthToken) -> Result<GlobalVars, StoreError> {
        auth_token.check_privilege(Privilege::ShowReservations)?;
        Ok(self.data()?.global_vars.clone())
    }

    fn update_global_vars(
        &mut self,
        auth_token: &AuthToken,
        global_vars: GlobalVars,
    ) -> Result<(), StoreError> {
        auth_token.check_privilege(Privilege::ManageGlobalVars)?;
        self.data()?.global_vars = global_vars;
        Ok(())
    }
}

/// Set the status of all active reservations in the slot and return the ids of the changed ones
fn set_slot_status(
    data: &mut StoreMockData,
    slot_filter: &SlotFilter,
    new_status: ReservationStatus,
) -> Vec<ReservationId> {
    data.reservations
        .iter_mut()
        .filter(|r| {
            r.status.is_active()
                && r.status != new_status
                && slot_filter.matches(r.location_id, r.start_date, r.start_hour)
        })
        .map(|r| {
            r.status = new_status;
            r.id
        })
        .collect()
}
