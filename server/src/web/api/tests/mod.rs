
use super::*;
use crate::auth_session::SessionToken;
use crate::data_store::store_mock::StoreMock;
use crate::live_feed::{FeedEvent, LiveFeed};
use crate::setup::ClubSettings;
use crate::web::AppState;
use actix_web::body::MessageBody;
use actix_web::{http, test, web, App};
use futures::StreamExt;
use rezervari_api_types::{ChangeKind, CreateReservationResult, ReservationStatus, SessionInfo};
use sample_data::{FOUNDER_ID, KEY_MEMBER_ID, LOCATION_ID, MEMBER_ID, MEMBER_PASSWORD};
use std::sync::Arc;

const APP_SECRET: &str = "123456";

fn create_state() -> (AppState, Arc<StoreMock>) {
    let data_store_mock = Arc::new(StoreMock::default());
    sample_data::fill_sample_data(&data_store_mock);
    let state = AppState {
        store: data_store_mock.clone(),
        secret: APP_SECRET.to_string(),
        settings: ClubSettings::default(),
        feed: Arc::new(LiveFeed::new()),
        public_base_url: None,
    };
    (state, data_store_mock)
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .configure(configure_app)
                .app_data(web::Data::new($state.clone())),
        )
        .await
    };
}

fn session_header(profile_id: uuid::Uuid) -> (String, String) {
    (
        "X-SESSION-TOKEN".to_string(),
        SessionToken::new(profile_id).as_string(APP_SECRET),
    )
}

/// A date and hour of a bookable slot in the near future
fn bookable_slot(state: &AppState, store: &StoreMock) -> (chrono::NaiveDate, i32) {
    let date = state.settings.today() + chrono::Duration::days(1);
    let data = store.data.lock().unwrap();
    (date, data.locations[0].slots(date)[0])
}

fn reservation_request(date: chrono::NaiveDate, hour: i32) -> serde_json::Value {
    serde_json::json!({
        "location_input": LOCATION_ID,
        "start_date_input": date,
        "start_hour_input": hour,
    })
}

#[actix_web::test]
async fn test_login() {
    let (state, _store) = create_state();
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(serde_json::json!({"email": "ANA@example.ro", "password": MEMBER_PASSWORD}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let result: SessionInfo = serde_json::from_slice(&body).unwrap();
    assert_eq!(result.profile.id, MEMBER_ID);
    let token =
        SessionToken::from_string(&result.session_token, APP_SECRET, SESSION_TOKEN_MAX_AGE)
            .unwrap();
    assert_eq!(token.profile_id(), MEMBER_ID);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(serde_json::json!({"email": "ana@example.ro", "password": "wrong-password"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_signup() {
    let (state, store) = create_state();
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signup")
        .set_json(serde_json::json!({
            "email": "Ion@Example.ro",
            "name": " Ion Vasile ",
            "password": "12345678",
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);
    let body = res.into_body().try_into_bytes().unwrap();
    let result: SessionInfo = serde_json::from_slice(&body).unwrap();
    assert_eq!(result.profile.email, "ion@example.ro");
    assert_eq!(result.profile.name, "Ion Vasile");
    assert!(matches!(
        result.profile.role,
        rezervari_api_types::MemberRole::Member
    ));
    assert!(!result.profile.has_key);
    assert_eq!(store.data.lock().unwrap().profiles.len(), 4);

    // Same email address again
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signup")
        .set_json(serde_json::json!({
            "email": "ion@example.ro",
            "name": "Ion Altul",
            "password": "12345678",
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CONFLICT);

    // Invalid email address and short password
    for (email, password) in [("ion.example.ro", "12345678"), ("ion2@example.ro", "1234")] {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/signup")
            .set_json(serde_json::json!({
                "email": email,
                "name": "Ion Vasile",
                "password": password,
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), http::StatusCode::UNPROCESSABLE_ENTITY);
    }
    assert_eq!(store.data.lock().unwrap().profiles.len(), 4);
}

#[actix_web::test]
async fn test_password_change_signs_out_other_sessions() {
    let (state, _store) = create_state();
    let app = init_app!(state);
    let old_session = (
        "X-SESSION-TOKEN".to_string(),
        SessionToken::with_issue_time(MEMBER_ID, chrono::Utc::now() - chrono::Duration::seconds(10))
            .as_string(APP_SECRET),
    );

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/password")
        .append_header(old_session.clone())
        .set_json(serde_json::json!({
            "current_password": MEMBER_PASSWORD,
            "new_password": "o-parola-noua",
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let result: SessionInfo = serde_json::from_slice(&body).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/auth")
        .append_header(("X-SESSION-TOKEN".to_string(), result.session_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/v1/auth")
        .append_header(old_session)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_missing_session_token() {
    let (state, _store) = create_state();
    let app = init_app!(state);
    let req = test::TestRequest::get()
        .uri("/api/v1/locations")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/v1/locations")
        .append_header(("X-SESSION-TOKEN", "not-a-token"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_list_locations() {
    let (state, _store) = create_state();
    let app = init_app!(state);
    let req = test::TestRequest::get()
        .uri("/api/v1/locations")
        .append_header(session_header(MEMBER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let result: Vec<rezervari_api_types::Location> = serde_json::from_slice(&body).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].name, "Sala mare");
    assert_eq!(result[0].tables.len(), 2);

    let req = test::TestRequest::get()
        .uri("/api/v1/locations/42/tables")
        .append_header(session_header(MEMBER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_create_reservation() {
    let (state, store) = create_state();
    let app = init_app!(state);
    let (date, hour) = bookable_slot(&state, &store);
    let mut feed = state.feed.subscribe(LOCATION_ID, date);

    let req = test::TestRequest::post()
        .uri("/api/v1/rpc/create_reservation")
        .append_header(session_header(MEMBER_ID))
        .set_json(reservation_request(date, hour))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);
    let body = res.into_body().try_into_bytes().unwrap();
    let result: CreateReservationResult = serde_json::from_slice(&body).unwrap();
    assert_eq!(result.error, None);
    let reservation = result.reservation.unwrap();
    assert_eq!(reservation.user_id, MEMBER_ID);
    assert_eq!(reservation.start_hour, hour);
    assert!(matches!(reservation.status, ReservationStatus::Pending));

    match feed.next().await {
        Some(FeedEvent::Change(change)) => {
            assert!(matches!(change.kind, ChangeKind::Insert));
            assert_eq!(change.reservation_id, reservation.id);
        }
        other => panic!("Unexpected feed event {:?}", other),
    }

    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/locations/{}/reservations/{}",
            LOCATION_ID, date
        ))
        .append_header(session_header(FOUNDER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let roster: Vec<rezervari_api_types::Reservation> = serde_json::from_slice(&body).unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].user_name.as_deref(), Some("Ana Popescu"));
}

#[actix_web::test]
async fn test_key_holder_approves_slot() {
    let (state, store) = create_state();
    let app = init_app!(state);
    let (date, hour) = bookable_slot(&state, &store);

    for profile_id in [MEMBER_ID, KEY_MEMBER_ID] {
        let req = test::TestRequest::post()
            .uri("/api/v1/rpc/create_reservation")
            .append_header(session_header(profile_id))
            .set_json(reservation_request(date, hour))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), http::StatusCode::CREATED);
    }

    let data = store.data.lock().unwrap();
    assert_eq!(data.reservations.len(), 2);
    assert!(data
        .reservations
        .iter()
        .all(|r| r.status == crate::data_store::models::ReservationStatus::Approved));
}

#[actix_web::test]
async fn test_create_reservation_rejected() {
    let (state, store) = create_state();
    let app = init_app!(state);
    let (date, hour) = bookable_slot(&state, &store);
    store.data.lock().unwrap().global_vars.maintenance = true;

    let req = test::TestRequest::post()
        .uri("/api/v1/rpc/create_reservation")
        .append_header(session_header(MEMBER_ID))
        .set_json(reservation_request(date, hour))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CONFLICT);
    let body = res.into_body().try_into_bytes().unwrap();
    let result: CreateReservationResult = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        result.error,
        Some(crate::booking::rules::ReservationRejection::Maintenance.to_string())
    );
    assert!(result.reservation.is_none());
    assert!(store.data.lock().unwrap().reservations.is_empty());
}

#[actix_web::test]
async fn test_create_reservation_invalid_hour() {
    let (state, store) = create_state();
    let app = init_app!(state);
    let (date, _) = bookable_slot(&state, &store);

    for hour in [99, 24, -1, i32::MAX] {
        let req = test::TestRequest::post()
            .uri("/api/v1/rpc/create_reservation")
            .append_header(session_header(MEMBER_ID))
            .set_json(reservation_request(date, hour))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), http::StatusCode::UNPROCESSABLE_ENTITY);
    }
    assert!(store.data.lock().unwrap().reservations.is_empty());

    // The store is still usable afterwards
    let (date, hour) = bookable_slot(&state, &store);
    let req = test::TestRequest::post()
        .uri("/api/v1/rpc/create_reservation")
        .append_header(session_header(MEMBER_ID))
        .set_json(reservation_request(date, hour))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);
}

#[actix_web::test]
async fn test_transaction_conflict() {
    let (state, store) = create_state();
    let app = init_app!(state);
    let (date, hour) = bookable_slot(&state, &store);
    store.data.lock().unwrap().next_error =
        Some(crate::data_store::StoreError::TransactionConflict);

    let req = test::TestRequest::post()
        .uri("/api/v1/rpc/create_reservation")
        .append_header(session_header(MEMBER_ID))
        .set_json(reservation_request(date, hour))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn test_random_generator_failure_is_internal_error() {
    let (state, store) = create_state();
    let app = init_app!(state);
    store.data.lock().unwrap().next_error =
        Some(crate::data_store::StoreError::RandomnessUnavailable);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/signup")
        .set_json(serde_json::json!({
            "email": "ion@example.ro",
            "name": "Ion Vasile",
            "password": "12345678",
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn test_cancel_reservation() {
    let (state, store) = create_state();
    let app = init_app!(state);
    let (date, hour) = bookable_slot(&state, &store);

    let req = test::TestRequest::post()
        .uri("/api/v1/rpc/create_reservation")
        .append_header(session_header(MEMBER_ID))
        .set_json(reservation_request(date, hour))
        .to_request();
    let res = test::call_service(&app, req).await;
    let body = res.into_body().try_into_bytes().unwrap();
    let result: CreateReservationResult = serde_json::from_slice(&body).unwrap();
    let reservation_id = result.reservation.unwrap().id;

    // Another member must not cancel the reservation
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/reservations/{}/cancel", reservation_id))
        .append_header(session_header(KEY_MEMBER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/reservations/{}/cancel", reservation_id))
        .append_header(session_header(MEMBER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let result: rezervari_api_types::Reservation = serde_json::from_slice(&body).unwrap();
    assert!(matches!(result.status, ReservationStatus::Cancelled));

    let req = test::TestRequest::get()
        .uri("/api/v1/reservations/mine")
        .append_header(session_header(MEMBER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let result: Vec<rezervari_api_types::Reservation> = serde_json::from_slice(&body).unwrap();
    assert_eq!(result.len(), 1);
}

#[actix_web::test]
async fn test_cancel_last_key_holder_reverts_approval() {
    let (state, store) = create_state();
    let app = init_app!(state);
    let (date, hour) = bookable_slot(&state, &store);

    let mut reservation_ids = Vec::new();
    for profile_id in [MEMBER_ID, KEY_MEMBER_ID] {
        let req = test::TestRequest::post()
            .uri("/api/v1/rpc/create_reservation")
            .append_header(session_header(profile_id))
            .set_json(reservation_request(date, hour))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), http::StatusCode::CREATED);
        let body = res.into_body().try_into_bytes().unwrap();
        let result: CreateReservationResult = serde_json::from_slice(&body).unwrap();
        reservation_ids.push(result.reservation.unwrap().id);
    }
    let (member_reservation_id, key_reservation_id) = (reservation_ids[0], reservation_ids[1]);

    let mut feed = state.feed.subscribe(LOCATION_ID, date);
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/reservations/{}/cancel", key_reservation_id))
        .append_header(session_header(KEY_MEMBER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);

    {
        use crate::data_store::models::ReservationStatus as Status;
        let data = store.data.lock().unwrap();
        let status_of = |id: uuid::Uuid| {
            data.reservations
                .iter()
                .find(|r| r.id == id)
                .map(|r| r.status)
                .unwrap()
        };
        assert_eq!(status_of(key_reservation_id), Status::Cancelled);
        assert_eq!(status_of(member_reservation_id), Status::Pending);
    }

    // The cancelled row still exists, so both changes are updates
    for expected_id in [key_reservation_id, member_reservation_id] {
        match feed.next().await {
            Some(FeedEvent::Change(change)) => {
                assert!(matches!(change.kind, ChangeKind::Update));
                assert_eq!(change.reservation_id, expected_id);
            }
            other => panic!("Unexpected feed event {:?}", other),
        }
    }
}

#[actix_web::test]
async fn test_global_vars_privilege() {
    let (state, _store) = create_state();
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/v1/global-vars")
        .append_header(session_header(MEMBER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri("/api/v1/global-vars")
        .append_header(session_header(FOUNDER_ID))
        .set_json(serde_json::json!({"maintenance": true, "entrance_code": "1234"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/api/v1/global-vars")
        .append_header(session_header(FOUNDER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let result: rezervari_api_types::GlobalVars = serde_json::from_slice(&body).unwrap();
    assert!(result.maintenance);
    assert_eq!(result.entrance_code, "1234");
}

#[actix_web::test]
async fn test_guest_invites() {
    let (state, store) = create_state();
    let app = init_app!(state);
    let (date, hour) = bookable_slot(&state, &store);

    let guest = serde_json::json!({
        "location_id": LOCATION_ID,
        "guest_name": "  Io  ",
        "start_date": date,
        "start_hour": hour,
    });
    let req = test::TestRequest::post()
        .uri("/api/v1/guests")
        .append_header(session_header(FOUNDER_ID))
        .set_json(guest)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::UNPROCESSABLE_ENTITY);

    let guest = serde_json::json!({
        "location_id": LOCATION_ID,
        "guest_name": "  Ioana  ",
        "start_date": date,
        "start_hour": hour,
    });
    let req = test::TestRequest::post()
        .uri("/api/v1/guests")
        .append_header(session_header(MEMBER_ID))
        .set_json(guest.clone())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/v1/guests")
        .append_header(session_header(FOUNDER_ID))
        .set_json(guest)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);
    let body = res.into_body().try_into_bytes().unwrap();
    let created: rezervari_api_types::GuestInvite = serde_json::from_slice(&body).unwrap();
    assert_eq!(created.guest_name, "Ioana");
    assert_eq!(created.user_id, FOUNDER_ID);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/guests?location_id={}&date={}", LOCATION_ID, date))
        .append_header(session_header(FOUNDER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    let body = res.into_body().try_into_bytes().unwrap();
    let listed: Vec<rezervari_api_types::GuestInvite> = serde_json::from_slice(&body).unwrap();
    assert_eq!(listed.len(), 1);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/guests/{}", created.id))
        .append_header(session_header(FOUNDER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NO_CONTENT);
    assert!(store.data.lock().unwrap().guest_invites.is_empty());
}

#[actix_web::test]
async fn test_free_days() {
    let (state, store) = create_state();
    let app = init_app!(state);

    let req = test::TestRequest::put()
        .uri("/api/v1/free-days/2025-12-25")
        .append_header(session_header(FOUNDER_ID))
        .set_json(serde_json::json!({"date": "2025-12-25", "description": "Crăciun"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);

    let req = test::TestRequest::put()
        .uri("/api/v1/free-days/2025-12-25")
        .append_header(session_header(FOUNDER_ID))
        .set_json(serde_json::json!({"date": "2025-12-25", "description": "Crăciunul"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NO_CONTENT);
    assert_eq!(
        store.data.lock().unwrap().free_days[0].description,
        "Crăciunul"
    );

    let req = test::TestRequest::put()
        .uri("/api/v1/free-days/2025-12-26")
        .append_header(session_header(FOUNDER_ID))
        .set_json(serde_json::json!({"date": "2025-12-25", "description": "Crăciun"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::UNPROCESSABLE_ENTITY);

    let req = test::TestRequest::delete()
        .uri("/api/v1/free-days/2025-12-25")
        .append_header(session_header(MEMBER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_change_profile() {
    let (state, store) = create_state();
    let app = init_app!(state);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/profiles/{}", MEMBER_ID))
        .append_header(session_header(FOUNDER_ID))
        .set_json(serde_json::json!({"role": "coach", "has_key": true}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = res.into_body().try_into_bytes().unwrap();
    let result: rezervari_api_types::Profile = serde_json::from_slice(&body).unwrap();
    assert!(result.has_key);
    assert!(matches!(result.role, rezervari_api_types::MemberRole::Coach));
    assert_eq!(result.name, "Ana Popescu");

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/profiles/{}", FOUNDER_ID))
        .append_header(session_header(KEY_MEMBER_ID))
        .set_json(serde_json::json!({"role": "member"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);
    assert_eq!(
        store.data.lock().unwrap().profiles[0].role,
        crate::data_store::auth_token::MemberRole::Founder
    );
}
