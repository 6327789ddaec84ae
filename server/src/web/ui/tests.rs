use super::configure_app;
use crate::auth_session::SessionToken;
use crate::data_store::models::{Reservation, ReservationStatus};
use crate::data_store::store_mock::StoreMock;
use crate::data_store::ProfileId;
use crate::live_feed::LiveFeed;
use crate::setup::ClubSettings;
use crate::web::api::tests::sample_data::{
    self, FOUNDER_ID, KEY_MEMBER_ID, LOCATION_ID, MEMBER_ID, MEMBER_PASSWORD,
};
use crate::web::ui::util;
use crate::web::AppState;
use actix_web::body::MessageBody;
use actix_web::{http, test, web, App};
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
                .configure(crate::web::api::configure_app)
                .configure(configure_app)
                .app_data(web::Data::new($state.clone())),
        )
        .await
    };
}

fn session_cookie(profile_id: ProfileId) -> actix_web::cookie::Cookie<'static> {
    util::create_session_cookie(SessionToken::new(profile_id), APP_SECRET)
}

fn location_header(res: &actix_web::dev::ServiceResponse) -> String {
    res.headers()
        .get(http::header::LOCATION)
        .expect("redirect should have a location header")
        .to_str()
        .unwrap()
        .to_owned()
}

fn body_string(res: actix_web::dev::ServiceResponse) -> String {
    let body = res.into_body().try_into_bytes().unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[actix_web::test]
async fn test_admin_page_requires_login() {
    let (state, _store) = create_state();
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/ui/admin/free-days")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::SEE_OTHER);
    let location = location_header(&res);
    assert!(location.contains("/ui/login"));
    assert!(location.contains("redirect_to=%2Fui%2Fadmin%2Ffree-days"));
}

#[actix_web::test]
async fn test_admin_page_permission() {
    let (state, _store) = create_state();
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/ui/admin/members")
        .cookie(session_cookie(MEMBER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::SEE_OTHER);
    assert!(location_header(&res).ends_with("/ui/"));

    let req = test::TestRequest::get()
        .uri("/ui/admin/members")
        .cookie(session_cookie(FOUNDER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = body_string(res);
    assert!(body.contains("Ana Popescu"));
    assert!(body.contains("Mihai Dumitru"));
}

#[actix_web::test]
async fn test_login() {
    let (state, _store) = create_state();
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/ui/login?redirect_to=%2Fui%2Freservations")
        .set_form([("email", "ana@example.ro"), ("password", MEMBER_PASSWORD)])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::SEE_OTHER);
    assert_eq!(location_header(&res), "/ui/reservations");
    let cookie = res
        .response()
        .cookies()
        .find(|c| c.name() == util::SESSION_COOKIE_NAME)
        .expect("login should set the session cookie");
    let token =
        SessionToken::from_string(cookie.value(), APP_SECRET, util::SESSION_COOKIE_MAX_AGE)
            .unwrap();
    assert_eq!(token.profile_id(), MEMBER_ID);

    let req = test::TestRequest::post()
        .uri("/ui/login")
        .set_form([("email", "ana@example.ro"), ("password", "wrong-password")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::UNPROCESSABLE_ENTITY);
    assert!(res
        .response()
        .cookies()
        .all(|c| c.name() != util::SESSION_COOKIE_NAME));
}

#[actix_web::test]
async fn test_day_view() {
    let (state, _store) = create_state();
    let app = init_app!(state);
    let date = state.settings.today() + chrono::Duration::days(1);

    let req = test::TestRequest::get()
        .uri(&format!("/ui/locations/{}/{}", LOCATION_ID, date))
        .cookie(session_cookie(MEMBER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = body_string(res);
    assert!(body.contains("Sala mare"));
    assert!(body.contains("Masa 1"));
    assert!(body.contains("Rezervă"));

    let req = test::TestRequest::get()
        .uri(&format!("/ui/locations/{}/{}", 42, date))
        .cookie(session_cookie(MEMBER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_reserve_and_cancel() {
    let (state, store) = create_state();
    let app = init_app!(state);
    let date = state.settings.today() + chrono::Duration::days(1);
    let hour = store.data.lock().unwrap().locations[0].slots(date)[0];

    let req = test::TestRequest::post()
        .uri(&format!("/ui/locations/{}/{}/reserve", LOCATION_ID, date))
        .cookie(session_cookie(MEMBER_ID))
        .set_form([("hour", hour.to_string()), ("table_id", String::new())])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::SEE_OTHER);
    assert!(location_header(&res).ends_with(&format!("/ui/locations/{}/{}", LOCATION_ID, date)));

    let reservation_id = {
        let data = store.data.lock().unwrap();
        assert_eq!(data.reservations.len(), 1);
        let reservation = &data.reservations[0];
        assert_eq!(reservation.user_id, MEMBER_ID);
        assert_eq!(reservation.start_hour, hour);
        // Nobody with a key has reserved this slot, yet
        assert_eq!(reservation.status, ReservationStatus::Pending);
        reservation.id
    };

    // An hour outside of the opening hours is a validation error
    let req = test::TestRequest::post()
        .uri(&format!("/ui/locations/{}/{}/reserve", LOCATION_ID, date))
        .cookie(session_cookie(KEY_MEMBER_ID))
        .set_form([("hour", "3"), ("table_id", "")])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(store.data.lock().unwrap().reservations.len(), 1);

    let redirect_to = format!("/ui/locations/{}/{}", LOCATION_ID, date);
    let req = test::TestRequest::post()
        .uri(&format!("/ui/reservations/{}/cancel", reservation_id))
        .cookie(session_cookie(MEMBER_ID))
        .set_form([("redirect_to", redirect_to.as_str())])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::SEE_OTHER);
    assert_eq!(location_header(&res), redirect_to);
    assert_eq!(
        store.data.lock().unwrap().reservations[0].status,
        ReservationStatus::Cancelled
    );
}

#[actix_web::test]
async fn test_my_reservations_entrance_code() {
    let (state, store) = create_state();
    let app = init_app!(state);
    let today = state.settings.today();

    let req = test::TestRequest::get()
        .uri("/ui/reservations")
        .cookie(session_cookie(KEY_MEMBER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    assert!(!body_string(res).contains("4711"));

    store.data.lock().unwrap().reservations.push(Reservation {
        id: uuid::Uuid::now_v7(),
        created_at: chrono::Utc::now(),
        user_id: KEY_MEMBER_ID,
        location_id: LOCATION_ID,
        table_id: Some(1),
        start_date: today,
        start_hour: 10,
        duration: 2,
        status: ReservationStatus::Approved,
    });

    let req = test::TestRequest::get()
        .uri("/ui/reservations")
        .cookie(session_cookie(KEY_MEMBER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let body = body_string(res);
    assert!(body.contains("4711"));
    assert!(body.contains("calendar.ics?token="));
}

#[actix_web::test]
async fn test_save_free_day() {
    let (state, store) = create_state();
    let app = init_app!(state);
    let date = state.settings.today() + chrono::Duration::days(3);

    let req = test::TestRequest::post()
        .uri("/ui/admin/free-days")
        .cookie(session_cookie(FOUNDER_ID))
        .set_form([
            ("date", date.to_string()),
            ("description", "Ziua clubului".to_string()),
        ])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::SEE_OTHER);
    {
        let data = store.data.lock().unwrap();
        assert_eq!(data.free_days.len(), 1);
        assert_eq!(data.free_days[0].date, date);
    }

    // The description must not be empty
    let req = test::TestRequest::post()
        .uri("/ui/admin/free-days")
        .cookie(session_cookie(FOUNDER_ID))
        .set_form([("date", date.to_string()), ("description", String::new())])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::UNPROCESSABLE_ENTITY);
}
