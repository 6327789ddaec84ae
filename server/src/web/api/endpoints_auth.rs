use crate::data_store::models::NewProfile;
use crate::web::api::{require_session_token, validate_field, APIError, SessionTokenHeader};
use crate::web::ui::validation::{Email, MemberName, Password};
use crate::web::AppState;
use actix_web::{get, post, web, HttpResponse, Responder};
use log::info;
use rezervari_api_types::{LoginRequest, PasswordUpdateRequest, SessionInfo, SignupRequest};

#[post("/auth/signup")]
async fn signup(
    state: web::Data<AppState>,
    data: web::Json<SignupRequest>,
) -> Result<impl Responder, APIError> {
    let data = data.into_inner();
    let new_profile = NewProfile {
        email: validate_field::<Email>("email", &data.email)?.into_inner(),
        name: validate_field::<MemberName>("name", &data.name)?.into_inner(),
        password: validate_field::<Password>("password", &data.password)?.into_inner(),
    };
    let secret = state.secret.clone();
    let session_info = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let profile = store.create_profile(new_profile)?;
        info!("New member {} signed up", profile.id);
        let session_token = store.authenticate_with_password(&data.email, &data.password)?;
        Ok(SessionInfo {
            profile: profile.into(),
            session_token: session_token.as_string(&secret),
        })
    })
    .await??;
    Ok(HttpResponse::Created().json(session_info))
}

#[post("/auth/login")]
async fn login(
    state: web::Data<AppState>,
    data: web::Json<LoginRequest>,
) -> Result<impl Responder, APIError> {
    let data = data.into_inner();
    let secret = state.secret.clone();
    let session_info = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let session_token = store.authenticate_with_password(&data.email, &data.password)?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        let profile = store.get_profile(&auth, session_token.profile_id())?;
        Ok(SessionInfo {
            profile: profile.into(),
            session_token: session_token.as_string(&secret),
        })
    })
    .await??;
    Ok(web::Json(session_info))
}

#[get("/auth")]
async fn get_own_profile(
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
) -> Result<impl Responder, APIError> {
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let profile = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        Ok(store.get_profile(&auth, session_token.profile_id())?)
    })
    .await??;
    Ok(web::Json(rezervari_api_types::Profile::from(profile)))
}

/// Change the own password. Other sessions of the member are signed out, so the response contains
/// a fresh session token for the client.
#[post("/auth/password")]
async fn update_password(
    state: web::Data<AppState>,
    session_token_header: Option<web::Header<SessionTokenHeader>>,
    data: web::Json<PasswordUpdateRequest>,
) -> Result<impl Responder, APIError> {
    let session_token = require_session_token(session_token_header, &state.secret)?;
    let data = data.into_inner();
    let new_password = validate_field::<Password>("new_password", &data.new_password)?;
    let secret = state.secret.clone();
    let session_info = web::block(move || -> Result<_, APIError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_session(&session_token)?;
        let new_session_token =
            store.update_password(&auth, &data.current_password, &new_password.into_inner())?;
        let auth = store.get_auth_token_for_session(&new_session_token)?;
        let profile = store.get_profile(&auth, new_session_token.profile_id())?;
        info!("Member {} changed their password", profile.id);
        Ok(SessionInfo {
            profile: profile.into(),
            session_token: new_session_token.as_string(&secret),
        })
    })
    .await??;
    Ok(web::Json(session_info))
}
