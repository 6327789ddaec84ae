//! Member administration from the command line, e.g. for creating the first founder account
use crate::cli::util::{query_user, query_user_and_check, query_user_bool};
use crate::cli::CliAuthTokenKey;
use crate::cli_error::CliError;
use crate::data_store::auth_token::{AuthToken, MemberRole};
use crate::data_store::models::{NewProfile, Profile, ProfilePatch};
use crate::data_store::passwords::normalize_email;
use crate::data_store::{get_store_from_env, ReservationStore, ReservationStoreFacade};
use crate::web::ui::form_values::ValidateFromFormInput;
use crate::web::ui::validation::{Email, MemberName, Password};
use log::info;

pub fn print_member_list() -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;
    let auth_token = AuthToken::create_for_cli(&CliAuthTokenKey::new());

    let profiles = data_store.get_profiles(&auth_token)?;

    let mut table = comfy_table::Table::new();
    table
        .load_preset(comfy_table::presets::ASCII_BORDERS_ONLY_CONDENSED)
        .set_header(vec!["id", "email", "name", "role", "key", "member since"])
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic)
        .add_rows(profiles.into_iter().map(|profile| {
            [
                profile.id.to_string(),
                profile.email,
                profile.name,
                format!("{:?}", profile.role),
                if profile.has_key { "yes" } else { "" }.to_owned(),
                profile.created_at.date_naive().to_string(),
            ]
        }));

    println!("{table}");
    Ok(())
}

/// Interactively create a new member. In contrast to the signup in the web UI, any role can be
/// assigned here. The role is queried, if not given as `member`, `coach` or `founder`.
pub fn create_member(role: Option<&str>) -> Result<(), CliError> {
    let role = role
        .map(|role| role.parse::<MemberRole>())
        .transpose()
        .map_err(CliError::InvalidRole)?;
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;
    let auth_token = AuthToken::create_for_cli(&CliAuthTokenKey::new());

    let email: String = query_user_and_check("Email address", |value: &String| {
        Email::from_form_value(value).map(|_| ())
    });
    let name: String = query_user_and_check("Name", |value: &String| {
        MemberName::from_form_value(value).map(|_| ())
    });
    let password = query_password();
    let role = role.unwrap_or_else(|| query_user("Role (member, coach, founder)"));
    let has_key = query_user_bool("Does the member have a key to the club?", Some(false));

    let profile = data_store.create_profile(NewProfile {
        email,
        name,
        password,
    })?;
    let profile = data_store.update_profile(
        &auth_token,
        profile.id,
        ProfilePatch {
            name: None,
            role: Some(role),
            has_key: Some(has_key),
        },
    )?;
    info!(
        "Created member {} ({}) with role {:?}",
        profile.id, profile.email, profile.role
    );
    println!("Member {} created.", profile.id);
    Ok(())
}

/// Interactively set a new password for the member with the given email address. All sessions of
/// the member are invalidated.
pub fn set_member_password(email: &str) -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;
    let auth_token = AuthToken::create_for_cli(&CliAuthTokenKey::new());

    let profile = find_profile_by_email(&mut *data_store, &auth_token, email)?;
    println!("Setting new password for {} ({})", profile.name, profile.email);
    let password = query_password();
    data_store.set_password(&auth_token, profile.id, &password)?;
    info!("Password of member {} set via command line", profile.id);
    Ok(())
}

fn find_profile_by_email(
    data_store: &mut dyn ReservationStoreFacade,
    auth_token: &AuthToken,
    email: &str,
) -> Result<Profile, CliError> {
    let email = normalize_email(email);
    data_store
        .get_profiles(auth_token)?
        .into_iter()
        .find(|profile| profile.email == email)
        .ok_or(CliError::UnknownMember { email })
}

fn query_password() -> String {
    query_user_and_check("Password", |value: &String| {
        Password::from_form_value(value).map(|_| ())
    })
}
