use crate::setup::ClubSettings;
use crate::web::ui::base_template::{BaseTemplateContext, NavButton};
use crate::web::ui::error::AppError;
use crate::web::ui::util;
use crate::web::AppState;
use actix_web::web::Html;
use actix_web::{get, web, HttpRequest, Responder};
use askama::Template;

/// Booking rules, as shown on the help page. The placeholders are filled with the club settings.
const RULES_TEMPLATE: &str = "\
# Cum rezerv?

Alegeți locația și ziua, apoi un interval liber. Puteți alege o anumită masă sau lăsați sistemul \
să vă rezerve la oricare masă liberă.

# Reguli de rezervare

- Se pot face rezervări cu cel mult **{days_ahead} zile** în avans. Intervalele trecute sau deja \
începute nu mai pot fi rezervate.
- Un membru poate avea cel mult **{max_per_day} rezervări** active pe zi, la toate locațiile \
împreună. Antrenorii și fondatorii nu au această limită.
- Într-un interval pot juca cel mult atâția jucători câte mese are locația. Invitații ocupă și ei \
câte un loc.
- Un *invitat special* rezervă integral intervalul. Nu se mai pot face alte rezervări.
- În zilele libere și în intervalele restricționate de antrenori nu se pot face rezervări.

# Confirmare și cheie

O rezervare este **confirmată** de îndată ce un membru care are cheia sălii a rezervat același \
interval. Până atunci, rezervarea rămâne *în așteptare*. Dacă ultimul membru cu cheie își anulează \
rezervarea, celelalte rezervări ale intervalului revin în așteptare.

Codul de acces la intrare este afișat pe pagina *Rezervările mele* în ziua în care aveți o \
rezervare confirmată.

# Anulare

Rezervările pot fi anulate până la începutul intervalului. Vă rugăm anulați din timp, ca să \
eliberați locul pentru alți membri.
";

#[get("/help")]
async fn help(state: web::Data<AppState>, req: HttpRequest) -> Result<impl Responder, AppError> {
    let session_token = util::extract_session_token(&state, &req)?;
    let rules = rules_text(&state.settings);
    let auth = web::block(move || -> Result<_, AppError> {
        let mut store = state.store.get_facade()?;
        Ok(store.get_auth_token_for_session(&session_token)?)
    })
    .await??;

    let tmpl = HelpTemplate {
        base: BaseTemplateContext {
            request: &req,
            page_title: "Ajutor",
            auth_token: Some(&auth),
            active_nav_button: Some(NavButton::Help),
        },
        rules: &rules,
    };
    Ok(Html::new(tmpl.render()?))
}

fn rules_text(settings: &ClubSettings) -> String {
    RULES_TEMPLATE
        .replace("{days_ahead}", &settings.booking_days_ahead.to_string())
        .replace("{max_per_day}", &settings.max_reservations_per_day.to_string())
}

#[derive(Template)]
#[template(path = "help.html")]
struct HelpTemplate<'a> {
    base: BaseTemplateContext<'a>,
    rules: &'a str,
}

mod filters {
    pub use crate::web::ui::askama_filters::markdown;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_text_contains_settings() {
        let settings = ClubSettings {
            booking_days_ahead: 7,
            max_reservations_per_day: 3,
            ..ClubSettings::default()
        };
        let text = rules_text(&settings);
        assert!(text.contains("**7 zile**"));
        assert!(text.contains("**3 rezervări**"));
        assert!(!text.contains('{'));
    }
}
