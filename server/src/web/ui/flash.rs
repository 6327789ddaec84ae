//! Flash messages: short notices (e.g. "reservation confirmed") that are stored in a cookie and
//! shown on the next rendered page.
use actix_web::cookie::Cookie;
use actix_web::http::header::{HeaderValue, SET_COOKIE};
use actix_web::{HttpMessage, HttpRequest};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum FlashType {
    Info,
    Success,
    Warning,
    Error,
}

impl FlashType {
    /// CSS class for rendering the message
    pub fn css_class(&self) -> &'static str {
        match self {
            FlashType::Info => "flash-info",
            FlashType::Success => "flash-success",
            FlashType::Warning => "flash-warning",
            FlashType::Error => "flash-error",
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct FlashMessage {
    pub flash_type: FlashType,
    pub message: String,
}

impl FlashMessage {
    pub fn new(flash_type: FlashType, message: impl Into<String>) -> Self {
        Self {
            flash_type,
            message: message.into(),
        }
    }
}

struct Flashes {
    flashes: Vec<FlashMessage>,
    dirty: bool,
}

const COOKIE_NAME: &str = "rezervari-flash";

impl Flashes {
    fn from_cookie(request: &HttpRequest) -> Result<Self, serde_json::Error> {
        let flashes = match request.cookie(COOKIE_NAME) {
            Some(cookie) => serde_json::from_str(cookie.value())?,
            None => vec![],
        };
        Ok(Flashes {
            flashes,
            dirty: false,
        })
    }

    fn into_cookie(self) -> Cookie<'static> {
        let mut result = Cookie::new(
            COOKIE_NAME,
            serde_json::to_string(&self.flashes).expect("Flashes should be serializable as JSON"),
        );
        result.set_path("/");
        result.set_http_only(true);
        result
    }
}

pub trait FlashesInterface {
    fn add_flash_message(&self, flash: FlashMessage);

    fn get_and_clear_flashes(&self) -> Vec<FlashMessage>;
}

impl FlashesInterface for HttpRequest {
    fn add_flash_message(&self, flash: FlashMessage) {
        if let Some(flashes) = self.extensions_mut().get_mut::<Flashes>() {
            flashes.flashes.push(flash);
            flashes.dirty = true;
            return;
        }
        // Must not be within the `if let` statement to avoid panicking of the `extensions` RefCell
        self.extensions_mut().insert(Flashes {
            flashes: vec![flash],
            dirty: true,
        });
    }

    fn get_and_clear_flashes(&self) -> Vec<FlashMessage> {
        self.extensions_mut()
            .get_mut::<Flashes>()
            .map(|flashes| {
                if !flashes.flashes.is_empty() {
                    flashes.dirty = true;
                }
                std::mem::take(&mut flashes.flashes)
            })
            .unwrap_or_default()
    }
}

/// Middleware for loading the flash messages from the cookie into the request's extensions and
/// storing them back into the cookie when they have been changed.
pub async fn flash_middleware(
    req: actix_web::dev::ServiceRequest,
    next: actix_web::middleware::Next<impl actix_web::body::MessageBody>,
) -> Result<actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>, actix_web::Error> {
    // Ignore broken flash cookies
    if let Ok(flashes) = Flashes::from_cookie(req.request()) {
        req.extensions_mut().insert(flashes);
    }

    let mut response = next.call(req).await?;

    let flashes = response.request().extensions_mut().remove::<Flashes>();
    if let Some(flashes) = flashes {
        if flashes.dirty {
            let cookie = flashes.into_cookie();
            let val = HeaderValue::from_str(&cookie.to_string())?;
            response.headers_mut().append(SET_COOKIE, val);
        }
    }
    Ok(response)
}
