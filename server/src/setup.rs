use std::env;
use std::env::VarError;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Get the database URL from the environment variable.
pub fn get_database_url_from_env() -> Result<String, SetupError> {
    env::var("DATABASE_URL").map_err(|e| SetupError::from_env_error(e, "DATABASE_URL"))
}

/// Get the cryptographic application secret for signing session tokens from the environment
/// variable.
pub fn get_secret_from_env() -> Result<String, SetupError> {
    env::var("SECRET").map_err(|e| SetupError::from_env_error(e, "SECRET"))
}

/// Get the web server TCP listening port from the environment variable
pub fn get_listen_port_from_env() -> Result<u16, SetupError> {
    env::var("LISTEN_PORT")
        .map_err(|e| SetupError::from_env_error(e, "LISTEN_PORT"))
        .and_then(|v| {
            v.parse().map_err(|_| SetupError::EnvVariableInvalid {
                variable_name: "LISTEN_PORT",
                problem: "Not a valid uint16",
            })
        })
}

/// Get the web server TCP listening interface address from the environment variable
pub fn get_listen_address_from_env() -> Result<String, SetupError> {
    env::var("LISTEN_ADDRESS").map_err(|e| SetupError::from_env_error(e, "LISTEN_ADDRESS"))
}

/// Get the externally visible base URL of the application (e.g. `https://club.example.com`), if
/// configured. It is used for generating password reset links outside of a request context.
pub fn get_public_base_url_from_env() -> Result<Option<String>, SetupError> {
    optional_env_var("PUBLIC_BASE_URL")
}

/// Upper bound for `BOOKING_DAYS_AHEAD`
const MAX_BOOKING_DAYS_AHEAD: u32 = 3660;

/// Club-wide booking settings, taken from optional environment variables.
#[derive(Clone, Debug)]
pub struct ClubSettings {
    /// Timezone of the club. All slot hours and "today" calculations refer to this timezone.
    pub timezone: chrono_tz::Tz,
    /// Number of days in advance (counted from today) for which reservations are accepted.
    pub booking_days_ahead: u32,
    /// Maximum number of active reservations of a member (role `Member`) per day.
    pub max_reservations_per_day: u32,
}

impl Default for ClubSettings {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Bucharest,
            booking_days_ahead: 14,
            max_reservations_per_day: 2,
        }
    }
}

impl ClubSettings {
    pub fn from_env() -> Result<Self, SetupError> {
        let defaults = Self::default();
        Ok(Self {
            timezone: parse_optional_env_var("CLUB_TIMEZONE", "Not a known IANA timezone name")?
                .unwrap_or(defaults.timezone),
            booking_days_ahead: parse_optional_env_var::<u32>(
                "BOOKING_DAYS_AHEAD",
                "Not a number of days between 0 and 3660",
            )?
            .map(|days| {
                if days <= MAX_BOOKING_DAYS_AHEAD {
                    Ok(days)
                } else {
                    Err(SetupError::EnvVariableInvalid {
                        variable_name: "BOOKING_DAYS_AHEAD",
                        problem: "Not a number of days between 0 and 3660",
                    })
                }
            })
            .transpose()?
            .unwrap_or(defaults.booking_days_ahead),
            max_reservations_per_day: parse_optional_env_var(
                "MAX_RESERVATIONS_PER_DAY",
                "Not a valid uint32",
            )?
            .unwrap_or(defaults.max_reservations_per_day),
        })
    }

    /// The last date, for which reservations are accepted on the given day
    pub fn last_bookable_date(&self, today: chrono::NaiveDate) -> chrono::NaiveDate {
        today
            .checked_add_days(chrono::Days::new(self.booking_days_ahead.into()))
            .unwrap_or(chrono::NaiveDate::MAX)
    }

    /// The current calendar date in the club's timezone
    pub fn today(&self) -> chrono::NaiveDate {
        chrono::Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

fn optional_env_var(variable_name: &'static str) -> Result<Option<String>, SetupError> {
    match env::var(variable_name) {
        Ok(v) if v.is_empty() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(SetupError::from_env_error(e, variable_name)),
    }
}

fn parse_optional_env_var<T: FromStr>(
    variable_name: &'static str,
    problem: &'static str,
) -> Result<Option<T>, SetupError> {
    optional_env_var(variable_name)?
        .map(|v| {
            v.parse().map_err(|_| SetupError::EnvVariableInvalid {
                variable_name,
                problem,
            })
        })
        .transpose()
}

#[derive(Debug)]
pub enum SetupError {
    EnvVariableMissing {
        variable_name: &'static str,
    },
    EnvVariableInvalid {
        variable_name: &'static str,
        problem: &'static str,
    },
}

impl SetupError {
    fn from_env_error(error: VarError, variable_name: &'static str) -> Self {
        match error {
            VarError::NotPresent => Self::EnvVariableMissing { variable_name },
            VarError::NotUnicode(_) => Self::EnvVariableInvalid {
                variable_name,
                problem: "no valid unicode",
            },
        }
    }
}

impl Display for SetupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::EnvVariableMissing { variable_name } => {
                write!(f, "Environment variable {} must be defined", variable_name)
            }
            SetupError::EnvVariableInvalid {
                variable_name,
                problem,
            } => write!(
                f,
                "Value of environment variable {} is invalid: {}",
                variable_name, problem
            ),
        }
    }
}

impl std::error::Error for SetupError {}
