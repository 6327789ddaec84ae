use crate::data_store::auth_token::MemberRole;
use crate::web::ui::form_values::{
    FormValueRepresentation, ValidateFromFormInput, ValidationDataForFormValue,
};
use lazy_static::lazy_static;
use std::fmt::Debug;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MIN_NAME_LENGTH: usize = 3;

#[derive(Default, Debug)]
pub struct NonEmptyString(pub String);

impl NonEmptyString {
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FormValueRepresentation for NonEmptyString {
    fn into_form_value_string(self) -> String {
        self.0
    }
}
impl ValidateFromFormInput for NonEmptyString {
    fn from_form_value(value: &str) -> Result<Self, String> {
        let value = value.trim();
        if value.is_empty() {
            Err("Nu poate fi gol".to_owned())
        } else {
            Ok(NonEmptyString(value.to_owned()))
        }
    }
}

#[derive(Default, Debug)]
pub struct Password(pub String);

impl Password {
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FormValueRepresentation for Password {
    fn into_form_value_string(self) -> String {
        self.0
    }
}
impl ValidateFromFormInput for Password {
    fn from_form_value(value: &str) -> Result<Self, String> {
        if value.chars().count() < MIN_PASSWORD_LENGTH {
            Err(format!(
                "Parola trebuie să aibă cel puțin {} caractere",
                MIN_PASSWORD_LENGTH
            ))
        } else {
            Ok(Password(value.to_owned()))
        }
    }
}

#[derive(Default, Debug, PartialEq)]
pub struct Email(pub String);

impl Email {
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FormValueRepresentation for Email {
    fn into_form_value_string(self) -> String {
        self.0
    }
}
impl ValidateFromFormInput for Email {
    fn from_form_value(value: &str) -> Result<Self, String> {
        lazy_static! {
            static ref RE: regex::Regex = regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
        }
        let value = value.trim();
        if RE.is_match(value) {
            Ok(Email(value.to_owned()))
        } else {
            Err("Adresă de email invalidă".to_owned())
        }
    }
}

/// Name of a guest. Surrounding whitespace is removed before checking the length.
#[derive(Default, Debug, PartialEq)]
pub struct GuestName(pub String);

impl GuestName {
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FormValueRepresentation for GuestName {
    fn into_form_value_string(self) -> String {
        self.0
    }
}
impl ValidateFromFormInput for GuestName {
    fn from_form_value(value: &str) -> Result<Self, String> {
        let value = value.trim();
        if value.chars().count() < MIN_NAME_LENGTH {
            Err(format!(
                "Numele invitatului trebuie să aibă cel puțin {} caractere",
                MIN_NAME_LENGTH
            ))
        } else {
            Ok(GuestName(value.to_owned()))
        }
    }
}

#[derive(Default, Debug, PartialEq)]
pub struct MemberName(pub String);

impl MemberName {
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FormValueRepresentation for MemberName {
    fn into_form_value_string(self) -> String {
        self.0
    }
}
impl ValidateFromFormInput for MemberName {
    fn from_form_value(value: &str) -> Result<Self, String> {
        let value = value.trim();
        if value.chars().count() < MIN_NAME_LENGTH {
            Err(format!(
                "Numele trebuie să aibă cel puțin {} caractere",
                MIN_NAME_LENGTH
            ))
        } else {
            Ok(MemberName(value.to_owned()))
        }
    }
}

#[derive(Default, Debug, PartialEq)]
pub struct IsoDate(pub chrono::NaiveDate);

impl IsoDate {
    pub fn into_inner(self) -> chrono::NaiveDate {
        self.0
    }
}

impl FormValueRepresentation for IsoDate {
    fn into_form_value_string(self) -> String {
        crate::booking::schedule::date_to_iso_string(self.0)
    }
}
impl ValidateFromFormInput for IsoDate {
    fn from_form_value(value: &str) -> Result<Self, String> {
        crate::booking::schedule::parse_iso_date(value)
            .map(IsoDate)
            .ok_or_else(|| "Dată invalidă (format AAAA-LL-ZZ)".to_owned())
    }
}

/// Full hour of the day (0‥23)
#[derive(Default, Debug, PartialEq)]
pub struct Hour(pub i32);

impl Hour {
    pub fn into_inner(self) -> i32 {
        self.0
    }
}

impl FormValueRepresentation for Hour {
    fn into_form_value_string(self) -> String {
        self.0.to_string()
    }
}
impl ValidateFromFormInput for Hour {
    fn from_form_value(value: &str) -> Result<Self, String> {
        let hour: i32 = value
            .trim()
            .parse()
            .map_err(|_| "Nu este o oră validă".to_owned())?;
        if (0..24).contains(&hour) {
            Ok(Hour(hour))
        } else {
            Err("Ora trebuie să fie între 0 și 23".to_owned())
        }
    }
}

#[derive(Default, Debug, PartialEq)]
pub struct Int32FromList(pub i32);

impl Int32FromList {
    pub fn into_inner(self) -> i32 {
        self.0
    }
}

impl FormValueRepresentation for Int32FromList {
    fn into_form_value_string(self) -> String {
        self.0.to_string()
    }
}

impl ValidationDataForFormValue<Int32FromList> for &Vec<i32> {
    fn validate_form_value(self, value: &'_ str) -> Result<Int32FromList, String> {
        let id: i32 = value
            .parse()
            .map_err(|e| format!("Nu este un id: {}", e))?;
        if self.contains(&id) {
            Ok(Int32FromList(id))
        } else {
            Err("Id necunoscut".to_owned())
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Role(pub MemberRole);

impl Role {
    pub fn into_inner(self) -> MemberRole {
        self.0
    }
}

impl FormValueRepresentation for Role {
    fn into_form_value_string(self) -> String {
        i32::from(self.0).to_string()
    }
}
impl ValidateFromFormInput for Role {
    fn from_form_value(value: &str) -> Result<Self, String> {
        value
            .parse::<i32>()
            .ok()
            .and_then(|v| MemberRole::try_from(v).ok())
            .map(Role)
            .ok_or_else(|| "Rol necunoscut".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password() {
        assert!(Password::from_form_value("12345678").is_ok());
        assert!(Password::from_form_value("parolă lungă").is_ok());
        assert!(Password::from_form_value("1234567").is_err());
        // length is counted in characters, not bytes
        assert!(Password::from_form_value("ăâîșțăâ").is_err());
        assert!(Password::from_form_value("").is_err());
    }

    #[test]
    fn test_email() {
        assert_eq!(
            Email::from_form_value(" ana@example.ro "),
            Ok(Email("ana@example.ro".to_owned()))
        );
        assert!(Email::from_form_value("a.b@sub.domain.com").is_ok());
        assert!(Email::from_form_value("ana@example").is_err());
        assert!(Email::from_form_value("ana example@x.ro").is_err());
        assert!(Email::from_form_value("@example.ro").is_err());
        assert!(Email::from_form_value("ana@@example.ro").is_err());
        assert!(Email::from_form_value("").is_err());
    }

    #[test]
    fn test_guest_name() {
        assert_eq!(
            GuestName::from_form_value("  Ion  "),
            Ok(GuestName("Ion".to_owned()))
        );
        assert!(GuestName::from_form_value(" Io ").is_err());
        assert!(GuestName::from_form_value("     ").is_err());
        assert!(GuestName::from_form_value("Ștefan").is_ok());
    }

    #[test]
    fn test_member_name() {
        assert!(MemberName::from_form_value("Ana").is_ok());
        assert!(MemberName::from_form_value("Al").is_err());
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(
            IsoDate::from_form_value("2025-03-04"),
            Ok(IsoDate(chrono::NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()))
        );
        assert!(IsoDate::from_form_value("2025-13-01").is_err());
        assert!(IsoDate::from_form_value("04.03.2025").is_err());
        assert_eq!(
            IsoDate(chrono::NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()).into_form_value_string(),
            "2025-03-04"
        );
    }

    #[test]
    fn test_hour() {
        assert_eq!(Hour::from_form_value("0"), Ok(Hour(0)));
        assert_eq!(Hour::from_form_value(" 23"), Ok(Hour(23)));
        assert!(Hour::from_form_value("24").is_err());
        assert!(Hour::from_form_value("-1").is_err());
        assert!(Hour::from_form_value("8:00").is_err());
    }

    #[test]
    fn test_non_empty_string() {
        assert!(NonEmptyString::from_form_value("Antrenament echipă").is_ok());
        assert!(NonEmptyString::from_form_value(" \n ").is_err());
    }

    #[test]
    fn test_int32_from_list() {
        let ids = vec![1, 3];
        assert_eq!((&ids).validate_form_value("3"), Ok(Int32FromList(3)));
        assert!((&ids).validate_form_value("2").is_err());
        assert!((&ids).validate_form_value("x").is_err());
    }

    #[test]
    fn test_role() {
        assert_eq!(Role::from_form_value("3"), Ok(Role(MemberRole::Founder)));
        assert!(Role::from_form_value("7").is_err());
        assert_eq!(Role(MemberRole::Coach).into_form_value_string(), "2");
    }
}
