use crate::cli::CliAuthTokenKey;
use crate::data_store::{ProfileId, StoreError};
use diesel::deserialize::FromSql;
use diesel::query_builder::bind_collector::RawBytesBindCollector;
use diesel::serialize::ToSql;
use diesel::{AsExpression, FromSqlRow};
use std::fmt::{Display, Formatter};

pub struct EnumMemberNotExistingError {
    pub member_value: i32,
    pub enum_name: &'static str,
}

impl Display for EnumMemberNotExistingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} is not a valid value for {} enum",
            self.member_value, self.enum_name
        )
    }
}

/// Authorization token for accessing the data_store on behalf of a member
///
/// The AuthToken holds the [MemberRole] of the logged-in member, which implies a set of
/// [Privilege]s, plus the member's key holder flag, which influences the status of new
/// reservations.
///
/// This structure is our main protection against accidental unauthorized-access bugs: All
/// data_store access functions require an AuthToken and check its validity for the required
/// privilege. An AuthToken can only be created by
/// [crate::data_store::ReservationStoreFacade::get_auth_token_for_session], based on a valid
/// session of a member, and by cli functions via [AuthToken::create_for_cli].
#[derive(Debug, Clone)]
pub struct AuthToken {
    profile_id: Option<ProfileId>,
    role: MemberRole,
    has_key: bool,
}

impl AuthToken {
    /// Create a new AuthToken for a client session.
    ///
    /// This function must only be used by implementations of
    /// [crate::data_store::ReservationStoreFacade::get_auth_token_for_session] after checking the
    /// validity of the client's session against the member's profile!
    pub(crate) fn create_for_session(profile_id: ProfileId, role: MemberRole, has_key: bool) -> Self {
        AuthToken {
            profile_id: Some(profile_id),
            role,
            has_key,
        }
    }

    /// Create a new AuthToken for a command line interface functionality.
    ///
    /// The AuthToken is created with the founder role, but without a member profile. So it can be
    /// used for all management functions, but not for creating reservations.
    ///
    /// This function must only be used by command line interface functions, not in the context of
    /// the web server!
    pub fn create_for_cli(_key: &CliAuthTokenKey) -> Self {
        AuthToken {
            profile_id: None,
            role: MemberRole::Founder,
            has_key: false,
        }
    }

    /// The profile id of the member this token belongs to. `None` for cli tokens.
    pub fn profile_id(&self) -> Option<ProfileId> {
        self.profile_id
    }

    pub fn role(&self) -> MemberRole {
        self.role
    }

    pub fn has_key(&self) -> bool {
        self.has_key
    }

    /// Check if the AuthToken authorizes for the given `privilege`.
    ///
    /// The actual authorization check is delegated to [Privilege::qualifying_roles].
    pub fn has_privilege(&self, privilege: Privilege) -> bool {
        privilege.qualifying_roles().contains(&self.role)
    }

    /// Check if the AuthToken authorizes for the given `privilege`. If not, return an appropriate
    /// PermissionDenied error.
    pub fn check_privilege(&self, privilege: Privilege) -> Result<(), StoreError> {
        if self.has_privilege(privilege) {
            Ok(())
        } else {
            Err(StoreError::PermissionDenied {
                required_privilege: privilege,
            })
        }
    }

    /// Check if the token belongs to the given member or authorizes for the given `privilege`
    /// otherwise. This is used for actions, members may take on their own data.
    pub fn check_owner_or_privilege(
        &self,
        owner: ProfileId,
        privilege: Privilege,
    ) -> Result<(), StoreError> {
        if self.profile_id == Some(owner) {
            Ok(())
        } else {
            self.check_privilege(privilege)
        }
    }
}

/// Roles of club members.
///
/// Each role qualifies for a set of [Privilege]s. See [Privilege::qualifying_roles].
#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Clone, Copy, FromSqlRow, AsExpression)]
#[diesel(sql_type = diesel::sql_types::Integer)]
#[repr(i32)]
pub enum MemberRole {
    Member = 1,
    Coach = 2,
    Founder = 3,
}

impl TryFrom<i32> for MemberRole {
    type Error = EnumMemberNotExistingError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MemberRole::Member),
            2 => Ok(MemberRole::Coach),
            3 => Ok(MemberRole::Founder),
            value => Err(EnumMemberNotExistingError {
                member_value: value,
                enum_name: "MemberRole",
            }),
        }
    }
}

impl From<MemberRole> for i32 {
    fn from(value: MemberRole) -> Self {
        value as i32
    }
}

impl<DB> ToSql<diesel::sql_types::Integer, DB> for MemberRole
where
    DB: diesel::backend::Backend,
    for<'c> DB: diesel::backend::Backend<BindCollector<'c> = RawBytesBindCollector<DB>>,
    i32: ToSql<diesel::sql_types::Integer, DB>,
{
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, DB>,
    ) -> diesel::serialize::Result {
        let value: i32 = (*self).into();
        value.to_sql(&mut out.reborrow())
    }
}

impl<DB> FromSql<diesel::sql_types::Integer, DB> for MemberRole
where
    DB: diesel::backend::Backend,
    i32: FromSql<diesel::sql_types::Integer, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
        let x = i32::from_sql(bytes)?;
        x.try_into()
            .map_err(|e: EnumMemberNotExistingError| e.to_string().into())
    }
}

impl From<MemberRole> for rezervari_api_types::MemberRole {
    fn from(value: MemberRole) -> Self {
        match value {
            MemberRole::Member => Self::Member,
            MemberRole::Coach => Self::Coach,
            MemberRole::Founder => Self::Founder,
        }
    }
}

impl From<rezervari_api_types::MemberRole> for MemberRole {
    fn from(value: rezervari_api_types::MemberRole) -> Self {
        match value {
            rezervari_api_types::MemberRole::Member => Self::Member,
            rezervari_api_types::MemberRole::Coach => Self::Coach,
            rezervari_api_types::MemberRole::Founder => Self::Founder,
        }
    }
}

impl MemberRole {
    pub const ALL: [MemberRole; 3] = [MemberRole::Member, MemberRole::Coach, MemberRole::Founder];

    /// Human-readable name of the role, as shown in the web UI
    pub fn name(&self) -> &'static str {
        match self {
            MemberRole::Member => "Membru",
            MemberRole::Coach => "Antrenor",
            MemberRole::Founder => "Fondator",
        }
    }
}

impl std::str::FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(MemberRole::Member),
            "coach" => Ok(MemberRole::Coach),
            "founder" => Ok(MemberRole::Founder),
            _ => Err(format!(
                "'{}' is not a valid role. Use 'member', 'coach' or 'founder'.",
                s
            )),
        }
    }
}

/// Enum of available authorization privileges.
///
/// Each data_store action and web endpoint typically requires a single privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    ShowReservations,
    CreateReservation,
    ManageGuests,
    ManageRestrictions,
    ManageFreeDays,
    ManageMembers,
    ManageGlobalVars,
    ManageReservations,
}

impl Privilege {
    /// Get the list of [MemberRole]s that qualify for this privilege. Each returned role is
    /// individually sufficient for the privilege.
    ///
    /// This is function is our source of truth for authorization!
    pub fn qualifying_roles(&self) -> &'static [MemberRole] {
        match self {
            Privilege::ShowReservations => {
                &[MemberRole::Member, MemberRole::Coach, MemberRole::Founder]
            }
            Privilege::CreateReservation => {
                &[MemberRole::Member, MemberRole::Coach, MemberRole::Founder]
            }
            Privilege::ManageGuests => &[MemberRole::Coach, MemberRole::Founder],
            Privilege::ManageRestrictions => &[MemberRole::Coach, MemberRole::Founder],
            Privilege::ManageFreeDays => &[MemberRole::Founder],
            Privilege::ManageMembers => &[MemberRole::Founder],
            Privilege::ManageGlobalVars => &[MemberRole::Founder],
            Privilege::ManageReservations => &[MemberRole::Founder],
        }
    }
}
