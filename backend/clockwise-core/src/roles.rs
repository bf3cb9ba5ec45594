// src/roles.rs
use serde::{Deserialize, Serialize};

// Roles are stored under legacy codes; the display key is what the API and
// the label table use. Both directions go through the match arms below so a
// new variant fails to compile until it is mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "org_admin")]
    OrgAdmin,
    #[serde(rename = "program_manager")]
    ProgramManager,
    #[serde(rename = "hod", alias = "manager")]
    Manager,
    #[serde(rename = "faculty", alias = "member")]
    Member,
}

pub const ALL_ROLES: [Role; 4] = [
    Role::OrgAdmin,
    Role::ProgramManager,
    Role::Manager,
    Role::Member,
];

impl Role {
    /// Code written to the `user_roles.role` column.
    pub fn stored_code(self) -> &'static str {
        match self {
            Role::OrgAdmin => "org_admin",
            Role::ProgramManager => "program_manager",
            Role::Manager => "hod",
            Role::Member => "faculty",
        }
    }

    /// Key used by the API, navigation and label overrides.
    pub fn key(self) -> &'static str {
        match self {
            Role::OrgAdmin => "org_admin",
            Role::ProgramManager => "program_manager",
            Role::Manager => "manager",
            Role::Member => "member",
        }
    }

    pub fn from_stored(code: &str) -> Option<Self> {
        ALL_ROLES.into_iter().find(|r| r.stored_code() == code)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        ALL_ROLES.into_iter().find(|r| r.key() == key)
    }

    /// Accepts either spelling, the way role strings arrive from mixed sources.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::from_stored(&s).or_else(|| Self::from_key(&s))
    }

    /// Roles that may look at other users' timesheets and reports.
    pub fn is_manager_class(self) -> bool {
        !matches!(self, Role::Member)
    }

    pub fn default_label(self) -> &'static str {
        match self {
            Role::OrgAdmin => "Organization Admin",
            Role::ProgramManager => "Program Manager",
            Role::Manager => "Manager",
            Role::Member => "Member",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
