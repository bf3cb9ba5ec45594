// src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::roles::Role;

// Identifiers are the string UUIDs the database hands out.
pub type UserId = String;
pub type OrganizationId = String;
pub type DepartmentId = String;
pub type ProgramId = String;
pub type EntryId = String;

pub const DEFAULT_DAILY_TARGET_MINUTES: i64 = 8 * 60;

// --- Organization structure ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub name: String,
    pub code: String,
    pub department_id: DepartmentId,
}

// --- People ---

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: UserId,
    pub role: Role,
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(default)]
    pub program_id: Option<ProgramId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: UserId,
    pub daily_target_minutes: i64,
}

impl UserSettings {
    pub fn default_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            daily_target_minutes: DEFAULT_DAILY_TARGET_MINUTES,
        }
    }
}

/// A record from the auth provider's admin API. Unknown fields are carried
/// through untouched so listing endpoints return the provider's full shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// --- Timesheets ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Class,
    Quiz,
    Invigilation,
    Admin,
    Other,
}

pub const ALL_ACTIVITY_TYPES: [ActivityType; 5] = [
    ActivityType::Class,
    ActivityType::Quiz,
    ActivityType::Invigilation,
    ActivityType::Admin,
    ActivityType::Other,
];

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Class => "class",
            ActivityType::Quiz => "quiz",
            ActivityType::Invigilation => "invigilation",
            ActivityType::Admin => "admin",
            ActivityType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        ALL_ACTIVITY_TYPES.into_iter().find(|t| t.as_str() == s)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ActivityType::Class => "Class",
            ActivityType::Quiz => "Quiz",
            ActivityType::Invigilation => "Invigilation",
            ActivityType::Admin => "Admin",
            ActivityType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

pub const ALL_ENTRY_STATUSES: [EntryStatus; 4] = [
    EntryStatus::Draft,
    EntryStatus::Submitted,
    EntryStatus::Approved,
    EntryStatus::Rejected,
];

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Draft => "draft",
            EntryStatus::Submitted => "submitted",
            EntryStatus::Approved => "approved",
            EntryStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimesheetEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub entry_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub activity_type: ActivityType,
    #[serde(default)]
    pub activity_subtype: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: EntryStatus,
    #[serde(default)]
    pub reviewed_by: Option<UserId>,
    #[serde(default)]
    pub review_comment: Option<String>,
}

/// Row shape for inserts; the database assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTimesheetEntry {
    pub user_id: UserId,
    pub entry_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub activity_type: ActivityType,
    pub activity_subtype: Option<String>,
    pub notes: Option<String>,
    pub status: EntryStatus,
}

// --- Organization configuration ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityCategory {
    pub id: String,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    pub name: String,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationLabels {
    #[serde(default)]
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub org_admin_label: Option<String>,
    #[serde(default)]
    pub program_manager_label: Option<String>,
    #[serde(default)]
    pub manager_label: Option<String>,
    #[serde(default)]
    pub member_label: Option<String>,
    #[serde(default)]
    pub department_label: Option<String>,
    #[serde(default)]
    pub department_label_plural: Option<String>,
    #[serde(default)]
    pub program_label: Option<String>,
    #[serde(default)]
    pub program_label_plural: Option<String>,
}
