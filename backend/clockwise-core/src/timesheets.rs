// src/timesheets.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{EntryStatus, NewTimesheetEntry, TimesheetEntry, UserRole, UserSettings};
use crate::roles::Role;
use crate::supabase_client::SupabaseError;
use crate::validation::{validate_entry, TimesheetEntryInput, ValidationErrors};

#[async_trait]
pub trait TimesheetStore: Send + Sync {
    async fn insert_entry(&self, entry: &NewTimesheetEntry) -> Result<TimesheetEntry, SupabaseError>;

    async fn get_entry(&self, entry_id: &str) -> Result<Option<TimesheetEntry>, SupabaseError>;

    async fn update_entry_status(
        &self,
        entry_id: &str,
        update: &StatusUpdate,
    ) -> Result<TimesheetEntry, SupabaseError>;

    /// Entries dated `from..=to`, oldest first.
    async fn entries_for_user(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TimesheetEntry>, SupabaseError>;

    async fn user_settings(&self, user_id: &str) -> Result<Option<UserSettings>, SupabaseError>;
}

/// PATCH body for a status change.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StatusUpdate {
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_comment: Option<String>,
}

// --- Transitions ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot move an entry from {} to {}", .from.as_str(), .to.as_str())]
pub struct TransitionError {
    pub from: EntryStatus,
    pub to: EntryStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn target_status(self) -> EntryStatus {
        match self {
            ReviewDecision::Approve => EntryStatus::Approved,
            ReviewDecision::Reject => EntryStatus::Rejected,
        }
    }
}

/// Draft or rejected work goes (back) to review.
pub fn submit_transition(current: EntryStatus) -> Result<EntryStatus, TransitionError> {
    match current {
        EntryStatus::Draft | EntryStatus::Rejected => Ok(EntryStatus::Submitted),
        from => Err(TransitionError {
            from,
            to: EntryStatus::Submitted,
        }),
    }
}

pub fn review_transition(
    current: EntryStatus,
    decision: ReviewDecision,
) -> Result<EntryStatus, TransitionError> {
    let to = decision.target_status();
    match current {
        EntryStatus::Submitted => Ok(to),
        from => Err(TransitionError { from, to }),
    }
}

// --- Oversight ---

/// Whether `viewer` may see `owner`'s timesheets. Organization admins and
/// program managers see their whole organization; a manager only their
/// own department.
pub fn can_oversee(viewer: &UserRole, owner: &UserRole) -> bool {
    let same_organization =
        viewer.organization_id.is_some() && viewer.organization_id == owner.organization_id;
    match viewer.role {
        Role::OrgAdmin | Role::ProgramManager => same_organization,
        Role::Manager => {
            same_organization
                && viewer.department_id.is_some()
                && viewer.department_id == owner.department_id
        }
        Role::Member => false,
    }
}

/// Nobody approves their own entries.
pub fn can_review(reviewer: &UserRole, owner: &UserRole) -> bool {
    reviewer.user_id != owner.user_id && can_oversee(reviewer, owner)
}

// --- Workflow ---

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("Timesheet entry {0} not found")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Store(#[from] SupabaseError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEntryRequest {
    #[serde(flatten)]
    pub entry: TimesheetEntryInput,
    /// Submit straight away instead of saving a draft.
    #[serde(default)]
    pub submit: bool,
}

pub async fn create_entry<S: TimesheetStore + ?Sized>(
    store: &S,
    user_id: &str,
    request: &CreateEntryRequest,
) -> Result<TimesheetEntry, WorkflowError> {
    let valid = validate_entry(&request.entry)?;
    let row = NewTimesheetEntry {
        user_id: user_id.to_string(),
        entry_date: valid.entry_date,
        start_time: valid.start_time,
        end_time: valid.end_time,
        activity_type: valid.activity_type,
        activity_subtype: valid.activity_subtype,
        notes: valid.notes,
        status: if request.submit {
            EntryStatus::Submitted
        } else {
            EntryStatus::Draft
        },
    };
    let entry = store.insert_entry(&row).await?;
    info!(
        "Created {} entry {} for user {} ({} minutes)",
        entry.status.as_str(),
        entry.id,
        user_id,
        valid.duration_minutes
    );
    Ok(entry)
}

pub async fn submit_entry<S: TimesheetStore + ?Sized>(
    store: &S,
    user_id: &str,
    entry_id: &str,
) -> Result<TimesheetEntry, WorkflowError> {
    let entry = store
        .get_entry(entry_id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound(entry_id.to_string()))?;
    if entry.user_id != user_id {
        warn!("User {} tried to submit entry {} owned by {}", user_id, entry_id, entry.user_id);
        return Err(WorkflowError::Forbidden(
            "Only the owner can submit an entry".to_string(),
        ));
    }
    let status = submit_transition(entry.status)?;
    let update = StatusUpdate {
        status,
        reviewed_by: None,
        review_comment: None,
    };
    Ok(store.update_entry_status(entry_id, &update).await?)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub comment: Option<String>,
}

/// `owner_role` is the role row of the entry's owner, looked up by the caller.
pub async fn review_entry<S: TimesheetStore + ?Sized>(
    store: &S,
    reviewer: &UserRole,
    entry: &TimesheetEntry,
    owner_role: Option<&UserRole>,
    request: &ReviewRequest,
) -> Result<TimesheetEntry, WorkflowError> {
    let allowed = owner_role.is_some_and(|owner| can_review(reviewer, owner));
    if !allowed {
        warn!(
            "User {} may not review entry {} of user {}",
            reviewer.user_id, entry.id, entry.user_id
        );
        return Err(WorkflowError::Forbidden(
            "Not allowed to review this entry".to_string(),
        ));
    }
    let status = review_transition(entry.status, request.decision)?;
    let update = StatusUpdate {
        status,
        reviewed_by: Some(reviewer.user_id.clone()),
        review_comment: request
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from),
    };
    let updated = store.update_entry_status(&entry.id, &update).await?;
    info!(
        "Entry {} {} by {}",
        updated.id,
        updated.status.as_str(),
        reviewer.user_id
    );
    Ok(updated)
}

/// Falls back to the default target when the user never saved settings.
pub async fn settings_for<S: TimesheetStore + ?Sized>(
    store: &S,
    user_id: &str,
) -> Result<UserSettings, SupabaseError> {
    Ok(store
        .user_settings(user_id)
        .await?
        .unwrap_or_else(|| UserSettings::default_for(user_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use crate::models::DEFAULT_DAILY_TARGET_MINUTES;

    fn role(user_id: &str, role: Role, org: Option<&str>, dept: Option<&str>) -> UserRole {
        UserRole {
            user_id: user_id.to_string(),
            role,
            organization_id: org.map(String::from),
            department_id: dept.map(String::from),
            program_id: None,
        }
    }

    fn input(start: &str, end: &str) -> TimesheetEntryInput {
        TimesheetEntryInput {
            entry_date: "2024-03-04".to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            activity_type: "class".to_string(),
            activity_subtype: None,
            notes: None,
        }
    }

    #[test]
    fn submit_is_allowed_from_draft_and_rejected_only() {
        assert_eq!(submit_transition(EntryStatus::Draft), Ok(EntryStatus::Submitted));
        assert_eq!(submit_transition(EntryStatus::Rejected), Ok(EntryStatus::Submitted));
        assert!(submit_transition(EntryStatus::Submitted).is_err());
        assert_eq!(
            submit_transition(EntryStatus::Approved),
            Err(TransitionError {
                from: EntryStatus::Approved,
                to: EntryStatus::Submitted
            })
        );
    }

    #[test]
    fn review_needs_a_submitted_entry() {
        assert_eq!(
            review_transition(EntryStatus::Submitted, ReviewDecision::Approve),
            Ok(EntryStatus::Approved)
        );
        assert_eq!(
            review_transition(EntryStatus::Submitted, ReviewDecision::Reject),
            Ok(EntryStatus::Rejected)
        );
        for status in [EntryStatus::Draft, EntryStatus::Approved, EntryStatus::Rejected] {
            assert!(review_transition(status, ReviewDecision::Approve).is_err(), "{:?}", status);
        }
    }

    #[test]
    fn review_scope_follows_role() {
        let member = role("m1", Role::Member, Some("org"), Some("cs"));
        let manager_cs = role("h1", Role::Manager, Some("org"), Some("cs"));
        let manager_math = role("h2", Role::Manager, Some("org"), Some("math"));
        let admin = role("a1", Role::OrgAdmin, Some("org"), None);
        let foreign_admin = role("a2", Role::OrgAdmin, Some("other"), None);
        let peer = role("m2", Role::Member, Some("org"), Some("cs"));

        assert!(can_review(&manager_cs, &member));
        assert!(!can_review(&manager_math, &member));
        assert!(can_review(&admin, &member));
        assert!(!can_review(&foreign_admin, &member));
        assert!(!can_review(&peer, &member));
        assert!(!can_review(&manager_cs, &manager_cs), "self-review");
        assert!(can_oversee(&manager_cs, &manager_cs));
    }

    #[tokio::test]
    async fn create_validates_before_writing() {
        let store = MemoryStore::seeded();
        let bad = CreateEntryRequest {
            entry: input("10:00", "09:00"),
            submit: false,
        };
        let err = create_entry(&store, "user-member", &bad).await.unwrap_err();
        match err {
            WorkflowError::Validation(errors) => assert!(errors.field("end_time").is_some()),
            other => panic!("expected validation error, got {:?}", other),
        }

        let good = CreateEntryRequest {
            entry: input("09:00", "10:00"),
            submit: true,
        };
        let created = create_entry(&store, "user-member", &good).await.unwrap();
        assert_eq!(created.status, EntryStatus::Submitted);
        assert_eq!(created.user_id, "user-member");
    }

    #[tokio::test]
    async fn draft_to_approved_round_trip() {
        let store = MemoryStore::seeded();
        let draft = create_entry(
            &store,
            "user-member",
            &CreateEntryRequest {
                entry: input("13:00", "15:00"),
                submit: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(draft.status, EntryStatus::Draft);

        let not_owner = submit_entry(&store, "user-manager", &draft.id).await;
        assert!(matches!(not_owner, Err(WorkflowError::Forbidden(_))));

        let submitted = submit_entry(&store, "user-member", &draft.id).await.unwrap();
        assert_eq!(submitted.status, EntryStatus::Submitted);

        let reviewer = store.role_of("user-manager").unwrap();
        let owner = store.role_of("user-member").unwrap();
        let approved = review_entry(
            &store,
            &reviewer,
            &submitted,
            Some(&owner),
            &ReviewRequest {
                decision: ReviewDecision::Approve,
                comment: Some("  ".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(approved.status, EntryStatus::Approved);
        assert_eq!(approved.reviewed_by.as_deref(), Some("user-manager"));
        assert_eq!(approved.review_comment, None);

        let again = review_entry(
            &store,
            &reviewer,
            &approved,
            Some(&owner),
            &ReviewRequest {
                decision: ReviewDecision::Reject,
                comment: None,
            },
        )
        .await;
        assert!(matches!(again, Err(WorkflowError::Transition(_))));
    }

    #[tokio::test]
    async fn missing_entry_and_missing_owner_role() {
        let store = MemoryStore::seeded();
        assert!(matches!(
            submit_entry(&store, "user-member", "nope").await,
            Err(WorkflowError::NotFound(_))
        ));

        let reviewer = store.role_of("user-manager").unwrap();
        let entry = store.entries_snapshot()[0].clone();
        let result = review_entry(
            &store,
            &reviewer,
            &entry,
            None,
            &ReviewRequest {
                decision: ReviewDecision::Approve,
                comment: None,
            },
        )
        .await;
        assert!(matches!(result, Err(WorkflowError::Forbidden(_))));
    }

    #[tokio::test]
    async fn settings_default_when_absent() {
        let store = MemoryStore::seeded();
        let settings = settings_for(&store, "user-manager").await.unwrap();
        assert_eq!(settings.daily_target_minutes, DEFAULT_DAILY_TARGET_MINUTES);
        let member = settings_for(&store, "user-member").await.unwrap();
        assert_eq!(member.daily_target_minutes, 360);
    }
}
