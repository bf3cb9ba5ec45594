// src/navigation.rs
//
// Sidebar entries per role. Hiding an entry is a convenience for the UI
// only: every route the menu points at does its own role check.
use serde::Serialize;

use crate::labels::{EntityKind, LabelResolver};
use crate::models::EntryStatus;
use crate::roles::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub key: &'static str,
    pub title: String,
    pub path: &'static str,
}

#[derive(Debug, Clone, Copy)]
enum Title {
    Fixed(&'static str),
    Entities(EntityKind),
    RoleDirectory(Role),
}

// (key, title, path) per role, in display order.
const ORG_ADMIN_MENU: &[(&str, Title, &str)] = &[
    ("dashboard", Title::Fixed("Dashboard"), "/admin"),
    ("departments", Title::Entities(EntityKind::Department), "/admin/departments"),
    ("programs", Title::Entities(EntityKind::Program), "/admin/programs"),
    ("users", Title::Fixed("Users"), "/admin/users"),
    ("activity_categories", Title::Fixed("Activity Categories"), "/admin/activity-categories"),
    ("labels", Title::Fixed("Terminology"), "/admin/labels"),
    ("reports", Title::Fixed("Reports"), "/admin/reports"),
    ("organization", Title::Fixed("Organization"), "/admin/organization"),
];

const PROGRAM_MANAGER_MENU: &[(&str, Title, &str)] = &[
    ("dashboard", Title::Fixed("Dashboard"), "/program"),
    ("approvals", Title::Fixed("Approvals"), "/program/approvals"),
    ("members", Title::RoleDirectory(Role::Member), "/program/members"),
    ("reports", Title::Fixed("Reports"), "/program/reports"),
];

const MANAGER_MENU: &[(&str, Title, &str)] = &[
    ("dashboard", Title::Fixed("Dashboard"), "/manager"),
    ("approvals", Title::Fixed("Approvals"), "/manager/approvals"),
    ("members", Title::RoleDirectory(Role::Member), "/manager/members"),
    ("timesheet", Title::Fixed("My Timesheet"), "/manager/timesheet"),
    ("reports", Title::Fixed("Reports"), "/manager/reports"),
];

const MEMBER_MENU: &[(&str, Title, &str)] = &[
    ("dashboard", Title::Fixed("Dashboard"), "/member"),
    ("timesheet", Title::Fixed("My Timesheet"), "/member/timesheet"),
    ("history", Title::Fixed("History"), "/member/history"),
    ("reports", Title::Fixed("My Reports"), "/member/reports"),
];

fn menu_for(role: Role) -> &'static [(&'static str, Title, &'static str)] {
    match role {
        Role::OrgAdmin => ORG_ADMIN_MENU,
        Role::ProgramManager => PROGRAM_MANAGER_MENU,
        Role::Manager => MANAGER_MENU,
        Role::Member => MEMBER_MENU,
    }
}

pub fn navigation_for(role: Role, labels: &LabelResolver) -> Vec<NavItem> {
    menu_for(role)
        .iter()
        .map(|&(key, title, path)| NavItem {
            key,
            title: match title {
                Title::Fixed(text) => text.to_string(),
                Title::Entities(entity) => labels.entity_label(entity, true).to_string(),
                Title::RoleDirectory(role) => format!("{} Directory", labels.role_label(role)),
            },
            path,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub label: &'static str,
    pub color: &'static str,
}

impl StatusBadge {
    pub fn for_status(status: EntryStatus) -> Self {
        let (label, color) = match status {
            EntryStatus::Draft => ("Draft", "gray"),
            EntryStatus::Submitted => ("Submitted", "blue"),
            EntryStatus::Approved => ("Approved", "green"),
            EntryStatus::Rejected => ("Rejected", "red"),
        };
        Self { label, color }
    }
}
