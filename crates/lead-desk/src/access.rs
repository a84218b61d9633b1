//! Role capability table.
//!
//! Every authorization decision goes through [`authorize`]. Roles are a flat
//! set: no role implies another, and the only extra grant is the `is_staff`
//! flag, which unlocks the administrative operations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::staff::StaffId;

/// Operator roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    AdmManager,
    AdmExec,
    Processing,
    Media,
    Trainer,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Admin,
        Role::AdmManager,
        Role::AdmExec,
        Role::Processing,
        Role::Media,
        Role::Trainer,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::AdmManager => "ADM_MANAGER",
            Role::AdmExec => "ADM_EXEC",
            Role::Processing => "PROCESSING",
            Role::Media => "MEDIA",
            Role::Trainer => "TRAINER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Authenticated identity performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: StaffId,
    pub username: String,
    pub role: Role,
    pub is_staff: bool,
}

/// Operations guarded by the capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateLead,
    ViewLeads,
    ModifyLeads,
    SubmitProcessingUpdate,
    ManageStaff,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Operation::CreateLead => "create leads",
            Operation::ViewLeads => "view leads",
            Operation::ModifyLeads => "modify leads",
            Operation::SubmitProcessingUpdate => "submit processing updates",
            Operation::ManageStaff => "manage staff",
        }
    }
}

struct Capability {
    operation: Operation,
    roles: &'static [Role],
    /// Whether `is_staff` actors pass regardless of role.
    staff_flag_grants: bool,
}

const CAPABILITIES: &[Capability] = &[
    Capability {
        operation: Operation::CreateLead,
        roles: &[Role::Admin, Role::AdmManager, Role::AdmExec],
        staff_flag_grants: false,
    },
    Capability {
        operation: Operation::ViewLeads,
        roles: &[Role::Admin],
        staff_flag_grants: true,
    },
    Capability {
        operation: Operation::ModifyLeads,
        roles: &[Role::Admin],
        staff_flag_grants: true,
    },
    // PROCESSING is checked on `changed_by` by the lifecycle engine.
    Capability {
        operation: Operation::SubmitProcessingUpdate,
        roles: &Role::ALL,
        staff_flag_grants: true,
    },
    Capability {
        operation: Operation::ManageStaff,
        roles: &[Role::Admin],
        staff_flag_grants: true,
    },
];

/// Raised when an authenticated actor lacks the capability for an operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("role {role} may not {}", .operation.label())]
pub struct AccessDenied {
    pub role: Role,
    pub operation: Operation,
}

pub fn can_perform(actor: &Actor, operation: Operation) -> bool {
    CAPABILITIES
        .iter()
        .find(|capability| capability.operation == operation)
        .is_some_and(|capability| {
            capability.roles.contains(&actor.role)
                || (capability.staff_flag_grants && actor.is_staff)
        })
}

pub fn authorize(actor: &Actor, operation: Operation) -> Result<(), AccessDenied> {
    if can_perform(actor, operation) {
        Ok(())
    } else {
        tracing::debug!(
            actor = %actor.username,
            role = %actor.role,
            operation = operation.label(),
            "capability check refused"
        );
        Err(AccessDenied {
            role: actor.role,
            operation,
        })
    }
}
