use crate::core::{AuditFields, EntityId};
use docket_derive::ChangeTracked;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ChangeTracked)]
#[tracked(table = "users")]
pub struct User {
    #[tracked(id)]
    pub id: EntityId,
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub department: String,
    pub locked: bool,
    #[tracked(audit)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ChangeTracked)]
#[tracked(table = "roles")]
pub struct Role {
    #[tracked(id)]
    pub id: EntityId,
    pub name: String,
    pub description: String,
    #[tracked(audit)]
    pub audit: AuditFields,
}
