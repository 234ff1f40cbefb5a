//! Wire DTOs for the auth endpoints and their domain models
//!
//! The backend's JSON is decoded into `*Dto` structs that mirror it field for
//! field, then mapped explicitly into domain types. Unknown role names are
//! kept as `Role::Other` rather than failing the whole call.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier that the backend may send as either a string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{n}"),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

/// `GET /api/v1/auth/profile` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDto {
    pub id: EntityId,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub role: String,
    #[serde(default)]
    pub company_id: Option<EntityId>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Dashboard role of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Role {
    Admin,
    FleetManager,
    RentalAgent,
    WorkshopTechnician,
    Employee,
    Other(String),
}

impl Role {
    /// Parse the backend's role string.
    ///
    /// Matching ignores case and treats `-` and spaces like `_`.
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        match normalized.as_str() {
            "admin" | "super_admin" | "superadmin" => Role::Admin,
            "fleet_manager" | "fleet_owner" | "fleet" => Role::FleetManager,
            "rental_agent" | "rental" | "rental_company" => Role::RentalAgent,
            "workshop" | "workshop_technician" | "mechanic" => Role::WorkshopTechnician,
            "employee" | "driver" | "staff" => Role::Employee,
            _ => Role::Other(raw.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::FleetManager => "fleet_manager",
            Role::RentalAgent => "rental_agent",
            Role::WorkshopTechnician => "workshop_technician",
            Role::Employee => "employee",
            Role::Other(raw) => raw,
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_owned()
    }
}

/// Signed-in user as the dashboard sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub company_id: Option<String>,
    pub active: bool,
}

impl From<ProfileDto> for UserProfile {
    fn from(dto: ProfileDto) -> Self {
        let joined = [dto.first_name.as_deref(), dto.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let display_name = dto
            .full_name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .or_else(|| (!joined.is_empty()).then_some(joined))
            .unwrap_or_else(|| dto.email.clone());

        Self {
            id: dto.id.to_string(),
            email: dto.email,
            display_name,
            role: Role::parse(&dto.role),
            company_id: dto.company_id.map(|id| id.to_string()),
            active: dto.is_active,
        }
    }
}

/// `POST /api/v1/auth/validate` response body.
///
/// A 2xx from the validate endpoint means the bearer was accepted, so `valid`
/// defaults to true when the backend omits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidation {
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

fn default_valid() -> bool {
    true
}

/// Body of endpoints that only confirm an action (logout, change-password).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Acknowledgement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
