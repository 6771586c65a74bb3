use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PersonnelId(pub String);

impl std::fmt::Display for PersonnelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonnelRole {
    Employee,
    ServiceChief,
    Hr,
    Admin,
}

impl PersonnelRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::ServiceChief => "service_chief",
            Self::Hr => "hr",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "employee" => Some(Self::Employee),
            "service_chief" => Some(Self::ServiceChief),
            "hr" => Some(Self::Hr),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Directory entry for one member of staff. Read-only from the workflow's point of view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personnel {
    pub id: PersonnelId,
    pub name: String,
    pub role: PersonnelRole,
    pub service: String,
    pub active: bool,
}

impl Personnel {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        role: PersonnelRole,
        service: impl Into<String>,
    ) -> Self {
        Self {
            id: PersonnelId(id.into()),
            name: name.into(),
            role,
            service: service.into(),
            active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn belongs_to(&self, service: &str) -> bool {
        self.service.trim().eq_ignore_ascii_case(service.trim())
    }
}
