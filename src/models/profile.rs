use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Account role stored on the profile row at signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Candidate,
    Recruiter,
}

impl Role {
    /// Landing route for this role, used by the route guard when an
    /// authenticated user hits a route their role is not allowed on.
    #[must_use]
    pub const fn home_path(self) -> &'static str {
        match self {
            Self::Candidate => "/candidate/dashboard",
            Self::Recruiter => "/recruiter/dashboard",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Candidate => "candidate",
            Self::Recruiter => "recruiter",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "candidate" => Ok(Self::Candidate),
            "recruiter" => Ok(Self::Recruiter),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// One row per user in the `profiles` table, created implicitly at signup
/// from the role/name metadata and read on every session establishment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,

    pub full_name: Option<String>,

    pub role: Role,

    #[serde(default)]
    pub avatar_url: Option<String>,
}
