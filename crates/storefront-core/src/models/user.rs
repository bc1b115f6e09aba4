use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

/// The signed-in user.
///
/// The admin flag is only a hint for which views to offer; the backend
/// enforces authorization on every privileged call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct Identity {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl Identity {
    pub fn role_display(&self) -> &'static str {
        if self.is_admin {
            "admin"
        } else {
            "customer"
        }
    }
}
