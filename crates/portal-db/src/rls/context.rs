use portal_core::ActingIdentity;

use super::error::ConfigError;

/// Setting read by `current_app_user_id()` in the row-security policies.
pub const USER_ID_SETTING: &str = "app.user_id";
/// Setting read by `app_is_admin()` in the row-security policies.
pub const IS_ADMIN_SETTING: &str = "app.is_admin";

const ROLE_NAME_MAX: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxIsolation {
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl TxIsolation {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "read_committed" | "read committed" => Some(Self::ReadCommitted),
            "repeatable_read" | "repeatable read" => Some(Self::RepeatableRead),
            "serializable" => Some(Self::Serializable),
            _ => None,
        }
    }

    pub const fn statement(&self) -> &'static str {
        match self {
            Self::ReadCommitted => "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
            Self::RepeatableRead => "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ",
            Self::Serializable => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE",
        }
    }
}

/// Least-privilege database role a scoped transaction switches to. Must be
/// a plain lowercase identifier so it can be quoted without escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRole(String);

impl AppRole {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let bytes = value.as_bytes();
        let valid = !bytes.is_empty()
            && bytes.len() <= ROLE_NAME_MAX
            && (bytes[0].is_ascii_lowercase() || bytes[0] == b'_')
            && bytes
                .iter()
                .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || *byte == b'_');
        if !valid {
            return Err(ConfigError::InvalidRole(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

/// The transaction-scoped settings one call establishes. Both keys are
/// always written so a scope never inherits the other key from a value left
/// at session level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    identity: ActingIdentity,
}

impl SessionContext {
    pub const fn new(identity: ActingIdentity) -> Self {
        Self { identity }
    }

    pub const fn identity(&self) -> ActingIdentity {
        self.identity
    }

    pub fn settings(&self) -> [(&'static str, String); 2] {
        match self.identity {
            ActingIdentity::User(user_id) => [
                (USER_ID_SETTING, user_id.to_string()),
                (IS_ADMIN_SETTING, "false".to_string()),
            ],
            ActingIdentity::Admin => [
                (USER_ID_SETTING, String::new()),
                (IS_ADMIN_SETTING, "true".to_string()),
            ],
        }
    }

    /// Renders the statement batch sent right after BEGIN. `SET` cannot take
    /// bind parameters, so values are interpolated; every value here comes
    /// from a validated `UserId` or a fixed literal, and every statement is
    /// `LOCAL` so it ends with the transaction.
    pub fn render(&self, role: Option<&AppRole>, isolation: TxIsolation) -> String {
        let mut statements = Vec::with_capacity(4);
        statements.push(isolation.statement().to_string());
        if let Some(role) = role {
            statements.push(format!("SET LOCAL ROLE {}", role.quoted()));
        }
        for (name, value) in self.settings() {
            statements.push(format!("SET LOCAL {name} = '{value}'"));
        }
        statements.join(";\n")
    }
}
