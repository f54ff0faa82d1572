use derive_more::{From, Into};
use serde::{Deserialize, Serialize};

/// Short-lived bearer credential for the remote backend.
///
/// `Debug` is redacted so tokens never end up in logs by accident.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct AccessToken(pub String);

/// Longer-lived credential exchanged for a new access/refresh pair.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

impl AccessToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RefreshToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RefreshToken(..)")
    }
}

impl From<&str> for AccessToken {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<&str> for RefreshToken {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_redacted() {
        let access = AccessToken::from("secret-access");
        let refresh = RefreshToken::from("secret-refresh");
        assert_eq!(format!("{access:?}"), "AccessToken(..)");
        assert_eq!(format!("{refresh:?}"), "RefreshToken(..)");
    }

    #[test]
    fn serde_is_transparent() {
        let access = AccessToken::from("at");
        let json = serde_json::to_string(&access).unwrap();
        assert_eq!(json, "\"at\"");
        let parsed: AccessToken = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, access);
    }

    #[test]
    fn into_string() {
        let refresh = RefreshToken::from("rt".to_string());
        let raw: String = refresh.into();
        assert_eq!(raw, "rt");
    }

    #[test]
    fn newtypes_prevent_mixing() {
        fn takes_access(_: &AccessToken) {}
        fn takes_refresh(_: &RefreshToken) {}

        takes_access(&AccessToken::from("x"));
        takes_refresh(&RefreshToken::from("x"));
        // takes_access(&RefreshToken::from("x"));  // Compile error!
    }
}
