//! JWT claim set shared by access and refresh tokens

use serde::{Deserialize, Serialize};

use super::principal::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: Role,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expires at (Unix seconds)
    pub exp: i64,
    pub iss: String,
    pub typ: TokenType,
    /// Session family; one per login
    pub fam: String,
    /// Rotation marker, refresh tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rot: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_claims_omit_rotation_marker() {
        let claims = Claims {
            sub: "u".into(),
            role: Role::User,
            iat: 1,
            exp: 2,
            iss: "shop".into(),
            typ: TokenType::Access,
            fam: "f".into(),
            rot: None,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["typ"], "access");
        assert!(json.get("rot").is_none());
    }
}
