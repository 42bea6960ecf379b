use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 用户角色（封闭集合，与服务端保持一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Employee,
    LoanOfficer,
    Accountant,
    Admin,
}

impl Role {
    /// 全部角色
    pub const ALL: [Role; 4] = [
        Role::Employee,
        Role::LoanOfficer,
        Role::Accountant,
        Role::Admin,
    ];

    /// 服务端使用的角色标识
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "EMPLOYEE",
            Role::LoanOfficer => "LOAN_OFFICER",
            Role::Accountant => "ACCOUNTANT",
            Role::Admin => "ADMIN",
        }
    }

    /// 注册接口路径片段：`/auth/register/{slug}`
    pub fn registration_slug(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::LoanOfficer => "loan-officer",
            Role::Accountant => "accountant",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 未知角色标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "EMPLOYEE" => Ok(Role::Employee),
            "LOAN_OFFICER" => Ok(Role::LoanOfficer),
            "ACCOUNTANT" => Ok(Role::Accountant),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde_uses_server_identifiers() {
        let json = serde_json::to_string(&Role::LoanOfficer).unwrap();
        assert_eq!(json, "\"LOAN_OFFICER\"");

        let role: Role = serde_json::from_str("\"ACCOUNTANT\"").unwrap();
        assert_eq!(role, Role::Accountant);

        assert!(serde_json::from_str::<Role>("\"MANAGER\"").is_err());
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("loan-officer".parse::<Role>().unwrap(), Role::LoanOfficer);
        assert!("guest".parse::<Role>().is_err());

        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_registration_slug() {
        assert_eq!(Role::LoanOfficer.registration_slug(), "loan-officer");
        assert_eq!(Role::Employee.registration_slug(), "employee");
        assert!(Role::Admin.is_admin());
        assert!(!Role::Accountant.is_admin());
    }
}
