use elms_config::{PolicyConfig, PolicyMode};
use elms_core::{ElmsError, Result};
use elms_session::Session;
use elms_types::Role;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{error, warn};

use crate::routes::{normalize_path, RouteAccess, RouteRegistry};

/// 角色首页表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    homes: BTreeMap<Role, String>,
}

impl RouteTable {
    /// 空表
    pub fn empty() -> Self {
        Self {
            homes: BTreeMap::new(),
        }
    }

    /// 标准首页表
    pub fn standard() -> Self {
        Self::empty()
            .with_home(Role::Employee, "/employee/dashboard")
            .with_home(Role::LoanOfficer, "/loan-officer/dashboard")
            .with_home(Role::Accountant, "/accountant/dashboard")
            .with_home(Role::Admin, "/admin/dashboard")
    }

    pub fn with_home(mut self, role: Role, route: impl Into<String>) -> Self {
        self.homes.insert(role, route.into());
        self
    }

    pub fn home(&self, role: Role) -> Option<&str> {
        self.homes.get(&role).map(String::as_str)
    }

    /// 缺少首页的角色
    pub fn missing_roles(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| !self.homes.contains_key(role))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &str)> {
        self.homes.iter().map(|(role, route)| (*role, route.as_str()))
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// 导航判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    RedirectToLogin,
    /// 重定向到该角色的首页
    RedirectToHome { role: Role, home: String },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

/// 访问策略
///
/// 每次导航都重新判定，不缓存结果。
pub struct AccessPolicy {
    table: RouteTable,
    mode: PolicyMode,
    login_route: String,
    public_routes: HashSet<String>,
    fallback_home: String,
    routes: RouteRegistry,
}

impl AccessPolicy {
    /// 创建访问策略
    ///
    /// 开发模式下首页表不完整直接返回错误；生产模式下仅记录，判定时回退到默认首页。
    pub fn new(table: RouteTable, mode: PolicyMode) -> Result<Self> {
        let defaults = PolicyConfig::default();
        Self::build(
            table,
            mode,
            &defaults.login_route,
            &defaults.public_routes,
            defaults.fallback_home.clone(),
        )
    }

    /// 按配置创建
    pub fn from_config(config: &PolicyConfig) -> Result<Self> {
        let mut table = RouteTable::standard();
        for (key, home) in &config.homes {
            let role = key
                .parse::<Role>()
                .map_err(|e| ElmsError::Config(format!("policy.homes: {}", e)))?;
            table = table.with_home(role, home.clone());
        }

        Self::build(
            table,
            config.mode,
            &config.login_route,
            &config.public_routes,
            config.fallback_home.clone(),
        )
    }

    fn build(
        table: RouteTable,
        mode: PolicyMode,
        login_route: &str,
        public_routes: &[String],
        fallback_home: String,
    ) -> Result<Self> {
        let login_route = normalize_path(login_route);
        let mut public_routes: HashSet<String> =
            public_routes.iter().map(|r| normalize_path(r)).collect();
        public_routes.insert(login_route.clone());

        let policy = Self {
            routes: RouteRegistry::standard(&table),
            table,
            mode,
            login_route,
            public_routes,
            fallback_home: normalize_path(&fallback_home),
        };
        policy.check_fallback()?;
        policy.check_table()?;
        Ok(policy)
    }

    /// 默认首页必须对所有角色开放，否则回退后会再次被拒绝
    fn check_fallback(&self) -> Result<()> {
        let reachable = match self.routes.access_for(&self.fallback_home) {
            RouteAccess::Public | RouteAccess::Authenticated => true,
            RouteAccess::Roles(roles) => Role::ALL.iter().all(|role| roles.contains(role)),
            RouteAccess::Landing => false,
        };

        if reachable {
            Ok(())
        } else {
            Err(ElmsError::Policy(format!(
                "fallback home '{}' is not reachable by every role",
                self.fallback_home
            )))
        }
    }

    fn check_table(&self) -> Result<()> {
        let missing = self.table.missing_roles();
        if missing.is_empty() {
            return Ok(());
        }

        let names = missing
            .iter()
            .map(Role::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        match self.mode {
            PolicyMode::Development => Err(ElmsError::Policy(format!(
                "no home route configured for role(s): {}",
                names
            ))),
            PolicyMode::Production => {
                warn!(roles = %names, fallback = %self.fallback_home, "Role home routes missing, using fallback");
                Ok(())
            }
        }
    }

    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn routes(&self) -> &RouteRegistry {
        &self.routes
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    pub fn is_public(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.public_routes.contains(&path)
            || matches!(self.routes.access_for(&path), RouteAccess::Public)
    }

    /// 角色首页
    pub fn home_of(&self, role: Role) -> &str {
        match self.table.home(role) {
            Some(home) => home,
            None => {
                // 开发模式在构造时已拒绝不完整的首页表
                error!(role = %role, fallback = %self.fallback_home, "No home route for role");
                self.fallback_home.as_str()
            }
        }
    }

    /// 判定访问
    ///
    /// `required` 为空表示任意已登录用户均可访问。
    pub fn decide(&self, required: &[Role], session: Option<&Session>) -> AccessDecision {
        let Some(session) = session else {
            return AccessDecision::RedirectToLogin;
        };

        let role = session.role();
        if !required.is_empty() && !required.contains(&role) {
            return AccessDecision::RedirectToHome {
                role,
                home: self.home_of(role).to_string(),
            };
        }

        AccessDecision::Allow
    }

    /// 按路径判定访问；公共路由总是允许
    pub fn decide_path(&self, path: &str, session: Option<&Session>) -> AccessDecision {
        let path = normalize_path(path);

        if self.public_routes.contains(&path) {
            return AccessDecision::Allow;
        }

        match self.routes.access_for(&path) {
            RouteAccess::Public => AccessDecision::Allow,
            RouteAccess::Authenticated => self.decide(&[], session),
            RouteAccess::Roles(roles) => self.decide(roles, session),
            RouteAccess::Landing => match session {
                Some(session) => AccessDecision::RedirectToHome {
                    role: session.role(),
                    home: self.home_of(session.role()).to_string(),
                },
                None => AccessDecision::RedirectToLogin,
            },
        }
    }

    /// 登录后（或访问根路径时）应进入的页面
    pub fn landing_for(&self, session: Option<&Session>) -> &str {
        match session {
            Some(session) => self.home_of(session.role()),
            None => self.login_route.as_str(),
        }
    }

    /// 判定结果对应的跳转目标；允许访问时为 None
    pub fn redirect_target<'a>(&'a self, decision: &'a AccessDecision) -> Option<&'a str> {
        match decision {
            AccessDecision::Allow => None,
            AccessDecision::RedirectToLogin => Some(self.login_route.as_str()),
            AccessDecision::RedirectToHome { home, .. } => Some(home.as_str()),
        }
    }
}
