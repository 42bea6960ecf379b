pub use elms_config::normalize_path;
use elms_types::Role;
use std::collections::HashMap;

use crate::policy::RouteTable;

/// 路由访问要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAccess {
    /// 无需登录
    Public,
    /// 任意已登录用户
    Authenticated,
    /// 仅限列出的角色
    Roles(Vec<Role>),
    /// 根路径：跳转到当前用户的首页
    Landing,
}

/// 路由登记表；未登记的路径按 `Authenticated` 处理
#[derive(Debug, Clone)]
pub struct RouteRegistry {
    routes: HashMap<String, RouteAccess>,
    default_access: RouteAccess,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            default_access: RouteAccess::Authenticated,
        }
    }

    /// 标准路由；每个角色的首页只对该角色开放
    pub fn standard(table: &RouteTable) -> Self {
        let mut registry = Self::new();

        registry.register("/", RouteAccess::Landing);
        registry.register("/dashboard", RouteAccess::Authenticated);
        registry.register("/loans", RouteAccess::Authenticated);
        registry.register("/loans/new", RouteAccess::Authenticated);
        registry.register("/admin", RouteAccess::Roles(vec![Role::Admin]));
        registry.register("/reports", RouteAccess::Roles(vec![Role::Admin]));

        for (role, home) in table.iter() {
            registry.register(home, RouteAccess::Roles(vec![role]));
        }

        registry
    }

    pub fn register(&mut self, path: impl AsRef<str>, access: RouteAccess) {
        self.routes.insert(normalize_path(path.as_ref()), access);
    }

    pub fn access_for(&self, path: &str) -> &RouteAccess {
        self.routes
            .get(&normalize_path(path))
            .unwrap_or(&self.default_access)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.routes.contains_key(&normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new()
    }
}
