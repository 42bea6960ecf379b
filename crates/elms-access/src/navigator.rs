use elms_core::SessionEvent;
use elms_session::SessionStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::policy::{AccessDecision, AccessPolicy};
use crate::routes::normalize_path;

/// 导航器：持有当前位置，订阅会话失效事件并跳转到登录页
pub struct Navigator {
    policy: Arc<AccessPolicy>,
    session: Arc<SessionStore>,
    location: watch::Sender<String>,
    login_redirects: AtomicU64,
}

impl Navigator {
    pub fn new(policy: Arc<AccessPolicy>, session: Arc<SessionStore>) -> Self {
        let (location, _) = watch::channel(policy.login_route().to_string());
        Self {
            policy,
            session,
            location,
            login_redirects: AtomicU64::new(0),
        }
    }

    /// 当前位置
    pub fn location(&self) -> String {
        self.location.borrow().clone()
    }

    pub fn watch_location(&self) -> watch::Receiver<String> {
        self.location.subscribe()
    }

    /// 失效事件触发的登录跳转次数
    pub fn login_redirects(&self) -> u64 {
        self.login_redirects.load(Ordering::SeqCst)
    }

    /// 导航到 `path`；被拒绝时改为跳转目标
    ///
    /// 已登录用户访问登录页时直接进入其首页。
    pub async fn navigate(&self, path: &str) -> AccessDecision {
        let session = self.session.current().await;
        let decision = match &session {
            Some(session) if normalize_path(path) == self.policy.login_route() => {
                AccessDecision::RedirectToHome {
                    role: session.role(),
                    home: self.policy.home_of(session.role()).to_string(),
                }
            }
            _ => self.policy.decide_path(path, session.as_ref()),
        };

        let target = match self.policy.redirect_target(&decision) {
            Some(target) => {
                debug!(requested = %path, target = %target, "Navigation redirected");
                target.to_string()
            }
            None => normalize_path(path),
        };
        self.location.send_replace(target);

        decision
    }

    /// 跳转到登录页；已在公共路由上时不跳转
    pub fn redirect_to_login(&self) -> bool {
        let current = self.location();
        if self.policy.is_public(&current) {
            debug!(location = %current, "Already on a public route, no redirect");
            return false;
        }

        self.login_redirects.fetch_add(1, Ordering::SeqCst);
        self.location
            .send_replace(self.policy.login_route().to_string());
        info!(from = %current, "Redirected to login after session invalidation");
        true
    }

    async fn handle(&self, event: &SessionEvent) {
        if let SessionEvent::Invalidated { generation } = event {
            // 事件送达前可能已有新的登录
            if let Some(active) = self.session.active_token().await {
                if active.generation != *generation {
                    debug!(
                        invalidated = generation,
                        current = active.generation,
                        "Newer session active, invalidation ignored"
                    );
                    return;
                }
            }

            debug!(generation = generation, "Session invalidated");
            self.redirect_to_login();
        }
    }

    /// 订阅会话事件，直到事件总线关闭
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let rx = self.session.subscribe();
        let navigator = Arc::clone(self);
        tokio::spawn(async move { navigator.run(rx).await })
    }

    async fn run(&self, mut rx: broadcast::Receiver<SessionEvent>) {
        loop {
            match rx.recv().await {
                Ok(event) => self.handle(&event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Navigator lagged behind session events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
