use elms_core::{Authenticator, ElmsError, EventBus, Result, SessionEvent};
use elms_types::{Credentials, Identity};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use super::{ActiveToken, Session, SessionStorage};

struct SessionSlot {
    session: Session,
    generation: u64,
}

#[derive(Default)]
struct SessionState {
    slot: Option<SessionSlot>,
    last_generation: u64,
}

impl SessionState {
    fn install(&mut self, session: Session) -> u64 {
        self.last_generation += 1;
        let generation = self.last_generation;
        self.slot = Some(SessionSlot {
            session,
            generation,
        });
        generation
    }
}

/// 会话存储：当前登录用户的唯一来源
///
/// 所有写操作在同一把锁内完成持久化与内存更新，二者不会出现不一致。
/// 每次建立会话分配递增的代数，401 只会清除发出请求时的那一代会话。
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    state: RwLock<SessionState>,
    events: EventBus,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>, events: EventBus) -> Self {
        Self {
            storage,
            state: RwLock::new(SessionState::default()),
            events,
        }
    }

    /// 从持久化存储恢复会话；数据损坏时清除并以未登录状态启动
    pub async fn restore(&self) -> Option<Session> {
        let mut state = self.state.write().await;

        let entries = match self.storage.load().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Persisted session unreadable, clearing");
                self.clear_storage_quietly().await;
                state.slot = None;
                return None;
            }
        };

        if entries.is_empty() {
            debug!("No persisted session");
            state.slot = None;
            return None;
        }

        let session = match (entries.token, entries.user) {
            (Some(token), Some(user)) => serde_json::from_str::<Identity>(&user)
                .ok()
                .and_then(|identity| Session::new(token, identity)),
            _ => None,
        };

        match session {
            Some(session) => {
                let identity = session.identity().clone();
                let generation = state.install(session.clone());

                info!(user_id = identity.id, role = %identity.role, "Session restored");
                self.events.publish(SessionEvent::Restored {
                    identity,
                    generation,
                });
                Some(session)
            }
            None => {
                warn!("Persisted session is incomplete or malformed, clearing");
                self.clear_storage_quietly().await;
                state.slot = None;
                None
            }
        }
    }

    /// 登录；失败时保留原有会话
    pub async fn login(
        &self,
        authenticator: &dyn Authenticator,
        credentials: &Credentials,
    ) -> Result<Session> {
        debug!(email = %credentials.email, "Login requested");

        let response = authenticator.authenticate(credentials).await.map_err(|e| {
            warn!(email = %credentials.email, error = %e, "Login failed");
            e
        })?;

        let (token, identity) = response.into_parts();
        let session = Session::new(token, identity.clone())
            .ok_or_else(|| ElmsError::Decode("login response carried an empty token".to_string()))?;
        let user = serde_json::to_string(&identity)?;

        let mut state = self.state.write().await;

        self.storage
            .save(session.token(), &user)
            .await
            .map_err(|e| ElmsError::Storage(e.to_string()))?;

        let generation = state.install(session.clone());

        info!(
            user_id = identity.id,
            role = %identity.role,
            generation = generation,
            "Session established"
        );
        self.events.publish(SessionEvent::LoggedIn {
            identity,
            generation,
        });

        Ok(session)
    }

    /// 登出；重复调用无副作用
    pub async fn logout(&self) -> Result<()> {
        let mut state = self.state.write().await;

        self.storage
            .clear()
            .await
            .map_err(|e| ElmsError::Storage(e.to_string()))?;

        if let Some(slot) = state.slot.take() {
            info!(user_id = slot.session.identity().id, "Session closed");
            self.events.publish(SessionEvent::LoggedOut);
        }

        Ok(())
    }

    /// 收到认证失败后清除会话
    ///
    /// 仅当当前会话仍是 `generation` 那一代时才清除，返回是否清除。
    pub async fn invalidate(&self, generation: u64) -> bool {
        let mut state = self.state.write().await;

        let current = state.slot.as_ref().map(|slot| slot.generation);
        if current != Some(generation) {
            debug!(
                generation = generation,
                current = ?current,
                "Stale authentication failure ignored"
            );
            return false;
        }

        self.clear_storage_quietly().await;
        if let Some(slot) = state.slot.take() {
            warn!(
                user_id = slot.session.identity().id,
                generation = generation,
                "Session invalidated by server"
            );
        }
        self.events.publish(SessionEvent::Invalidated { generation });

        true
    }

    /// 当前会话
    pub async fn current(&self) -> Option<Session> {
        let state = self.state.read().await;
        state.slot.as_ref().map(|slot| slot.session.clone())
    }

    /// 当前 token 及其代数，供网关附加到请求上
    pub async fn active_token(&self) -> Option<ActiveToken> {
        let state = self.state.read().await;
        state.slot.as_ref().map(|slot| ActiveToken {
            token: slot.session.token().to_string(),
            generation: slot.generation,
        })
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.slot.is_some()
    }

    /// 订阅会话事件
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    async fn clear_storage_quietly(&self) {
        if let Err(e) = self.storage.clear().await {
            tracing::error!(error = %e, "Failed to clear persisted session");
        }
    }
}
