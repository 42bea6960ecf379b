use elms_types::Identity;
use tokio::sync::broadcast;

/// 会话生命周期事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// 启动时从持久化存储恢复
    Restored { identity: Identity, generation: u64 },
    LoggedIn { identity: Identity, generation: u64 },
    /// 用户主动登出
    LoggedOut,
    /// 收到 401 后由网关清除
    Invalidated { generation: u64 },
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// 返回接收者数量；没有订阅者时返回 0
    pub fn publish(&self, event: SessionEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::trace!("Session event dropped, no subscribers");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
