//! Lifecycle Events - 라이프사이클 이벤트 버스
//!
//! 매니저는 상태 전이가 끝난 뒤 (lock 을 놓은 후) 이벤트를 발행합니다.
//! 구독자는 broadcast 채널 또는 등록된 핸들러로 받습니다.

use crate::component::CapabilityKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dirsrv_foundation::Dn;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

// ============================================================================
// LifecycleEvent
// ============================================================================

/// 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventKind {
    /// 인스턴스가 게시됨
    Activated,
    /// 비활성화로 인스턴스가 내려감
    Deactivated,
    /// 설치 실패
    Failed,
    /// 재시작해야 반영되는 변경이 수락됨
    AdminActionRequired,
    /// 엔트리 삭제
    Removed,
}

impl fmt::Display for LifecycleEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activated => write!(f, "activated"),
            Self::Deactivated => write!(f, "deactivated"),
            Self::Failed => write!(f, "failed"),
            Self::AdminActionRequired => write!(f, "admin_action_required"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// 라이프사이클 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub id: Uuid,
    pub kind: LifecycleEventKind,
    pub capability: CapabilityKind,
    pub dn: Dn,
    pub class_name: Option<String>,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn new(kind: LifecycleEventKind, capability: CapabilityKind, dn: Dn) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            capability,
            dn,
            class_name: None,
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

// ============================================================================
// LifecycleEventHandler
// ============================================================================

/// 이벤트 핸들러 트레이트
#[async_trait]
pub trait LifecycleEventHandler: Send + Sync {
    /// 핸들러 이름
    fn name(&self) -> &str;

    /// 관심 있는 이벤트 종류 (비어 있으면 전부)
    fn interested_events(&self) -> Vec<LifecycleEventKind> {
        Vec::new()
    }

    /// 이벤트 처리
    async fn handle(&self, event: &LifecycleEvent);
}

// ============================================================================
// LifecycleEventBus
// ============================================================================

/// 이벤트 버스 - 발행, 구독, 최근 히스토리
pub struct LifecycleEventBus {
    sender: broadcast::Sender<LifecycleEvent>,
    handlers: RwLock<HashMap<String, Arc<dyn LifecycleEventHandler>>>,
    history: Mutex<VecDeque<LifecycleEvent>>,
    history_size: usize,
}

impl LifecycleEventBus {
    pub fn new() -> Self {
        Self::with_capacity(256, 256)
    }

    /// 용량 지정하여 생성
    pub fn with_capacity(channel_capacity: usize, history_size: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            sender,
            handlers: RwLock::new(HashMap::new()),
            history: Mutex::new(VecDeque::with_capacity(history_size)),
            history_size,
        }
    }

    pub fn register_handler(&self, handler: Arc<dyn LifecycleEventHandler>) {
        let name = handler.name().to_string();
        self.handlers.write().insert(name, handler);
    }

    pub fn unregister_handler(&self, name: &str) -> bool {
        self.handlers.write().remove(name).is_some()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// 이벤트 발행
    pub async fn publish(&self, event: LifecycleEvent) {
        debug!("Lifecycle event: {} {} {}", event.capability, event.kind, event.dn);

        if self.history_size > 0 {
            let mut history = self.history.lock();
            if history.len() >= self.history_size {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        // 구독자가 없어도 OK
        let _ = self.sender.send(event.clone());

        let handlers: Vec<Arc<dyn LifecycleEventHandler>> = self.handlers.read().values().cloned().collect();
        for handler in handlers {
            let interested = handler.interested_events();
            if interested.is_empty() || interested.contains(&event.kind) {
                handler.handle(&event).await;
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    pub fn history(&self) -> Vec<LifecycleEvent> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn history_by_kind(&self, kind: LifecycleEventKind) -> Vec<LifecycleEvent> {
        self.history
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// 특정 엔트리의 이벤트 히스토리
    pub fn history_for(&self, dn: &Dn) -> Vec<LifecycleEvent> {
        self.history
            .lock()
            .iter()
            .filter(|e| &e.dn == dn)
            .cloned()
            .collect()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }
}

impl Default for LifecycleEventBus {
    fn default() -> Self {
        Self::new()
    }
}
