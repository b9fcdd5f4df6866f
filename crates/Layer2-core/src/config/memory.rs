//! In-Memory Configuration Store - 참조용 메모리 저장소
//!
//! 저장소 계약을 그대로 따르는 비영속 구현입니다.
//!
//! - 엔트리별 async lock 으로 같은 식별자의 변경을 직렬화
//! - 영속화 전에 모든 리스너에게 수락 여부 확인 (거부 사유 전부 수집)
//! - 하나라도 거부하면 `UnacceptableConfiguration` 으로 실패하고 저장하지 않음
//! - 저장 후 모든 리스너에게 apply 전달

use super::cfg::ComponentCfg;
use super::store::{ConfigurationListener, ConfigurationStore, Subscription, SubscriptionId};
use async_trait::async_trait;
use dirsrv_foundation::{ConfigChangeResult, Dn, Error, Result, UnacceptableReasons};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

type ListenerList<C> = Arc<RwLock<Vec<(SubscriptionId, Arc<dyn ConfigurationListener<C>>)>>>;

/// 메모리 설정 저장소
pub struct InMemoryConfigStore<C: ComponentCfg> {
    /// 저장소 이름 (로그/에러 메시지용, 예: "alert handler")
    label: String,

    /// 엔트리
    entries: RwLock<BTreeMap<Dn, C>>,

    /// 엔트리별 변경 직렬화 lock
    entry_locks: Mutex<HashMap<Dn, Arc<tokio::sync::Mutex<()>>>>,

    /// 구독 리스너
    listeners: ListenerList<C>,

    /// 구독 ID 카운터
    next_id: AtomicU64,
}

impl<C: ComponentCfg> InMemoryConfigStore<C> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: RwLock::new(BTreeMap::new()),
            entry_locks: Mutex::new(HashMap::new()),
            listeners: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// 초기 엔트리로 생성 (리스너 통지 없음)
    pub fn with_entries(label: impl Into<String>, entries: impl IntoIterator<Item = C>) -> Self {
        let store = Self::new(label);
        {
            let mut map = store.entries.write();
            for entry in entries {
                map.insert(entry.dn().clone(), entry);
            }
        }
        store
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, dn: &Dn) -> bool {
        self.entries.read().contains_key(dn)
    }

    /// 현재 등록된 리스너 수
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// 모든 엔트리 스냅샷
    pub fn entries(&self) -> Vec<C> {
        self.entries.read().values().cloned().collect()
    }

    // ========================================================================
    // 관리자 변경 API
    // ========================================================================

    /// 엔트리 추가
    pub async fn add_entry(&self, config: C) -> Result<Vec<ConfigChangeResult>> {
        let dn = config.dn().clone();
        let lock = self.entry_lock(&dn);
        let _guard = lock.lock().await;

        if self.contains(&dn) {
            return Err(Error::InvalidInput(format!(
                "{} entry {} already exists",
                self.label, dn
            )));
        }

        let listeners = self.listener_snapshot();
        let mut reasons = UnacceptableReasons::new();
        let mut acceptable = true;
        for listener in &listeners {
            if !listener.is_configuration_add_acceptable(&config, &mut reasons).await {
                acceptable = false;
            }
        }
        if !acceptable {
            warn!("Rejected add of {} entry {}: {}", self.label, dn, reasons);
            self.release_entry_lock(&dn, &lock);
            return Err(Error::unacceptable(&self.label, dn.as_str(), reasons.into_vec()));
        }

        self.entries.write().insert(dn.clone(), config.clone());
        info!("Added {} entry {}", self.label, dn);

        let mut results = Vec::with_capacity(listeners.len());
        for listener in &listeners {
            results.push(listener.apply_configuration_add(&config).await);
        }
        Ok(results)
    }

    /// 엔트리 수정
    pub async fn modify_entry(&self, config: C) -> Result<Vec<ConfigChangeResult>> {
        let dn = config.dn().clone();
        let lock = self.entry_lock(&dn);
        let _guard = lock.lock().await;

        if !self.contains(&dn) {
            self.release_entry_lock(&dn, &lock);
            return Err(Error::NotFound(format!("{} entry {}", self.label, dn)));
        }

        let listeners = self.listener_snapshot();
        let mut reasons = UnacceptableReasons::new();
        let mut acceptable = true;
        for listener in &listeners {
            if !listener.is_configuration_change_acceptable(&config, &mut reasons).await {
                acceptable = false;
            }
        }
        if !acceptable {
            warn!("Rejected change of {} entry {}: {}", self.label, dn, reasons);
            return Err(Error::unacceptable(&self.label, dn.as_str(), reasons.into_vec()));
        }

        self.entries.write().insert(dn.clone(), config.clone());
        info!("Modified {} entry {}", self.label, dn);

        let mut results = Vec::with_capacity(listeners.len());
        for listener in &listeners {
            results.push(listener.apply_configuration_change(&config).await);
        }
        Ok(results)
    }

    /// 엔트리 삭제
    pub async fn delete_entry(&self, dn: &Dn) -> Result<Vec<ConfigChangeResult>> {
        let lock = self.entry_lock(dn);
        let _guard = lock.lock().await;

        let Some(current) = self.entries.read().get(dn).cloned() else {
            self.release_entry_lock(dn, &lock);
            return Err(Error::NotFound(format!("{} entry {}", self.label, dn)));
        };

        let listeners = self.listener_snapshot();
        let mut reasons = UnacceptableReasons::new();
        let mut acceptable = true;
        for listener in &listeners {
            if !listener.is_configuration_delete_acceptable(&current, &mut reasons).await {
                acceptable = false;
            }
        }
        if !acceptable {
            warn!("Rejected delete of {} entry {}: {}", self.label, dn, reasons);
            return Err(Error::unacceptable(&self.label, dn.as_str(), reasons.into_vec()));
        }

        self.entries.write().remove(dn);
        info!("Deleted {} entry {}", self.label, dn);

        let mut results = Vec::with_capacity(listeners.len());
        for listener in &listeners {
            results.push(listener.apply_configuration_delete(&current).await);
        }
        self.release_entry_lock(dn, &lock);
        Ok(results)
    }

    // ========================================================================
    // 내부 헬퍼
    // ========================================================================

    fn entry_lock(&self, dn: &Dn) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.entry_locks.lock();
        Arc::clone(locks.entry(dn.clone()).or_default())
    }

    /// 대기자가 없으면 식별자의 잠금을 맵에서 제거
    ///
    /// 호출자는 `lock` 을 잡고 있어야 합니다. 맵과 호출자 외에 참조가 있으면
    /// 대기 중인 작업이 있으므로 남겨 둡니다.
    fn release_entry_lock(&self, dn: &Dn, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.entry_locks.lock();
        let idle = locks
            .get(dn)
            .is_some_and(|held| Arc::ptr_eq(held, lock) && Arc::strong_count(lock) == 2);
        if idle {
            locks.remove(dn);
        }
    }

    #[cfg(test)]
    fn entry_lock_count(&self) -> usize {
        self.entry_locks.lock().len()
    }

    fn listener_snapshot(&self) -> Vec<Arc<dyn ConfigurationListener<C>>> {
        self.listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }
}

#[async_trait]
impl<C: ComponentCfg> ConfigurationStore<C> for InMemoryConfigStore<C> {
    async fn list(&self) -> Result<Vec<Dn>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    async fn get(&self, dn: &Dn) -> Result<Option<C>> {
        Ok(self.entries.read().get(dn).cloned())
    }

    fn subscribe(&self, listener: Arc<dyn ConfigurationListener<C>>) -> Subscription {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().push((id, listener));
        debug!("{} store: attached {}", self.label, id);

        let listeners = Arc::clone(&self.listeners);
        let label = self.label.clone();
        Subscription::new(id, move |id| {
            listeners.write().retain(|(existing, _)| *existing != id);
            debug!("{} store: detached {}", label, id);
        })
    }
}
