//! Configuration Store Contract - 설정 저장소 인터페이스
//!
//! 저장소는 capability별로 엔트리 목록/조회를 제공하고, 변경을 커밋하기 전에
//! 구독자에게 수락 여부를 묻고, 커밋 후 apply 콜백을 전달합니다.

use super::cfg::ComponentCfg;
use async_trait::async_trait;
use dirsrv_foundation::{ConfigChangeResult, Dn, Result, UnacceptableReasons};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// ConfigurationListener - 변경 리스너
// ============================================================================

/// 설정 변경 리스너
///
/// `is_*_acceptable` 는 저장소가 변경을 영속화하기 전에 호출되며,
/// `false` 를 반환하면 `reasons` 에 사유를 남겨야 합니다.
/// `apply_*` 는 영속화 이후 호출됩니다.
#[async_trait]
pub trait ConfigurationListener<C: ComponentCfg>: Send + Sync {
    async fn is_configuration_add_acceptable(&self, config: &C, reasons: &mut UnacceptableReasons) -> bool;

    async fn apply_configuration_add(&self, config: &C) -> ConfigChangeResult;

    async fn is_configuration_change_acceptable(&self, config: &C, reasons: &mut UnacceptableReasons) -> bool;

    async fn apply_configuration_change(&self, config: &C) -> ConfigChangeResult;

    async fn is_configuration_delete_acceptable(&self, config: &C, reasons: &mut UnacceptableReasons) -> bool;

    async fn apply_configuration_delete(&self, config: &C) -> ConfigChangeResult;
}

// ============================================================================
// ConfigurationStore - 저장소 트레이트
// ============================================================================

/// capability 하나에 대한 설정 저장소
#[async_trait]
pub trait ConfigurationStore<C: ComponentCfg>: Send + Sync {
    /// 현재 엔트리 식별자 목록
    async fn list(&self) -> Result<Vec<Dn>>;

    /// 엔트리 스냅샷 조회
    async fn get(&self, dn: &Dn) -> Result<Option<C>>;

    /// 리스너 등록. 반환된 핸들을 drop 하면 등록이 해제됩니다.
    fn subscribe(&self, listener: Arc<dyn ConfigurationListener<C>>) -> Subscription;
}

// ============================================================================
// Subscription - 구독 핸들
// ============================================================================

/// 구독 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscription-{}", self.0)
    }
}

type DetachFn = Box<dyn FnOnce(SubscriptionId) + Send + Sync>;

/// 리스너 등록 핸들
pub struct Subscription {
    id: SubscriptionId,
    detach: Option<DetachFn>,
}

impl Subscription {
    pub fn new(id: SubscriptionId, detach: impl FnOnce(SubscriptionId) + Send + Sync + 'static) -> Self {
        Self {
            id,
            detach: Some(Box::new(detach)),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// 명시적으로 등록 해제
    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscription_detaches_once() {
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let sub = Subscription::new(SubscriptionId::new(7), move |id| {
            assert_eq!(id.as_u64(), 7);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        sub.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let counter = Arc::clone(&calls);
        {
            let _sub = Subscription::new(SubscriptionId::new(8), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
