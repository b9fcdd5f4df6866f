//! Server Registry - 프로세스 전역 활성 컴포넌트 테이블
//!
//! 라이프사이클 매니저만 register/deregister 하고, 서버의 다른 부분
//! (알림 전달, 로그 로테이션, 스키마 조회) 은 lock 없이 스냅샷을 읽습니다.

use super::active_set::ActiveSet;
use crate::component::{
    AlertHandler, AlertNotification, CapabilityKind, FileNamingPolicy, MatchingRule, RetentionPolicy,
};
use dirsrv_foundation::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};

/// 서버 레지스트리
#[derive(Default)]
pub struct ServerRegistry {
    alert_handlers: ActiveSet<dyn AlertHandler>,
    retention_policies: ActiveSet<dyn RetentionPolicy>,
    matching_rules: ActiveSet<dyn MatchingRule>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // capability별 활성 집합
    // ========================================================================

    pub fn alert_handlers(&self) -> &ActiveSet<dyn AlertHandler> {
        &self.alert_handlers
    }

    pub fn retention_policies(&self) -> &ActiveSet<dyn RetentionPolicy> {
        &self.retention_policies
    }

    pub fn matching_rules(&self) -> &ActiveSet<dyn MatchingRule> {
        &self.matching_rules
    }

    /// capability별 활성 인스턴스 수
    pub fn active_counts(&self) -> BTreeMap<CapabilityKind, usize> {
        BTreeMap::from([
            (CapabilityKind::AlertHandler, self.alert_handlers.len()),
            (CapabilityKind::RetentionPolicy, self.retention_policies.len()),
            (CapabilityKind::MatchingRule, self.matching_rules.len()),
        ])
    }

    // ========================================================================
    // 소비자 API
    // ========================================================================

    /// 필터를 통과하는 모든 alert handler 에게 알림 전달. 전달된 핸들러 수를 반환.
    pub fn send_alert(&self, generator: &str, alert_type: &str, message: &str) -> usize {
        let notification = AlertNotification::new(generator, alert_type, message);
        let mut delivered = 0;

        for entry in self.alert_handlers.snapshot().iter() {
            if !entry.instance.alert_filter().admits(alert_type) {
                continue;
            }
            match entry.instance.send_alert(&notification) {
                Ok(()) => delivered += 1,
                Err(e) => error!("Alert handler {} failed to deliver {}: {}", entry.dn, alert_type, e),
            }
        }

        debug!("Alert {} from {} delivered to {} handler(s)", alert_type, generator, delivered);
        delivered
    }

    /// 모든 활성 retention policy 가 삭제를 원하는 파일 (중복 제거, 정렬)
    pub fn retention_candidates(&self, naming: &dyn FileNamingPolicy) -> Result<Vec<PathBuf>> {
        let mut candidates = BTreeSet::new();
        for entry in self.retention_policies.snapshot().iter() {
            candidates.extend(entry.instance.delete_files(naming)?);
        }
        Ok(candidates.into_iter().collect())
    }

    /// 이름 또는 OID 로 활성 matching rule 조회 (대소문자 무시)
    pub fn matching_rule(&self, name_or_oid: &str) -> Option<Arc<dyn MatchingRule>> {
        self.matching_rules
            .snapshot()
            .iter()
            .find(|e| {
                e.instance.name().eq_ignore_ascii_case(name_or_oid) || e.instance.oid() == name_or_oid
            })
            .map(|e| Arc::clone(&e.instance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{
        BitStringEqualityMatchingRule, ManagedComponent, SizeBasedRetentionPolicy, DirectoryNamingPolicy,
    };
    use crate::config::{AlertHandlerCfg, RetentionLimit, RetentionPolicyCfg};
    use async_trait::async_trait;
    use dirsrv_foundation::{Dn, Error, UnacceptableReasons};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        filter: crate::component::AlertTypeFilter,
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl ManagedComponent<AlertHandlerCfg> for Recording {
        fn class_name(&self) -> &str {
            "Recording"
        }

        async fn initialize(&mut self, _config: &AlertHandlerCfg) -> Result<()> {
            Ok(())
        }

        fn is_configuration_acceptable(&self, _config: &AlertHandlerCfg, _reasons: &mut UnacceptableReasons) -> bool {
            true
        }
    }

    impl AlertHandler for Recording {
        fn alert_filter(&self) -> &crate::component::AlertTypeFilter {
            &self.filter
        }

        fn send_alert(&self, notification: &AlertNotification) -> Result<()> {
            if self.fail {
                return Err(Error::Internal("down".into()));
            }
            self.seen.lock().push(notification.alert_type.clone());
            Ok(())
        }
    }

    fn dn(name: &str) -> Dn {
        Dn::parse(&format!("cn={},cn=config", name)).unwrap()
    }

    #[test]
    fn test_send_alert_respects_filters_and_failures() {
        let registry = ServerRegistry::new();

        let all = Arc::new(Recording::default());
        let filtered = Arc::new(Recording {
            filter: crate::component::AlertTypeFilter::from_config(
                &AlertHandlerCfg::new(dn("f"), "Recording").with_disabled_alert_type("noisy"),
            ),
            ..Default::default()
        });
        let broken = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });

        registry.alert_handlers().register(dn("all"), all.clone());
        registry.alert_handlers().register(dn("filtered"), filtered.clone());
        registry.alert_handlers().register(dn("broken"), broken);

        assert_eq!(registry.send_alert("test", "noisy", "hello"), 1);
        assert_eq!(registry.send_alert("test", "quiet", "hello"), 2);
        assert_eq!(all.seen.lock().len(), 2);
        assert_eq!(filtered.seen.lock().as_slice(), ["quiet".to_string()]);
    }

    #[test]
    fn test_matching_rule_lookup() {
        let registry = ServerRegistry::new();
        registry
            .matching_rules()
            .register(dn("bits"), Arc::new(BitStringEqualityMatchingRule::default()));

        assert!(registry.matching_rule("BITSTRINGMATCH").is_some());
        assert!(registry.matching_rule("2.5.13.16").is_some());
        assert!(registry.matching_rule("caseIgnoreMatch").is_none());
    }

    #[tokio::test]
    async fn test_retention_candidates_union() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..3 {
            std::fs::write(dir.path().join(format!("access.{}", i)), vec![0u8; 10]).unwrap();
        }

        let registry = ServerRegistry::new();
        for (name, limit) in [("a", 5), ("b", 15)] {
            let mut policy = SizeBasedRetentionPolicy::new();
            policy
                .initialize(
                    &RetentionPolicyCfg::new(dn(name), SizeBasedRetentionPolicy::CLASS_NAME)
                        .with_limit(RetentionLimit::DiskSpaceUsed(limit)),
                )
                .await
                .unwrap();
            registry.retention_policies().register(dn(name), Arc::new(policy));
        }

        let naming = DirectoryNamingPolicy::new(dir.path(), "access");
        let candidates = registry.retention_candidates(&naming).unwrap();
        assert_eq!(candidates.len(), 3);

        let mut sorted = candidates.clone();
        sorted.sort();
        assert_eq!(candidates, sorted);
    }
}
