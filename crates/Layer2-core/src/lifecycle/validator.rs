//! Acceptance Validator - 설치 없는 설정 검사
//!
//! 저장소의 pre-commit 질의와 매니저의 설치 직전 검사가 같은 함수를 사용합니다.

use crate::component::Capability;
use crate::config::ComponentCfg;
use crate::loader::ComponentLoader;
use dirsrv_foundation::UnacceptableReasons;
use tracing::debug;

/// dry-run 검사기
pub struct AcceptanceValidator<K: Capability> {
    loader: ComponentLoader<K>,
}

impl<K: Capability> AcceptanceValidator<K> {
    pub fn new(loader: ComponentLoader<K>) -> Self {
        Self { loader }
    }

    /// 설정 검사. 비어 있는 보고서는 수락을 뜻합니다.
    ///
    /// 비활성화된 설정은 항상 수락됩니다.
    pub async fn check_acceptable(&self, config: &K::Config) -> UnacceptableReasons {
        let mut reasons = UnacceptableReasons::new();
        if !config.is_enabled() {
            return reasons;
        }

        if let Err(e) = self.loader.load(config.class_name(), config, false).await {
            debug!("[{}] {} is not acceptable: {}", K::KIND, config.dn(), e);
            reasons.push(e.to_string());
        }
        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{RetentionPolicy, RetentionPolicyCapability, SizeBasedRetentionPolicy};
    use crate::config::{RetentionLimit, RetentionPolicyCfg};
    use crate::loader::{FactoryTable, TypeCatalog};
    use dirsrv_foundation::Dn;
    use std::sync::Arc;

    fn validator() -> AcceptanceValidator<RetentionPolicyCapability> {
        let table = Arc::new(FactoryTable::new(Arc::new(TypeCatalog::new())));
        table.register(SizeBasedRetentionPolicy::CLASS_NAME, || {
            let policy: Box<dyn RetentionPolicy> = Box::new(SizeBasedRetentionPolicy::new());
            Ok(policy)
        });
        AcceptanceValidator::new(ComponentLoader::new(table))
    }

    fn cfg(class_name: &str) -> RetentionPolicyCfg {
        RetentionPolicyCfg::new(Dn::parse("cn=R,cn=Retention Policies,cn=config").unwrap(), class_name)
    }

    #[tokio::test]
    async fn test_disabled_is_always_acceptable() {
        let reasons = validator().check_acceptable(&cfg("Nope").with_enabled(false)).await;
        assert!(reasons.is_acceptable());
    }

    #[tokio::test]
    async fn test_loader_error_becomes_single_reason() {
        let v = validator();

        let reasons = v.check_acceptable(&cfg("Nope")).await;
        assert_eq!(reasons.len(), 1);
        assert!(reasons.joined().contains("Nope"));

        let reasons = v.check_acceptable(&cfg(SizeBasedRetentionPolicy::CLASS_NAME)).await;
        assert_eq!(reasons.len(), 1);

        let ok = cfg(SizeBasedRetentionPolicy::CLASS_NAME).with_limit(RetentionLimit::DiskSpaceUsed(10));
        assert!(v.check_acceptable(&ok).await.is_acceptable());
    }
}
