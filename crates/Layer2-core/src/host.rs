//! Component Host - 서버 프로세스의 컴포넌트 런타임 조립
//!
//! ```text
//! ComponentHost
//! ├── TypeCatalog (공유)
//! ├── FactoryTable × 3  ─┐
//! ├── LifecycleManager × 3 ──► ServerRegistry (활성 인스턴스)
//! └── LifecycleEventBus ─┘
//! ```
//!
//! `ConfigStores` 는 capability별 저장소 묶음이며 `ConfigTree` 와 상호 변환됩니다.

use crate::component::{
    AlertHandlerCapability, Capability, CapabilityKind, MatchingRuleCapability, RetentionPolicyCapability,
};
use crate::config::{
    AlertHandlerCfg, ComponentCfg, ConfigTree, EntryDiff, InMemoryConfigStore, MatchingRuleCfg, RetentionPolicyCfg,
    TreeDiff,
};
use crate::lifecycle::{LifecycleEventBus, LifecycleManager, LifecycleManagerConfig, StartupReport};
use crate::loader::{FactoryTable, TypeCatalog};
use crate::registry::ServerRegistry;
use dirsrv_foundation::{ConfigChangeResult, Dn, Result, ServerSettings, UnacceptableReasons};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// ConfigStores
// ============================================================================

/// capability별 설정 저장소
pub struct ConfigStores {
    pub alert_handlers: Arc<InMemoryConfigStore<AlertHandlerCfg>>,
    pub retention_policies: Arc<InMemoryConfigStore<RetentionPolicyCfg>>,
    pub matching_rules: Arc<InMemoryConfigStore<MatchingRuleCfg>>,
}

/// 트리 변경 연산 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOperation {
    Add,
    Modify,
    Delete,
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Modify => write!(f, "modify"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// 변경 하나의 결과. 저장소가 거부하면 `Err` 에 사유가 담깁니다.
#[derive(Debug, Clone)]
pub struct ChangeOutcome {
    pub capability: CapabilityKind,
    pub operation: ChangeOperation,
    pub dn: Dn,
    pub result: std::result::Result<Vec<ConfigChangeResult>, String>,
}

impl ChangeOutcome {
    /// 저장소가 수락했고 모든 리스너가 성공했는지
    pub fn is_success(&self) -> bool {
        matches!(&self.result, Ok(results) if results.iter().all(ConfigChangeResult::is_success))
    }

    pub fn admin_action_required(&self) -> bool {
        matches!(&self.result, Ok(results) if results.iter().any(|r| r.admin_action_required))
    }
}

impl ConfigStores {
    pub fn new() -> Self {
        Self::from_tree(&ConfigTree::default())
    }

    /// 트리로 저장소 채우기
    pub fn from_tree(tree: &ConfigTree) -> Self {
        Self {
            alert_handlers: Arc::new(InMemoryConfigStore::with_entries(
                "alert handler",
                tree.alert_handlers.iter().cloned(),
            )),
            retention_policies: Arc::new(InMemoryConfigStore::with_entries(
                "retention policy",
                tree.retention_policies.iter().cloned(),
            )),
            matching_rules: Arc::new(InMemoryConfigStore::with_entries(
                "matching rule",
                tree.matching_rules.iter().cloned(),
            )),
        }
    }

    /// 현재 저장소 내용을 트리로
    pub fn snapshot(&self) -> ConfigTree {
        ConfigTree {
            alert_handlers: self.alert_handlers.entries(),
            retention_policies: self.retention_policies.entries(),
            matching_rules: self.matching_rules.entries(),
        }
    }

    /// 변경 집합 적용 (capability별로 delete → modify → add 순서)
    pub async fn apply_diff(&self, diff: &TreeDiff) -> Vec<ChangeOutcome> {
        let mut outcomes = Vec::with_capacity(diff.len());
        outcomes.extend(apply_entry_diff::<AlertHandlerCapability>(&self.alert_handlers, &diff.alert_handlers).await);
        outcomes.extend(
            apply_entry_diff::<RetentionPolicyCapability>(&self.retention_policies, &diff.retention_policies).await,
        );
        outcomes.extend(apply_entry_diff::<MatchingRuleCapability>(&self.matching_rules, &diff.matching_rules).await);
        outcomes
    }
}

impl Default for ConfigStores {
    fn default() -> Self {
        Self::new()
    }
}

async fn apply_entry_diff<K: Capability>(
    store: &InMemoryConfigStore<K::Config>,
    diff: &EntryDiff<K::Config>,
) -> Vec<ChangeOutcome> {
    let outcome = |operation, dn: &Dn, result: Result<Vec<ConfigChangeResult>>| ChangeOutcome {
        capability: K::KIND,
        operation,
        dn: dn.clone(),
        result: result.map_err(|e| e.to_string()),
    };

    let mut outcomes = Vec::with_capacity(diff.len());
    for dn in &diff.deleted {
        outcomes.push(outcome(ChangeOperation::Delete, dn, store.delete_entry(dn).await));
    }
    for config in &diff.modified {
        let result = store.modify_entry(config.clone()).await;
        outcomes.push(outcome(ChangeOperation::Modify, config.dn(), result));
    }
    for config in &diff.added {
        let result = store.add_entry(config.clone()).await;
        outcomes.push(outcome(ChangeOperation::Add, config.dn(), result));
    }
    outcomes
}

// ============================================================================
// EntryCheck
// ============================================================================

/// 트리 엔트리 하나의 dry-run 검사 결과
#[derive(Debug, Clone)]
pub struct EntryCheck {
    pub capability: CapabilityKind,
    pub dn: Dn,
    pub class_name: String,
    pub enabled: bool,
    pub reasons: UnacceptableReasons,
}

impl EntryCheck {
    pub fn is_acceptable(&self) -> bool {
        self.reasons.is_acceptable()
    }
}

// ============================================================================
// ComponentHost
// ============================================================================

/// 컴포넌트 런타임
pub struct ComponentHost {
    settings: ServerSettings,
    catalog: Arc<TypeCatalog>,
    registry: Arc<ServerRegistry>,
    events: Arc<LifecycleEventBus>,

    alert_factories: Arc<FactoryTable<AlertHandlerCapability>>,
    retention_factories: Arc<FactoryTable<RetentionPolicyCapability>>,
    matching_factories: Arc<FactoryTable<MatchingRuleCapability>>,

    alert_handlers: Arc<LifecycleManager<AlertHandlerCapability>>,
    retention_policies: Arc<LifecycleManager<RetentionPolicyCapability>>,
    matching_rules: Arc<LifecycleManager<MatchingRuleCapability>>,
}

impl ComponentHost {
    /// 빈 factory table 로 생성
    pub fn new(settings: ServerSettings) -> Self {
        let catalog = Arc::new(TypeCatalog::new());
        let registry = Arc::new(ServerRegistry::new());
        let events = Arc::new(LifecycleEventBus::with_capacity(
            settings.lifecycle.event_history.max(16),
            settings.lifecycle.event_history,
        ));
        let manager_config = LifecycleManagerConfig {
            continue_on_error: settings.lifecycle.continue_on_error,
        };

        let alert_factories = Arc::new(FactoryTable::new(Arc::clone(&catalog)));
        let retention_factories = Arc::new(FactoryTable::new(Arc::clone(&catalog)));
        let matching_factories = Arc::new(FactoryTable::new(Arc::clone(&catalog)));

        let alert_handlers = Arc::new(LifecycleManager::new(
            Arc::clone(&alert_factories),
            Arc::clone(&registry),
            Arc::clone(&events),
            manager_config.clone(),
        ));
        let retention_policies = Arc::new(LifecycleManager::new(
            Arc::clone(&retention_factories),
            Arc::clone(&registry),
            Arc::clone(&events),
            manager_config.clone(),
        ));
        let matching_rules = Arc::new(LifecycleManager::new(
            Arc::clone(&matching_factories),
            Arc::clone(&registry),
            Arc::clone(&events),
            manager_config,
        ));

        Self {
            settings,
            catalog,
            registry,
            events,
            alert_factories,
            retention_factories,
            matching_factories,
            alert_handlers,
            retention_policies,
            matching_rules,
        }
    }

    /// 내장 구현 타입을 등록하여 생성
    pub fn with_builtins(settings: ServerSettings) -> Self {
        let host = Self::new(settings);
        crate::component::register_builtins(&host);
        host
    }

    // ========================================================================
    // 접근자
    // ========================================================================

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<ServerRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &Arc<LifecycleEventBus> {
        &self.events
    }

    pub fn alert_factories(&self) -> &Arc<FactoryTable<AlertHandlerCapability>> {
        &self.alert_factories
    }

    pub fn retention_factories(&self) -> &Arc<FactoryTable<RetentionPolicyCapability>> {
        &self.retention_factories
    }

    pub fn matching_factories(&self) -> &Arc<FactoryTable<MatchingRuleCapability>> {
        &self.matching_factories
    }

    pub fn alert_handlers(&self) -> &Arc<LifecycleManager<AlertHandlerCapability>> {
        &self.alert_handlers
    }

    pub fn retention_policies(&self) -> &Arc<LifecycleManager<RetentionPolicyCapability>> {
        &self.retention_policies
    }

    pub fn matching_rules(&self) -> &Arc<LifecycleManager<MatchingRuleCapability>> {
        &self.matching_rules
    }

    // ========================================================================
    // 시작 / 검사 / 종료
    // ========================================================================

    /// 모든 매니저를 저장소에 연결하고 기존 엔트리 설치
    pub async fn initialize_all(&self, stores: &ConfigStores) -> Result<BTreeMap<CapabilityKind, StartupReport>> {
        let mut reports = BTreeMap::new();
        reports.insert(
            CapabilityKind::AlertHandler,
            self.alert_handlers.initialize_all(stores.alert_handlers.as_ref()).await?,
        );
        reports.insert(
            CapabilityKind::RetentionPolicy,
            self.retention_policies
                .initialize_all(stores.retention_policies.as_ref())
                .await?,
        );
        reports.insert(
            CapabilityKind::MatchingRule,
            self.matching_rules.initialize_all(stores.matching_rules.as_ref()).await?,
        );

        let failed: usize = reports.values().map(|r| r.failed.len()).sum();
        if failed > 0 {
            warn!("Component host started with {} failed component(s)", failed);
        } else {
            info!("Component host started: {:?}", self.registry.active_counts());
        }
        Ok(reports)
    }

    /// 트리의 모든 엔트리를 설치 없이 검사
    pub async fn check_tree(&self, tree: &ConfigTree) -> Vec<EntryCheck> {
        let mut checks = Vec::with_capacity(tree.len());
        for config in &tree.alert_handlers {
            checks.push(entry_check(&self.alert_handlers, config).await);
        }
        for config in &tree.retention_policies {
            checks.push(entry_check(&self.retention_policies, config).await);
        }
        for config in &tree.matching_rules {
            checks.push(entry_check(&self.matching_rules, config).await);
        }
        checks
    }

    /// 운영자 재시작
    pub async fn restart(&self, kind: CapabilityKind, dn: &Dn) -> Result<ConfigChangeResult> {
        match kind {
            CapabilityKind::AlertHandler => self.alert_handlers.restart(dn).await,
            CapabilityKind::RetentionPolicy => self.retention_policies.restart(dn).await,
            CapabilityKind::MatchingRule => self.matching_rules.restart(dn).await,
        }
    }

    /// 재시작 대기 중인 엔트리
    pub fn pending_restarts(&self) -> Vec<(CapabilityKind, Dn)> {
        let mut pending = Vec::new();
        pending.extend(
            self.alert_handlers
                .pending_restarts()
                .into_iter()
                .map(|dn| (CapabilityKind::AlertHandler, dn)),
        );
        pending.extend(
            self.retention_policies
                .pending_restarts()
                .into_iter()
                .map(|dn| (CapabilityKind::RetentionPolicy, dn)),
        );
        pending.extend(
            self.matching_rules
                .pending_restarts()
                .into_iter()
                .map(|dn| (CapabilityKind::MatchingRule, dn)),
        );
        pending
    }

    pub fn is_consistent(&self) -> bool {
        self.alert_handlers.is_consistent()
            && self.retention_policies.is_consistent()
            && self.matching_rules.is_consistent()
    }

    /// 모든 매니저 종료. 내려간 인스턴스 수를 반환.
    pub async fn shutdown(&self) -> usize {
        let (alerts, retention, rules) = futures::join!(
            self.alert_handlers.shutdown(),
            self.retention_policies.shutdown(),
            self.matching_rules.shutdown(),
        );
        let total = alerts + retention + rules;
        info!("Component host shut down ({} component(s))", total);
        total
    }
}

async fn entry_check<K: Capability>(manager: &LifecycleManager<K>, config: &K::Config) -> EntryCheck {
    EntryCheck {
        capability: K::KIND,
        dn: config.dn().clone(),
        class_name: config.class_name().to_string(),
        enabled: config.is_enabled(),
        reasons: manager.check_acceptable(config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{BitStringEqualityMatchingRule, LogAlertHandler, SizeBasedRetentionPolicy};
    use crate::config::RetentionLimit;

    const TREE: &str = r#"
[[alert_handler]]
dn = "cn=Log,cn=Alert Handlers,cn=config"
class_name = "LogAlertHandler"

[[retention_policy]]
dn = "cn=Size,cn=Retention Policies,cn=config"
class_name = "SizeBasedRetentionPolicy"
limit = { disk_space_used = 1048576 }

[[matching_rule]]
dn = "cn=bitStringMatch,cn=Matching Rules,cn=config"
class_name = "BitStringEqualityMatchingRule"
"#;

    #[tokio::test]
    async fn test_initialize_from_tree() {
        let host = ComponentHost::with_builtins(ServerSettings::default());
        let stores = ConfigStores::from_tree(&ConfigTree::from_toml_str(TREE).unwrap());

        let reports = host.initialize_all(&stores).await.unwrap();
        assert!(reports.values().all(StartupReport::is_clean));
        assert_eq!(host.registry().alert_handlers().len(), 1);
        assert!(host.registry().matching_rule("bitStringMatch").is_some());
        assert!(host.is_consistent());

        assert_eq!(host.shutdown().await, 3);
        assert!(host.registry().active_counts().values().all(|n| *n == 0));
    }

    #[tokio::test]
    async fn test_check_tree_reports_unacceptable_entries() {
        let host = ComponentHost::with_builtins(ServerSettings::default());
        let mut tree = ConfigTree::from_toml_str(TREE).unwrap();
        tree.retention_policies.push(RetentionPolicyCfg::new(
            Dn::parse("cn=Broken,cn=Retention Policies,cn=config").unwrap(),
            SizeBasedRetentionPolicy::CLASS_NAME,
        ));
        tree.alert_handlers.push(AlertHandlerCfg::new(
            Dn::parse("cn=Wrong,cn=Alert Handlers,cn=config").unwrap(),
            BitStringEqualityMatchingRule::CLASS_NAME,
        ));

        let checks = host.check_tree(&tree).await;
        let rejected: Vec<&EntryCheck> = checks.iter().filter(|c| !c.is_acceptable()).collect();
        assert_eq!(checks.len(), 5);
        assert_eq!(rejected.len(), 2);
        assert!(rejected.iter().any(|c| c.dn.rdn_value() == "Broken"));
        assert!(rejected.iter().any(|c| c.reasons.joined().contains("matching rule")));
    }

    #[tokio::test]
    async fn test_apply_diff_drives_managers() {
        let host = ComponentHost::with_builtins(ServerSettings::default());
        let current = ConfigTree::from_toml_str(TREE).unwrap();
        let stores = ConfigStores::from_tree(&current);
        host.initialize_all(&stores).await.unwrap();

        let mut target = current.clone();
        target.alert_handlers.clear();
        target.retention_policies[0] = target.retention_policies[0]
            .clone()
            .with_limit(RetentionLimit::DiskSpaceUsed(2048));
        target.alert_handlers.push(AlertHandlerCfg::new(
            Dn::parse("cn=Other,cn=Alert Handlers,cn=config").unwrap(),
            LogAlertHandler::CLASS_NAME,
        ));

        let outcomes = stores.apply_diff(&current.diff(&target)).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(ChangeOutcome::is_success));
        assert!(outcomes
            .iter()
            .any(|o| o.operation == ChangeOperation::Modify && o.admin_action_required()));

        assert_eq!(stores.snapshot().len(), target.len());
        assert_eq!(host.pending_restarts().len(), 1);
        assert_eq!(host.registry().alert_handlers().len(), 1);
        assert!(host.is_consistent());
    }
}
