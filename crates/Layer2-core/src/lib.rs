//! dirsrv-core: Component Runtime for dirsrv
//!
//! Layer2 - 설정 기반 플러그형 컴포넌트 런타임
//!
//! # 주요 모듈
//!
//! - `config`: 컴포넌트 설정 스냅샷, 설정 저장소, 설정 트리
//! - `component`: capability 계약 (alert handler, retention policy, matching rule) 과 내장 구현
//! - `loader`: 타입 이름 → 생성자 factory table 과 컴포넌트 로더
//! - `lifecycle`: dry-run 검사, 라이프사이클 매니저, 이벤트 버스
//! - `registry`: 서버 레지스트리 (lock-free 활성 인스턴스 스냅샷)
//! - `host`: 위 구성요소의 조립
//!
//! # 사용 예시
//!
//! ```ignore
//! use dirsrv_core::{ComponentHost, ConfigStores, ConfigTree};
//!
//! let host = ComponentHost::with_builtins(settings);
//! let stores = ConfigStores::from_tree(&ConfigTree::load(path)?);
//! host.initialize_all(&stores).await?;
//!
//! // 서버의 다른 부분은 레지스트리 스냅샷만 읽음
//! host.registry().send_alert("backend", "disk-full", "99% used");
//!
//! // 설정 변경은 저장소를 통해
//! stores.alert_handlers.modify_entry(changed).await?;
//! ```

pub mod component;
pub mod config;
pub mod host;
pub mod lifecycle;
pub mod loader;
pub mod registry;

// Re-exports: Component
pub use component::{
    register_builtins,
    // Alert handlers
    AlertHandler,
    AlertHandlerCapability,
    AlertNotification,
    AlertTypeFilter,
    BitStringEqualityMatchingRule,
    // Traits
    Capability,
    CapabilityKind,
    CaseIgnoreEqualityMatchingRule,
    DirectoryNamingPolicy,
    FileNamingPolicy,
    FileNumberRetentionPolicy,
    JsonFileAlertHandler,
    LogAlertHandler,
    ManagedComponent,
    // Matching rules
    MatchingRule,
    MatchingRuleCapability,
    // Retention policies
    RetentionPolicy,
    RetentionPolicyCapability,
    SizeBasedRetentionPolicy,
};

// Re-exports: Config
pub use config::{
    AlertHandlerCfg, ComponentCfg, ConfigTree, ConfigurationListener, ConfigurationStore, EntryDiff,
    InMemoryConfigStore, MatchingRuleCfg, RetentionLimit, RetentionPolicyCfg, Subscription, SubscriptionId,
    TreeDiff,
};

// Re-exports: Loader
pub use loader::{ComponentLoader, Constructor, FactoryTable, TypeCatalog};

// Re-exports: Lifecycle
pub use lifecycle::{
    AcceptanceValidator, ComponentState, LifecycleEvent, LifecycleEventBus, LifecycleEventHandler,
    LifecycleEventKind, LifecycleManager, LifecycleManagerConfig, StartupReport,
};

// Re-exports: Registry
pub use registry::{ActiveEntry, ActiveSet, ServerRegistry};

// Re-exports: Host
pub use host::{ChangeOperation, ChangeOutcome, ComponentHost, ConfigStores, EntryCheck};
