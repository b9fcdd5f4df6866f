//! Config - 컴포넌트 설정과 설정 저장소
//!
//! - `cfg.rs` - capability별 설정 스냅샷 (AlertHandlerCfg, RetentionPolicyCfg, MatchingRuleCfg)
//! - `store.rs` - 저장소 계약 (ConfigurationStore, ConfigurationListener, Subscription)
//! - `memory.rs` - 메모리 참조 저장소 (InMemoryConfigStore)
//! - `tree.rs` - 설정 트리 TOML 파일 (ConfigTree, TreeDiff)

pub mod cfg;
pub mod memory;
pub mod store;
pub mod tree;

pub use cfg::{AlertHandlerCfg, ComponentCfg, MatchingRuleCfg, RetentionLimit, RetentionPolicyCfg};
pub use memory::InMemoryConfigStore;
pub use store::{ConfigurationListener, ConfigurationStore, Subscription, SubscriptionId};
pub use tree::{ConfigTree, EntryDiff, TreeDiff};
