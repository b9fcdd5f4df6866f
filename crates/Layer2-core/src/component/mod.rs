//! Component - capability 계약과 내장 구현
//!
//! ## 구조
//!
//! ```text
//! ManagedComponent<C>          (initialize / is_configuration_acceptable / finalize)
//! ├── AlertHandler             LogAlertHandler, JsonFileAlertHandler
//! ├── RetentionPolicy          SizeBasedRetentionPolicy, FileNumberRetentionPolicy
//! └── MatchingRule             BitStringEqualityMatchingRule, CaseIgnoreEqualityMatchingRule
//! ```

pub mod alert;
pub mod builtin;
pub mod matching;
pub mod retention;
pub mod traits;

pub use alert::{
    AlertHandler, AlertHandlerCapability, AlertNotification, AlertTypeFilter, JsonFileAlertHandler,
    LogAlertHandler,
};
pub use builtin::register_builtins;
pub use matching::{
    BitStringEqualityMatchingRule, CaseIgnoreEqualityMatchingRule, MatchingRule, MatchingRuleCapability,
};
pub use retention::{
    remove_files, DirectoryNamingPolicy, FileNamingPolicy, FileNumberRetentionPolicy, RetentionPolicy,
    RetentionPolicyCapability, SizeBasedRetentionPolicy,
};
pub use traits::{Capability, CapabilityKind, ManagedComponent};
