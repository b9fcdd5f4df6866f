//! Component Configuration - 컴포넌트별 설정 스냅샷
//!
//! 설정 저장소가 제공하는 불변 뷰입니다. 라이프사이클 매니저는 스냅샷을
//! 읽기만 하고, 변경은 저장소가 새 스냅샷으로 교체하는 방식으로 전달됩니다.

use dirsrv_foundation::{Dn, SyntaxEnforcementPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// ComponentCfg - 공통 설정 트레이트
// ============================================================================

/// 모든 컴포넌트 설정 스냅샷이 구현하는 트레이트
pub trait ComponentCfg: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// 설정 엔트리 식별자
    fn dn(&self) -> &Dn;

    /// 활성화 여부
    fn is_enabled(&self) -> bool;

    /// 구현 타입 이름
    fn class_name(&self) -> &str;
}

fn default_enabled() -> bool {
    true
}

macro_rules! impl_component_cfg {
    ($ty:ty) => {
        impl ComponentCfg for $ty {
            fn dn(&self) -> &Dn {
                &self.dn
            }

            fn is_enabled(&self) -> bool {
                self.enabled
            }

            fn class_name(&self) -> &str {
                &self.class_name
            }
        }
    };
}

// ============================================================================
// AlertHandlerCfg
// ============================================================================

/// Alert handler 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertHandlerCfg {
    pub dn: Dn,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    pub class_name: String,

    /// 허용할 알림 타입 (비어 있으면 전부)
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub enabled_alert_types: BTreeSet<String>,

    /// 제외할 알림 타입
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub disabled_alert_types: BTreeSet<String>,

    /// 파일 기반 핸들러의 출력 경로
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl AlertHandlerCfg {
    pub fn new(dn: Dn, class_name: impl Into<String>) -> Self {
        Self {
            dn,
            enabled: true,
            class_name: class_name.into(),
            enabled_alert_types: BTreeSet::new(),
            disabled_alert_types: BTreeSet::new(),
            log_file: None,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn with_enabled_alert_type(mut self, alert_type: impl Into<String>) -> Self {
        self.enabled_alert_types.insert(alert_type.into());
        self
    }

    pub fn with_disabled_alert_type(mut self, alert_type: impl Into<String>) -> Self {
        self.disabled_alert_types.insert(alert_type.into());
        self
    }
}

impl_component_cfg!(AlertHandlerCfg);

// ============================================================================
// RetentionPolicyCfg
// ============================================================================

/// 보존 한도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionLimit {
    /// 로그 파일 전체 크기 상한 (bytes)
    DiskSpaceUsed(u64),
    /// 보존할 파일 개수
    NumberOfFiles(u32),
    /// 남겨둘 최소 여유 공간 (bytes)
    FreeDiskSpace(u64),
}

impl fmt::Display for RetentionLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiskSpaceUsed(bytes) => write!(f, "disk-space-used={}", bytes),
            Self::NumberOfFiles(count) => write!(f, "number-of-files={}", count),
            Self::FreeDiskSpace(bytes) => write!(f, "free-disk-space={}", bytes),
        }
    }
}

/// Log retention policy 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicyCfg {
    pub dn: Dn,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    pub class_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<RetentionLimit>,
}

impl RetentionPolicyCfg {
    pub fn new(dn: Dn, class_name: impl Into<String>) -> Self {
        Self {
            dn,
            enabled: true,
            class_name: class_name.into(),
            limit: None,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_limit(mut self, limit: RetentionLimit) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn disk_space_used(&self) -> Option<u64> {
        match self.limit {
            Some(RetentionLimit::DiskSpaceUsed(bytes)) => Some(bytes),
            _ => None,
        }
    }

    pub fn number_of_files(&self) -> Option<u32> {
        match self.limit {
            Some(RetentionLimit::NumberOfFiles(count)) => Some(count),
            _ => None,
        }
    }
}

impl_component_cfg!(RetentionPolicyCfg);

// ============================================================================
// MatchingRuleCfg
// ============================================================================

/// Matching rule 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingRuleCfg {
    pub dn: Dn,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    pub class_name: String,

    /// 서버 기본값 대신 사용할 구문 검사 정책
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax_enforcement: Option<SyntaxEnforcementPolicy>,
}

impl MatchingRuleCfg {
    pub fn new(dn: Dn, class_name: impl Into<String>) -> Self {
        Self {
            dn,
            enabled: true,
            class_name: class_name.into(),
            syntax_enforcement: None,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_syntax_enforcement(mut self, policy: SyntaxEnforcementPolicy) -> Self {
        self.syntax_enforcement = Some(policy);
        self
    }
}

impl_component_cfg!(MatchingRuleCfg);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_limit_toml() {
        let cfg: RetentionPolicyCfg = toml::from_str(
            r#"
            dn = "cn=Size Limit,cn=Retention Policies,cn=config"
            class_name = "SizeBasedRetentionPolicy"
            limit = { disk_space_used = 104857600 }
            "#,
        )
        .unwrap();

        assert!(cfg.is_enabled());
        assert_eq!(cfg.disk_space_used(), Some(104_857_600));
        assert_eq!(cfg.number_of_files(), None);
    }

    #[test]
    fn test_alert_handler_defaults() {
        let cfg: AlertHandlerCfg = toml::from_str(
            r#"
            dn = "cn=Log,cn=Alert Handlers,cn=config"
            class_name = "LogAlertHandler"
            enabled = false
            "#,
        )
        .unwrap();

        assert!(!cfg.is_enabled());
        assert!(cfg.enabled_alert_types.is_empty());
        assert!(cfg.log_file.is_none());
    }
}
