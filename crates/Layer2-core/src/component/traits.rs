//! Component Traits - 관리 대상 컴포넌트 계약
//!
//! 모든 pluggable 컴포넌트는 `ManagedComponent` 를 구현하고, capability별
//! 트레이트 (AlertHandler, RetentionPolicy, MatchingRule) 가 이를 확장합니다.
//!
//! `Capability` 는 타입 레벨 descriptor 로, 라이프사이클 매니저와 로더가
//! capability에 대해 제네릭하게 동작할 수 있게 합니다.

use crate::config::ComponentCfg;
use crate::registry::{ActiveSet, ServerRegistry};
use async_trait::async_trait;
use dirsrv_foundation::{Result, UnacceptableReasons};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CapabilityKind - capability 종류 (닫힌 집합)
// ============================================================================

/// capability 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    AlertHandler,
    RetentionPolicy,
    MatchingRule,
}

impl CapabilityKind {
    /// 사람이 읽는 이름 (메시지용)
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::AlertHandler => "alert handler",
            Self::RetentionPolicy => "retention policy",
            Self::MatchingRule => "matching rule",
        }
    }

    pub fn all() -> [CapabilityKind; 3] {
        [Self::AlertHandler, Self::RetentionPolicy, Self::MatchingRule]
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// ManagedComponent - 공통 라이프사이클 계약
// ============================================================================

/// 라이프사이클 매니저가 관리하는 컴포넌트
#[async_trait]
pub trait ManagedComponent<C: ComponentCfg>: Send + Sync {
    /// 구현 타입 이름
    fn class_name(&self) -> &str;

    /// 설정으로 1회 초기화. 성공해야만 서버에 노출됩니다.
    async fn initialize(&mut self, config: &C) -> Result<()>;

    /// 설치 없이 설정을 검사. 거부하면 `reasons` 에 사유를 남기고 `false`.
    fn is_configuration_acceptable(&self, config: &C, reasons: &mut UnacceptableReasons) -> bool;

    /// 자원 해제. 실패는 로그로만 남습니다.
    async fn finalize(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Capability - 타입 레벨 descriptor
// ============================================================================

/// capability descriptor
///
/// ```ignore
/// let manager: LifecycleManager<AlertHandlerCapability> = ...;
/// ```
pub trait Capability: Send + Sync + 'static {
    /// 설정 스냅샷 타입
    type Config: ComponentCfg;

    /// 인스턴스 트레이트 객체 타입 (예: `dyn AlertHandler`)
    type Instance: ?Sized + ManagedComponent<Self::Config> + 'static;

    /// capability 종류
    const KIND: CapabilityKind;

    /// 서버 레지스트리에서 이 capability의 활성 집합
    fn active_set(registry: &ServerRegistry) -> &ActiveSet<Self::Instance>;
}
