//! Component State - 식별자별 라이프사이클 상태

use serde::{Deserialize, Serialize};
use std::fmt;

/// 설정 엔트리 하나의 상태
///
/// ```text
///            add(enabled)            change(disabled)
///  Absent ───────────────▶ Active ─────────────────▶ Disabled
///    │  ▲                   │  ▲                        │
///    │  └──── delete ───────┘  └──── change(enabled) ───┘
///    │ add(invalid)
///    ▼
///  Failed ── change(enabled, valid) ──▶ Active
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "error")]
pub enum ComponentState {
    /// 알려지지 않음 (추가 전이거나 삭제됨)
    Absent,
    /// 설정은 있으나 비활성화됨
    Disabled,
    /// 인스턴스가 초기화되어 서버 레지스트리에 게시됨
    Active,
    /// 마지막 설치 시도가 실패함
    Failed(String),
}

impl ComponentState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl Default for ComponentState {
    fn default() -> Self {
        Self::Absent
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Disabled => write!(f, "disabled"),
            Self::Active => write!(f, "active"),
            Self::Failed(error) => write!(f, "failed: {}", error),
        }
    }
}
