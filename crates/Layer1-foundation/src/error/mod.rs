//! Error types for dirsrv
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// dirsrv 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 컴포넌트 라이프사이클 관련
    // ========================================================================
    /// 구현 타입 이름을 찾을 수 없거나 요구되는 capability를 구현하지 않음
    #[error("Unable to load component type '{class_name}' as {capability}: {reason}")]
    Resolution {
        class_name: String,
        capability: String,
        reason: String,
    },

    /// 구현 타입의 생성자가 실패함
    #[error("Unable to instantiate component type '{class_name}' as {capability}: {message}")]
    Instantiation {
        class_name: String,
        capability: String,
        message: String,
    },

    /// 초기화 진입점이 실패함 (원인 보존)
    #[error(
        "An error occurred while trying to initialize an instance of '{class_name}' as {capability} \
         defined in configuration entry {dn}: {source}"
    )]
    Initialization {
        class_name: String,
        capability: String,
        dn: String,
        #[source]
        source: Box<Error>,
    },

    /// 컴포넌트 자체 검사가 설정을 거부함
    #[error(
        "The configuration for the {capability} defined in configuration entry {dn} was not acceptable: {}",
        .reasons.join(".  ")
    )]
    UnacceptableConfiguration {
        capability: String,
        dn: String,
        reasons: Vec<String>,
    },

    /// finalize 훅 실패 (로그만 남기고 전파하지 않음)
    #[error("Finalization of {capability} {dn} failed: {message}")]
    Finalization {
        capability: String,
        dn: String,
        message: String,
    },

    // ========================================================================
    // 스키마 관련
    // ========================================================================
    #[error("Invalid attribute syntax: {0}")]
    InvalidAttributeSyntax(String),

    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid DN: {0}")]
    InvalidDn(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 로더/검증 단계에서 발생하는 라이프사이클 에러인지 확인
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(
            self,
            Error::Resolution { .. }
                | Error::Instantiation { .. }
                | Error::Initialization { .. }
                | Error::UnacceptableConfiguration { .. }
        )
    }

    /// 관리자에게 그대로 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::UnacceptableConfiguration { .. }
                | Error::Resolution { .. }
                | Error::InvalidDn(_)
                | Error::NotFound(_)
                | Error::InvalidInput(_)
                | Error::InvalidAttributeSyntax(_)
        )
    }

    /// 거부 사유 목록 (UnacceptableConfiguration 인 경우)
    pub fn reasons(&self) -> Option<&[String]> {
        match self {
            Error::UnacceptableConfiguration { reasons, .. } => Some(reasons),
            _ => None,
        }
    }

    /// Resolution 에러 생성 헬퍼
    pub fn resolution(
        class_name: impl Into<String>,
        capability: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::Resolution {
            class_name: class_name.into(),
            capability: capability.into(),
            reason: reason.into(),
        }
    }

    /// Instantiation 에러 생성 헬퍼
    pub fn instantiation(
        class_name: impl Into<String>,
        capability: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Instantiation {
            class_name: class_name.into(),
            capability: capability.into(),
            message: message.into(),
        }
    }

    /// Initialization 에러 생성 헬퍼
    pub fn initialization(
        class_name: impl Into<String>,
        capability: impl Into<String>,
        dn: impl Into<String>,
        source: Error,
    ) -> Self {
        Error::Initialization {
            class_name: class_name.into(),
            capability: capability.into(),
            dn: dn.into(),
            source: Box::new(source),
        }
    }

    /// UnacceptableConfiguration 에러 생성 헬퍼
    pub fn unacceptable(
        capability: impl Into<String>,
        dn: impl Into<String>,
        reasons: Vec<String>,
    ) -> Self {
        Error::UnacceptableConfiguration {
            capability: capability.into(),
            dn: dn.into(),
            reasons,
        }
    }

    /// Finalization 에러 생성 헬퍼
    pub fn finalization(
        capability: impl Into<String>,
        dn: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Finalization {
            capability: capability.into(),
            dn: dn.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
