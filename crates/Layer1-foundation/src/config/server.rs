//! Server Settings - 서버 전역 설정
//!
//! 컴포넌트 라이프사이클과 스키마 처리에 영향을 주는 설정을 TOML 파일에서 읽습니다.
//!
//! ## 검색 우선순위
//!
//! 1. User-level: `~/.dirsrv/server.toml`
//! 2. Instance-level: `<instance>/config/server.toml`
//! 3. Local override: `<instance>/config/server.local.toml`
//!
//! 각 레벨의 설정이 이전 레벨을 오버라이드합니다.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 설정 폴더 이름
pub const CONFIG_DIR_NAME: &str = ".dirsrv";

/// 설정 파일명
pub const SERVER_SETTINGS_FILE: &str = "server.toml";

/// 로컬 오버라이드 파일명
pub const SERVER_LOCAL_SETTINGS_FILE: &str = "server.local.toml";

// ============================================================================
// SyntaxEnforcementPolicy
// ============================================================================

/// 잘못된 속성 값 구문을 만났을 때의 처리 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxEnforcementPolicy {
    /// 에러로 거부
    #[default]
    Reject,
    /// 경고 로그 후 허용
    Warn,
    /// 조용히 허용
    Accept,
}

impl fmt::Display for SyntaxEnforcementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Warn => write!(f, "warn"),
            Self::Accept => write!(f, "accept"),
        }
    }
}

// ============================================================================
// ServerSettings
// ============================================================================

/// 라이프사이클 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleSettings {
    /// 시작 시 한 컴포넌트가 실패해도 나머지를 계속 처리
    pub continue_on_error: bool,

    /// 라이프사이클 이벤트 히스토리 크기
    pub event_history: usize,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            event_history: 256,
        }
    }
}

/// 스키마 설정
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSettings {
    /// 기본 구문 검사 정책
    pub syntax_enforcement: SyntaxEnforcementPolicy,
}

/// 서버 전역 설정
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub lifecycle: LifecycleSettings,
    pub schema: SchemaSettings,
}

/// 파일 단위 부분 설정 (병합용)
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsOverlay {
    lifecycle: LifecycleOverlay,
    schema: SchemaOverlay,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LifecycleOverlay {
    continue_on_error: Option<bool>,
    event_history: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SchemaOverlay {
    syntax_enforcement: Option<SyntaxEnforcementPolicy>,
}

impl ServerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// TOML 문자열에서 로드 (누락된 값은 기본값)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut settings = Self::default();
        settings.apply(toml::from_str(content)?);
        Ok(settings)
    }

    /// 파일에서 로드. 파일이 없으면 기본값.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Settings file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&content)?;
        info!("Loaded server settings from: {}", path.display());
        Ok(settings)
    }

    /// 표준 위치를 모두 검색하여 우선순위 순으로 병합
    pub fn discover(instance_dir: &Path) -> Result<Self> {
        let mut settings = Self::default();

        for path in Self::search_paths(instance_dir) {
            if !path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            settings.apply(toml::from_str(&content)?);
            info!("Loaded server settings from: {}", path.display());
        }

        Ok(settings)
    }

    /// 검색 경로 (낮은 우선순위부터)
    pub fn search_paths(instance_dir: &Path) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(CONFIG_DIR_NAME).join(SERVER_SETTINGS_FILE));
        }
        paths.push(instance_dir.join("config").join(SERVER_SETTINGS_FILE));
        paths.push(instance_dir.join("config").join(SERVER_LOCAL_SETTINGS_FILE));

        paths
    }

    // ========================================================================
    // Merge
    // ========================================================================

    fn apply(&mut self, overlay: SettingsOverlay) {
        if let Some(v) = overlay.lifecycle.continue_on_error {
            self.lifecycle.continue_on_error = v;
        }
        if let Some(v) = overlay.lifecycle.event_history {
            self.lifecycle.event_history = v;
        }
        if let Some(v) = overlay.schema.syntax_enforcement {
            self.schema.syntax_enforcement = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let settings = ServerSettings::default();
        assert!(settings.lifecycle.continue_on_error);
        assert_eq!(settings.schema.syntax_enforcement, SyntaxEnforcementPolicy::Reject);
    }

    #[test]
    fn test_partial_toml() {
        let settings = ServerSettings::from_toml_str("[schema]\nsyntax_enforcement = \"warn\"\n").unwrap();
        assert_eq!(settings.schema.syntax_enforcement, SyntaxEnforcementPolicy::Warn);
        assert_eq!(settings.lifecycle, LifecycleSettings::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ServerSettings::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(settings, ServerSettings::default());
    }

    #[test]
    fn test_discover_merges_local_over_instance() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join("config");
        fs::create_dir_all(&config_dir).unwrap();

        fs::write(
            config_dir.join(SERVER_SETTINGS_FILE),
            "[lifecycle]\ncontinue_on_error = false\nevent_history = 10\n",
        )
        .unwrap();
        fs::write(config_dir.join(SERVER_LOCAL_SETTINGS_FILE), "[lifecycle]\nevent_history = 42\n").unwrap();

        let settings = ServerSettings::discover(dir.path()).unwrap();
        assert!(!settings.lifecycle.continue_on_error);
        assert_eq!(settings.lifecycle.event_history, 42);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(ServerSettings::from_toml_str("[lifecycle\n").is_err());
    }
}
