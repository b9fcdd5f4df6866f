//! Alert Handlers - 관리자 알림 전달
//!
//! 서버의 다른 부분이 `ServerRegistry::send_alert` 로 알림을 보내면
//! 활성화된 모든 alert handler 중 알림 타입 필터를 통과하는 것들이 받습니다.

use super::traits::{Capability, CapabilityKind, ManagedComponent};
use crate::config::AlertHandlerCfg;
use crate::registry::{ActiveSet, ServerRegistry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dirsrv_foundation::{Error, Result, UnacceptableReasons};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

// ============================================================================
// AlertNotification
// ============================================================================

/// 관리자 알림
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertNotification {
    pub id: Uuid,

    /// 알림을 발생시킨 컴포넌트 이름
    pub generator: String,

    /// 알림 타입 (예: `org.opends.server.DirectoryServerShutdown`)
    pub alert_type: String,

    pub message: String,

    pub timestamp: DateTime<Utc>,
}

impl AlertNotification {
    pub fn new(generator: impl Into<String>, alert_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            generator: generator.into(),
            alert_type: alert_type.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// AlertTypeFilter
// ============================================================================

/// 알림 타입 필터
///
/// disabled 목록에 있으면 거부, enabled 목록이 비어 있으면 나머지 전부 허용.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertTypeFilter {
    enabled: BTreeSet<String>,
    disabled: BTreeSet<String>,
}

impl AlertTypeFilter {
    pub fn from_config(config: &AlertHandlerCfg) -> Self {
        Self {
            enabled: config.enabled_alert_types.clone(),
            disabled: config.disabled_alert_types.clone(),
        }
    }

    pub fn admits(&self, alert_type: &str) -> bool {
        if self.disabled.contains(alert_type) {
            return false;
        }
        self.enabled.is_empty() || self.enabled.contains(alert_type)
    }
}

// ============================================================================
// AlertHandler - capability 계약
// ============================================================================

/// Alert handler capability
pub trait AlertHandler: ManagedComponent<AlertHandlerCfg> {
    /// 초기화 시 설정된 알림 타입 필터
    fn alert_filter(&self) -> &AlertTypeFilter;

    /// 알림 전달
    fn send_alert(&self, notification: &AlertNotification) -> Result<()>;
}

/// Alert handler capability descriptor
pub struct AlertHandlerCapability;

impl Capability for AlertHandlerCapability {
    type Config = AlertHandlerCfg;
    type Instance = dyn AlertHandler;

    const KIND: CapabilityKind = CapabilityKind::AlertHandler;

    fn active_set(registry: &ServerRegistry) -> &ActiveSet<dyn AlertHandler> {
        registry.alert_handlers()
    }
}

// ============================================================================
// LogAlertHandler
// ============================================================================

/// 알림을 서버 로그 (`tracing`) 로 남기는 핸들러
#[derive(Debug, Default)]
pub struct LogAlertHandler {
    filter: AlertTypeFilter,
}

impl LogAlertHandler {
    pub const CLASS_NAME: &'static str = "LogAlertHandler";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManagedComponent<AlertHandlerCfg> for LogAlertHandler {
    fn class_name(&self) -> &str {
        Self::CLASS_NAME
    }

    async fn initialize(&mut self, config: &AlertHandlerCfg) -> Result<()> {
        self.filter = AlertTypeFilter::from_config(config);
        Ok(())
    }

    fn is_configuration_acceptable(&self, _config: &AlertHandlerCfg, _reasons: &mut UnacceptableReasons) -> bool {
        true
    }
}

impl AlertHandler for LogAlertHandler {
    fn alert_filter(&self) -> &AlertTypeFilter {
        &self.filter
    }

    fn send_alert(&self, notification: &AlertNotification) -> Result<()> {
        warn!(
            target: "dirsrv::alert",
            generator = %notification.generator,
            alert_type = %notification.alert_type,
            "{}",
            notification.message
        );
        Ok(())
    }
}

// ============================================================================
// JsonFileAlertHandler
// ============================================================================

/// 알림을 JSON lines 로 파일에 덧붙이는 핸들러
#[derive(Debug, Default)]
pub struct JsonFileAlertHandler {
    filter: AlertTypeFilter,
    path: Option<PathBuf>,
    file: Mutex<Option<File>>,
}

impl JsonFileAlertHandler {
    pub const CLASS_NAME: &'static str = "JsonFileAlertHandler";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

#[async_trait]
impl ManagedComponent<AlertHandlerCfg> for JsonFileAlertHandler {
    fn class_name(&self) -> &str {
        Self::CLASS_NAME
    }

    async fn initialize(&mut self, config: &AlertHandlerCfg) -> Result<()> {
        let path = config
            .log_file
            .clone()
            .ok_or_else(|| Error::Config(format!("{} requires a log_file", Self::CLASS_NAME)))?;

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?
            .into_std()
            .await;

        debug!("Opened alert log {}", path.display());
        self.filter = AlertTypeFilter::from_config(config);
        self.path = Some(path);
        *self.file.lock() = Some(file);
        Ok(())
    }

    fn is_configuration_acceptable(&self, config: &AlertHandlerCfg, reasons: &mut UnacceptableReasons) -> bool {
        let Some(path) = &config.log_file else {
            reasons.push(format!("The alert handler defined in {} does not specify a log_file", config.dn));
            return false;
        };

        if path.is_dir() {
            reasons.push(format!("The alert log file {} is a directory", path.display()));
            return false;
        }

        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
                reasons.push(format!(
                    "The parent directory {} of alert log file {} does not exist",
                    parent.display(),
                    path.display()
                ));
                false
            }
            _ => true,
        }
    }

    async fn finalize(&self) -> Result<()> {
        if let Some(mut file) = self.file.lock().take() {
            file.flush()?;
        }
        Ok(())
    }
}

impl AlertHandler for JsonFileAlertHandler {
    fn alert_filter(&self) -> &AlertTypeFilter {
        &self.filter
    }

    fn send_alert(&self, notification: &AlertNotification) -> Result<()> {
        let mut line = serde_json::to_string(notification)?;
        line.push('\n');

        let mut guard = self.file.lock();
        let file = guard
            .as_mut()
            .ok_or_else(|| Error::Internal(format!("{} is not open", Self::CLASS_NAME)))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
