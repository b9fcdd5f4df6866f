//! Configuration Tree - 컴포넌트 엔트리 TOML 파일
//!
//! ```toml
//! [[alert_handler]]
//! dn = "cn=Log Alert Handler,cn=Alert Handlers,cn=config"
//! class_name = "LogAlertHandler"
//!
//! [[retention_policy]]
//! dn = "cn=Size Limit,cn=Retention Policies,cn=config"
//! class_name = "SizeBasedRetentionPolicy"
//! limit = { disk_space_used = 104857600 }
//!
//! [[matching_rule]]
//! dn = "cn=bitStringMatch,cn=Matching Rules,cn=config"
//! class_name = "BitStringEqualityMatchingRule"
//! ```

use super::cfg::{AlertHandlerCfg, ComponentCfg, MatchingRuleCfg, RetentionPolicyCfg};
use dirsrv_foundation::{Dn, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::info;

/// 설정 트리 문서
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigTree {
    #[serde(default, rename = "alert_handler", skip_serializing_if = "Vec::is_empty")]
    pub alert_handlers: Vec<AlertHandlerCfg>,

    #[serde(default, rename = "retention_policy", skip_serializing_if = "Vec::is_empty")]
    pub retention_policies: Vec<RetentionPolicyCfg>,

    #[serde(default, rename = "matching_rule", skip_serializing_if = "Vec::is_empty")]
    pub matching_rules: Vec<MatchingRuleCfg>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// TOML 문자열에서 파싱 (중복 식별자 검사 포함)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let tree: Self = toml::from_str(content)?;
        tree.validate()?;
        Ok(tree)
    }

    /// 파일에서 로드
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "configuration tree {} does not exist",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let tree = Self::from_toml_str(&content)?;
        info!(
            "Loaded configuration tree from {} ({} entries)",
            path.display(),
            tree.len()
        );
        Ok(tree)
    }

    /// TOML 문자열로 직렬화
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// 파일로 저장
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// 전체 엔트리 수
    pub fn len(&self) -> usize {
        self.alert_handlers.len() + self.retention_policies.len() + self.matching_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn validate(&self) -> Result<()> {
        check_unique("alert_handler", &self.alert_handlers)?;
        check_unique("retention_policy", &self.retention_policies)?;
        check_unique("matching_rule", &self.matching_rules)?;
        Ok(())
    }

    // ========================================================================
    // Diff
    // ========================================================================

    /// `self` 에서 `target` 으로 가기 위한 변경 집합
    pub fn diff(&self, target: &ConfigTree) -> TreeDiff {
        TreeDiff {
            alert_handlers: diff_entries(&self.alert_handlers, &target.alert_handlers),
            retention_policies: diff_entries(&self.retention_policies, &target.retention_policies),
            matching_rules: diff_entries(&self.matching_rules, &target.matching_rules),
        }
    }
}

fn check_unique<C: ComponentCfg>(section: &str, entries: &[C]) -> Result<()> {
    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.dn().clone()) {
            return Err(Error::Config(format!(
                "duplicate [[{}]] entry {}",
                section,
                entry.dn()
            )));
        }
    }
    Ok(())
}

// ============================================================================
// EntryDiff / TreeDiff
// ============================================================================

/// capability 하나에 대한 변경 집합
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDiff<C> {
    pub added: Vec<C>,
    pub modified: Vec<C>,
    pub deleted: Vec<Dn>,
}

impl<C> EntryDiff<C> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }
}

impl<C> Default for EntryDiff<C> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            modified: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

/// 트리 전체 변경 집합
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeDiff {
    pub alert_handlers: EntryDiff<AlertHandlerCfg>,
    pub retention_policies: EntryDiff<RetentionPolicyCfg>,
    pub matching_rules: EntryDiff<MatchingRuleCfg>,
}

impl TreeDiff {
    pub fn is_empty(&self) -> bool {
        self.alert_handlers.is_empty() && self.retention_policies.is_empty() && self.matching_rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.alert_handlers.len() + self.retention_policies.len() + self.matching_rules.len()
    }
}

fn diff_entries<C: ComponentCfg>(current: &[C], target: &[C]) -> EntryDiff<C> {
    let current: BTreeMap<&Dn, &C> = current.iter().map(|c| (c.dn(), c)).collect();
    let target_map: BTreeMap<&Dn, &C> = target.iter().map(|c| (c.dn(), c)).collect();

    let mut diff = EntryDiff::default();
    for (dn, cfg) in &target_map {
        match current.get(dn) {
            None => diff.added.push((*cfg).clone()),
            Some(existing) if *existing != *cfg => diff.modified.push((*cfg).clone()),
            Some(_) => {}
        }
    }
    for dn in current.keys() {
        if !target_map.contains_key(dn) {
            diff.deleted.push((*dn).clone());
        }
    }
    diff
}
