//! Dn - 설정 엔트리 식별자 (Distinguished Name)
//!
//! 설정 트리의 각 엔트리를 유일하게 식별하는 키입니다.
//! 원본 문자열은 표시용으로 보존하고, 비교/해시는 정규화된 형태로 수행합니다.
//!
//! ```text
//! cn=Log Alert Handler,cn=Alert Handlers,cn=config
//! └──────── RDN ──────┘└──────────── parent ─────┘
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 설정 엔트리의 Distinguished Name
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dn {
    /// 원본 문자열
    raw: Arc<str>,
    /// 정규화된 문자열 (비교용)
    normalized: Arc<str>,
}

impl Dn {
    /// 문자열을 파싱하여 Dn 생성
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidDn("empty DN".into()));
        }

        let rdns = split_rdns(trimmed);
        let mut normalized = Vec::with_capacity(rdns.len());

        for rdn in &rdns {
            let (attr, value) = split_rdn(rdn)
                .ok_or_else(|| Error::InvalidDn(format!("'{}' has malformed RDN '{}'", trimmed, rdn)))?;
            normalized.push(format!("{}={}", attr.to_ascii_lowercase(), normalize_value(value)));
        }

        Ok(Self {
            raw: Arc::from(trimmed),
            normalized: Arc::from(normalized.join(",")),
        })
    }

    /// 원본 문자열
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// 정규화된 문자열
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// 첫 번째 RDN의 값 (예: `cn=Foo,cn=config` → `Foo`)
    pub fn rdn_value(&self) -> &str {
        let rdns = split_rdns(&self.raw);
        rdns.first()
            .and_then(|rdn| split_rdn(rdn))
            .map(|(_, value)| value)
            .unwrap_or("")
    }

    /// 부모 Dn (최상위면 None)
    pub fn parent(&self) -> Option<Dn> {
        let rdns = split_rdns(&self.raw);
        if rdns.len() < 2 {
            return None;
        }
        Dn::parse(&rdns[1..].join(",")).ok()
    }

    /// 하위 Dn 생성
    pub fn child(&self, attr: &str, value: &str) -> Result<Dn> {
        Dn::parse(&format!("{}={},{}", attr, escape_value(value), self.raw))
    }

    /// `other` 의 하위 엔트리인지 확인 (자기 자신 제외)
    pub fn is_descendant_of(&self, other: &Dn) -> bool {
        self.normalized.len() > other.normalized.len()
            && self.normalized.ends_with(&*other.normalized)
            && self.normalized[..self.normalized.len() - other.normalized.len()].ends_with(',')
    }
}

// ============================================================================
// 파싱 헬퍼
// ============================================================================

/// 이스케이프되지 않은 콤마로 RDN 분리
fn split_rdns(dn: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, c) in dn.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ',' if !escaped => {
                parts.push(dn[start..i].trim());
                start = i + 1;
            }
            _ => escaped = false,
        }
    }
    parts.push(dn[start..].trim());
    parts
}

fn split_rdn(rdn: &str) -> Option<(&str, &str)> {
    let (attr, value) = rdn.split_once('=')?;
    let attr = attr.trim();
    let value = value.trim();
    if attr.is_empty() || value.is_empty() || !attr.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.') {
        return None;
    }
    Some((attr, value))
}

fn normalize_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace(',', "\\,")
}

// ============================================================================
// Trait 구현
// ============================================================================

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl PartialOrd for Dn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dn({})", self.raw)
    }
}

impl TryFrom<String> for Dn {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Dn::parse(&value)
    }
}

impl TryFrom<&str> for Dn {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Dn::parse(value)
    }
}

impl From<Dn> for String {
    fn from(dn: Dn) -> Self {
        dn.raw.to_string()
    }
}

impl std::str::FromStr for Dn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Dn::parse(s)
    }
}
