//! Type Catalog - 구현 타입 이름 → capability 색인
//!
//! 모든 factory table 이 공유합니다. 로더는 요청된 capability 의 테이블에
//! 이름이 없을 때 이 색인을 보고 "다른 capability 로 등록됨" 을 알려줍니다.

use crate::component::CapabilityKind;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};

/// 구현 타입 카탈로그
#[derive(Debug, Default)]
pub struct TypeCatalog {
    types: RwLock<HashMap<String, BTreeSet<CapabilityKind>>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 타입 이름이 capability 를 구현함을 기록
    pub fn record(&self, class_name: &str, kind: CapabilityKind) {
        self.types
            .write()
            .entry(class_name.to_string())
            .or_default()
            .insert(kind);
    }

    /// 기록 제거
    pub fn forget(&self, class_name: &str, kind: CapabilityKind) {
        let mut types = self.types.write();
        if let Some(kinds) = types.get_mut(class_name) {
            kinds.remove(&kind);
            if kinds.is_empty() {
                types.remove(class_name);
            }
        }
    }

    /// 타입이 구현하는 capability 목록
    pub fn capabilities_of(&self, class_name: &str) -> Vec<CapabilityKind> {
        self.types
            .read()
            .get(class_name)
            .map(|kinds| kinds.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.types.read().contains_key(class_name)
    }

    /// 등록된 타입 이름 (정렬)
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}
