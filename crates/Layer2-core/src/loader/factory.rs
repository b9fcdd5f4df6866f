//! Factory Table - capability별 구현 타입 생성자 테이블
//!
//! 런타임 reflection 대신 "타입 이름 → 인자 없는 생성자" 테이블을 둡니다.

use super::catalog::TypeCatalog;
use crate::component::Capability;
use dirsrv_foundation::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// 인자 없는 생성자
pub type Constructor<K> = Arc<dyn Fn() -> Result<Box<<K as Capability>::Instance>> + Send + Sync>;

/// capability 하나의 생성자 테이블
pub struct FactoryTable<K: Capability> {
    constructors: RwLock<HashMap<String, Constructor<K>>>,
    catalog: Arc<TypeCatalog>,
}

impl<K: Capability> FactoryTable<K> {
    pub fn new(catalog: Arc<TypeCatalog>) -> Self {
        Self {
            constructors: RwLock::new(HashMap::new()),
            catalog,
        }
    }

    /// 생성자 등록. 같은 이름이 있으면 교체합니다.
    pub fn register<F>(&self, class_name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Result<Box<K::Instance>> + Send + Sync + 'static,
    {
        let class_name = class_name.into();
        let previous = self
            .constructors
            .write()
            .insert(class_name.clone(), Arc::new(constructor));

        if previous.is_some() {
            warn!("[{}] Replaced constructor for {}", K::KIND, class_name);
        } else {
            debug!("[{}] Registered constructor for {}", K::KIND, class_name);
        }
        self.catalog.record(&class_name, K::KIND);
    }

    /// 생성자 제거
    pub fn unregister(&self, class_name: &str) -> bool {
        let removed = self.constructors.write().remove(class_name).is_some();
        if removed {
            self.catalog.forget(class_name, K::KIND);
            debug!("[{}] Unregistered constructor for {}", K::KIND, class_name);
        }
        removed
    }

    /// 생성자 조회
    pub fn get(&self, class_name: &str) -> Option<Constructor<K>> {
        self.constructors.read().get(class_name).cloned()
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.constructors.read().contains_key(class_name)
    }

    /// 등록된 타입 이름 (정렬)
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.constructors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.read().is_empty()
    }

    /// 공유 카탈로그
    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }
}
