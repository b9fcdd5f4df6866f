//! Component Loader - 타입 이름으로 컴포넌트 생성
//!
//! `load(class_name, config, initialize)`:
//!
//! 1. factory table 에서 타입 이름 해석 (실패 시 `Resolution`)
//! 2. 인자 없는 생성자로 인스턴스 생성 (실패 시 `Instantiation`)
//! 3. `initialize = true` 면 초기화 (실패 시 원인을 보존한 `Initialization`)
//!    `initialize = false` 면 자체 검사만 수행 (거부 시 `UnacceptableConfiguration`)

use super::factory::{Constructor, FactoryTable};
use crate::component::{Capability, ManagedComponent};
use crate::config::ComponentCfg;
use dirsrv_foundation::{Error, Result, UnacceptableReasons};
use std::sync::Arc;
use tracing::debug;

/// capability 하나에 대한 로더. 공유 factory table 외의 상태는 없습니다.
pub struct ComponentLoader<K: Capability> {
    factories: Arc<FactoryTable<K>>,
}

impl<K: Capability> Clone for ComponentLoader<K> {
    fn clone(&self) -> Self {
        Self {
            factories: Arc::clone(&self.factories),
        }
    }
}

impl<K: Capability> ComponentLoader<K> {
    pub fn new(factories: Arc<FactoryTable<K>>) -> Self {
        Self { factories }
    }

    pub fn factories(&self) -> &Arc<FactoryTable<K>> {
        &self.factories
    }

    /// 타입 이름 해석
    pub fn resolve(&self, class_name: &str) -> Result<Constructor<K>> {
        if let Some(constructor) = self.factories.get(class_name) {
            return Ok(constructor);
        }

        let others = self.factories.catalog().capabilities_of(class_name);
        let reason = if others.is_empty() {
            format!("no implementation type named '{}' is registered", class_name)
        } else {
            let names: Vec<&str> = others.iter().map(|k| k.display_name()).collect();
            format!(
                "'{}' is registered as {} and does not implement the {} contract",
                class_name,
                names.join(", "),
                K::KIND
            )
        };
        Err(Error::resolution(class_name, K::KIND.display_name(), reason))
    }

    /// 인스턴스 생성 후 초기화 또는 자체 검사
    pub async fn load(&self, class_name: &str, config: &K::Config, initialize: bool) -> Result<Box<K::Instance>> {
        let constructor = self.resolve(class_name)?;

        let mut instance = constructor()
            .map_err(|e| Error::instantiation(class_name, K::KIND.display_name(), e.to_string()))?;

        if initialize {
            instance.initialize(config).await.map_err(|e| {
                Error::initialization(class_name, K::KIND.display_name(), config.dn().to_string(), e)
            })?;
            debug!("[{}] Initialized {} for {}", K::KIND, class_name, config.dn());
        } else {
            let mut reasons = UnacceptableReasons::new();
            if !instance.is_configuration_acceptable(config, &mut reasons) {
                return Err(Error::unacceptable(
                    K::KIND.display_name(),
                    config.dn().to_string(),
                    reasons.into_vec(),
                ));
            }
        }

        Ok(instance)
    }
}
