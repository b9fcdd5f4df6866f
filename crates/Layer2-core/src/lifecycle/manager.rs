//! Lifecycle Manager - capability별 컴포넌트 라이프사이클 관리
//!
//! 설정 저장소의 add/change/delete 를 받아 validate-then-commit 으로 처리합니다.
//!
//! ## 불변식
//!
//! - 엔트리 맵의 `Active` 슬롯과 서버 레지스트리의 게시 상태는 같은 임계 구역에서 바뀝니다.
//! - 엔트리 맵 lock 은 `.await`, 초기화, finalize 동안 잡지 않습니다.
//! - 설치 중인 엔트리가 삭제되면 설치는 게시하지 않고 인스턴스를 finalize 합니다.

use super::events::{LifecycleEvent, LifecycleEventBus, LifecycleEventKind};
use super::state::ComponentState;
use super::validator::AcceptanceValidator;
use crate::component::{Capability, CapabilityKind, ManagedComponent};
use crate::config::{ComponentCfg, ConfigurationListener, ConfigurationStore, Subscription};
use crate::loader::{ComponentLoader, FactoryTable};
use crate::registry::ServerRegistry;
use async_trait::async_trait;
use dirsrv_foundation::{ConfigChangeResult, Dn, Error, Result, UnacceptableReasons};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 매니저 설정
#[derive(Debug, Clone)]
pub struct LifecycleManagerConfig {
    /// 시작 시 한 엔트리가 실패해도 나머지를 계속 처리
    pub continue_on_error: bool,
}

impl Default for LifecycleManagerConfig {
    fn default() -> Self {
        Self {
            continue_on_error: true,
        }
    }
}

/// `initialize_all` 결과
#[derive(Debug, Clone, Default)]
pub struct StartupReport {
    pub activated: Vec<Dn>,
    pub disabled: Vec<Dn>,
    pub failed: Vec<(Dn, String)>,
}

impl StartupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

// ============================================================================
// 내부 슬롯
// ============================================================================

struct LiveEntry<K: Capability> {
    instance: Arc<K::Instance>,
    class_name: String,
    /// 인스턴스를 초기화한 스냅샷
    initialized_with: K::Config,
    admin_action_required: bool,
}

enum Slot<K: Capability> {
    Disabled,
    Active(LiveEntry<K>),
    Failed(String),
}

enum Install<K: Capability> {
    Activated {
        instance: Arc<K::Instance>,
        replaced: Option<Arc<K::Instance>>,
    },
    Cancelled,
}

enum Publish<K: Capability> {
    Activated {
        instance: Arc<K::Instance>,
        replaced: Option<Arc<K::Instance>>,
    },
    Cancelled(Option<Box<K::Instance>>),
    Failed(Error),
}

enum ActiveChange {
    NotActive,
    Unchanged,
    AdminAction(String),
}

// ============================================================================
// LifecycleManager
// ============================================================================

/// capability 하나의 라이프사이클 매니저
pub struct LifecycleManager<K: Capability> {
    loader: ComponentLoader<K>,
    validator: AcceptanceValidator<K>,
    registry: Arc<ServerRegistry>,
    events: Arc<LifecycleEventBus>,
    config: LifecycleManagerConfig,

    /// 식별자 → 슬롯 (Active 슬롯이 Registry Map)
    entries: RwLock<HashMap<Dn, Slot<K>>>,

    /// 진행 중인 설치의 취소 플래그 (설치마다 하나, 같은 식별자에 여러 개 가능)
    installs: Mutex<HashMap<Dn, Vec<Arc<AtomicBool>>>>,

    /// 식별자별 최신 스냅샷 (restart 용)
    latest: RwLock<HashMap<Dn, K::Config>>,

    /// 저장소 구독
    subscription: Mutex<Option<Subscription>>,
}

impl<K: Capability> LifecycleManager<K> {
    pub fn new(
        factories: Arc<FactoryTable<K>>,
        registry: Arc<ServerRegistry>,
        events: Arc<LifecycleEventBus>,
        config: LifecycleManagerConfig,
    ) -> Self {
        let loader = ComponentLoader::new(factories);
        Self {
            validator: AcceptanceValidator::new(loader.clone()),
            loader,
            registry,
            events,
            config,
            entries: RwLock::new(HashMap::new()),
            installs: Mutex::new(HashMap::new()),
            latest: RwLock::new(HashMap::new()),
            subscription: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> CapabilityKind {
        K::KIND
    }

    pub fn loader(&self) -> &ComponentLoader<K> {
        &self.loader
    }

    /// 설정 검사 (pre-commit 질의와 같은 함수)
    pub async fn check_acceptable(&self, config: &K::Config) -> UnacceptableReasons {
        self.validator.check_acceptable(config).await
    }

    // ========================================================================
    // 시작 / 종료
    // ========================================================================

    /// 저장소 구독 후 기존 엔트리를 모두 설치
    pub async fn initialize_all(self: &Arc<Self>, store: &dyn ConfigurationStore<K::Config>) -> Result<StartupReport> {
        let listener: Arc<dyn ConfigurationListener<K::Config>> = self.clone();
        let previous = self.subscription.lock().replace(store.subscribe(listener));
        drop(previous);

        let mut report = StartupReport::default();
        for dn in store.list().await? {
            let Some(config) = store.get(&dn).await? else {
                continue;
            };
            self.latest.write().insert(dn.clone(), config.clone());

            if !config.is_enabled() {
                self.entries.write().insert(dn.clone(), Slot::Disabled);
                debug!("[{}] {} is disabled", K::KIND, dn);
                report.disabled.push(dn);
                continue;
            }

            match self.install(&config).await {
                Ok(Install::Activated { replaced, .. }) => {
                    if let Some(old) = replaced {
                        self.finalize_instance(&dn, &*old).await;
                    }
                    report.activated.push(dn);
                }
                Ok(Install::Cancelled) => {}
                Err(e) => {
                    error!(
                        "[{}] Unable to initialize {} ({}): {}",
                        K::KIND,
                        dn,
                        config.class_name(),
                        e
                    );
                    if !self.config.continue_on_error {
                        return Err(e);
                    }
                    report.failed.push((dn, e.to_string()));
                }
            }
        }

        info!(
            "[{}] Initialized: {} active, {} disabled, {} failed",
            K::KIND,
            report.activated.len(),
            report.disabled.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// 구독 해제 후 모든 활성 인스턴스를 내림
    pub async fn shutdown(&self) -> usize {
        let subscription = self.subscription.lock().take();
        drop(subscription);

        let drained: Vec<(Dn, LiveEntry<K>)> = {
            let mut entries = self.entries.write();
            for flag in self.installs.lock().values().flatten() {
                flag.store(true, Ordering::SeqCst);
            }
            let active_set = K::active_set(&self.registry);
            entries
                .drain()
                .filter_map(|(dn, slot)| match slot {
                    Slot::Active(live) => {
                        active_set.deregister(&live.instance);
                        Some((dn, live))
                    }
                    _ => None,
                })
                .collect()
        };

        let count = drained.len();
        for (dn, live) in drained {
            self.finalize_instance(&dn, &*live.instance).await;
            self.emit(LifecycleEventKind::Deactivated, &dn, &live.class_name, None).await;
        }
        self.latest.write().clear();

        info!("[{}] Shut down {} component(s)", K::KIND, count);
        count
    }

    /// 운영자 재시작: 최신 스냅샷으로 새 인스턴스를 설치하고 교체
    ///
    /// 실패하면 기존 인스턴스는 그대로 동작하고 에러를 반환합니다.
    pub async fn restart(&self, dn: &Dn) -> Result<ConfigChangeResult> {
        let config = self
            .latest
            .read()
            .get(dn)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{} {}", K::KIND, dn)))?;

        if !config.is_enabled() {
            return Err(Error::InvalidInput(format!(
                "{} {} is disabled and cannot be restarted",
                K::KIND,
                dn
            )));
        }

        match self.install(&config).await? {
            Install::Activated { replaced, .. } => {
                if let Some(old) = replaced {
                    self.finalize_instance(dn, &*old).await;
                }
                info!("[{}] Restarted {} ({})", K::KIND, dn, config.class_name());
                Ok(ConfigChangeResult::success()
                    .with_message(format!("The {} {} was restarted", K::KIND, dn)))
            }
            Install::Cancelled => Err(Error::NotFound(format!(
                "{} {} was deleted or disabled during restart",
                K::KIND,
                dn
            ))),
        }
    }

    // ========================================================================
    // 조회
    // ========================================================================

    pub fn state(&self, dn: &Dn) -> ComponentState {
        match self.entries.read().get(dn) {
            None => ComponentState::Absent,
            Some(Slot::Disabled) => ComponentState::Disabled,
            Some(Slot::Active(_)) => ComponentState::Active,
            Some(Slot::Failed(error)) => ComponentState::Failed(error.clone()),
        }
    }

    pub fn instance(&self, dn: &Dn) -> Option<Arc<K::Instance>> {
        match self.entries.read().get(dn) {
            Some(Slot::Active(live)) => Some(Arc::clone(&live.instance)),
            _ => None,
        }
    }

    /// 활성 식별자 (정렬)
    pub fn active_dns(&self) -> Vec<Dn> {
        let mut dns: Vec<Dn> = self
            .entries
            .read()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Active(_)))
            .map(|(dn, _)| dn.clone())
            .collect();
        dns.sort();
        dns
    }

    pub fn active_count(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|slot| matches!(slot, Slot::Active(_)))
            .count()
    }

    /// 재시작이 필요한 식별자 (정렬)
    pub fn pending_restarts(&self) -> Vec<Dn> {
        let mut dns: Vec<Dn> = self
            .entries
            .read()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Active(live) if live.admin_action_required))
            .map(|(dn, _)| dn.clone())
            .collect();
        dns.sort();
        dns
    }

    pub fn is_admin_action_required(&self, dn: &Dn) -> bool {
        matches!(self.entries.read().get(dn), Some(Slot::Active(live)) if live.admin_action_required)
    }

    /// 최신 스냅샷
    pub fn latest_config(&self, dn: &Dn) -> Option<K::Config> {
        self.latest.read().get(dn).cloned()
    }

    /// 엔트리 맵과 서버 레지스트리가 일치하는지
    pub fn is_consistent(&self) -> bool {
        let entries = self.entries.read();
        let published = K::active_set(&self.registry).snapshot();

        let mut active = 0;
        for (dn, slot) in entries.iter() {
            if let Slot::Active(live) = slot {
                active += 1;
                let listed = published
                    .iter()
                    .any(|e| &e.dn == dn && Arc::ptr_eq(&e.instance, &live.instance));
                if !listed {
                    return false;
                }
            }
        }
        active == published.len()
    }

    // ========================================================================
    // 상태 전이
    // ========================================================================

    /// 검사 → 초기화 → 게시
    async fn install(&self, config: &K::Config) -> Result<Install<K>> {
        let dn = config.dn().clone();
        let cancelled = Arc::new(AtomicBool::new(false));
        self.installs
            .lock()
            .entry(dn.clone())
            .or_default()
            .push(Arc::clone(&cancelled));

        let loaded = self.load_validated(config).await;

        let outcome = {
            let mut entries = self.entries.write();
            self.forget_install(&dn, &cancelled);

            if cancelled.load(Ordering::SeqCst) {
                Publish::<K>::Cancelled(loaded.ok())
            } else {
                match loaded {
                    Ok(boxed) => {
                        let instance: Arc<K::Instance> = Arc::from(boxed);
                        let replaced = K::active_set(&self.registry).register(dn.clone(), Arc::clone(&instance));
                        entries.insert(
                            dn.clone(),
                            Slot::Active(LiveEntry {
                                instance: Arc::clone(&instance),
                                class_name: config.class_name().to_string(),
                                initialized_with: config.clone(),
                                admin_action_required: false,
                            }),
                        );
                        Publish::<K>::Activated { instance, replaced }
                    }
                    Err(e) => {
                        if !matches!(entries.get(&dn), Some(Slot::Active(_))) {
                            entries.insert(dn.clone(), Slot::Failed(e.to_string()));
                        }
                        Publish::<K>::Failed(e)
                    }
                }
            }
        };

        match outcome {
            Publish::Activated { instance, replaced } => {
                info!("[{}] Activated {} ({})", K::KIND, dn, config.class_name());
                self.emit(LifecycleEventKind::Activated, &dn, config.class_name(), None)
                    .await;
                Ok(Install::Activated { instance, replaced })
            }
            Publish::Cancelled(instance) => {
                if let Some(instance) = instance {
                    self.finalize_instance(&dn, &*instance).await;
                }
                info!("[{}] Installation of {} was cancelled", K::KIND, dn);
                Ok(Install::Cancelled)
            }
            Publish::Failed(e) => {
                self.emit(
                    LifecycleEventKind::Failed,
                    &dn,
                    config.class_name(),
                    Some(e.to_string()),
                )
                .await;
                Err(e)
            }
        }
    }

    async fn load_validated(&self, config: &K::Config) -> Result<Box<K::Instance>> {
        let reasons = self.validator.check_acceptable(config).await;
        if !reasons.is_acceptable() {
            return Err(Error::unacceptable(
                K::KIND.display_name(),
                config.dn().to_string(),
                reasons.into_vec(),
            ));
        }
        self.loader.load(config.class_name(), config, true).await
    }

    /// 자신의 취소 플래그만 제거 (entries lock 을 잡은 상태에서 호출)
    fn forget_install(&self, dn: &Dn, flag: &Arc<AtomicBool>) {
        let mut installs = self.installs.lock();
        if let Some(flags) = installs.get_mut(dn) {
            flags.retain(|f| !Arc::ptr_eq(f, flag));
            if flags.is_empty() {
                installs.remove(dn);
            }
        }
    }

    /// 식별자의 진행 중인 설치를 모두 취소 (entries lock 을 잡은 상태에서 호출)
    fn cancel_installs(&self, dn: &Dn) {
        if let Some(flags) = self.installs.lock().get(dn) {
            for flag in flags {
                flag.store(true, Ordering::SeqCst);
            }
        }
    }

    /// 비활성화. 없는 식별자는 그대로 두고, Active 였으면 레지스트리에서 내리고 반환합니다.
    fn disable_slot(&self, dn: &Dn) -> Option<LiveEntry<K>> {
        let mut entries = self.entries.write();
        self.cancel_installs(dn);

        let slot = entries.get_mut(dn)?;
        match std::mem::replace(slot, Slot::Disabled) {
            Slot::Active(live) => {
                K::active_set(&self.registry).deregister(&live.instance);
                Some(live)
            }
            _ => None,
        }
    }

    /// 슬롯 교체. 이전이 Active 면 레지스트리에서 내리고 반환합니다.
    fn replace_slot(&self, dn: &Dn, next: Option<Slot<K>>, cancel_pending: bool) -> (bool, Option<LiveEntry<K>>) {
        let mut entries = self.entries.write();
        if cancel_pending {
            self.cancel_installs(dn);
        }

        let previous = match next {
            Some(slot) => entries.insert(dn.clone(), slot),
            None => entries.remove(dn),
        };

        match previous {
            Some(Slot::Active(live)) => {
                K::active_set(&self.registry).deregister(&live.instance);
                (true, Some(live))
            }
            Some(_) => (true, None),
            None => (false, None),
        }
    }

    async fn activation_result(&self, config: &K::Config) -> ConfigChangeResult {
        let dn = config.dn();
        match self.install(config).await {
            Ok(Install::Activated { replaced, .. }) => {
                if let Some(old) = replaced {
                    self.finalize_instance(dn, &*old).await;
                }
                ConfigChangeResult::success()
            }
            Ok(Install::Cancelled) => ConfigChangeResult::success()
                .with_message(format!("Installation of {} {} was cancelled by a later delete or disable", K::KIND, dn)),
            Err(e) => {
                error!(
                    "[{}] Unable to install {} ({}): {}",
                    K::KIND,
                    dn,
                    config.class_name(),
                    e
                );
                ConfigChangeResult::failure(e.to_string())
            }
        }
    }

    async fn finalize_instance(&self, dn: &Dn, instance: &K::Instance) {
        if let Err(e) = instance.finalize().await {
            let failure = Error::finalization(K::KIND.display_name(), dn.to_string(), e.to_string());
            warn!("{}", failure);
        }
    }

    async fn emit(&self, kind: LifecycleEventKind, dn: &Dn, class_name: &str, message: Option<String>) {
        let mut event = LifecycleEvent::new(kind, K::KIND, dn.clone()).with_class_name(class_name);
        if let Some(message) = message {
            event = event.with_message(message);
        }
        self.events.publish(event).await;
    }

    async fn collect_reasons(&self, config: &K::Config, reasons: &mut UnacceptableReasons) -> bool {
        let found = self.validator.check_acceptable(config).await;
        let acceptable = found.is_acceptable();
        reasons.extend(found);
        acceptable
    }
}

// ============================================================================
// ConfigurationListener 구현
// ============================================================================

#[async_trait]
impl<K: Capability> ConfigurationListener<K::Config> for LifecycleManager<K> {
    async fn is_configuration_add_acceptable(&self, config: &K::Config, reasons: &mut UnacceptableReasons) -> bool {
        self.collect_reasons(config, reasons).await
    }

    async fn apply_configuration_add(&self, config: &K::Config) -> ConfigChangeResult {
        let dn = config.dn().clone();
        self.latest.write().insert(dn.clone(), config.clone());

        if matches!(self.state(&dn), ComponentState::Active) {
            return self.apply_configuration_change(config).await;
        }

        if !config.is_enabled() {
            self.replace_slot(&dn, Some(Slot::Disabled), false);
            debug!("[{}] Added disabled entry {}", K::KIND, dn);
            return ConfigChangeResult::success();
        }

        self.activation_result(config).await
    }

    async fn is_configuration_change_acceptable(
        &self,
        config: &K::Config,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        self.collect_reasons(config, reasons).await
    }

    async fn apply_configuration_change(&self, config: &K::Config) -> ConfigChangeResult {
        let dn = config.dn().clone();
        self.latest.write().insert(dn.clone(), config.clone());

        if !config.is_enabled() {
            if let Some(live) = self.disable_slot(&dn) {
                self.finalize_instance(&dn, &*live.instance).await;
                info!("[{}] Disabled {} ({})", K::KIND, dn, live.class_name);
                self.emit(LifecycleEventKind::Deactivated, &dn, &live.class_name, None)
                    .await;
            }
            return ConfigChangeResult::success();
        }

        let change = {
            let mut entries = self.entries.write();
            match entries.get_mut(&dn) {
                Some(Slot::Active(live)) => {
                    if live.class_name != config.class_name() {
                        live.admin_action_required = true;
                        ActiveChange::AdminAction(format!(
                            "The {} defined in configuration entry {} has a new implementation type {}, \
                             but the change will not take effect until the component is restarted",
                            K::KIND,
                            dn,
                            config.class_name()
                        ))
                    } else if live.initialized_with != *config {
                        live.admin_action_required = true;
                        ActiveChange::AdminAction(format!(
                            "The configuration change for the {} defined in configuration entry {} \
                             will not take effect until the component is restarted",
                            K::KIND,
                            dn
                        ))
                    } else {
                        live.admin_action_required = false;
                        ActiveChange::Unchanged
                    }
                }
                _ => ActiveChange::NotActive,
            }
        };

        match change {
            ActiveChange::NotActive => self.activation_result(config).await,
            ActiveChange::Unchanged => ConfigChangeResult::success(),
            ActiveChange::AdminAction(message) => {
                warn!("[{}] {}", K::KIND, message);
                self.emit(
                    LifecycleEventKind::AdminActionRequired,
                    &dn,
                    config.class_name(),
                    Some(message.clone()),
                )
                .await;
                ConfigChangeResult::success().with_admin_action(message)
            }
        }
    }

    async fn is_configuration_delete_acceptable(
        &self,
        _config: &K::Config,
        _reasons: &mut UnacceptableReasons,
    ) -> bool {
        true
    }

    async fn apply_configuration_delete(&self, config: &K::Config) -> ConfigChangeResult {
        let dn = config.dn().clone();
        self.latest.write().remove(&dn);

        let (known, live) = self.replace_slot(&dn, None, true);
        match live {
            Some(live) => {
                self.finalize_instance(&dn, &*live.instance).await;
                info!("[{}] Removed {} ({})", K::KIND, dn, live.class_name);
                self.emit(LifecycleEventKind::Removed, &dn, &live.class_name, None).await;
            }
            None if known => {
                debug!("[{}] Removed inactive entry {}", K::KIND, dn);
                self.emit(LifecycleEventKind::Removed, &dn, config.class_name(), None)
                    .await;
            }
            None => debug!("[{}] Delete of unknown entry {} ignored", K::KIND, dn),
        }
        ConfigChangeResult::success()
    }
}
