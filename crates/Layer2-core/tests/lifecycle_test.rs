//! 라이프사이클 통합 테스트 - 저장소 → 매니저 → 서버 레지스트리 전체 경로
//!
//! `cargo test -p dirsrv-core --test lifecycle_test`

use dirsrv_core::{
    AlertHandlerCfg, ComponentHost, ComponentState, ConfigStores, ConfigTree, DirectoryNamingPolicy,
    LifecycleEventKind, LogAlertHandler, RetentionLimit, RetentionPolicyCfg, SizeBasedRetentionPolicy,
};
use dirsrv_foundation::{Dn, Error, ServerSettings};
use std::fs::File;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

const MB: u64 = 1024 * 1024;

fn alert_dn(name: &str) -> Dn {
    Dn::parse(&format!("cn={},cn=Alert Handlers,cn=config", name)).unwrap()
}

fn retention_dn(name: &str) -> Dn {
    Dn::parse(&format!("cn={},cn=Retention Policies,cn=config", name)).unwrap()
}

async fn started(tree: &ConfigTree) -> (ComponentHost, ConfigStores) {
    let host = ComponentHost::with_builtins(ServerSettings::default());
    let stores = ConfigStores::from_tree(tree);
    host.initialize_all(&stores).await.expect("initialize failed");
    (host, stores)
}

#[tokio::test]
async fn test_retention_limit_change_requires_restart() {
    // E1: 100MB 로 설치
    let e1 = RetentionPolicyCfg::new(retention_dn("E1"), SizeBasedRetentionPolicy::CLASS_NAME)
        .with_limit(RetentionLimit::DiskSpaceUsed(100 * MB));
    let (host, stores) = started(&ConfigTree::default()).await;

    stores.retention_policies.add_entry(e1.clone()).await.unwrap();
    assert_eq!(host.retention_policies().state(&e1.dn), ComponentState::Active);
    let original = host.registry().retention_policies().get(&e1.dn).unwrap();

    // 같은 타입, 50MB 로 변경
    let changed = e1.clone().with_limit(RetentionLimit::DiskSpaceUsed(50 * MB));
    let results = stores.retention_policies.modify_entry(changed).await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_success());
    assert!(results[0].admin_action_required);
    assert!(!results[0].messages.is_empty());

    let current = host.registry().retention_policies().get(&e1.dn).unwrap();
    assert!(Arc::ptr_eq(&original, &current), "old instance should keep running");
    assert!(host.retention_policies().is_admin_action_required(&e1.dn));

    // 삭제하면 플래그와 관계없이 내려감
    stores.retention_policies.delete_entry(&e1.dn).await.unwrap();
    assert!(host.registry().retention_policies().is_empty());
    assert_eq!(host.retention_policies().state(&e1.dn), ComponentState::Absent);
    assert!(host.pending_restarts().is_empty());
    assert_eq!(
        host.events()
            .history_for(&e1.dn)
            .iter()
            .filter(|e| e.kind == LifecycleEventKind::Removed)
            .count(),
        1
    );
    assert!(host.is_consistent());
}

#[tokio::test]
async fn test_add_with_unknown_type_is_refused() {
    let (host, stores) = started(&ConfigTree::default()).await;
    let config = AlertHandlerCfg::new(alert_dn("Bogus"), "NoSuchAlertHandler");

    let err = stores.alert_handlers.add_entry(config.clone()).await.unwrap_err();
    assert!(matches!(err, Error::UnacceptableConfiguration { .. }));
    let reasons = err.reasons().unwrap();
    assert_eq!(reasons.len(), 1);
    assert!(reasons[0].contains("NoSuchAlertHandler"));

    assert!(!stores.alert_handlers.contains(&config.dn));
    assert_eq!(host.alert_handlers().state(&config.dn), ComponentState::Absent);
    assert!(host.registry().alert_handlers().is_empty());
}

#[tokio::test]
async fn test_disable_then_enable_behaves_like_fresh_add() {
    let config = AlertHandlerCfg::new(alert_dn("Log"), LogAlertHandler::CLASS_NAME);
    let (host, stores) = started(&ConfigTree::default()).await;

    stores.alert_handlers.add_entry(config.clone()).await.unwrap();
    let first = host.alert_handlers().instance(&config.dn).unwrap();

    stores
        .alert_handlers
        .modify_entry(config.clone().with_enabled(false))
        .await
        .unwrap();
    assert_eq!(host.alert_handlers().state(&config.dn), ComponentState::Disabled);
    assert!(host.registry().alert_handlers().is_empty());

    let results = stores.alert_handlers.modify_entry(config.clone()).await.unwrap();
    assert!(results.iter().all(|r| r.is_success() && !r.admin_action_required));

    let second = host.alert_handlers().instance(&config.dn).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(host.registry().alert_handlers().len(), 1);
    assert!(host.is_consistent());
}

#[tokio::test]
async fn test_acceptable_configuration_installs() {
    let host = ComponentHost::with_builtins(ServerSettings::default());
    let stores = ConfigStores::new();
    host.initialize_all(&stores).await.unwrap();

    let candidates = vec![
        RetentionPolicyCfg::new(retention_dn("size"), SizeBasedRetentionPolicy::CLASS_NAME)
            .with_limit(RetentionLimit::DiskSpaceUsed(MB)),
        RetentionPolicyCfg::new(retention_dn("count"), "FileNumberRetentionPolicy")
            .with_limit(RetentionLimit::NumberOfFiles(3)),
        RetentionPolicyCfg::new(retention_dn("wrong"), "FileNumberRetentionPolicy")
            .with_limit(RetentionLimit::FreeDiskSpace(MB)),
    ];

    for config in candidates {
        let acceptable = host.retention_policies().check_acceptable(&config).await.is_acceptable();
        let result = stores.retention_policies.add_entry(config.clone()).await;
        assert_eq!(acceptable, result.is_ok(), "{}", config.dn);
        if acceptable {
            assert!(host.retention_policies().state(&config.dn).is_active());
        }
    }
    assert_eq!(host.registry().retention_policies().len(), 2);
}

#[tokio::test]
async fn test_delete_of_never_added_entry() {
    let (host, stores) = started(&ConfigTree::default()).await;
    let dn = alert_dn("Ghost");

    assert!(matches!(
        stores.alert_handlers.delete_entry(&dn).await,
        Err(Error::NotFound(_))
    ));
    assert_eq!(host.alert_handlers().state(&dn), ComponentState::Absent);
    assert!(host.events().history().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_of_distinct_entries() {
    let host = Arc::new(ComponentHost::with_builtins(ServerSettings::default()));
    let stores = Arc::new(ConfigStores::new());
    host.initialize_all(&stores).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let stores = Arc::clone(&stores);
        tasks.push(tokio::spawn(async move {
            let config = AlertHandlerCfg::new(alert_dn(&format!("h{}", i)), LogAlertHandler::CLASS_NAME);
            stores.alert_handlers.add_entry(config).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(host.alert_handlers().active_count(), 16);
    assert_eq!(host.registry().alert_handlers().len(), 16);
    for i in 0..16 {
        let dn = alert_dn(&format!("h{}", i));
        assert!(host.registry().alert_handlers().get(&dn).is_some());
    }
    assert!(host.is_consistent());
}

#[tokio::test]
async fn test_retention_candidates_free_oldest_files() {
    let dir = tempfile::tempdir().unwrap();
    let now = SystemTime::now();
    for i in 0..10u64 {
        let path = dir.path().join(format!("access.{}", i));
        std::fs::write(&path, vec![0u8; 10]).unwrap();
        let file = File::options().write(true).open(&path).unwrap();
        file.set_modified(now - Duration::from_secs(100 - i)).unwrap();
    }

    let tree = ConfigTree {
        retention_policies: vec![RetentionPolicyCfg::new(retention_dn("E1"), SizeBasedRetentionPolicy::CLASS_NAME)
            .with_limit(RetentionLimit::DiskSpaceUsed(50))],
        ..Default::default()
    };
    let (host, _stores) = started(&tree).await;

    let naming = DirectoryNamingPolicy::new(dir.path(), "access");
    let candidates = host.registry().retention_candidates(&naming).unwrap();
    let mut names: Vec<String> = candidates
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["access.0", "access.1", "access.2", "access.3", "access.4"]);

    assert_eq!(dirsrv_core::component::remove_files(&candidates).unwrap(), 5);
    assert!(host.registry().retention_candidates(&naming).unwrap().is_empty());
}

#[tokio::test]
async fn test_json_alerts_reach_file_until_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("alerts.json");
    let tree = ConfigTree {
        alert_handlers: vec![
            AlertHandlerCfg::new(alert_dn("Json"), "JsonFileAlertHandler").with_log_file(&log),
            AlertHandlerCfg::new(alert_dn("Quiet"), LogAlertHandler::CLASS_NAME).with_enabled_alert_type("other"),
        ],
        ..Default::default()
    };
    let (host, _stores) = started(&tree).await;

    assert_eq!(host.registry().send_alert("backend", "disk-full", "99% used"), 1);
    assert_eq!(host.shutdown().await, 2);
    assert_eq!(host.registry().send_alert("backend", "disk-full", "gone"), 0);

    let content = std::fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);
    let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(value["alert_type"], "disk-full");
}

#[tokio::test]
async fn test_restart_applies_pending_change() {
    let config = AlertHandlerCfg::new(alert_dn("Log"), LogAlertHandler::CLASS_NAME);
    let (host, stores) = started(&ConfigTree::default()).await;
    stores.alert_handlers.add_entry(config.clone()).await.unwrap();

    stores
        .alert_handlers
        .modify_entry(config.clone().with_disabled_alert_type("noisy"))
        .await
        .unwrap();
    assert_eq!(host.registry().send_alert("test", "noisy", "x"), 1);

    host.restart(dirsrv_core::CapabilityKind::AlertHandler, &config.dn)
        .await
        .unwrap();
    assert_eq!(host.registry().send_alert("test", "noisy", "x"), 0);
    assert!(host.pending_restarts().is_empty());
    assert!(host.is_consistent());
}
