//! Admin commands - check / start / reload / alert

use anyhow::{bail, Context};
use dirsrv_core::{CapabilityKind, ComponentHost, ConfigStores, ConfigTree, EntryCheck, StartupReport};
use dirsrv_foundation::ServerSettings;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

fn load_tree(path: &Path) -> anyhow::Result<ConfigTree> {
    ConfigTree::load(path).with_context(|| format!("failed to load configuration tree {}", path.display()))
}

/// 호스트 생성 후 트리로 부트스트랩
async fn bootstrap(
    settings: ServerSettings,
    tree: &ConfigTree,
) -> anyhow::Result<(ComponentHost, ConfigStores, BTreeMap<CapabilityKind, StartupReport>)> {
    let host = ComponentHost::with_builtins(settings);
    let stores = ConfigStores::from_tree(tree);
    let reports = host.initialize_all(&stores).await?;
    Ok((host, stores, reports))
}

// ============================================================================
// check
// ============================================================================

pub async fn check(settings: ServerSettings, tree_path: &Path) -> anyhow::Result<()> {
    let tree = load_tree(tree_path)?;
    let host = ComponentHost::with_builtins(settings);
    let checks = host.check_tree(&tree).await;

    println!("\nChecking {} ({} entries)\n", tree_path.display(), checks.len());
    for check in &checks {
        print_check(check);
    }

    let rejected = checks.iter().filter(|c| !c.is_acceptable()).count();
    println!();
    if rejected > 0 {
        bail!("{} of {} entries were not acceptable", rejected, checks.len());
    }
    println!("All entries are acceptable.");
    Ok(())
}

fn print_check(check: &EntryCheck) {
    let status = if !check.is_acceptable() {
        "✗"
    } else if check.enabled {
        "✓"
    } else {
        "-"
    };
    println!(
        "{} [{}] {} ({})",
        status, check.capability, check.dn, check.class_name
    );
    for reason in check.reasons.iter() {
        println!("    {}", reason);
    }
}

// ============================================================================
// start
// ============================================================================

pub async fn start(settings: ServerSettings, tree_path: &Path, wait: bool, events: bool) -> anyhow::Result<()> {
    let tree = load_tree(tree_path)?;
    let (host, _stores, reports) = bootstrap(settings, &tree).await?;

    print_reports(&host, &reports);

    if events {
        for event in host.events().history() {
            println!("{}", serde_json::to_string(&event)?);
        }
    }

    if wait {
        info!("Running; press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
    }

    host.shutdown().await;
    Ok(())
}

fn print_reports(host: &ComponentHost, reports: &BTreeMap<CapabilityKind, StartupReport>) {
    println!("\nActive components\n");
    for (kind, report) in reports {
        println!(
            "{:<18} {} active, {} disabled, {} failed",
            kind.display_name(),
            report.activated.len(),
            report.disabled.len(),
            report.failed.len()
        );
        for dn in &report.activated {
            println!("    ✓ {}", dn);
        }
        for (dn, error) in &report.failed {
            println!("    ✗ {}: {}", dn, error);
        }
    }

    let counts = host.registry().active_counts();
    let total: usize = counts.values().sum();
    println!("\n{} component(s) published", total);
}

// ============================================================================
// reload
// ============================================================================

pub async fn reload(settings: ServerSettings, tree_path: &Path, new_tree_path: &Path) -> anyhow::Result<()> {
    let current = load_tree(tree_path)?;
    let target = load_tree(new_tree_path)?;
    let (host, stores, _reports) = bootstrap(settings, &current).await?;

    let diff = current.diff(&target);
    if diff.is_empty() {
        println!("No changes between {} and {}", tree_path.display(), new_tree_path.display());
        host.shutdown().await;
        return Ok(());
    }

    println!("\nApplying {} change(s)\n", diff.len());
    let outcomes = stores.apply_diff(&diff).await;
    for outcome in &outcomes {
        let status = if outcome.is_success() { "✓" } else { "✗" };
        println!(
            "{} {} [{}] {}",
            status, outcome.operation, outcome.capability, outcome.dn
        );
        match &outcome.result {
            Ok(results) => {
                for message in results.iter().flat_map(|r| r.messages.iter()) {
                    println!("    {}", message);
                }
            }
            Err(reason) => println!("    {}", reason),
        }
    }

    let pending = host.pending_restarts();
    if !pending.is_empty() {
        println!("\nRestart required for:");
        for (kind, dn) in &pending {
            println!("    [{}] {}", kind, dn);
        }
    }

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    host.shutdown().await;
    if failed > 0 {
        bail!("{} of {} change(s) failed", failed, outcomes.len());
    }
    Ok(())
}

// ============================================================================
// alert
// ============================================================================

pub async fn alert(
    settings: ServerSettings,
    tree_path: &Path,
    generator: &str,
    alert_type: &str,
    message: &str,
) -> anyhow::Result<()> {
    let tree = load_tree(tree_path)?;
    let (host, _stores, _reports) = bootstrap(settings, &tree).await?;

    let delivered = host.registry().send_alert(generator, alert_type, message);
    println!("Alert {} delivered to {} handler(s)", alert_type, delivered);

    host.shutdown().await;
    Ok(())
}
