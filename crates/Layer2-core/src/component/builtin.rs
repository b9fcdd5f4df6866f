//! Builtin Components - 내장 구현 타입 등록

use super::alert::{AlertHandler, JsonFileAlertHandler, LogAlertHandler};
use super::matching::{BitStringEqualityMatchingRule, CaseIgnoreEqualityMatchingRule, MatchingRule};
use super::retention::{FileNumberRetentionPolicy, RetentionPolicy, SizeBasedRetentionPolicy};
use crate::host::ComponentHost;
use tracing::debug;

/// 내장 구현 타입을 host 의 factory table 에 등록
///
/// bit string 규칙의 기본 정책은 `schema.syntax_enforcement` 설정을 따릅니다.
pub fn register_builtins(host: &ComponentHost) {
    let alerts = host.alert_factories();
    alerts.register(LogAlertHandler::CLASS_NAME, || {
        let handler: Box<dyn AlertHandler> = Box::new(LogAlertHandler::new());
        Ok(handler)
    });
    alerts.register(JsonFileAlertHandler::CLASS_NAME, || {
        let handler: Box<dyn AlertHandler> = Box::new(JsonFileAlertHandler::new());
        Ok(handler)
    });

    let retention = host.retention_factories();
    retention.register(SizeBasedRetentionPolicy::CLASS_NAME, || {
        let policy: Box<dyn RetentionPolicy> = Box::new(SizeBasedRetentionPolicy::new());
        Ok(policy)
    });
    retention.register(FileNumberRetentionPolicy::CLASS_NAME, || {
        let policy: Box<dyn RetentionPolicy> = Box::new(FileNumberRetentionPolicy::new());
        Ok(policy)
    });

    let syntax_policy = host.settings().schema.syntax_enforcement;
    let rules = host.matching_factories();
    rules.register(BitStringEqualityMatchingRule::CLASS_NAME, move || {
        let rule: Box<dyn MatchingRule> = Box::new(BitStringEqualityMatchingRule::new(syntax_policy));
        Ok(rule)
    });
    rules.register(CaseIgnoreEqualityMatchingRule::CLASS_NAME, || {
        let rule: Box<dyn MatchingRule> = Box::new(CaseIgnoreEqualityMatchingRule::new());
        Ok(rule)
    });

    debug!("Registered {} builtin component types", host.catalog().len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::CapabilityKind;
    use dirsrv_foundation::{ServerSettings, SyntaxEnforcementPolicy};

    #[test]
    fn test_builtins_are_registered_per_capability() {
        let host = ComponentHost::with_builtins(ServerSettings::default());

        assert_eq!(host.alert_factories().len(), 2);
        assert_eq!(host.retention_factories().len(), 2);
        assert_eq!(host.matching_factories().len(), 2);
        assert_eq!(
            host.catalog().capabilities_of(SizeBasedRetentionPolicy::CLASS_NAME),
            vec![CapabilityKind::RetentionPolicy]
        );
    }

    #[test]
    fn test_bit_string_rule_uses_settings_policy() {
        let mut settings = ServerSettings::default();
        settings.schema.syntax_enforcement = SyntaxEnforcementPolicy::Warn;
        let host = ComponentHost::with_builtins(settings);

        let constructor = host
            .matching_factories()
            .get(BitStringEqualityMatchingRule::CLASS_NAME)
            .unwrap();
        let rule = constructor().unwrap();
        assert_eq!(rule.normalize_value(b"'012'B").unwrap(), "'012'B");
    }
}
