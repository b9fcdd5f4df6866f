//! Matching Rules - 속성 값 정규화/비교 규칙

use super::traits::{Capability, CapabilityKind, ManagedComponent};
use crate::config::MatchingRuleCfg;
use crate::registry::{ActiveSet, ServerRegistry};
use async_trait::async_trait;
use dirsrv_foundation::{Error, Result, SyntaxEnforcementPolicy, UnacceptableReasons};
use tracing::warn;

// ============================================================================
// MatchingRule - capability 계약
// ============================================================================

/// Matching rule capability
pub trait MatchingRule: ManagedComponent<MatchingRuleCfg> {
    /// 규칙 이름 (예: `bitStringMatch`)
    fn name(&self) -> &str;

    /// 규칙 OID
    fn oid(&self) -> &str;

    /// 연관된 구문 OID
    fn syntax_oid(&self) -> &str;

    /// 값 정규화
    fn normalize_value(&self, value: &[u8]) -> Result<String>;

    /// 두 값이 같은지 (정규화 후 비교)
    fn values_match(&self, a: &[u8], b: &[u8]) -> Result<bool> {
        Ok(self.normalize_value(a)? == self.normalize_value(b)?)
    }
}

/// Matching rule capability descriptor
pub struct MatchingRuleCapability;

impl Capability for MatchingRuleCapability {
    type Config = MatchingRuleCfg;
    type Instance = dyn MatchingRule;

    const KIND: CapabilityKind = CapabilityKind::MatchingRule;

    fn active_set(registry: &ServerRegistry) -> &ActiveSet<dyn MatchingRule> {
        registry.matching_rules()
    }
}

// ============================================================================
// BitStringEqualityMatchingRule
// ============================================================================

pub const EMR_BIT_STRING_NAME: &str = "bitStringMatch";
pub const EMR_BIT_STRING_OID: &str = "2.5.13.16";
pub const SYNTAX_BIT_STRING_OID: &str = "1.3.6.1.4.1.1466.115.121.1.6";

/// X.520 bitStringMatch. 값은 `'0101'B` 형태로 정규화됩니다.
#[derive(Debug, Clone)]
pub struct BitStringEqualityMatchingRule {
    policy: SyntaxEnforcementPolicy,
}

impl BitStringEqualityMatchingRule {
    pub const CLASS_NAME: &'static str = "BitStringEqualityMatchingRule";

    /// 서버 기본 구문 검사 정책으로 생성
    pub fn new(default_policy: SyntaxEnforcementPolicy) -> Self {
        Self { policy: default_policy }
    }

    pub fn policy(&self) -> SyntaxEnforcementPolicy {
        self.policy
    }

    fn report_invalid_syntax(&self, value: String, message: String) -> Result<String> {
        match self.policy {
            SyntaxEnforcementPolicy::Reject => Err(Error::InvalidAttributeSyntax(message)),
            SyntaxEnforcementPolicy::Warn => {
                warn!("{}", message);
                Ok(value)
            }
            SyntaxEnforcementPolicy::Accept => Ok(value),
        }
    }
}

impl Default for BitStringEqualityMatchingRule {
    fn default() -> Self {
        Self::new(SyntaxEnforcementPolicy::default())
    }
}

#[async_trait]
impl ManagedComponent<MatchingRuleCfg> for BitStringEqualityMatchingRule {
    fn class_name(&self) -> &str {
        Self::CLASS_NAME
    }

    async fn initialize(&mut self, config: &MatchingRuleCfg) -> Result<()> {
        if let Some(policy) = config.syntax_enforcement {
            self.policy = policy;
        }
        Ok(())
    }

    fn is_configuration_acceptable(&self, _config: &MatchingRuleCfg, _reasons: &mut UnacceptableReasons) -> bool {
        true
    }
}

impl MatchingRule for BitStringEqualityMatchingRule {
    fn name(&self) -> &str {
        EMR_BIT_STRING_NAME
    }

    fn oid(&self) -> &str {
        EMR_BIT_STRING_OID
    }

    fn syntax_oid(&self) -> &str {
        SYNTAX_BIT_STRING_OID
    }

    fn normalize_value(&self, value: &[u8]) -> Result<String> {
        let original = String::from_utf8_lossy(value);
        let upper = original.to_uppercase();
        let chars: Vec<char> = upper.chars().collect();
        let length = chars.len();

        if length < 3 {
            return self.report_invalid_syntax(
                upper,
                format!("The provided value \"{}\" is too short to be a valid bit string", original),
            );
        }

        if chars[0] != '\'' || chars[length - 2] != '\'' || chars[length - 1] != 'B' {
            return self.report_invalid_syntax(
                upper,
                format!(
                    "The provided value \"{}\" is not a valid bit string because it is not \
                     surrounded by single quotes and followed by a capital letter B",
                    original
                ),
            );
        }

        if let Some(bad) = chars[1..length - 2].iter().find(|c| **c != '0' && **c != '1') {
            let message = format!(
                "The provided value \"{}\" is not a valid bit string because '{}' is not a valid binary digit",
                original, bad
            );
            return self.report_invalid_syntax(upper, message);
        }

        Ok(upper)
    }
}

// ============================================================================
// CaseIgnoreEqualityMatchingRule
// ============================================================================

pub const EMR_CASE_IGNORE_NAME: &str = "caseIgnoreMatch";
pub const EMR_CASE_IGNORE_OID: &str = "2.5.13.2";
pub const SYNTAX_DIRECTORY_STRING_OID: &str = "1.3.6.1.4.1.1466.115.121.1.15";

/// caseIgnoreMatch. 앞뒤 공백 제거, 내부 공백 축약, 소문자화.
#[derive(Debug, Clone, Default)]
pub struct CaseIgnoreEqualityMatchingRule;

impl CaseIgnoreEqualityMatchingRule {
    pub const CLASS_NAME: &'static str = "CaseIgnoreEqualityMatchingRule";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ManagedComponent<MatchingRuleCfg> for CaseIgnoreEqualityMatchingRule {
    fn class_name(&self) -> &str {
        Self::CLASS_NAME
    }

    async fn initialize(&mut self, _config: &MatchingRuleCfg) -> Result<()> {
        Ok(())
    }

    fn is_configuration_acceptable(&self, _config: &MatchingRuleCfg, _reasons: &mut UnacceptableReasons) -> bool {
        true
    }
}

impl MatchingRule for CaseIgnoreEqualityMatchingRule {
    fn name(&self) -> &str {
        EMR_CASE_IGNORE_NAME
    }

    fn oid(&self) -> &str {
        EMR_CASE_IGNORE_OID
    }

    fn syntax_oid(&self) -> &str {
        SYNTAX_DIRECTORY_STRING_OID
    }

    fn normalize_value(&self, value: &[u8]) -> Result<String> {
        let text = String::from_utf8_lossy(value);
        Ok(text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_string_normalizes_to_upper() {
        let rule = BitStringEqualityMatchingRule::default();
        assert_eq!(rule.normalize_value(b"'0101'b").unwrap(), "'0101'B");
        assert!(rule.values_match(b"'01'B", b"'01'b").unwrap());
    }

    #[test]
    fn test_bit_string_reject_policy() {
        let rule = BitStringEqualityMatchingRule::new(SyntaxEnforcementPolicy::Reject);
        assert!(matches!(rule.normalize_value(b"'B"), Err(Error::InvalidAttributeSyntax(_))));
        assert!(matches!(rule.normalize_value(b"0101B"), Err(Error::InvalidAttributeSyntax(_))));
        assert!(matches!(rule.normalize_value(b"'0121'B"), Err(Error::InvalidAttributeSyntax(_))));
    }

    #[tokio::test]
    async fn test_bit_string_config_override() {
        let mut rule = BitStringEqualityMatchingRule::new(SyntaxEnforcementPolicy::Reject);
        let cfg = MatchingRuleCfg::new(
            dirsrv_foundation::Dn::parse("cn=bitStringMatch,cn=Matching Rules,cn=config").unwrap(),
            BitStringEqualityMatchingRule::CLASS_NAME,
        )
        .with_syntax_enforcement(SyntaxEnforcementPolicy::Warn);

        rule.initialize(&cfg).await.unwrap();
        assert_eq!(rule.policy(), SyntaxEnforcementPolicy::Warn);
        assert_eq!(rule.normalize_value(b"'0121'b").unwrap(), "'0121'B");

        let accepting = BitStringEqualityMatchingRule::new(SyntaxEnforcementPolicy::Accept);
        assert_eq!(accepting.normalize_value(b"x").unwrap(), "X");
    }

    #[test]
    fn test_case_ignore() {
        let rule = CaseIgnoreEqualityMatchingRule::new();
        assert_eq!(rule.normalize_value(b"  Hello   World ").unwrap(), "hello world");
    }
}
