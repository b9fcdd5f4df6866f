//! Core Types - 설정 변경 결과 및 거부 사유 타입

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ResultCode - 설정 변경 결과 코드
// ============================================================================

/// 설정 변경 적용 결과 코드 (LDAP result code 부분집합)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    /// 성공
    Success,
    /// 제약 조건 위반
    ConstraintViolation,
    /// 수행 거부
    UnwillingToPerform,
    /// 서버 내부 오류 (기본 실패 코드)
    Other,
}

impl ResultCode {
    /// LDAP 정수 값
    pub fn int_value(&self) -> u32 {
        match self {
            Self::Success => 0,
            Self::ConstraintViolation => 19,
            Self::UnwillingToPerform => 53,
            Self::Other => 80,
        }
    }

    /// 서버 오류 시 사용하는 결과 코드
    pub fn server_error() -> Self {
        Self::Other
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::UnwillingToPerform => write!(f, "unwilling_to_perform"),
            Self::Other => write!(f, "other"),
        }
    }
}

// ============================================================================
// ConfigChangeResult - 설정 변경 적용 결과
// ============================================================================

/// add/change/delete 적용 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChangeResult {
    /// 결과 코드
    pub result_code: ResultCode,

    /// 관리자 조치 필요 여부 (재시작해야 반영되는 변경)
    pub admin_action_required: bool,

    /// 메시지 목록
    pub messages: Vec<String>,
}

impl ConfigChangeResult {
    pub fn new(result_code: ResultCode, admin_action_required: bool, messages: Vec<String>) -> Self {
        Self {
            result_code,
            admin_action_required,
            messages,
        }
    }

    /// 성공 결과
    pub fn success() -> Self {
        Self::new(ResultCode::Success, false, Vec::new())
    }

    /// 서버 오류 결과
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(ResultCode::server_error(), false, vec![message.into()])
    }

    /// 관리자 조치 필요 플래그 설정
    pub fn with_admin_action(mut self, message: impl Into<String>) -> Self {
        self.admin_action_required = true;
        self.messages.push(message.into());
        self
    }

    /// 메시지 추가
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.result_code == ResultCode::Success
    }
}

impl Default for ConfigChangeResult {
    fn default() -> Self {
        Self::success()
    }
}

// ============================================================================
// UnacceptableReasons - 거부 사유 (Rejection Report)
// ============================================================================

/// 설정이 거부된 사유 목록. 비어 있으면 수락된 것.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnacceptableReasons(Vec<String>);

impl UnacceptableReasons {
    pub fn new() -> Self {
        Self::default()
    }

    /// 사유 추가
    pub fn push(&mut self, reason: impl Into<String>) {
        self.0.push(reason.into());
    }

    /// 다른 보고서의 사유를 이어 붙임
    pub fn extend(&mut self, other: UnacceptableReasons) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 수락 여부 (사유가 없으면 수락)
    pub fn is_acceptable(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    /// 표시용 문자열 (사유를 `".  "` 로 연결)
    pub fn joined(&self) -> String {
        self.0.join(".  ")
    }
}

impl fmt::Display for UnacceptableReasons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

impl From<Vec<String>> for UnacceptableReasons {
    fn from(reasons: Vec<String>) -> Self {
        Self(reasons)
    }
}

impl IntoIterator for UnacceptableReasons {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_result_builders() {
        let result = ConfigChangeResult::success().with_admin_action("restart needed");
        assert!(result.is_success());
        assert!(result.admin_action_required);
        assert_eq!(result.messages, vec!["restart needed".to_string()]);

        let failed = ConfigChangeResult::failure("boom");
        assert_eq!(failed.result_code, ResultCode::Other);
        assert_eq!(failed.result_code.int_value(), 80);
    }

    #[test]
    fn test_reasons_join() {
        let mut reasons = UnacceptableReasons::new();
        assert!(reasons.is_acceptable());

        reasons.push("missing limit");
        reasons.push("bad path");
        assert_eq!(reasons.to_string(), "missing limit.  bad path");
        assert_eq!(reasons.len(), 2);
    }
}
