//! Core Module - 설정 식별자 및 변경 결과 타입
//!
//! ## 타입 계층
//!
//! - `dn.rs`: 설정 엔트리 식별자 (Dn)
//! - `types.rs`: 변경 결과 (ConfigChangeResult, ResultCode), 거부 사유 (UnacceptableReasons)

pub mod dn;
pub mod types;

pub use dn::Dn;
pub use types::{ConfigChangeResult, ResultCode, UnacceptableReasons};
