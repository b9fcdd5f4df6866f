//! # dirsrv-foundation
//!
//! Foundation layer for dirsrv:
//! - Error: 중앙 에러 타입 (라이프사이클 에러 분류 포함)
//! - Core: 설정 엔트리 식별자 (Dn), 변경 결과, 거부 사유
//! - Config: 서버 전역 설정 (ServerSettings)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Layer3-server (dirsrv CLI)                             │
//! ├─────────────────────────────────────────────────────────┤
//! │  Layer2-core                                            │
//! │  ├── Capability contracts / Component loader            │
//! │  ├── Lifecycle managers (add / change / delete)         │
//! │  └── Server registry (active instances)                 │
//! ├─────────────────────────────────────────────────────────┤
//! │  Layer1-foundation (이 레이어)                           │
//! │  ├── Error / Result                                     │
//! │  ├── Dn, ConfigChangeResult, UnacceptableReasons        │
//! │  └── ServerSettings                                     │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod error;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core (식별자 및 결과 타입)
// ============================================================================
pub use core::{ConfigChangeResult, Dn, ResultCode, UnacceptableReasons};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    LifecycleSettings, SchemaSettings, ServerSettings, SyntaxEnforcementPolicy, CONFIG_DIR_NAME,
    SERVER_LOCAL_SETTINGS_FILE, SERVER_SETTINGS_FILE,
};
