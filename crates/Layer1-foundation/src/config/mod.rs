//! Config - 서버 전역 설정
//!
//! - `server.rs` - ServerSettings (라이프사이클, 스키마 정책)

mod server;

pub use server::{
    LifecycleSettings, SchemaSettings, ServerSettings, SyntaxEnforcementPolicy, CONFIG_DIR_NAME,
    SERVER_LOCAL_SETTINGS_FILE, SERVER_SETTINGS_FILE,
};
