//! Registry - 서버 전역 활성 컴포넌트 테이블
//!
//! - `active_set.rs` - capability 하나의 활성 집합 (arc-swap 스냅샷)
//! - `server.rs` - capability별 활성 집합 묶음과 소비자 API

mod active_set;
mod server;

pub use active_set::{ActiveEntry, ActiveSet};
pub use server::ServerRegistry;
