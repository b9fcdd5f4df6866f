//! Lifecycle - 설정 변경에 따른 컴포넌트 설치/교체/해제
//!
//! - `validator`: 설치 없는 dry-run 검사
//! - `manager`: capability별 라이프사이클 매니저 (저장소 리스너)
//! - `events`: 상태 전이 이벤트 버스
//! - `state`: 엔트리 상태

mod events;
mod manager;
mod state;
mod validator;

pub use events::{LifecycleEvent, LifecycleEventBus, LifecycleEventHandler, LifecycleEventKind};
pub use manager::{LifecycleManager, LifecycleManagerConfig, StartupReport};
pub use state::ComponentState;
pub use validator::AcceptanceValidator;
