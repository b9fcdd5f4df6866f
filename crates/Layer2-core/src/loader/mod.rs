//! Loader - 타입 이름 기반 컴포넌트 로더
//!
//! - `catalog.rs` - 타입 이름 → capability 색인 (모든 테이블 공유)
//! - `factory.rs` - capability별 생성자 테이블
//! - `component_loader.rs` - 해석 / 생성 / 초기화 또는 자체 검사

mod catalog;
mod component_loader;
mod factory;

pub use catalog::TypeCatalog;
pub use component_loader::ComponentLoader;
pub use factory::{Constructor, FactoryTable};
