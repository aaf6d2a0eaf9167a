#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`buffer`]: 잔여 텍스트 누적 및 완전한 레코드 블록 추출
//! - [`parser`]: 레코드 블록에서 Timestamp/Hostname/속성 정규화
//! - [`filter`]: 규칙명 기반 제외 판정
//! - [`forwarder`]: JSON 직렬화 및 TCP 전달 (재시도 포함)
//! - [`source`]: 외부 프로세스 라인 스트림 추상화
//! - [`pipeline`]: 전체 파이프라인 오케스트레이션
//! - [`config`]: 파이프라인 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌─────────────┐
//! │ EventSource  │──▶│ RecordBuffer │──▶│ EventParser │
//! │ (외부 명령)  │   │ (조각 조립)  │   │ (정규화)    │
//! └──────────────┘   └──────────────┘   └──────┬──────┘
//!                                              │
//!                    ┌──────────────┐   ┌──────▼──────┐
//!                    │  Forwarder   │◀──│ RuleFilter  │
//!                    │ (TCP 전달)   │   │ (제외 판정) │
//!                    └──────────────┘   └─────────────┘
//! ```
//!
//! [`EventRelay`]가 위 구성 요소를 단일 태스크에서 순서대로 구동합니다.
//! 레코드 하나의 전달이 종결되어야 다음 레코드로 진행하므로 전달 순서는
//! 항상 추출 순서와 같습니다.

pub mod buffer;
pub mod config;
pub mod error;
pub mod filter;
pub mod forwarder;
pub mod parser;
pub mod pipeline;
pub mod source;

pub use buffer::RecordBuffer;
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::RelayError;
pub use filter::RuleFilter;
pub use forwarder::{Forwarder, SinkConfig};
pub use parser::EventParser;
pub use pipeline::{EventRelay, EventRelayBuilder};
pub use source::{CommandSource, EventSource, StaticSource};
