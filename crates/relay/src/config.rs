//! 릴레이 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`RelayConfig`](eventpost_core::config::RelayConfig)를
//! 기반으로 파이프라인 전용 확장 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use eventpost_core::config::EventpostConfig;
//! use eventpost_relay::config::PipelineConfig;
//!
//! let core_config = EventpostConfig::default();
//! let config = PipelineConfig::from_core(&core_config.relay);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// 릴레이 파이프라인 설정
///
/// core의 `RelayConfig`에서 파생되며, 파이프라인 내부에서
/// 사용하는 추가 설정을 포함합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 이벤트 스트림을 생성하는 외부 명령
    pub source_command: String,
    /// 외부 명령 인자 목록
    pub source_args: Vec<String>,
    /// 싱크 호스트
    pub sink_host: String,
    /// 싱크 포트
    pub sink_port: u16,
    /// 싱크 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
    /// 레코드당 최대 전달 시도 횟수
    pub max_attempts: u32,
    /// 시도 사이의 대기 간격 (초)
    pub retry_interval_secs: u64,
    /// 제외할 규칙명 목록
    pub exclude_rules: Vec<String>,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 잔여 버퍼 크기 상한 (바이트)
    ///
    /// 열림 마커가 전혀 없는 텍스트가 이 크기를 넘으면 폐기합니다.
    pub max_buffer_bytes: usize,
    /// 단일 레코드 크기 상한 (바이트)
    pub max_record_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_core(&eventpost_core::config::RelayConfig::default())
    }
}

impl PipelineConfig {
    /// core의 `RelayConfig`에서 파이프라인 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &eventpost_core::config::RelayConfig) -> Self {
        Self {
            enabled: core.enabled,
            source_command: core.source_command.clone(),
            source_args: core.source_args.clone(),
            sink_host: core.sink_host.clone(),
            sink_port: core.sink_port,
            connect_timeout_secs: core.connect_timeout_secs,
            max_attempts: core.max_attempts,
            retry_interval_secs: core.retry_interval_secs,
            exclude_rules: core.exclude_rules.clone(),
            max_buffer_bytes: 4 * 1024 * 1024, // 4MB
            max_record_bytes: 256 * 1024,      // 256KB
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), RelayError> {
        const MAX_DELIVERY_ATTEMPTS: u32 = 100;
        const MAX_RETRY_INTERVAL_SECS: u64 = 3600; // 1 hour
        const MAX_CONNECT_TIMEOUT_SECS: u64 = 300; // 5 minutes

        if self.sink_host.is_empty() {
            return Err(RelayError::Config {
                field: "sink_host".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.sink_port == 0 {
            return Err(RelayError::Config {
                field: "sink_port".to_owned(),
                reason: "must be 1-65535".to_owned(),
            });
        }

        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > MAX_CONNECT_TIMEOUT_SECS {
            return Err(RelayError::Config {
                field: "connect_timeout_secs".to_owned(),
                reason: format!("must be 1-{}", MAX_CONNECT_TIMEOUT_SECS),
            });
        }

        if self.max_attempts == 0 || self.max_attempts > MAX_DELIVERY_ATTEMPTS {
            return Err(RelayError::Config {
                field: "max_attempts".to_owned(),
                reason: format!("must be 1-{}", MAX_DELIVERY_ATTEMPTS),
            });
        }

        if self.retry_interval_secs > MAX_RETRY_INTERVAL_SECS {
            return Err(RelayError::Config {
                field: "retry_interval_secs".to_owned(),
                reason: format!("must be 0-{}", MAX_RETRY_INTERVAL_SECS),
            });
        }

        if self.max_record_bytes == 0 {
            return Err(RelayError::Config {
                field: "max_record_bytes".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.max_buffer_bytes < self.max_record_bytes {
            return Err(RelayError::Config {
                field: "max_buffer_bytes".to_owned(),
                reason: "must be at least max_record_bytes".to_owned(),
            });
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 싱크 주소를 설정합니다.
    pub fn sink(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.sink_host = host.into();
        self.config.sink_port = port;
        self
    }

    /// 소스 명령을 설정합니다.
    pub fn source_command(mut self, command: impl Into<String>, args: Vec<String>) -> Self {
        self.config.source_command = command.into();
        self.config.source_args = args;
        self
    }

    /// 연결 타임아웃(초)을 설정합니다.
    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    /// 최대 전달 시도 횟수를 설정합니다.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// 재시도 간격(초)을 설정합니다.
    pub fn retry_interval_secs(mut self, secs: u64) -> Self {
        self.config.retry_interval_secs = secs;
        self
    }

    /// 제외 규칙 목록을 설정합니다.
    pub fn exclude_rules(mut self, rules: Vec<String>) -> Self {
        self.config.exclude_rules = rules;
        self
    }

    /// 잔여 버퍼 상한(바이트)을 설정합니다.
    pub fn max_buffer_bytes(mut self, bytes: usize) -> Self {
        self.config.max_buffer_bytes = bytes;
        self
    }

    /// 단일 레코드 상한(바이트)을 설정합니다.
    pub fn max_record_bytes(mut self, bytes: usize) -> Self {
        self.config.max_record_bytes = bytes;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, RelayError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
