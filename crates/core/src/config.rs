//! 설정 관리 — eventpost.toml 파싱 및 런타임 설정
//!
//! [`EventpostConfig`]는 데몬과 릴레이 파이프라인의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`EVENTPOST_RELAY_SINK_HOST=10.0.0.5` 형식)
//! 3. 설정 파일 (`eventpost.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), eventpost_core::error::EventpostError> {
//! use eventpost_core::config::EventpostConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = EventpostConfig::load("eventpost.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = EventpostConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, EventpostError};

/// Eventpost 통합 설정
///
/// `eventpost.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventpostConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 릴레이 파이프라인 설정
    #[serde(default)]
    pub relay: RelayConfig,
}

impl EventpostConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, EventpostError> {
        let mut config = Self::from_file(path).await?;
        for warning in config.apply_env_overrides() {
            warn!("{warning}");
        }
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, EventpostError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EventpostError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                EventpostError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, EventpostError> {
        toml::from_str(toml_str).map_err(|e| {
            EventpostError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `EVENTPOST_{SECTION}_{FIELD}`
    /// 예: `EVENTPOST_RELAY_SINK_PORT=6514`
    ///
    /// 해석할 수 없어 무시된 오버라이드는 경고 메시지로 반환됩니다.
    /// 로깅 초기화 전에 호출될 수 있으므로 직접 로그를 남기지 않으며,
    /// 호출자가 구독자를 올린 뒤 기록합니다.
    #[must_use]
    pub fn apply_env_overrides(&mut self) -> Vec<String> {
        let results = [
            // General
            override_string(&mut self.general.log_level, "EVENTPOST_GENERAL_LOG_LEVEL"),
            override_string(&mut self.general.log_format, "EVENTPOST_GENERAL_LOG_FORMAT"),
            // Relay
            override_bool(&mut self.relay.enabled, "EVENTPOST_RELAY_ENABLED"),
            override_string(
                &mut self.relay.source_command,
                "EVENTPOST_RELAY_SOURCE_COMMAND",
            ),
            override_csv(&mut self.relay.source_args, "EVENTPOST_RELAY_SOURCE_ARGS"),
            override_string(&mut self.relay.sink_host, "EVENTPOST_RELAY_SINK_HOST"),
            override_u16(&mut self.relay.sink_port, "EVENTPOST_RELAY_SINK_PORT"),
            override_u64(
                &mut self.relay.connect_timeout_secs,
                "EVENTPOST_RELAY_CONNECT_TIMEOUT_SECS",
            ),
            override_u32(&mut self.relay.max_attempts, "EVENTPOST_RELAY_MAX_ATTEMPTS"),
            override_u64(
                &mut self.relay.retry_interval_secs,
                "EVENTPOST_RELAY_RETRY_INTERVAL_SECS",
            ),
            override_csv(&mut self.relay.exclude_rules, "EVENTPOST_RELAY_EXCLUDE_RULES"),
        ];
        results.into_iter().flatten().collect()
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), EventpostError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // relay 섹션은 활성화된 경우에만 검증
        if self.relay.enabled {
            if self.relay.source_command.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "relay.source_command".to_owned(),
                    reason: "source command must not be empty when relay is enabled".to_owned(),
                }
                .into());
            }

            if self.relay.sink_host.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "relay.sink_host".to_owned(),
                    reason: "sink host must not be empty when relay is enabled".to_owned(),
                }
                .into());
            }

            if self.relay.sink_port == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "relay.sink_port".to_owned(),
                    reason: "must be 1-65535".to_owned(),
                }
                .into());
            }

            const MAX_CONNECT_TIMEOUT_SECS: u64 = 300; // 5 minutes
            if self.relay.connect_timeout_secs == 0
                || self.relay.connect_timeout_secs > MAX_CONNECT_TIMEOUT_SECS
            {
                return Err(ConfigError::InvalidValue {
                    field: "relay.connect_timeout_secs".to_owned(),
                    reason: format!("must be 1-{}", MAX_CONNECT_TIMEOUT_SECS),
                }
                .into());
            }

            const MAX_DELIVERY_ATTEMPTS: u32 = 100;
            if self.relay.max_attempts == 0 || self.relay.max_attempts > MAX_DELIVERY_ATTEMPTS {
                return Err(ConfigError::InvalidValue {
                    field: "relay.max_attempts".to_owned(),
                    reason: format!("must be 1-{}", MAX_DELIVERY_ATTEMPTS),
                }
                .into());
            }

            const MAX_RETRY_INTERVAL_SECS: u64 = 3600; // 1 hour
            if self.relay.retry_interval_secs > MAX_RETRY_INTERVAL_SECS {
                return Err(ConfigError::InvalidValue {
                    field: "relay.retry_interval_secs".to_owned(),
                    reason: format!("must be 0-{}", MAX_RETRY_INTERVAL_SECS),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 릴레이 파이프라인 설정
///
/// 소스 프로세스, 싱크 주소, 전달 재시도 정책, 규칙 제외 목록을 담습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
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
    ///
    /// 기본값은 빈 문자열과 `-` 플레이스홀더로,
    /// "매칭된 규칙 없음"을 뜻하는 레코드를 걸러냅니다.
    pub exclude_rules: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_command: "wevtutil".to_owned(),
            source_args: vec![
                "qe".to_owned(),
                "Microsoft-Windows-Sysmon/Operational".to_owned(),
                "/f:xml".to_owned(),
            ],
            sink_host: "127.0.0.1".to_owned(),
            sink_port: 6514,
            connect_timeout_secs: 5,
            max_attempts: 3,
            retry_interval_secs: 5,
            exclude_rules: vec![String::new(), "-".to_owned()],
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---
// 각 헬퍼는 무시된 오버라이드에 대한 경고 메시지를 반환합니다.

fn override_string(target: &mut String, env_key: &str) -> Option<String> {
    if let Ok(value) = std::env::var(env_key) {
        *target = value;
    }
    None
}

fn override_bool(target: &mut bool, env_key: &str) -> Option<String> {
    let value = std::env::var(env_key).ok()?;
    match value.parse::<bool>() {
        Ok(parsed) => {
            *target = parsed;
            None
        }
        Err(_) => Some(format!(
            "ignoring invalid boolean env override: {env_key}={value}"
        )),
    }
}

fn override_u16(target: &mut u16, env_key: &str) -> Option<String> {
    let value = std::env::var(env_key).ok()?;
    match value.parse::<u16>() {
        Ok(parsed) => {
            *target = parsed;
            None
        }
        Err(_) => Some(format!(
            "ignoring invalid u16 env override: {env_key}={value}"
        )),
    }
}

fn override_u32(target: &mut u32, env_key: &str) -> Option<String> {
    let value = std::env::var(env_key).ok()?;
    match value.parse::<u32>() {
        Ok(parsed) => {
            *target = parsed;
            None
        }
        Err(_) => Some(format!(
            "ignoring invalid u32 env override: {env_key}={value}"
        )),
    }
}

fn override_u64(target: &mut u64, env_key: &str) -> Option<String> {
    let value = std::env::var(env_key).ok()?;
    match value.parse::<u64>() {
        Ok(parsed) => {
            *target = parsed;
            None
        }
        Err(_) => Some(format!(
            "ignoring invalid u64 env override: {env_key}={value}"
        )),
    }
}

/// 쉼표 구분 목록 오버라이드. 빈 문자열 항목도 그대로 유지합니다
/// (제외 규칙 목록에서 빈 문자열은 유효한 멤버입니다).
fn override_csv(target: &mut Vec<String>, env_key: &str) -> Option<String> {
    if let Ok(value) = std::env::var(env_key) {
        *target = value.split(',').map(str::to_owned).collect();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EventpostConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn default_exclusions_are_empty_and_dash() {
        let config = RelayConfig::default();
        assert_eq!(config.exclude_rules, vec![String::new(), "-".to_owned()]);
    }

    #[test]
    fn parse_minimal_toml() {
        let config = EventpostConfig::parse(
            r#"
            [general]
            log_level = "debug"

            [relay]
            sink_host = "10.0.0.5"
            sink_port = 7000
            "#,
        )
        .unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.relay.sink_host, "10.0.0.5");
        assert_eq!(config.relay.sink_port, 7000);
        // 섹션에 없는 필드는 기본값으로 채워짐
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.relay.max_attempts, 3);
        assert_eq!(config.relay.retry_interval_secs, 5);
        assert_eq!(config.relay.exclude_rules, vec![String::new(), "-".to_owned()]);
    }

    #[test]
    fn parse_rejects_malformed_toml() {
        let result = EventpostConfig::parse("[general\nlog_level = ");
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = EventpostConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = EventpostConfig::default();
        config.general.log_format = "xml".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_sink_port() {
        let mut config = EventpostConfig::default();
        config.relay.sink_port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sink_port"));
    }

    #[test]
    fn validate_rejects_zero_max_attempts() {
        let mut config = EventpostConfig::default();
        config.relay.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_source_command_when_enabled() {
        let mut config = EventpostConfig::default();
        config.relay.source_command.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_skips_relay_checks_when_disabled() {
        let mut config = EventpostConfig::default();
        config.relay.enabled = false;
        config.relay.source_command.clear();
        config.relay.sink_port = 0;
        config.validate().unwrap();
    }

    #[test]
    fn env_override_parses_port() {
        // 이 테스트 전용 환경변수 키를 사용하여 병렬 테스트와 격리
        let mut port: u16 = 6514;
        unsafe { std::env::set_var("EVENTPOST_TEST_PORT_OVERRIDE", "9200") };
        let warning = override_u16(&mut port, "EVENTPOST_TEST_PORT_OVERRIDE");
        unsafe { std::env::remove_var("EVENTPOST_TEST_PORT_OVERRIDE") };
        assert_eq!(port, 9200);
        assert!(warning.is_none());
    }

    #[test]
    fn env_override_reports_invalid_number() {
        let mut attempts: u32 = 3;
        unsafe { std::env::set_var("EVENTPOST_TEST_ATTEMPTS_OVERRIDE", "many") };
        let warning = override_u32(&mut attempts, "EVENTPOST_TEST_ATTEMPTS_OVERRIDE");
        unsafe { std::env::remove_var("EVENTPOST_TEST_ATTEMPTS_OVERRIDE") };
        // 값은 유지되고, 무시 사유가 경고 메시지로 반환됨
        assert_eq!(attempts, 3);
        let warning = warning.unwrap();
        assert!(warning.contains("EVENTPOST_TEST_ATTEMPTS_OVERRIDE"));
        assert!(warning.contains("many"));
    }

    #[test]
    fn env_override_csv_keeps_empty_members() {
        let mut rules = vec!["old".to_owned()];
        unsafe { std::env::set_var("EVENTPOST_TEST_RULES_OVERRIDE", ",-,Alert1") };
        override_csv(&mut rules, "EVENTPOST_TEST_RULES_OVERRIDE");
        unsafe { std::env::remove_var("EVENTPOST_TEST_RULES_OVERRIDE") };
        assert_eq!(
            rules,
            vec![String::new(), "-".to_owned(), "Alert1".to_owned()]
        );
    }

    #[tokio::test]
    async fn from_file_reports_missing_file() {
        let err = EventpostConfig::from_file("/nonexistent/eventpost.toml")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn from_file_loads_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eventpost.toml");
        tokio::fs::write(
            &path,
            "[relay]\nsink_host = \"collector.internal\"\nsink_port = 6514\n",
        )
        .await
        .unwrap();

        let config = EventpostConfig::from_file(&path).await.unwrap();
        assert_eq!(config.relay.sink_host, "collector.internal");
    }
}
