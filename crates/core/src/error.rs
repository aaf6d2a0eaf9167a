//! 에러 타입 — 도메인별 에러 정의

/// Eventpost 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum EventpostError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 소스 스트림 에러 (프로세스 스폰 실패, 읽기 실패 등)
    #[error("source failed: {0}")]
    SourceFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = EventpostError::Config(ConfigError::InvalidValue {
            field: "relay.sink_port".to_owned(),
            reason: "must not be 0".to_owned(),
        });
        let msg = err.to_string();
        assert!(msg.contains("relay.sink_port"));
        assert!(msg.contains("must not be 0"));
    }

    #[test]
    fn file_not_found_display() {
        let err = ConfigError::FileNotFound {
            path: "/etc/eventpost/eventpost.toml".to_owned(),
        };
        assert!(err.to_string().contains("eventpost.toml"));
    }

    #[test]
    fn pipeline_error_converts_to_top_level() {
        let err: EventpostError = PipelineError::SourceFailed("stdout closed".to_owned()).into();
        assert!(matches!(err, EventpostError::Pipeline(_)));
        assert!(err.to_string().contains("stdout closed"));
    }

    #[test]
    fn io_error_converts_to_top_level() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: EventpostError = io.into();
        assert!(matches!(err, EventpostError::Io(_)));
    }
}
