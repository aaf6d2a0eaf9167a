//! 릴레이 파이프라인 에러 타입
//!
//! [`RelayError`]는 릴레이 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<RelayError> for EventpostError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use eventpost_core::error::{EventpostError, PipelineError};

/// 릴레이 파이프라인 도메인 에러
///
/// 레코드 정규화, 소스 스트림, 싱크 전달, 설정 등 파이프라인 내부의
/// 모든 에러 상황을 포괄합니다. 레코드 단위 에러는 파이프라인을
/// 중단시키지 않고 해당 레코드만 폐기합니다.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// 레코드 정규화 실패 (필수 필드 누락, 크기 초과 등)
    #[error("malformed record: {reason}")]
    MalformedRecord {
        /// 실패 사유
        reason: String,
    },

    /// 소스 스트림 에러 (프로세스 스폰/읽기/종료 실패)
    #[error("source error: {reason}")]
    Source {
        /// 에러 사유
        reason: String,
    },

    /// 싱크 전달 에러 (단일 시도 기준)
    #[error("sink error: {host}:{port}: {reason}")]
    Sink {
        /// 싱크 호스트
        host: String,
        /// 싱크 포트
        port: u16,
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RelayError> for EventpostError {
    fn from(err: RelayError) -> Self {
        let reason = err.to_string();
        match err {
            RelayError::Source { .. } => {
                EventpostError::Pipeline(PipelineError::SourceFailed(reason))
            }
            _ => EventpostError::Pipeline(PipelineError::InitFailed(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_record_display() {
        let err = RelayError::MalformedRecord {
            reason: "no TimeCreated SystemTime attribute or UtcTime data value".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("malformed record"));
        assert!(msg.contains("UtcTime"));
    }

    #[test]
    fn sink_error_includes_address() {
        let err = RelayError::Sink {
            host: "collector.internal".to_owned(),
            port: 6514,
            reason: "connection refused".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("collector.internal:6514"));
        assert!(msg.contains("refused"));
    }

    #[test]
    fn source_error_converts_to_source_failed() {
        let err = RelayError::Source {
            reason: "child exited".to_owned(),
        };
        let top: EventpostError = err.into();
        assert!(matches!(
            top,
            EventpostError::Pipeline(PipelineError::SourceFailed(_))
        ));
    }

    #[test]
    fn config_error_converts_to_init_failed() {
        let err = RelayError::Config {
            field: "max_attempts".to_owned(),
            reason: "must be 1-100".to_owned(),
        };
        let top: EventpostError = err.into();
        assert!(matches!(
            top,
            EventpostError::Pipeline(PipelineError::InitFailed(_))
        ));
    }
}
