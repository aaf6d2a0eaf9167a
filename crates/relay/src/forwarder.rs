//! 전달 포워더 -- 레코드 직렬화 및 싱크 전달
//!
//! [`Forwarder`]는 수락된 레코드를 JSON 한 줄로 직렬화하여 설정된
//! 싱크에 TCP로 전달합니다.
//!
//! # 연결 규율
//! 전달 단위마다 연결을 하나 열고, 한 레코드만 쓰고, 닫습니다.
//! 연결 풀링이나 재사용은 없습니다. 연결 수립은 고정 타임아웃으로
//! 제한되며, 소켓은 성공/실패 어느 경로에서든 스코프 종료 시 해제됩니다.
//!
//! # 재시도 정책
//! 시도 실패(타임아웃, 연결 거부, 전송 에러) 시 최대 시도 횟수까지
//! 재시도하며, 시도 사이에만(마지막 시도 후에는 아님) 고정 간격을
//! 대기합니다. 모든 시도가 실패하면 레코드를 폐기하고
//! [`DeliveryOutcome::Abandoned`]를 반환합니다.
//!
//! 취소 토큰은 연결 대기와 재시도 대기 양쪽에서 검사됩니다. 전달 도중
//! 취소가 발화하면 진행 중인 레코드는 즉시 포기됩니다.

use std::time::Duration;

use metrics::counter;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use eventpost_core::metrics::RELAY_DELIVERY_ATTEMPTS_TOTAL;
use eventpost_core::types::{DeliveryOutcome, EventRecord};

use crate::config::PipelineConfig;
use crate::error::RelayError;

/// 싱크 연결 설정
///
/// 프로세스 수명 동안 불변입니다.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// 싱크 호스트
    pub host: String,
    /// 싱크 포트
    pub port: u16,
    /// 연결 수립 타임아웃
    pub connect_timeout: Duration,
    /// 레코드당 최대 시도 횟수
    pub max_attempts: u32,
    /// 시도 사이의 대기 간격
    pub retry_interval: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 6514,
            connect_timeout: Duration::from_secs(5),
            max_attempts: 3,
            retry_interval: Duration::from_secs(5),
        }
    }
}

impl SinkConfig {
    /// 파이프라인 설정에서 싱크 설정을 만듭니다.
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        Self {
            host: config.sink_host.clone(),
            port: config.sink_port,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            max_attempts: config.max_attempts,
            retry_interval: Duration::from_secs(config.retry_interval_secs),
        }
    }
}

/// 전달 포워더
pub struct Forwarder {
    /// 싱크 설정
    config: SinkConfig,
}

impl Forwarder {
    /// 새 포워더를 생성합니다.
    pub fn new(config: SinkConfig) -> Self {
        Self { config }
    }

    /// 싱크 주소를 `host:port` 형태로 반환합니다.
    pub fn sink_addr(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// 레코드 하나를 싱크에 전달합니다.
    ///
    /// 직렬화 실패만 `Err`로 보고하며, 전송 실패는 재시도 후
    /// [`DeliveryOutcome`]으로 종결됩니다. 재시도 상태는 레코드 간에
    /// 이월되지 않습니다. 연결 대기 또는 재시도 대기 중 취소가 발화하면
    /// 레코드를 즉시 포기합니다.
    pub async fn forward(
        &self,
        record: &EventRecord,
        cancel: &CancellationToken,
    ) -> Result<DeliveryOutcome, RelayError> {
        let mut line =
            serde_json::to_string(record).map_err(|e| RelayError::MalformedRecord {
                reason: format!("serialization failed: {e}"),
            })?;
        line.push('\n');

        for attempt in 1..=self.config.max_attempts {
            counter!(RELAY_DELIVERY_ATTEMPTS_TOTAL).increment(1);
            let result = tokio::select! {
                result = self.attempt(line.as_bytes()) => result,
                _ = cancel.cancelled() => {
                    warn!(attempt, "delivery cancelled mid-attempt, discarding record");
                    return Ok(DeliveryOutcome::Abandoned);
                }
            };
            match result {
                Ok(()) => {
                    debug!(attempt, sink = %self.sink_addr(), "record delivered");
                    return Ok(DeliveryOutcome::Delivered);
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        "delivery attempt failed"
                    );
                    if attempt < self.config.max_attempts {
                        tokio::select! {
                            _ = tokio::time::sleep(self.config.retry_interval) => {}
                            _ = cancel.cancelled() => {
                                warn!(attempt, "delivery cancelled during retry wait, discarding record");
                                return Ok(DeliveryOutcome::Abandoned);
                            }
                        }
                    }
                }
            }
        }

        warn!(
            sink = %self.sink_addr(),
            attempts = self.config.max_attempts,
            timestamp = %record.timestamp,
            "delivery abandoned, discarding record"
        );
        Ok(DeliveryOutcome::Abandoned)
    }

    /// 단일 전달 시도. 연결 → 쓰기 → 종료.
    ///
    /// 스트림은 이 함수의 스코프를 벗어나며 모든 경로에서 해제됩니다.
    async fn attempt(&self, payload: &[u8]) -> Result<(), RelayError> {
        let addr = self.sink_addr();

        let mut stream = timeout(self.config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| self.sink_error("connect timed out".to_owned()))?
            .map_err(|e| self.sink_error(format!("connect failed: {e}")))?;

        stream
            .write_all(payload)
            .await
            .map_err(|e| self.sink_error(format!("write failed: {e}")))?;

        stream
            .shutdown()
            .await
            .map_err(|e| self.sink_error(format!("shutdown failed: {e}")))?;

        Ok(())
    }

    fn sink_error(&self, reason: String) -> RelayError {
        RelayError::Sink {
            host: self.config.host.clone(),
            port: self.config.port,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Instant;

    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    fn sample_record() -> EventRecord {
        let mut attributes = BTreeMap::new();
        attributes.insert("RuleName".to_owned(), "Alert1".to_owned());
        EventRecord {
            timestamp: "2024-01-15T12:00:00Z".to_owned(),
            hostname: "host1".to_owned(),
            attributes,
        }
    }

    fn test_config(port: u16, max_attempts: u32, retry_ms: u64) -> SinkConfig {
        SinkConfig {
            host: "127.0.0.1".to_owned(),
            port,
            connect_timeout: Duration::from_secs(1),
            max_attempts,
            retry_interval: Duration::from_millis(retry_ms),
        }
    }

    /// 사용 가능한 로컬 포트를 예약했다가 닫아서 "연결 거부" 주소를 만듭니다.
    async fn refused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn delivers_newline_terminated_json() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let sink = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut line = String::new();
            BufReader::new(stream).read_line(&mut line).await.unwrap();
            line
        });

        let forwarder = Forwarder::new(test_config(port, 3, 10));
        let outcome = forwarder
            .forward(&sample_record(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, DeliveryOutcome::Delivered);

        let line = sink.await.unwrap();
        assert!(line.ends_with('\n'));
        let json: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(json["Hostname"], "host1");
        assert_eq!(json["Message"]["RuleName"], "Alert1");
    }

    #[tokio::test]
    async fn abandons_after_exhausting_attempts() {
        let port = refused_port().await;
        let forwarder = Forwarder::new(test_config(port, 3, 100));

        let start = Instant::now();
        let outcome = forwarder
            .forward(&sample_record(), &CancellationToken::new())
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(outcome, DeliveryOutcome::Abandoned);
        // 시도 사이 2회의 대기 (마지막 시도 후에는 대기 없음)
        assert!(elapsed >= Duration::from_millis(200), "elapsed: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(800), "elapsed: {elapsed:?}");
    }

    #[tokio::test]
    async fn single_attempt_has_no_backoff_wait() {
        let port = refused_port().await;
        let forwarder = Forwarder::new(test_config(port, 1, 5_000));

        let start = Instant::now();
        let outcome = forwarder
            .forward(&sample_record(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, DeliveryOutcome::Abandoned);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn cancellation_interrupts_retry_wait() {
        let port = refused_port().await;
        // 재시도 간격이 5초여도 취소 즉시 포기해야 함
        let forwarder = Forwarder::new(test_config(port, 3, 5_000));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let outcome = forwarder.forward(&sample_record(), &cancel).await.unwrap();

        assert_eq!(outcome, DeliveryOutcome::Abandoned);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn recovers_when_sink_comes_back() {
        let port = refused_port().await;
        let addr = format!("127.0.0.1:{port}");

        // 첫 시도 실패 후 재시도 전에 싱크를 살림
        let sink = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let listener = TcpListener::bind(addr).await.unwrap();
            let (stream, _) = listener.accept().await.unwrap();
            let mut line = String::new();
            BufReader::new(stream).read_line(&mut line).await.unwrap();
            line
        });

        let forwarder = Forwarder::new(test_config(port, 3, 300));
        let outcome = forwarder
            .forward(&sample_record(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert!(!sink.await.unwrap().is_empty());
    }
}
