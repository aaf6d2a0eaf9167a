//! 파이프라인 오케스트레이션 -- 읽기/추출/정규화/필터/전달의 전체 흐름
//!
//! [`EventRelay`]는 소스에서 라인을 읽어 버퍼에 쌓고, 완성된 레코드를
//! 추출 순서 그대로 정규화 → 필터 → 전달 단계에 동기적으로 통과시킵니다.
//! 레코드 *n*의 전달이 종결(성공 또는 포기)되기 전에는 레코드 *n+1*의
//! 전달이 시작되지 않으므로, 전달 순서는 항상 소스 순서와 일치하고
//! 메모리는 "현재 버퍼 + 전달 중 레코드 하나"로 제한됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! EventSource -> RecordBuffer -> EventParser -> RuleFilter -> Forwarder -> TCP sink
//! ```
//!
//! 레코드 단위 실패(정규화 실패, 전달 포기)는 로그로만 보고되고 루프를
//! 중단시키지 않습니다. 루프는 소스 EOF 또는 취소 신호로만 끝납니다.

use metrics::{counter, gauge};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use eventpost_core::metrics::{
    RELAY_BUFFER_BYTES, RELAY_LINES_READ_TOTAL, RELAY_PARSE_ERRORS_TOTAL,
    RELAY_RECORDS_ABANDONED_TOTAL, RELAY_RECORDS_DELIVERED_TOTAL, RELAY_RECORDS_EXTRACTED_TOTAL,
    RELAY_RECORDS_FILTERED_TOTAL,
};
use eventpost_core::types::DeliveryOutcome;

use crate::buffer::RecordBuffer;
use crate::config::PipelineConfig;
use crate::error::RelayError;
use crate::filter::RuleFilter;
use crate::forwarder::{Forwarder, SinkConfig};
use crate::parser::EventParser;
use crate::source::EventSource;

/// 파이프라인 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum RelayState {
    /// 초기화됨, 아직 시작하지 않음
    Idle,
    /// 소스의 다음 라인을 대기 중
    Reading,
    /// 라인 하나에서 나온 레코드들을 처리 중
    Draining,
    /// 종료됨 (EOF 또는 취소)
    Terminated,
}

/// 이벤트 릴레이 -- 단일 태스크 스트리밍 파이프라인
///
/// # 사용 예시
/// ```ignore
/// use eventpost_relay::{EventRelayBuilder, CommandSource};
/// use tokio_util::sync::CancellationToken;
///
/// let mut relay = EventRelayBuilder::new().config(config).build()?;
/// let source = CommandSource::spawn(&command, &args)?;
/// relay.run(source, CancellationToken::new()).await?;
/// ```
pub struct EventRelay {
    /// 레코드 버퍼 (릴레이가 단독 소유)
    buffer: RecordBuffer,
    /// 필드 정규화기
    parser: EventParser,
    /// 규칙 필터
    filter: RuleFilter,
    /// 전달 포워더
    forwarder: Forwarder,
    /// 현재 상태
    state: RelayState,
    /// 읽은 라인 수
    lines_read: u64,
    /// 추출된 레코드 수
    records_extracted: u64,
    /// 정규화 실패 수
    parse_errors: u64,
    /// 필터로 제외된 레코드 수
    records_filtered: u64,
    /// 전달 성공 레코드 수
    records_delivered: u64,
    /// 전달 포기 레코드 수
    records_abandoned: u64,
}

impl EventRelay {
    /// 현재 상태 이름을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            RelayState::Idle => "idle",
            RelayState::Reading => "reading",
            RelayState::Draining => "draining",
            RelayState::Terminated => "terminated",
        }
    }

    /// 읽은 라인 수를 반환합니다.
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// 추출된 레코드 수를 반환합니다.
    pub fn records_extracted(&self) -> u64 {
        self.records_extracted
    }

    /// 정규화 실패 수를 반환합니다.
    pub fn parse_errors(&self) -> u64 {
        self.parse_errors
    }

    /// 필터로 제외된 레코드 수를 반환합니다.
    pub fn records_filtered(&self) -> u64 {
        self.records_filtered
    }

    /// 전달에 성공한 레코드 수를 반환합니다.
    pub fn records_delivered(&self) -> u64 {
        self.records_delivered
    }

    /// 전달을 포기한 레코드 수를 반환합니다.
    pub fn records_abandoned(&self) -> u64 {
        self.records_abandoned
    }

    /// 파이프라인을 구동합니다.
    ///
    /// 소스 EOF 또는 취소 신호까지 블로킹됩니다. EOF 시 소스 프로세스에
    /// 종료를 요청하고 기다립니다. 취소는 소스 읽기 대기, 싱크 연결 대기,
    /// 재시도 대기 지점에서 확인되는 협력적 신호이며, 전달 중이던
    /// 레코드는 즉시 포기됩니다.
    pub async fn run<S: EventSource>(
        &mut self,
        mut source: S,
        cancel_token: CancellationToken,
    ) -> Result<(), RelayError> {
        self.state = RelayState::Reading;
        info!(sink = %self.forwarder.sink_addr(), "event relay started");

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!("cancellation requested, terminating relay");
                    if let Err(e) = source.terminate().await {
                        warn!(error = %e, "source termination failed");
                    }
                    break;
                }
                line = source.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            self.state = RelayState::Draining;
                            self.process_line(&line, &cancel_token).await;
                            self.state = RelayState::Reading;
                            // 전달 도중 취소가 발화했으면 다음 읽기 없이 종료
                            if cancel_token.is_cancelled() {
                                info!("cancellation requested, terminating relay");
                                if let Err(e) = source.terminate().await {
                                    warn!(error = %e, "source termination failed");
                                }
                                break;
                            }
                        }
                        Ok(None) => {
                            info!("source end-of-stream");
                            if let Err(e) = source.terminate().await {
                                warn!(error = %e, "source termination failed");
                            }
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "source read failed, terminating relay");
                            if let Err(te) = source.terminate().await {
                                warn!(error = %te, "source termination failed");
                            }
                            self.state = RelayState::Terminated;
                            return Err(e);
                        }
                    }
                }
            }
        }

        self.state = RelayState::Terminated;
        info!(
            lines = self.lines_read,
            extracted = self.records_extracted,
            delivered = self.records_delivered,
            abandoned = self.records_abandoned,
            "event relay terminated"
        );
        Ok(())
    }

    /// 라인 하나를 버퍼에 반영하고, 완성된 레코드를 모두 처리합니다.
    ///
    /// 추출/정규화 실패는 해당 조각/레코드에 국한되며 루프를 중단시키지
    /// 않습니다.
    async fn process_line(&mut self, line: &str, cancel: &CancellationToken) {
        self.lines_read += 1;
        counter!(RELAY_LINES_READ_TOTAL).increment(1);

        self.buffer.append(line);
        self.buffer.append("\n");

        let records = self.buffer.drain_complete();
        gauge!(RELAY_BUFFER_BYTES).set(self.buffer.len() as f64);

        for raw in records {
            self.records_extracted += 1;
            counter!(RELAY_RECORDS_EXTRACTED_TOTAL).increment(1);

            let record = match self.parser.parse(&raw) {
                Ok(record) => record,
                Err(e) => {
                    self.parse_errors += 1;
                    counter!(RELAY_PARSE_ERRORS_TOTAL).increment(1);
                    warn!(error = %e, "dropping malformed record");
                    continue;
                }
            };

            if !self.filter.accepts(&record) {
                self.records_filtered += 1;
                counter!(RELAY_RECORDS_FILTERED_TOTAL).increment(1);
                debug!(rule = record.rule_name(), "record excluded by rule filter");
                continue;
            }

            match self.forwarder.forward(&record, cancel).await {
                Ok(DeliveryOutcome::Delivered) => {
                    self.records_delivered += 1;
                    counter!(RELAY_RECORDS_DELIVERED_TOTAL).increment(1);
                }
                Ok(DeliveryOutcome::Abandoned) => {
                    self.records_abandoned += 1;
                    counter!(RELAY_RECORDS_ABANDONED_TOTAL).increment(1);
                }
                Err(e) => {
                    self.parse_errors += 1;
                    counter!(RELAY_PARSE_ERRORS_TOTAL).increment(1);
                    warn!(error = %e, "failed to serialize record, dropping");
                }
            }
        }
    }
}

/// 이벤트 릴레이 빌더
///
/// 설정을 검증하고 파이프라인 구성 요소를 조립합니다.
pub struct EventRelayBuilder {
    config: PipelineConfig,
}

impl EventRelayBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 릴레이를 빌드합니다.
    pub fn build(self) -> Result<EventRelay, RelayError> {
        self.config.validate()?;

        let sink_config = SinkConfig::from_pipeline(&self.config);

        Ok(EventRelay {
            buffer: RecordBuffer::new(self.config.max_buffer_bytes),
            parser: EventParser::new().with_max_record_bytes(self.config.max_record_bytes),
            filter: RuleFilter::new(self.config.exclude_rules.clone()),
            forwarder: Forwarder::new(sink_config),
            state: RelayState::Idle,
            lines_read: 0,
            records_extracted: 0,
            parse_errors: 0,
            records_filtered: 0,
            records_delivered: 0,
            records_abandoned: 0,
        })
    }
}

impl Default for EventRelayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfigBuilder;
    use crate::source::StaticSource;

    fn test_relay() -> EventRelay {
        let config = PipelineConfigBuilder::new()
            // 테스트에서 실제 연결은 발생하지 않음
            .sink("127.0.0.1", 1)
            .max_attempts(1)
            .retry_interval_secs(0)
            .build()
            .unwrap();
        EventRelayBuilder::new().config(config).build().unwrap()
    }

    #[test]
    fn builder_creates_idle_relay() {
        let relay = test_relay();
        assert_eq!(relay.state_name(), "idle");
        assert_eq!(relay.records_delivered(), 0);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.max_attempts = 0;
        let result = EventRelayBuilder::new().config(config).build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn empty_source_terminates_cleanly() {
        let mut relay = test_relay();
        let source = StaticSource::new(Vec::<String>::new());
        relay.run(source, CancellationToken::new()).await.unwrap();
        assert_eq!(relay.state_name(), "terminated");
        assert_eq!(relay.lines_read(), 0);
    }

    #[tokio::test]
    async fn excluded_records_never_touch_the_sink() {
        // 싱크 주소는 연결 불가지만, 모두 제외되므로 연결 시도 자체가 없음
        let mut relay = test_relay();
        let source = StaticSource::new([
            r#"<Event><TimeCreated SystemTime="2024-01-15T12:00:00Z"/><EventData><Data Name="RuleName">-</Data></EventData></Event>"#,
            r#"<Event><TimeCreated SystemTime="2024-01-15T12:00:01Z"/><EventData><Data Name="RuleName"></Data></EventData></Event>"#,
        ]);
        relay.run(source, CancellationToken::new()).await.unwrap();

        assert_eq!(relay.records_extracted(), 2);
        assert_eq!(relay.records_filtered(), 2);
        assert_eq!(relay.records_delivered(), 0);
        assert_eq!(relay.records_abandoned(), 0);
    }

    #[tokio::test]
    async fn malformed_records_do_not_stop_the_stream() {
        let mut relay = test_relay();
        let source = StaticSource::new([
            // Timestamp 없음 -> 정규화 실패
            "<Event><System/></Event>",
            // 제외 대상 정상 레코드
            r#"<Event><TimeCreated SystemTime="2024-01-15T12:00:00Z"/><EventData><Data Name="RuleName">-</Data></EventData></Event>"#,
        ]);
        relay.run(source, CancellationToken::new()).await.unwrap();

        assert_eq!(relay.records_extracted(), 2);
        assert_eq!(relay.parse_errors(), 1);
        assert_eq!(relay.records_filtered(), 1);
        assert_eq!(relay.state_name(), "terminated");
    }

    #[tokio::test]
    async fn cancellation_interrupts_inflight_delivery() {
        // 연결 거부 포트를 예약했다가 닫아서 만들고, 재시도 대기가 긴
        // 설정으로 전달 중 취소가 즉시 포기로 이어지는지 확인
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = PipelineConfigBuilder::new()
            .sink("127.0.0.1", port)
            .connect_timeout_secs(1)
            .max_attempts(3)
            .retry_interval_secs(5)
            .build()
            .unwrap();
        let mut relay = EventRelayBuilder::new().config(config).build().unwrap();

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(150)).await;
            trigger.cancel();
        });

        let source = StaticSource::new([
            r#"<Event><TimeCreated SystemTime="2024-01-15T12:00:00Z"/><EventData><Data Name="RuleName">Alert1</Data></EventData></Event>"#,
        ]);
        let start = std::time::Instant::now();
        relay.run(source, token).await.unwrap();

        assert!(start.elapsed() < std::time::Duration::from_secs(2));
        assert_eq!(relay.records_abandoned(), 1);
        assert_eq!(relay.state_name(), "terminated");
    }

    #[tokio::test]
    async fn pre_cancelled_token_terminates_immediately() {
        let mut relay = test_relay();
        let token = CancellationToken::new();
        token.cancel();
        // 취소 토큰이 이미 발화된 경우 라인을 읽지 않고 종료
        let source = StaticSource::new(["<Event></Event>"]);
        relay.run(source, token).await.unwrap();
        assert_eq!(relay.state_name(), "terminated");
    }
}
