//! 메트릭 상수 정의
//!
//! 릴레이 파이프라인이 사용하는 메트릭 이름을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `eventpost_`
//! - 모듈명: `relay_`
//! - 접미어: `_total` (counter), 없음 (gauge)

/// Relay: 소스에서 읽은 라인 수 (counter)
pub const RELAY_LINES_READ_TOTAL: &str = "eventpost_relay_lines_read_total";

/// Relay: 버퍼에서 추출된 완전한 레코드 수 (counter)
pub const RELAY_RECORDS_EXTRACTED_TOTAL: &str = "eventpost_relay_records_extracted_total";

/// Relay: 정규화 실패로 폐기된 레코드 수 (counter)
pub const RELAY_PARSE_ERRORS_TOTAL: &str = "eventpost_relay_parse_errors_total";

/// Relay: 규칙 필터로 제외된 레코드 수 (counter)
pub const RELAY_RECORDS_FILTERED_TOTAL: &str = "eventpost_relay_records_filtered_total";

/// Relay: 싱크 전달에 성공한 레코드 수 (counter)
pub const RELAY_RECORDS_DELIVERED_TOTAL: &str = "eventpost_relay_records_delivered_total";

/// Relay: 모든 시도 소진 후 폐기된 레코드 수 (counter)
pub const RELAY_RECORDS_ABANDONED_TOTAL: &str = "eventpost_relay_records_abandoned_total";

/// Relay: 싱크 연결 시도 수, 성공/실패 포함 (counter)
pub const RELAY_DELIVERY_ATTEMPTS_TOTAL: &str = "eventpost_relay_delivery_attempts_total";

/// Relay: 현재 잔여 버퍼 크기, 바이트 (gauge)
pub const RELAY_BUFFER_BYTES: &str = "eventpost_relay_buffer_bytes";
