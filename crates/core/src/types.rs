//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 릴레이 파이프라인의 각 단계가 교환하는 데이터 구조를 정의합니다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 레코드 분류에 사용되는 고정 속성 키
///
/// 레코드를 생성한 탐지 규칙의 이름이 이 키에 담기며,
/// 규칙 필터는 이 키의 값만으로 전달/제외를 결정합니다.
pub const RULE_NAME_KEY: &str = "RuleName";

/// 정규화된 이벤트 레코드
///
/// 원시 이벤트 XML 블록에서 추출된 필드를 담습니다.
/// 싱크 와이어 형식(JSON 한 줄)의 필드명은 `Timestamp`/`Hostname`/`Message`로
/// 고정되어 있으며 serde rename으로 바인딩합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// 레코드 생성 시각 (원본 표기 그대로 전달)
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    /// 레코드를 생성한 호스트명 (없으면 빈 문자열)
    #[serde(rename = "Hostname")]
    pub hostname: String,
    /// 이벤트 데이터 섹션의 이름-값 쌍 (키 유일, 중복 시 마지막 값 우선)
    #[serde(rename = "Message")]
    pub attributes: BTreeMap<String, String>,
}

impl EventRecord {
    /// 규칙 필터가 참조하는 규칙명 속성을 반환합니다.
    ///
    /// 속성이 없으면 빈 문자열로 취급합니다.
    pub fn rule_name(&self) -> &str {
        self.attributes
            .get(RULE_NAME_KEY)
            .map(String::as_str)
            .unwrap_or("")
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({} attributes)",
            self.timestamp,
            self.hostname,
            self.attributes.len(),
        )
    }
}

/// 레코드별 전달 결과
///
/// 재시도 상태는 레코드 간에 이월되지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// 한 번의 시도가 성공하여 싱크에 전달됨
    Delivered,
    /// 모든 시도를 소진하여 레코드를 폐기함
    Abandoned,
}
