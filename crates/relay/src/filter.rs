//! 규칙 필터 -- 규칙명 기반 제외 판정
//!
//! [`RuleFilter`]는 정규화된 레코드의 규칙명 속성이 제외 집합에
//! 속하는지만 검사하는 순수 술어입니다. I/O도, 부수 효과도 없습니다.
//!
//! 기본 제외 집합은 빈 문자열과 `-` 플레이스홀더로, "매칭된 규칙 없음"을
//! 뜻하는 레코드를 걸러냅니다. 규칙명 속성이 없는 레코드는 빈 문자열로
//! 취급됩니다.

use std::collections::HashSet;

use eventpost_core::types::EventRecord;

/// 규칙명 제외 필터
pub struct RuleFilter {
    /// 제외할 규칙명 집합
    excluded: HashSet<String>,
}

impl RuleFilter {
    /// 주어진 제외 목록으로 필터를 생성합니다.
    pub fn new(excluded: impl IntoIterator<Item = String>) -> Self {
        Self {
            excluded: excluded.into_iter().collect(),
        }
    }

    /// 기본 제외 집합(`""`, `"-"`)으로 필터를 생성합니다.
    pub fn with_defaults() -> Self {
        Self::new([String::new(), "-".to_owned()])
    }

    /// 레코드를 전달해야 하면 `true`, 제외해야 하면 `false`를 반환합니다.
    pub fn accepts(&self, record: &EventRecord) -> bool {
        !self.excluded.contains(record.rule_name())
    }

    /// 제외 집합의 크기를 반환합니다.
    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }
}

impl Default for RuleFilter {
    fn default() -> Self {
        Self::with_defaults()
    }
}
