//! 필드 정규화 -- 원시 레코드 블록에서 Timestamp/Hostname/속성 추출
//!
//! [`EventParser`]는 하나의 원시 이벤트 XML 블록을 [`EventRecord`]로
//! 변환합니다. 부분 문자열 스캔 방식이라 내부가 정합한 XML이 아니어도
//! 추출 가능한 요소만 건져내고 계속 진행합니다(skip-and-continue).
//!
//! # 추출 규칙
//! - Timestamp: `<TimeCreated SystemTime="…">` 속성 우선,
//!   없으면 `<Data Name="UtcTime">` 값으로 폴백. 둘 다 없으면 해당
//!   레코드만 정규화 실패로 폐기됩니다.
//! - Hostname: `<Computer>` 요소 텍스트(트림). 없거나 비어 있으면 빈 문자열.
//! - 속성: 모든 `<Data Name="…">값</Data>` 엔트리. Name 속성이 없는
//!   엔트리는 건너뛰고, 값은 트림하며, 중복 키는 마지막 값이 이깁니다.

use std::collections::BTreeMap;

use eventpost_core::types::EventRecord;

use crate::error::RelayError;

/// 속성 폴백에 사용하는 UTC 시각 데이터 키
const UTC_TIME_KEY: &str = "UtcTime";

/// 이벤트 레코드 파서
///
/// 관용적인(well-formed) 문서를 요구하지 않는 복구형 리더입니다.
pub struct EventParser {
    /// 단일 레코드 최대 허용 크기 (바이트)
    max_record_bytes: usize,
}

impl EventParser {
    /// 기본 설정으로 새 파서를 생성합니다.
    pub fn new() -> Self {
        Self {
            max_record_bytes: 256 * 1024, // 256KB
        }
    }

    /// 단일 레코드 최대 크기를 설정합니다.
    pub fn with_max_record_bytes(mut self, bytes: usize) -> Self {
        self.max_record_bytes = bytes;
        self
    }

    /// 원시 레코드 블록을 정규화합니다.
    ///
    /// Timestamp를 해석할 수 없는 경우에만 실패하며, 실패는 해당
    /// 레코드에 국한됩니다.
    pub fn parse(&self, raw: &str) -> Result<EventRecord, RelayError> {
        if raw.len() > self.max_record_bytes {
            return Err(RelayError::MalformedRecord {
                reason: format!(
                    "record too large: {} bytes (max: {})",
                    raw.len(),
                    self.max_record_bytes
                ),
            });
        }

        let mut attributes = BTreeMap::new();
        collect_data_entries(raw, &mut attributes);

        let timestamp = match time_created(raw) {
            Some(ts) => ts,
            None => attributes
                .get(UTC_TIME_KEY)
                .map(String::to_owned)
                .ok_or_else(|| RelayError::MalformedRecord {
                    reason: "no TimeCreated SystemTime attribute or UtcTime data value"
                        .to_owned(),
                })?,
        };

        let hostname = element_text(raw, "Computer")
            .map(|text| text.trim().to_owned())
            .unwrap_or_default();

        Ok(EventRecord {
            timestamp,
            hostname,
            attributes,
        })
    }
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new()
    }
}

/// `<TimeCreated …>` 태그의 `SystemTime` 속성값을 추출합니다.
///
/// 속성이 없거나 비어 있으면 `None`을 반환하여 폴백을 유도합니다.
fn time_created(raw: &str) -> Option<String> {
    let start = find_tag_start(raw, "TimeCreated", 0)?;
    let tag = open_tag_slice(raw, start);
    let value = attr_value(tag, "SystemTime")?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_owned())
}

/// 모든 `<Data Name="…">` 엔트리를 속성 맵에 수집합니다.
///
/// Name 속성이 없는 엔트리는 건너뛰고, 닫힘이 잘린 말미의 태그는
/// 무시합니다. 중복 키는 마지막 값이 이깁니다.
fn collect_data_entries(raw: &str, attributes: &mut BTreeMap<String, String>) {
    let mut search = 0usize;
    while let Some(start) = find_tag_start(raw, "Data", search) {
        let tag = open_tag_slice(raw, start);
        let tag_end = start + tag.len();
        if tag_end >= raw.len() && !tag.ends_with('>') {
            // 태그가 블록 끝에서 잘림
            break;
        }
        search = tag_end;

        let Some(name) = attr_value(tag, "Name") else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        let value = if tag.ends_with("/>") {
            String::new()
        } else {
            let text = &raw[tag_end..];
            let text = match text.find('<') {
                Some(pos) => &text[..pos],
                None => text,
            };
            decode_entities(text.trim())
        };

        attributes.insert(name.to_owned(), value);
    }
}

/// 요소의 텍스트 내용을 추출합니다 (첫 번째 일치 요소 기준).
fn element_text(raw: &str, name: &str) -> Option<String> {
    let start = find_tag_start(raw, name, 0)?;
    let tag = open_tag_slice(raw, start);
    if tag.ends_with("/>") {
        return Some(String::new());
    }
    let body = &raw[start + tag.len()..];
    let text = match body.find('<') {
        Some(pos) => &body[..pos],
        None => body,
    };
    Some(decode_entities(text))
}

/// `<name` 형태로 시작하는 열림 태그 위치를 찾습니다.
///
/// 태그명 경계를 검사하여 `<Data`가 `<Database`에 매칭되는 일을
/// 방지합니다.
fn find_tag_start(raw: &str, name: &str, from: usize) -> Option<usize> {
    let pattern = format!("<{name}");
    let mut search = from;
    while let Some(rel) = raw[search..].find(&pattern) {
        let pos = search + rel;
        match raw.as_bytes().get(pos + pattern.len()) {
            Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') | Some(b'/') => {
                return Some(pos);
            }
            _ => search = pos + 1,
        }
    }
    None
}

/// `start`에서 시작하는 열림 태그 전체(`<… >`)를 잘라냅니다.
///
/// `>`가 아직 도착하지 않았다면 블록 끝까지를 반환합니다.
fn open_tag_slice(raw: &str, start: usize) -> &str {
    match raw[start..].find('>') {
        Some(pos) => &raw[start..start + pos + 1],
        None => &raw[start..],
    }
}

/// 열림 태그 조각에서 `name="value"` 속성값을 추출합니다.
fn attr_value<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!("{name}=\"");
    let mut search = 0usize;
    while let Some(rel) = tag[search..].find(&pattern) {
        let pos = search + rel;
        // 속성명 앞은 공백이어야 함 (다른 속성값 내부 매칭 방지)
        let boundary = matches!(
            tag.as_bytes().get(pos.wrapping_sub(1)),
            Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n')
        );
        if !boundary {
            search = pos + 1;
            continue;
        }
        let value_start = pos + pattern.len();
        let value_end = tag[value_start..].find('"')?;
        return Some(&tag[value_start..value_start + value_end]);
    }
    None
}

/// 기본 XML 엔티티를 복원합니다.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let (decoded, consumed) = if rest.starts_with("&lt;") {
            ('<', 4)
        } else if rest.starts_with("&gt;") {
            ('>', 4)
        } else if rest.starts_with("&amp;") {
            ('&', 5)
        } else if rest.starts_with("&quot;") {
            ('"', 6)
        } else if rest.starts_with("&apos;") {
            ('\'', 6)
        } else {
            ('&', 1)
        };
        out.push(decoded);
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    out
}
