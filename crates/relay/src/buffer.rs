//! 레코드 버퍼링 -- 잔여 텍스트 누적 및 완전한 레코드 블록 추출
//!
//! [`RecordBuffer`]는 소스에서 도착한 텍스트 조각을 누적하고,
//! 열림 마커(`<Event …>`)와 닫힘 마커(`</Event>`)가 모두 도착한
//! 완전한 레코드 블록만 순서대로 꺼냅니다.
//!
//! # 불변식
//! - 추출 후 버퍼에는 마지막 닫힘 마커 이후의 접미사(잔여 텍스트)만 남습니다.
//!   완성된 레코드가 추출되지 않은 채 버퍼에 남는 일은 없습니다.
//! - 닫힘 마커가 아직 도착하지 않은 레코드는 절대 추출되지 않고,
//!   다음 패스까지 원문 그대로 보존됩니다. 소스가 텍스트를 어떻게 쪼개
//!   보내더라도 데이터 유실이 없습니다.
//! - 잔여 트리밍은 추출에 사용된 것과 동일한 매치 집합에서만 유도됩니다.
//!   짝 없는 고아 닫힘 마커는 일반 텍스트로 취급되어 레코드를 버리거나
//!   중복시키지 못합니다.

use tracing::warn;

/// 레코드 열림 마커. 태그명 경계 검사와 함께 사용합니다.
const OPEN_MARKER: &str = "<Event";

/// 레코드 닫힘 마커. `</EventData>` 등과는 마지막 `>` 덕분에 겹치지 않습니다.
const CLOSE_MARKER: &str = "</Event>";

/// 레코드 버퍼
///
/// 스트림 펌프가 단독으로 소유하며, 잠금 없이 변이합니다.
pub struct RecordBuffer {
    /// 아직 소비되지 않은 텍스트
    residual: String,
    /// 마커 없는 텍스트 폐기 기준 (바이트)
    max_buffer_bytes: usize,
    /// 지금까지 추출된 레코드 수
    records_extracted: u64,
    /// 마커 없는 오버플로우로 폐기된 바이트 수
    discarded_bytes: u64,
}

impl RecordBuffer {
    /// 새 레코드 버퍼를 생성합니다.
    pub fn new(max_buffer_bytes: usize) -> Self {
        Self {
            residual: String::new(),
            max_buffer_bytes,
            records_extracted: 0,
            discarded_bytes: 0,
        }
    }

    /// 도착한 텍스트 조각을 버퍼 끝에 그대로 추가합니다.
    pub fn append(&mut self, chunk: &str) {
        self.residual.push_str(chunk);
    }

    /// 버퍼에 담긴 모든 완전한 레코드 블록을 도착 순서대로 꺼냅니다.
    ///
    /// 반환된 각 블록은 열림 마커에서 시작해 대응하는 닫힘 마커로 끝나는
    /// 최소 부분 문자열입니다. 내부가 올바른 구조가 아니어도 블록은
    /// 그대로 반환되며, 해석 실패는 정규화 단계에서 레코드 단위로
    /// 처리됩니다.
    pub fn drain_complete(&mut self) -> Vec<String> {
        let mut records = Vec::new();
        let mut consumed = 0usize;

        loop {
            let Some(open) = find_open(&self.residual, consumed) else {
                break;
            };
            let Some(close_rel) = self.residual[open..].find(CLOSE_MARKER) else {
                break;
            };
            let end = open + close_rel + CLOSE_MARKER.len();
            records.push(self.residual[open..end].to_owned());
            consumed = end;
        }

        if consumed > 0 {
            // 마지막으로 추출된 레코드의 닫힘 마커까지만 소비
            self.residual.drain(..consumed);
            self.records_extracted += records.len() as u64;
        }

        self.enforce_capacity();
        records
    }

    /// 마커 없는 텍스트가 상한을 넘으면 폐기합니다.
    ///
    /// 열림 마커(버퍼 끝에 걸친 부분 마커 포함)가 있는 텍스트는
    /// 절대 폐기하지 않습니다.
    fn enforce_capacity(&mut self) {
        if self.residual.len() <= self.max_buffer_bytes
            || find_open(&self.residual, 0).is_some()
        {
            return;
        }

        // 말미의 부분 열림 마커 가능성만 남기고 앞부분을 버립니다.
        let keep = OPEN_MARKER.len() - 1;
        let mut cut = self.residual.len().saturating_sub(keep);
        while !self.residual.is_char_boundary(cut) {
            cut -= 1;
        }

        self.discarded_bytes += cut as u64;
        warn!(
            discarded = cut,
            total_discarded = self.discarded_bytes,
            capacity = self.max_buffer_bytes,
            "buffer exceeded capacity with no record marker, discarding stale text"
        );
        self.residual.drain(..cut);
    }

    /// 현재 잔여 텍스트 크기를 바이트로 반환합니다.
    pub fn len(&self) -> usize {
        self.residual.len()
    }

    /// 잔여 텍스트가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.residual.is_empty()
    }

    /// 잔여 텍스트를 반환합니다.
    pub fn residual(&self) -> &str {
        &self.residual
    }

    /// 지금까지 추출된 레코드 수를 반환합니다.
    pub fn records_extracted(&self) -> u64 {
        self.records_extracted
    }

    /// 오버플로우로 폐기된 바이트 수를 반환합니다.
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded_bytes
    }
}

/// `from` 이후 첫 레코드 열림 마커의 위치를 찾습니다.
///
/// `<EventData>`, `<EventID>`처럼 태그명이 이어지는 경우는 제외하고,
/// `<Event>` 또는 `<Event …>` 형태만 열림 마커로 인정합니다.
/// 버퍼 끝에 걸쳐 잘린 `<Event`는 다음 조각을 기다려야 하므로
/// 열림 마커 후보로 반환합니다.
fn find_open(text: &str, from: usize) -> Option<usize> {
    let mut search = from;
    while let Some(rel) = text[search..].find(OPEN_MARKER) {
        let pos = search + rel;
        match text.as_bytes().get(pos + OPEN_MARKER.len()) {
            Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') | Some(b'/') => {
                return Some(pos);
            }
            // 버퍼 끝에 걸친 잠재적 열림 마커
            None => return Some(pos),
            Some(_) => search = pos + 1,
        }
    }
    None
}
