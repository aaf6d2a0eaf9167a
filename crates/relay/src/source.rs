//! 이벤트 소스 -- 외부 라인 스트림 추상화
//!
//! 파이프라인이 소비하는 소스는 "다음 라인 또는 EOF"만 제공하는
//! 외부 협력자입니다. [`EventSource`] trait이 그 최소 계약을 정의하고,
//! [`CommandSource`]가 외부 프로세스 바인딩을 제공합니다.

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info};

use crate::error::RelayError;

/// 라인 지향 이벤트 소스
///
/// 구현체는 순서가 보장된 라인 스트림과 명시적 EOF 신호를 제공해야
/// 합니다. 파이프라인은 단일 태스크에서 소스를 소유하므로 공유 동기화는
/// 필요하지 않습니다.
#[allow(async_fn_in_trait)]
pub trait EventSource {
    /// 다음 라인을 반환합니다. 스트림이 끝나면 `None`을 반환합니다.
    async fn next_line(&mut self) -> Result<Option<String>, RelayError>;

    /// 소스에 종료를 요청하고 완료를 기다립니다.
    async fn terminate(&mut self) -> Result<(), RelayError>;
}

/// 외부 프로세스 소스
///
/// 설정된 명령을 스폰하여 stdout의 라인을 이벤트 스트림으로 사용합니다.
#[derive(Debug)]
pub struct CommandSource {
    /// 자식 프로세스 핸들
    child: Child,
    /// stdout 라인 리더
    lines: Lines<BufReader<ChildStdout>>,
}

impl CommandSource {
    /// 명령을 스폰하고 stdout 파이프를 연결합니다.
    pub fn spawn(command: &str, args: &[String]) -> Result<Self, RelayError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| RelayError::Source {
                reason: format!("failed to spawn '{command}': {e}"),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| RelayError::Source {
            reason: "child stdout unavailable".to_owned(),
        })?;

        info!(command, "source process started");
        Ok(Self {
            child,
            lines: BufReader::new(stdout).lines(),
        })
    }
}

impl EventSource for CommandSource {
    async fn next_line(&mut self) -> Result<Option<String>, RelayError> {
        self.lines.next_line().await.map_err(|e| RelayError::Source {
            reason: format!("read from source failed: {e}"),
        })
    }

    async fn terminate(&mut self) -> Result<(), RelayError> {
        // 이미 종료된 프로세스에 대한 kill 실패는 무해함
        if let Err(e) = self.child.start_kill() {
            debug!(error = %e, "source process kill skipped");
        }
        let status = self.child.wait().await.map_err(|e| RelayError::Source {
            reason: format!("failed to await source process: {e}"),
        })?;
        info!(%status, "source process terminated");
        Ok(())
    }
}

/// 고정 라인 목록 소스
///
/// 테스트와 수동 검증에서 소스 프로세스 없이 파이프라인을 구동할 때
/// 사용합니다.
#[derive(Debug)]
pub struct StaticSource {
    lines: std::collections::VecDeque<String>,
}

impl StaticSource {
    /// 주어진 라인들을 순서대로 돌려주는 소스를 만듭니다.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl EventSource for StaticSource {
    async fn next_line(&mut self) -> Result<Option<String>, RelayError> {
        Ok(self.lines.pop_front())
    }

    async fn terminate(&mut self) -> Result<(), RelayError> {
        Ok(())
    }
}
