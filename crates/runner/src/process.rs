//! 프로세스 실행 -- 취소와 진행률을 지원하는 셸 명령 실행기
//!
//! 명령줄은 POSIX 계열에서 `sh -c`, Windows 계열에서 `cmd /C`로 실행됩니다.
//! stdout/stderr는 메모리에 전부 수집합니다 (스캔 출력은 크기가 제한된 JSON 문서).
//!
//! # 진행률
//! 스캐너는 분수 진행률을 내보내지 않으므로 휴리스틱을 사용합니다:
//! 시작 시 `0.0`, 이후 틱마다 `0.9 * (1 - 0.5^n)`, 성공 종료 시 `1.0`.
//! 실패나 취소 시에는 완료 보고를 보내지 않습니다.
//!
//! # 취소
//! 취소 토큰이 트리거되면 셸과 스캐너를 포함한 프로세스 그룹(Windows에서는
//! 프로세스 트리)을 강제 종료하고 회수한 뒤 [`RunnerError::Cancelled`]로 끝납니다.
//! 부분 출력은 반환하지 않습니다.

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use kubescape_core::types::Platform;
use kubescape_core::ui::{KubescapeUi, ProgressReporter};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::RunnerError;

/// 기본 진행률 틱 간격
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// 휴리스틱 진행률 상한 (성공 종료 전까지 넘지 않음)
const PROGRESS_CEILING: f64 = 0.9;

/// 셸 명령 실행기
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    platform: Platform,
    tick_interval: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(Platform::current())
    }
}

impl ProcessRunner {
    /// 주어진 플랫폼의 셸을 사용하는 실행기를 생성합니다.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// 진행률 틱 간격을 설정합니다.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// 셸 플랫폼
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// 명령을 실행하고 stdout을 반환합니다.
    ///
    /// # Errors
    ///
    /// - 0이 아닌 종료 코드: [`RunnerError::Execution`]
    /// - 취소: [`RunnerError::Cancelled`]
    /// - 셸 시작 실패: [`RunnerError::Spawn`]
    pub async fn run<U: KubescapeUi>(
        &self,
        ui: &U,
        command_line: &str,
        cancel: &CancellationToken,
        progress: Option<&ProgressReporter>,
    ) -> Result<String, RunnerError> {
        if cancel.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }

        ui.debug(&format!("running: {command_line}"));
        debug!(command = command_line, platform = %self.platform, "spawning scanner process");

        let (program, mut cmd) = shell_command(self.platform, command_line);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // 셸과 그 자식(스캐너)을 하나의 프로세스 그룹으로 묶어 취소 시 함께 종료
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| RunnerError::Spawn {
            program: program.to_owned(),
            reason: e.to_string(),
        })?;

        let stdout_task = spawn_reader(child.stdout.take());
        let stderr_task = spawn_reader(child.stderr.take());

        let report = |fraction: f64| {
            if let Some(reporter) = progress {
                reporter.report(fraction);
            }
        };
        report(0.0);

        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // interval의 첫 틱은 즉시 완료됨
        ticker.tick().await;
        let mut ticks: i32 = 0;

        let status = loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => Event::Cancelled,
                status = child.wait() => Event::Exited(status),
                _ = ticker.tick() => Event::Tick,
            };

            match event {
                Event::Exited(status) => break status?,
                Event::Tick => {
                    ticks = ticks.saturating_add(1);
                    report(heuristic_fraction(ticks));
                }
                Event::Cancelled => {
                    kill_process_tree(&mut child).await;
                    if let Err(e) = child.wait().await {
                        warn!(error = %e, "failed to reap scanner process");
                    }
                    stdout_task.abort();
                    stderr_task.abort();
                    debug!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "scanner process cancelled"
                    );
                    return Err(RunnerError::Cancelled);
                }
            }
        };

        let stdout = join_reader(stdout_task).await?;
        let stderr = join_reader(stderr_task).await?;

        debug!(
            exit_code = status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            stdout_bytes = stdout.len(),
            "scanner process exited"
        );

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr).trim().to_owned();
            return Err(RunnerError::Execution {
                exit_code: exit_code(&status),
                stderr,
            });
        }

        report(1.0);
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

enum Event {
    Exited(std::io::Result<ExitStatus>),
    Tick,
    Cancelled,
}

/// `n`번째 틱의 휴리스틱 진행률
pub fn heuristic_fraction(ticks: i32) -> f64 {
    PROGRESS_CEILING * (1.0 - 0.5_f64.powi(ticks.max(0)))
}

fn exit_code(status: &ExitStatus) -> Option<i32> {
    status.code()
}

fn shell_command(platform: Platform, command_line: &str) -> (&'static str, Command) {
    if platform.is_windows() {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C");
        // cmd.exe는 자체 인용 규칙을 쓰므로 명령줄을 그대로 넘김
        #[cfg(windows)]
        cmd.raw_arg(command_line);
        #[cfg(not(windows))]
        cmd.arg(command_line);
        ("cmd", cmd)
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command_line);
        ("sh", cmd)
    }
}

/// 셸 래퍼와 그 아래에서 실행 중인 스캐너를 강제 종료합니다.
///
/// unix에서는 셸이 리더인 프로세스 그룹 전체에 `SIGKILL`을 보냅니다.
/// Windows에서는 `taskkill /T /F`로 프로세스 트리를 종료합니다.
async fn kill_process_tree(child: &mut Child) {
    if let Some(pid) = child.id() {
        #[cfg(unix)]
        {
            match libc::pid_t::try_from(pid) {
                Ok(pgid) => {
                    // SAFETY: kill(2)에 음수 pid를 주면 해당 프로세스 그룹에만 시그널을 보냄
                    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
                    if rc != 0 {
                        let err = std::io::Error::last_os_error();
                        debug!(pid, error = %err, "process group kill failed");
                    }
                }
                Err(_) => warn!(pid, "pid out of range for process group kill"),
            }
        }

        #[cfg(windows)]
        {
            let status = Command::new("taskkill")
                .args(["/T", "/F", "/PID", &pid.to_string()])
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            if let Err(e) = status {
                debug!(pid, error = %e, "taskkill failed");
            }
        }
    }

    // 그룹 종료가 실패했거나 이미 회수된 경우를 위한 직접 종료
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "scanner shell already exited");
    }
}

fn spawn_reader<R>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok(buf)
    })
}

async fn join_reader(
    task: JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>, RunnerError> {
    match task.await {
        Ok(result) => Ok(result?),
        Err(e) => Err(RunnerError::Io(std::io::Error::other(e))),
    }
}
