//! 보조 프로세스 가드
//!
//! 하네스가 직접 띄운 파이프라인 구성요소를 추적하고, 시나리오가 어떻게 끝나든
//! (통과, 단언 실패, 에러) 모두 종료되도록 합니다.
//!
//! - 정상 경로: [`ProcessGuard::terminate_all`]을 호출해 종료를 기다립니다.
//! - 그 외 경로: `Drop`에서 남은 프로세스에 kill 신호를 보냅니다
//!   (`kill_on_drop`도 설정되어 있음).

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use ingest_chaos_core::config::AuxProcessConfig;
use ingest_chaos_core::error::HarnessError;
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// 종료 신호 후 대기 한도
const TERMINATE_WAIT: Duration = Duration::from_secs(5);

/// 실행 중인 보조 프로세스 목록
#[derive(Debug, Default)]
pub struct ProcessGuard {
    children: Vec<(String, Child)>,
}

impl ProcessGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 프로세스를 시작하고 추적 목록에 넣습니다.
    ///
    /// `base_env` 위에 프로세스별 `env`가 덮어씁니다.
    pub fn spawn(
        &mut self,
        config: &AuxProcessConfig,
        base_env: &BTreeMap<String, String>,
    ) -> Result<u32, HarnessError> {
        let mut command = Command::new(&config.program);
        command
            .args(&config.args)
            .envs(base_env)
            .envs(&config.env)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &config.workdir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| {
            HarnessError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to spawn '{}' ({}): {e}", config.name, config.program),
            ))
        })?;
        let pid = child.id().unwrap_or_default();
        info!(process = %config.name, pid, program = %config.program, "aux process started");
        self.children.push((config.name.clone(), child));
        Ok(pid)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// 추적 중인 모든 프로세스를 종료하고 종료를 기다립니다.
    ///
    /// 이미 끝난 프로세스는 건너뜁니다. 종료에 실패해도 나머지를 계속 처리합니다.
    pub async fn terminate_all(&mut self) {
        for (name, mut child) in self.children.drain(..) {
            match child.try_wait() {
                Ok(Some(status)) => {
                    info!(process = %name, %status, "aux process already exited");
                    continue;
                }
                Ok(None) => {}
                Err(e) => warn!(process = %name, error = %e, "failed to query aux process"),
            }

            if let Err(e) = child.start_kill() {
                warn!(process = %name, error = %e, "failed to signal aux process");
            }
            match tokio::time::timeout(TERMINATE_WAIT, child.wait()).await {
                Ok(Ok(status)) => info!(process = %name, %status, "aux process terminated"),
                Ok(Err(e)) => warn!(process = %name, error = %e, "failed to reap aux process"),
                Err(_) => warn!(process = %name, "aux process did not exit in time"),
            }
        }
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        for (name, child) in &mut self.children {
            warn!(process = %name, "aux process still running at drop, killing");
            let _ = child.start_kill();
        }
    }
}
