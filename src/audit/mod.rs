//! 명령별 감사 로그
//!
//! 모든 기록은 [`redact`]를 거친다. 비밀번호 값 자체는 이 모듈까지 오지 않는다.

pub mod redact;

pub use redact::redact;

use crate::config::Config;
use crate::error::{PilotError, Result};
use crate::executor::classifier::ExecutionStatus;
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

/// 감사 로그 파일 생성기. 디렉토리가 없으면 비활성.
#[derive(Debug, Clone, Default)]
pub struct AuditLogger {
    dir: Option<PathBuf>,
}

impl AuditLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn from_config(config: &Config) -> Self {
        if config.audit_log {
            Self::new(config.log_dir())
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// 명령 하나에 대한 로그 파일 열기
    ///
    /// 비활성이거나 파일을 만들 수 없으면 `None`. 로그 실패로 실행을 막지 않는다.
    pub fn start(&self, argv: &[String], display: &str) -> Option<AuditLog> {
        let dir = self.dir.as_ref()?;

        match AuditLog::create(dir, argv, display) {
            Ok(log) => {
                debug!(path = %log.path.display(), "audit log opened");
                Some(log)
            }
            Err(e) => {
                warn!(error = %e, "audit log unavailable");
                None
            }
        }
    }
}

/// 열린 감사 로그 파일 (0o600)
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    file: File,
}

impl AuditLog {
    fn create(dir: &Path, argv: &[String], display: &str) -> Result<Self> {
        ensure_private_dir(dir)?;

        let now = Local::now();
        let group = argv.get(1).map(|s| file_component(s)).unwrap_or_else(|| "unknown".into());
        let sub = argv.get(2).map(|s| file_component(s)).unwrap_or_else(|| "unknown".into());
        let stem = format!("{}_{}_{}", now.format("%Y%m%d_%H%M%S"), group, sub);

        let (path, file) = open_unique(dir, &stem)?;

        let mut log = Self { path, file };
        log.write_raw(&format!(
            "=== txpilot audit log ===\nTimestamp: {}\nCommand: {}\n\n",
            now.to_rfc3339(),
            display
        ))?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 라벨이 붙은 출력 구간 (STDOUT, STDERR, OUTPUT ...)
    pub fn section(&mut self, label: &str, content: &str) {
        let text = format!("--- {} ---\n{}\n", label, content.trim_end());
        self.write_or_warn(&text);
    }

    /// 드라이버가 수행한 동작 (예: "credential supplied")
    pub fn action(&mut self, action: &str) {
        self.write_or_warn(&format!("[ACTION] {}\n", action));
    }

    /// 결과 요약
    pub fn finish(&mut self, status: ExecutionStatus, exit_code: Option<i32>, elapsed_ms: u128) {
        let exit = exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string());
        let text = format!(
            "\n=== RESULT ===\nStatus: {}\nExit code: {}\nElapsed: {}ms\n",
            status, exit, elapsed_ms
        );
        self.write_or_warn(&text);
    }

    fn write_or_warn(&mut self, text: &str) {
        if let Err(e) = self.write_raw(text) {
            warn!(path = %self.path.display(), error = %e, "audit log write failed");
        }
    }

    fn write_raw(&mut self, text: &str) -> Result<()> {
        self.file
            .write_all(redact(text).as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|e| PilotError::AuditLogError(e.to_string()))
    }
}

fn ensure_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| PilotError::AuditLogError(e.to_string()))?;

    #[cfg(unix)]
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
        .map_err(|e| PilotError::AuditLogError(e.to_string()))?;

    Ok(())
}

/// 같은 초에 같은 명령이 두 번 실행되면 접미어를 붙인다
fn open_unique(dir: &Path, stem: &str) -> Result<(PathBuf, File)> {
    for n in 0..100 {
        let name = if n == 0 {
            format!("{}.log", stem)
        } else {
            format!("{}_{}.log", stem, n)
        };
        let path = dir.join(name);

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        match options.open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(PilotError::AuditLogError(e.to_string())),
        }
    }

    Err(PilotError::AuditLogError(format!(
        "too many log files named {}",
        stem
    )))
}

fn file_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
