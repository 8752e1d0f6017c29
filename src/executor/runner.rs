use crate::audit::{AuditLog, AuditLogger};
use crate::config::Config;
use crate::executor::classifier::{ExecutionStatus, OutputParser};
use crate::executor::commands::{ArgValue, CommandSpec};
use crate::executor::driver::{interrupted, DriverOutcome, DriverSettings, InteractiveDriver};
use crate::executor::launcher::{ProcessLauncher, SystemLauncher};
use crate::executor::validator::CommandValidator;
use crate::security::SharedCredentials;
use crate::ui::prompt::PromptCredentials;
use serde::Serialize;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{info, warn};

/// 실행 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// 출력 전체를 모으고 고정 타임아웃
    Normal,
    /// 프롬프트에 응답하며 구동
    Interactive,
}

/// 실행기 설정 (설정 파일에서 주입)
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub binary: String,
    /// 비어 있으면 `--network`를 붙이지 않는다
    pub network: Option<String>,
    pub command_timeout: Duration,
    pub driver: DriverSettings,
    pub demo_mode: bool,
}

impl ExecutorSettings {
    pub fn from_config(config: &Config) -> Self {
        let network = Some(config.network.trim().to_string()).filter(|n| !n.is_empty());

        Self {
            binary: config.binary.clone(),
            network,
            command_timeout: config.command_timeout(),
            driver: DriverSettings {
                prompt_timeout: config.prompt_timeout(),
                max_password_attempts: config.max_password_attempts,
                ..DriverSettings::default()
            },
            demo_mode: config.demo_mode,
        }
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// 지갑 CLI 실행 결과
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub status: ExecutionStatus,
    pub stdout: String,
    pub stderr: String,
    /// `None`이면 종료 코드를 얻지 못함
    pub exit_code: Option<i32>,
    pub argv: Vec<String>,
    /// 인자 값을 가린 명령 문자열
    pub display: String,
    pub elapsed_ms: u64,
    pub tx_hash: Option<String>,
    pub log_path: Option<String>,
    pub error_message: Option<String>,
    pub raw_output: String,
}

impl CommandResult {
    fn new(status: ExecutionStatus, argv: Vec<String>, display: String) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            argv,
            display,
            elapsed_ms: 0,
            tx_hash: None,
            log_path: None,
            error_message: None,
            raw_output: String::new(),
        }
    }

    fn failed(status: ExecutionStatus, argv: Vec<String>, display: String, message: String) -> Self {
        let mut result = Self::new(status, argv, display);
        result.stderr = message.clone();
        result.raw_output = message.clone();
        result.error_message = Some(message);
        result
    }

    pub fn success(&self) -> bool {
        self.status.is_success()
    }

    /// stdout, 비어 있으면 stderr
    pub fn output(&self) -> &str {
        if self.stdout.trim().is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }

    /// 에러 분석에 쓸 텍스트 (stderr 우선)
    pub fn error_text(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// 지갑 CLI 실행기
///
/// 허용 목록 검사, dry-run/데모 처리, 일반/대화형 실행, 출력 분류, 감사 로그를 담당.
/// 예상 가능한 실패는 모두 [`CommandResult`]로 돌려주며 에러를 던지지 않는다.
pub struct CommandExecutor {
    settings: ExecutorSettings,
    launcher: Arc<dyn ProcessLauncher>,
    validator: CommandValidator,
    audit: AuditLogger,
    interrupt: Option<watch::Receiver<bool>>,
}

impl CommandExecutor {
    pub fn new(settings: ExecutorSettings) -> Self {
        Self {
            settings,
            launcher: Arc::new(SystemLauncher),
            validator: CommandValidator::new(),
            audit: AuditLogger::disabled(),
            interrupt: None,
        }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    /// 대화형 실행 중 인터럽트 신호 (Ctrl-C)
    pub fn with_interrupt(mut self, interrupt: watch::Receiver<bool>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    fn is_interrupted(&self) -> bool {
        self.interrupt.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// `binary group sub [--network N] [--k v ...] [--flag ...]`
    pub fn build_argv(&self, spec: &CommandSpec) -> Vec<String> {
        self.render(spec, false)
    }

    /// 로그/화면용 명령 문자열. 인자 값은 `[VALUE]`로 가린다.
    pub fn display_command(&self, spec: &CommandSpec) -> String {
        self.render(spec, true).join(" ")
    }

    fn render(&self, spec: &CommandSpec, sanitize: bool) -> Vec<String> {
        let mut argv = vec![
            self.settings.binary.clone(),
            spec.group.clone(),
            spec.subcommand.clone(),
        ];

        if let Some(network) = &self.settings.network {
            argv.push("--network".to_string());
            argv.push(network.clone());
        }

        for (key, value) in &spec.args {
            match value {
                ArgValue::Bool(true) => argv.push(format!("--{}", key)),
                ArgValue::Bool(false) => {}
                other => {
                    argv.push(format!("--{}", key));
                    argv.push(if sanitize {
                        "[VALUE]".to_string()
                    } else {
                        other.render()
                    });
                }
            }
        }

        for flag in &spec.flags {
            argv.push(format!("--{}", flag));
        }

        argv
    }

    /// 비대화형 실행
    pub async fn run(&self, spec: &CommandSpec) -> CommandResult {
        self.execute(spec, ExecutionMode::Normal, false, None).await
    }

    /// 대화형 실행. `credentials`가 없으면 마스킹된 비밀번호 입력창을 띄운다.
    pub async fn run_interactive(
        &self,
        spec: &CommandSpec,
        credentials: Option<SharedCredentials>,
    ) -> CommandResult {
        self.execute(spec, ExecutionMode::Interactive, false, credentials).await
    }

    pub async fn execute(
        &self,
        spec: &CommandSpec,
        mode: ExecutionMode,
        dry_run: bool,
        credentials: Option<SharedCredentials>,
    ) -> CommandResult {
        // 1. 허용 목록 (어떤 I/O보다 먼저)
        if let Err(e) = self.validator.validate(&spec.group, &spec.subcommand) {
            warn!(command = %spec.name(), "rejected command outside the allow-list");
            return CommandResult::failed(ExecutionStatus::Failed, Vec::new(), spec.name(), e.to_string());
        }

        let argv = self.build_argv(spec);
        let command_text = self.display_command(spec);

        // 2. dry-run
        if dry_run {
            let mut result = CommandResult::new(ExecutionStatus::DryRun, argv, command_text);
            result.stdout = format!("[DRY RUN] Would execute: {}", result.argv.join(" "));
            result.raw_output = result.stdout.clone();
            result.exit_code = Some(0);
            return result;
        }

        // 3. 데모 모드
        if self.settings.demo_mode {
            let mut result = CommandResult::new(ExecutionStatus::DemoMode, argv, command_text);
            result.stdout = format!("[DEMO MODE] Command: {}", result.display);
            result.raw_output = result.stdout.clone();
            result.exit_code = Some(0);
            return result;
        }

        // 4. 이미 인터럽트된 상태면 새 프로세스를 띄우지 않는다
        if self.is_interrupted() {
            warn!(command = %command_text, "interrupted, not spawning");
            return CommandResult::failed(
                ExecutionStatus::Cancelled,
                argv,
                command_text,
                "Cancelled by user".to_string(),
            );
        }

        info!(command = %command_text, mode = ?mode, "executing wallet command");

        let start = Instant::now();
        let mut log = self.audit.start(&argv, &command_text);

        let mut result = match mode {
            ExecutionMode::Normal => self.execute_normal(argv, command_text, log.as_mut()).await,
            ExecutionMode::Interactive => {
                let credentials = credentials
                    .unwrap_or_else(|| Arc::new(PromptCredentials::default()) as SharedCredentials);
                self.execute_interactive(argv, command_text, credentials, log.as_mut())
                    .await
            }
        };

        result.elapsed_ms = start.elapsed().as_millis() as u64;

        if let Some(log) = log.as_mut() {
            log.finish(result.status, result.exit_code, result.elapsed_ms.into());
            result.log_path = Some(log.path().display().to_string());
        }

        info!(
            status = %result.status,
            exit_code = ?result.exit_code,
            elapsed_ms = result.elapsed_ms,
            "wallet command finished"
        );

        result
    }

    async fn execute_normal(
        &self,
        argv: Vec<String>,
        command_text: String,
        log: Option<&mut AuditLog>,
    ) -> CommandResult {
        let mut child = match self.launcher.spawn(&argv) {
            Ok(child) => child,
            Err(e) => {
                let message = self.spawn_error_message(&e);
                return CommandResult::failed(ExecutionStatus::Failed, argv, command_text, message);
            }
        };

        // 비대화형: 입력 없음
        drop(child.stdin.take());

        // 인터럽트가 이기면 future가 drop되며 kill_on_drop으로 종료된다
        let mut interrupt = self.interrupt.clone();
        let waited = tokio::select! {
            waited = timeout(self.settings.command_timeout, child.wait_with_output()) => Some(waited),
            _ = interrupted(&mut interrupt) => None,
        };

        let output = match waited {
            None => {
                warn!(command = %command_text, "interrupted while waiting for wallet CLI");
                return CommandResult::failed(
                    ExecutionStatus::Cancelled,
                    argv,
                    command_text,
                    "Cancelled by user".to_string(),
                );
            }
            Some(Ok(Ok(output))) => output,
            Some(Ok(Err(e))) => {
                let message = format!("Failed to read command output: {}", e);
                return CommandResult::failed(ExecutionStatus::Failed, argv, command_text, message);
            }
            Some(Err(_)) => {
                let message = format!(
                    "Command timed out after {} seconds",
                    self.settings.command_timeout.as_secs()
                );
                warn!(command = %command_text, "{}", message);
                return CommandResult::failed(ExecutionStatus::Timeout, argv, command_text, message);
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if let Some(log) = log {
            log.section("STDOUT", &stdout);
            log.section("STDERR", &stderr);
        }

        classify(argv, command_text, stdout, stderr, output.status.code())
    }

    async fn execute_interactive(
        &self,
        argv: Vec<String>,
        command_text: String,
        credentials: SharedCredentials,
        mut log: Option<&mut AuditLog>,
    ) -> CommandResult {
        let child = match self.launcher.spawn(&argv) {
            Ok(child) => child,
            Err(e) => {
                let message = self.spawn_error_message(&e);
                return CommandResult::failed(ExecutionStatus::Failed, argv, command_text, message);
            }
        };

        let driver = InteractiveDriver::new(self.settings.driver.clone());
        let out = driver
            .run(child, credentials, self.interrupt.clone(), log.as_deref_mut())
            .await;

        if let Some(log) = log {
            log.section("OUTPUT", &out.output);
        }

        let (status, message) = match out.outcome {
            DriverOutcome::Done => {
                return classify(argv, command_text, out.output, String::new(), out.exit_code);
            }
            DriverOutcome::TimedOut => (
                ExecutionStatus::Timeout,
                format!(
                    "Timed out waiting for wallet CLI after {} seconds",
                    self.settings.driver.prompt_timeout.as_secs()
                ),
            ),
            DriverOutcome::PasswordLimit => (
                ExecutionStatus::Failed,
                "Too many password attempts".to_string(),
            ),
            DriverOutcome::CredentialUnavailable(reason) => (
                ExecutionStatus::Failed,
                format!("Credential unavailable: {}", reason),
            ),
            DriverOutcome::Cancelled => (ExecutionStatus::Cancelled, "Cancelled by user".to_string()),
        };

        let mut result = CommandResult::new(status, argv, command_text);
        result.raw_output = format!("{}\n{}", out.output, message);
        result.stdout = out.output;
        result.stderr = message.clone();
        result.exit_code = out.exit_code;
        result.error_message = Some(message);
        result
    }

    fn spawn_error_message(&self, e: &io::Error) -> String {
        if e.kind() == io::ErrorKind::NotFound {
            format!(
                "`{}` not found. Install it with: pip install bittensor-cli",
                self.settings.binary
            )
        } else {
            format!("Failed to start `{}`: {}", self.settings.binary, e)
        }
    }
}

fn classify(
    argv: Vec<String>,
    command_text: String,
    stdout: String,
    stderr: String,
    exit_code: Option<i32>,
) -> CommandResult {
    let status = OutputParser::determine_status(&stdout, &stderr, exit_code);

    let mut result = CommandResult::new(status, argv, command_text);
    result.tx_hash = OutputParser::extract_tx_hash(&stdout);
    if !status.is_success() {
        result.error_message = OutputParser::parse_error_message(&stdout, &stderr);
    }
    result.raw_output = if stderr.is_empty() {
        stdout.clone()
    } else {
        format!("{}\n{}", stdout, stderr)
    };
    result.stdout = stdout;
    result.stderr = stderr;
    result.exit_code = exit_code;
    result
}
