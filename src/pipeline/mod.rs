//! Plan → Confirm → Execute → Verify
//!
//! 체인 상태를 바꾸는 모든 작업은 이 파이프라인을 거친다.

pub mod plans;

use crate::error::Result;
use crate::executor::classifier::ExecutionStatus;
use crate::executor::commands::{ArgValue, CommandSpec};
use crate::executor::runner::{CommandExecutor, CommandResult, ExecutionMode};
use crate::security::SharedCredentials;
use crate::translator::{translate_error, TranslatedError};
use crate::ui::render;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// 트랜잭션 단계. 선언 순서가 진행 순서.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxPhase {
    Planning,
    Signing,
    Broadcasting,
    InBlock,
    Finalized,
    Failed,
}

impl TxPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Signing => "signing",
            Self::Broadcasting => "broadcasting",
            Self::InBlock => "in_block",
            Self::Finalized => "finalized",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    /// 종료 코드만 확인
    None,
    /// 출력에서 성공 표식/해시 확인
    Stdout,
    /// 해시로 상태 조회
    TxHash,
    /// 체인에서 finalization 확인
    Chain,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanItem {
    pub label: String,
    pub value: String,
}

impl PlanItem {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// 확인 대기 중인 트랜잭션 계획 (저장하지 않음)
#[derive(Debug, Clone, Serialize)]
pub struct TxPlan {
    pub title: String,
    pub command_name: String,
    pub items: Vec<PlanItem>,
    pub warnings: Vec<String>,
    pub network: String,
    pub wallet: Option<String>,
    pub hotkey: Option<String>,
    pub command: CommandSpec,
    pub requires_password: bool,
    pub verification_level: VerificationLevel,
    pub next_steps: Vec<String>,
    /// 고액 송금 시 주소 앞부분을 다시 입력하게 한다
    #[serde(skip)]
    pub confirm_prefix: Option<String>,
}

impl TxPlan {
    fn netuid(&self) -> Option<u16> {
        match self.command.get("netuid") {
            Some(ArgValue::Int(n)) => u16::try_from(*n).ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TxResult {
    pub success: bool,
    pub phase: TxPhase,
    pub message: String,
    pub tx_hash: Option<String>,
    pub block_number: Option<u64>,
    #[serde(skip)]
    pub raw_output: Option<String>,
    pub error: Option<String>,
    pub diagnosis: Option<TranslatedError>,
    pub next_steps: Vec<String>,
}

impl TxResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            phase: TxPhase::Planning,
            message: message.into(),
            tx_hash: None,
            block_number: None,
            raw_output: None,
            error: None,
            diagnosis: None,
            next_steps: Vec::new(),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        let mut result = Self::new(message);
        result.advance(TxPhase::Failed);
        result
    }

    /// 단계 전진. 뒤로 가지 않으며 Failed는 어디서든 가능.
    pub fn advance(&mut self, phase: TxPhase) -> bool {
        if self.phase == TxPhase::Failed {
            return false;
        }
        if phase == TxPhase::Failed || phase > self.phase {
            self.phase = phase;
            return true;
        }
        false
    }
}

/// 확인 응답 입력 창구 (터미널, 테스트용 고정 응답 등)
pub trait ConfirmationInput: Send + Sync {
    /// 한 줄 입력. 인터럽트/EOF는 에러.
    fn read_response(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStatus {
    Finalized { block_number: Option<u64> },
    InBlock { block_number: Option<u64> },
    NotFound,
}

/// 해시로 체인 상태를 조회하는 외부 협력자
#[async_trait]
pub trait ChainVerifier: Send + Sync {
    async fn status(&self, tx_hash: &str) -> Result<ChainStatus>;
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub dry_run: bool,
    pub json_output: bool,
}

pub struct TransactionPipeline {
    executor: CommandExecutor,
    options: PipelineOptions,
    input: Box<dyn ConfirmationInput>,
    verifier: Option<Box<dyn ChainVerifier>>,
}

impl TransactionPipeline {
    pub fn new(
        executor: CommandExecutor,
        options: PipelineOptions,
        input: Box<dyn ConfirmationInput>,
    ) -> Self {
        Self {
            executor,
            options,
            input,
            verifier: None,
        }
    }

    pub fn with_verifier(mut self, verifier: Box<dyn ChainVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Step A: 계획 표시
    pub fn show_plan(&self, plan: &TxPlan) {
        if self.options.json_output {
            println!("{}", render::plan_json(plan, self.options.dry_run));
            return;
        }
        render::print_plan(plan, self.options.dry_run);
    }

    /// Step B: 명시적 확인 ("yes" / "y")
    pub fn confirm(&self, plan: &TxPlan) -> bool {
        if self.options.dry_run {
            render::print_info("Dry run - skipping execution");
            return false;
        }

        let response = match self.input.read_response("Type 'yes' to confirm") {
            Ok(response) => response,
            Err(_) => {
                render::print_warning("Cancelled");
                return false;
            }
        };

        if !matches!(response.trim().to_lowercase().as_str(), "yes" | "y") {
            return false;
        }

        if let Some(prefix) = &plan.confirm_prefix {
            let prompt = format!(
                "Large transfer. Type the first {} characters of the destination address",
                prefix.chars().count()
            );
            match self.input.read_response(&prompt) {
                Ok(answer) if answer.trim() == prefix => {}
                Ok(_) => {
                    render::print_warning("Address prefix did not match");
                    return false;
                }
                Err(_) => {
                    render::print_warning("Cancelled");
                    return false;
                }
            }
        }

        true
    }

    /// Step C: 실행
    pub async fn execute(
        &self,
        plan: &TxPlan,
        credentials: Option<SharedCredentials>,
    ) -> TxResult {
        let mut result = TxResult::new("Preparing transaction...");
        result.advance(TxPhase::Signing);
        self.show_phase(TxPhase::Signing, "Preparing transaction...");

        if self.executor.settings().demo_mode {
            result.success = true;
            result.advance(TxPhase::Finalized);
            result.message = "Demo mode - transaction simulated".to_string();
            result.next_steps = plan.next_steps.clone();
            return result;
        }

        result.advance(TxPhase::Broadcasting);
        self.show_phase(TxPhase::Broadcasting, "Broadcasting to network...");

        let mode = if plan.requires_password {
            ExecutionMode::Interactive
        } else {
            ExecutionMode::Normal
        };

        info!(command = %plan.command.name(), "broadcasting transaction");
        let cmd_result = self.executor.execute(&plan.command, mode, false, credentials).await;

        self.process_result(result, cmd_result, plan)
    }

    fn process_result(&self, mut result: TxResult, cmd: CommandResult, plan: &TxPlan) -> TxResult {
        result.raw_output = Some(cmd.raw_output.clone());

        if cmd.status == ExecutionStatus::Success {
            result.success = true;
            result.advance(TxPhase::InBlock);
            result.message = "Transaction submitted".to_string();
            result.tx_hash = cmd.tx_hash;
            result.next_steps = plan.next_steps.clone();
            return result;
        }

        let error = match cmd.error_text().trim() {
            "" => "Unknown error".to_string(),
            text => text.to_string(),
        };

        result.advance(TxPhase::Failed);
        result.message = match cmd.status {
            ExecutionStatus::Cancelled => "Cancelled by user".to_string(),
            ExecutionStatus::Timeout => "Transaction timed out".to_string(),
            _ => "Transaction failed".to_string(),
        };
        result.diagnosis = Some(translate_error(&error, cmd.exit_code, plan.netuid()));
        result.error = Some(error);

        warn!(status = %cmd.status, "transaction failed");
        result
    }

    /// Step D: 검증
    pub async fn verify(&self, plan: &TxPlan, mut result: TxResult) -> TxResult {
        // 실패했거나 이미 확정된 결과는 그대로
        if !result.success || result.phase == TxPhase::Finalized {
            return result;
        }

        match plan.verification_level {
            VerificationLevel::None => result,
            VerificationLevel::Stdout => verify_from_stdout(result),
            VerificationLevel::TxHash | VerificationLevel::Chain => {
                let (Some(verifier), Some(hash)) = (&self.verifier, result.tx_hash.clone()) else {
                    return verify_from_stdout(result);
                };

                match verifier.status(&hash).await {
                    Ok(ChainStatus::Finalized { block_number }) => {
                        result.advance(TxPhase::Finalized);
                        result.message = "Transaction finalized".to_string();
                        result.block_number = block_number;
                        result
                    }
                    Ok(ChainStatus::InBlock { block_number }) => {
                        result.advance(TxPhase::InBlock);
                        result.message = "Transaction included in block".to_string();
                        result.block_number = block_number;
                        result
                    }
                    Ok(ChainStatus::NotFound) => {
                        result.message = "Transaction submitted".to_string();
                        result
                    }
                    Err(e) => {
                        debug!(error = %e, "chain verification unavailable, using stdout");
                        verify_from_stdout(result)
                    }
                }
            }
        }
    }

    pub fn show_result(&self, result: &TxResult) {
        if self.options.json_output {
            println!("{}", render::result_json(result));
            return;
        }
        render::print_result(result);
    }

    /// 전체 흐름: 계획 → 확인 → 실행 → 검증 → 결과 표시
    pub async fn run(
        &self,
        plan: &TxPlan,
        credentials: Option<SharedCredentials>,
        skip_confirm: bool,
    ) -> TxResult {
        self.show_plan(plan);

        // --yes와 함께여도 dry-run은 실행하지 않는다
        if self.options.dry_run {
            if !self.options.json_output {
                render::print_info("Dry run - no transaction sent");
            }
            return TxResult::cancelled("Dry run - no transaction sent");
        }

        if !skip_confirm && !self.confirm(plan) {
            return TxResult::cancelled("Cancelled by user");
        }

        let result = self.execute(plan, credentials).await;
        let result = self.verify(plan, result).await;
        self.show_result(&result);
        result
    }

    fn show_phase(&self, phase: TxPhase, message: &str) {
        if self.options.json_output {
            return;
        }
        render::print_phase(phase, message);
    }
}

fn verify_from_stdout(mut result: TxResult) -> TxResult {
    if result.tx_hash.is_some() {
        result.advance(TxPhase::Finalized);
        result.message = "Transaction finalized".to_string();
    } else {
        result.advance(TxPhase::InBlock);
        result.message = "Transaction submitted".to_string();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PilotError;
    use crate::executor::launcher::testing::ScriptLauncher;
    use crate::executor::runner::ExecutorSettings;
    use crate::pipeline::plans::{self, PlanContext};
    use crate::translator::ErrorCategory;
    use secrecy::SecretString;
    use std::sync::Mutex;
    use std::time::Duration;

    const DEST: &str = "5DAAnrj7VHTznn2AWBemMuyBwZWs6FNFjdyVXUeYum3PTXFy";

    /// 미리 정한 응답을 순서대로 돌려준다. 없으면 인터럽트처럼 에러.
    struct ScriptedInput(Mutex<Vec<String>>);

    impl ScriptedInput {
        fn new(responses: &[&str]) -> Box<Self> {
            let mut responses: Vec<String> = responses.iter().map(|s| s.to_string()).collect();
            responses.reverse();
            Box::new(Self(Mutex::new(responses)))
        }
    }

    impl ConfirmationInput for ScriptedInput {
        fn read_response(&self, _prompt: &str) -> Result<String> {
            self.0.lock().unwrap().pop().ok_or(PilotError::UserCancelled)
        }
    }

    struct FixedVerifier(Result<ChainStatus>);

    #[async_trait]
    impl ChainVerifier for FixedVerifier {
        async fn status(&self, _tx_hash: &str) -> Result<ChainStatus> {
            match &self.0 {
                Ok(status) => Ok(*status),
                Err(e) => Err(PilotError::ExecutionError(e.to_string())),
            }
        }
    }

    fn ctx() -> PlanContext {
        PlanContext {
            network: "finney".to_string(),
            wallet: "alice".to_string(),
            hotkey: "default".to_string(),
            large_tx_threshold: 10.0,
        }
    }

    fn executor(scripts: &[&str], demo: bool) -> (CommandExecutor, std::sync::Arc<ScriptLauncher>) {
        let launcher = ScriptLauncher::new(scripts.iter().copied());
        let settings = ExecutorSettings {
            demo_mode: demo,
            command_timeout: Duration::from_secs(10),
            ..ExecutorSettings::default()
        };
        let executor = CommandExecutor::new(settings).with_launcher(launcher.clone());
        (executor, launcher)
    }

    fn pipeline(scripts: &[&str], responses: &[&str]) -> (TransactionPipeline, std::sync::Arc<ScriptLauncher>) {
        let (executor, launcher) = executor(scripts, false);
        let options = PipelineOptions {
            json_output: true,
            ..PipelineOptions::default()
        };
        (TransactionPipeline::new(executor, options, ScriptedInput::new(responses)), launcher)
    }

    fn password() -> SharedCredentials {
        std::sync::Arc::new(|| -> Result<SecretString> { Ok(SecretString::from("pw".to_string())) })
    }

    fn success_result(hash: Option<&str>) -> TxResult {
        let mut result = TxResult::new("Transaction submitted");
        result.success = true;
        result.advance(TxPhase::InBlock);
        result.tx_hash = hash.map(|h| h.to_string());
        result
    }

    #[test]
    fn test_phase_advance_is_monotonic() {
        let mut result = TxResult::new("x");
        assert!(result.advance(TxPhase::Broadcasting));
        assert!(!result.advance(TxPhase::Signing));
        assert_eq!(result.phase, TxPhase::Broadcasting);
        assert!(result.advance(TxPhase::Failed));
        assert!(!result.advance(TxPhase::Finalized));
        assert_eq!(result.phase, TxPhase::Failed);
    }

    #[test]
    fn test_confirm_accepts_yes() {
        let plan = plans::stake_plan(&ctx(), 1.0, DEST, None, 1);
        for answer in ["yes", "Y", "  YES  "] {
            let (p, _) = pipeline(&["true"], &[answer]);
            assert!(p.confirm(&plan), "{answer}");
        }
        for answer in ["no", "", "yess"] {
            let (p, _) = pipeline(&["true"], &[answer]);
            assert!(!p.confirm(&plan), "{answer}");
        }
    }

    #[test]
    fn test_confirm_interrupt_declines() {
        let plan = plans::stake_plan(&ctx(), 1.0, DEST, None, 1);
        let (p, _) = pipeline(&["true"], &[]);
        assert!(!p.confirm(&plan));
    }

    #[test]
    fn test_confirm_prefix_challenge() {
        let plan = plans::transfer_plan(&ctx(), 50.0, DEST);
        assert_eq!(plan.confirm_prefix.as_deref(), Some("5DAAnr"));

        let (p, _) = pipeline(&["true"], &["yes", "5DAAnr"]);
        assert!(p.confirm(&plan));

        let (p, _) = pipeline(&["true"], &["yes", "5XXXXX"]);
        assert!(!p.confirm(&plan));
    }

    #[test]
    fn test_dry_run_declines_without_prompting() {
        let (executor, _) = executor(&["true"], false);
        let options = PipelineOptions { dry_run: true, json_output: true };
        // 프롬프트를 띄웠다면 "yes"로 확인되었을 것
        let p = TransactionPipeline::new(executor, options, ScriptedInput::new(&["yes"]));
        let plan = plans::stake_plan(&ctx(), 1.0, DEST, None, 1);
        assert!(!p.confirm(&plan));
    }

    #[tokio::test]
    async fn test_run_declined_never_executes() {
        let (p, launcher) = pipeline(&["echo Finalized"], &["no"]);
        let plan = plans::stake_plan(&ctx(), 1.0, DEST, None, 1);

        let result = p.run(&plan, None, false).await;

        assert!(!result.success);
        assert_eq!(result.phase, TxPhase::Failed);
        assert_eq!(result.message, "Cancelled by user");
        assert_eq!(launcher.spawn_count(), 0);
    }

    #[tokio::test]
    async fn test_dry_run_with_skip_confirm_never_executes() {
        let (executor, launcher) = executor(&["echo Finalized"], false);
        let options = PipelineOptions { dry_run: true, json_output: true };
        let p = TransactionPipeline::new(executor, options, ScriptedInput::new(&[]));
        let plan = plans::stake_plan(&ctx(), 1.0, DEST, None, 1);

        let result = p.run(&plan, None, true).await;

        assert!(!result.success);
        assert_eq!(launcher.spawn_count(), 0);
    }

    #[tokio::test]
    async fn test_demo_mode_finalized() {
        let (executor, launcher) = executor(&["echo Finalized"], true);
        let options = PipelineOptions { dry_run: false, json_output: true };
        let p = TransactionPipeline::new(executor, options, ScriptedInput::new(&["yes"]));
        let plan = plans::stake_plan(&ctx(), 1.0, DEST, None, 1);

        let result = p.run(&plan, None, false).await;

        assert!(result.success);
        assert_eq!(result.phase, TxPhase::Finalized);
        assert_eq!(result.message, "Demo mode - transaction simulated");
        assert_eq!(launcher.spawn_count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_success_with_hash_is_finalized() {
        let hash = "cd".repeat(32);
        let script = format!("printf 'Enter password: '; read p; echo '✅ Finalized'; echo 'hash: 0x{}'", hash);
        let (p, _) = pipeline(&[script.as_str()], &["yes"]);
        let plan = plans::stake_plan(&ctx(), 1.0, DEST, Some("Validator"), 1);
        let provider = password();

        let result = p.run(&plan, Some(provider), false).await;

        assert!(result.success);
        assert_eq!(result.phase, TxPhase::Finalized);
        assert_eq!(result.tx_hash, Some(format!("0x{}", hash)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_failure_has_diagnosis() {
        let (p, _) = pipeline(&["echo 'Custom error: 6 - RateLimitExceeded'; exit 1"], &[]);
        let plan = plans::stake_plan(&ctx(), 1.0, DEST, None, 1);
        let provider = password();

        let result = p.execute(&plan, Some(provider)).await;

        assert!(!result.success);
        assert_eq!(result.phase, TxPhase::Failed);
        assert_eq!(result.message, "Transaction failed");
        let diagnosis = result.diagnosis.unwrap();
        assert_eq!(diagnosis.category, ErrorCategory::RateLimit);
        assert!(result.error.unwrap().contains("RateLimitExceeded"));
    }

    #[tokio::test]
    async fn test_verify_stdout_levels() {
        let (p, _) = pipeline(&["true"], &[]);
        let plan = plans::stake_plan(&ctx(), 1.0, DEST, None, 1);
        let hash = format!("0x{}", "a".repeat(64));

        let result = p.verify(&plan, success_result(Some(&hash))).await;
        assert_eq!(result.phase, TxPhase::Finalized);
        assert_eq!(result.message, "Transaction finalized");

        let result = p.verify(&plan, success_result(None)).await;
        assert_eq!(result.phase, TxPhase::InBlock);
        assert_eq!(result.message, "Transaction submitted");
    }

    #[tokio::test]
    async fn test_verify_none_level_passes_through() {
        let (p, _) = pipeline(&["true"], &[]);
        let mut plan = plans::stake_plan(&ctx(), 1.0, DEST, None, 1);
        plan.verification_level = VerificationLevel::None;
        let hash = format!("0x{}", "a".repeat(64));

        let result = p.verify(&plan, success_result(Some(&hash))).await;
        assert_eq!(result.phase, TxPhase::InBlock);
    }

    #[tokio::test]
    async fn test_verify_failed_result_untouched() {
        let (p, _) = pipeline(&["true"], &[]);
        let plan = plans::stake_plan(&ctx(), 1.0, DEST, None, 1);

        let result = p.verify(&plan, TxResult::cancelled("nope")).await;
        assert_eq!(result.phase, TxPhase::Failed);
        assert_eq!(result.message, "nope");
    }

    #[tokio::test]
    async fn test_verify_with_chain_verifier() {
        let (p, _) = pipeline(&["true"], &[]);
        let p = p.with_verifier(Box::new(FixedVerifier(Ok(ChainStatus::Finalized {
            block_number: Some(42),
        }))));
        let mut plan = plans::stake_plan(&ctx(), 1.0, DEST, None, 1);
        plan.verification_level = VerificationLevel::Chain;
        let hash = format!("0x{}", "a".repeat(64));

        let result = p.verify(&plan, success_result(Some(&hash))).await;
        assert_eq!(result.phase, TxPhase::Finalized);
        assert_eq!(result.block_number, Some(42));
    }

    #[tokio::test]
    async fn test_verify_falls_back_when_verifier_fails() {
        let (p, _) = pipeline(&["true"], &[]);
        let p = p.with_verifier(Box::new(FixedVerifier(Err(PilotError::ExecutionError(
            "rpc down".to_string(),
        )))));
        let mut plan = plans::stake_plan(&ctx(), 1.0, DEST, None, 1);
        plan.verification_level = VerificationLevel::TxHash;
        let hash = format!("0x{}", "a".repeat(64));

        let result = p.verify(&plan, success_result(Some(&hash))).await;
        assert_eq!(result.phase, TxPhase::Finalized);
        assert_eq!(result.message, "Transaction finalized");
    }
}
