use crate::executor::classifier::ExecutionStatus;
use crate::executor::commands::{self, CommandSpec};
use crate::executor::planner::{BatchAction, BatchOperation, BatchPlan, OperationStatus};
use crate::executor::runner::{CommandExecutor, ExecutionMode};
use crate::security::SharedCredentials;
use crate::translator::{translate_error, ErrorCategory};
use crate::ui::progress::BatchProgressDisplay;
use crate::ui::render::format_tao;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 배치 실행 결과
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    /// 총 작업 수
    pub total_operations: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub operations: Vec<BatchOperation>,
    /// rate limit으로 중단됨 (자동 재시도 없음)
    pub stopped_due_to_rate_limit: bool,
    /// 사용자 인터럽트로 중단됨
    pub stopped_due_to_interrupt: bool,
    pub total_duration_ms: u64,
}

impl BatchResult {
    fn new(operations: Vec<BatchOperation>) -> Self {
        Self {
            total_operations: operations.len(),
            successful: 0,
            failed: 0,
            skipped: 0,
            operations,
            stopped_due_to_rate_limit: false,
            stopped_due_to_interrupt: false,
            total_duration_ms: 0,
        }
    }

    /// `index` 이후 작업을 모두 건너뜀 처리
    fn skip_after(&mut self, index: usize) {
        for remaining in self.operations[index + 1..].iter_mut() {
            remaining.status = OperationStatus::Skipped;
            self.skipped += 1;
        }
    }

    pub fn stopped_early(&self) -> bool {
        self.stopped_due_to_rate_limit || self.stopped_due_to_interrupt
    }

    /// 모든 작업이 성공했는지 확인
    pub fn all_succeeded(&self) -> bool {
        self.total_operations > 0 && self.successful == self.total_operations
    }

    /// 실패한 작업들
    pub fn failed_operations(&self) -> Vec<&BatchOperation> {
        self.operations
            .iter()
            .filter(|op| op.status == OperationStatus::Failed)
            .collect()
    }

    /// 성공률 계산
    pub fn success_rate(&self) -> f64 {
        if self.total_operations == 0 {
            return 0.0;
        }
        (self.successful as f64 / self.total_operations as f64) * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub chunk_size: usize,
    pub chunk_delay: Duration,
    pub dry_run: bool,
    pub wallet_name: Option<String>,
    pub safe_staking: bool,
    /// 진행률 표시 (테스트에서는 끈다)
    pub show_progress: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            chunk_size: 3,
            chunk_delay: Duration::from_secs(5),
            dry_run: false,
            wallet_name: None,
            safe_staking: true,
            show_progress: true,
        }
    }
}

/// 배치 실행기
///
/// 작업은 주어진 순서대로 하나씩, 청크 사이에는 대기 시간을 둔다.
/// rate limit 실패가 나오면 남은 작업은 모두 건너뛰고 멈춘다.
pub struct BatchCoordinator<'a> {
    executor: &'a CommandExecutor,
    settings: BatchSettings,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(executor: &'a CommandExecutor, settings: BatchSettings) -> Self {
        Self { executor, settings }
    }

    fn build_command(&self, op: &BatchOperation) -> CommandSpec {
        let wallet = self.settings.wallet_name.as_deref();
        match op.action {
            BatchAction::Stake => commands::stake_add(
                op.amount,
                &op.validator_hotkey,
                op.netuid,
                wallet,
                self.settings.safe_staking,
            ),
            BatchAction::Unstake => {
                commands::stake_remove(op.amount, &op.validator_hotkey, op.netuid, wallet)
            }
        }
    }

    /// 실행 계획에 따라 배치 실행
    pub async fn execute(
        &self,
        plan: BatchPlan,
        credentials: Option<SharedCredentials>,
    ) -> BatchResult {
        let start_time = Instant::now();
        let mut result = BatchResult::new(plan.operations);

        if self.settings.dry_run {
            for op in result.operations.iter_mut() {
                op.status = OperationStatus::Skipped;
            }
            result.skipped = result.total_operations;
            return result;
        }

        let chunk_size = self.settings.chunk_size.max(1);
        let total = result.total_operations;
        let total_chunks = total.div_ceil(chunk_size);

        let progress = self
            .settings
            .show_progress
            .then(|| BatchProgressDisplay::new(total, "Batch"));

        info!(total, chunk_size, "starting batch");

        for chunk_start in (0..total).step_by(chunk_size) {
            let chunk_end = (chunk_start + chunk_size).min(total);
            if let Some(p) = &progress {
                p.set_message(&format!("chunk {}/{}", chunk_start / chunk_size + 1, total_chunks));
            }

            for index in chunk_start..chunk_end {
                let spec = self.build_command(&result.operations[index]);
                let label = result.operations[index].label();
                result.operations[index].status = OperationStatus::Running;

                let spinner = progress
                    .as_ref()
                    .map(|p| p.add_task(&task_label(&result.operations[index])));

                let cmd = self
                    .executor
                    .execute(&spec, ExecutionMode::Interactive, false, credentials.clone())
                    .await;

                let op = &mut result.operations[index];
                if cmd.success() {
                    op.status = OperationStatus::Success;
                    op.tx_hash = cmd.tx_hash.clone();
                    result.successful += 1;
                    if let (Some(p), Some(s)) = (&progress, &spinner) {
                        p.finish_task(s, cmd.elapsed_ms);
                    }
                    continue;
                }

                // Ctrl-C: 남은 작업은 보내지 않는다
                if cmd.status == ExecutionStatus::Cancelled {
                    op.status = OperationStatus::Failed;
                    op.error = Some("Cancelled by user".to_string());
                    result.failed += 1;
                    if let (Some(p), Some(s)) = (&progress, &spinner) {
                        p.fail_task(s, "Cancelled by user");
                    }
                    warn!(operation = index, "interrupted, stopping batch");
                    result.stopped_due_to_interrupt = true;
                    result.skip_after(index);
                    break;
                }

                let error_text = cmd.error_text().to_string();
                let diagnosis = translate_error(&error_text, cmd.exit_code, Some(op.netuid));
                let rate_limited = diagnosis.category == ErrorCategory::RateLimit;

                op.status = OperationStatus::Failed;
                op.error = Some(cmd.error_message.clone().unwrap_or(error_text));
                op.diagnosis = Some(diagnosis);
                result.failed += 1;
                if let (Some(p), Some(s)) = (&progress, &spinner) {
                    p.fail_task(s, op.error.as_deref().unwrap_or(""));
                }
                warn!(operation = index, validator = %label, "batch operation failed");

                if rate_limited {
                    warn!("rate limit detected, stopping batch");
                    result.stopped_due_to_rate_limit = true;
                    result.skip_after(index);
                    break;
                }
            }

            if result.stopped_early() {
                break;
            }

            // 마지막 청크 뒤에는 대기하지 않는다
            if chunk_end < total && !self.settings.chunk_delay.is_zero() {
                info!(delay_secs = self.settings.chunk_delay.as_secs_f64(), "waiting before next chunk");
                tokio::time::sleep(self.settings.chunk_delay).await;
            }
        }

        if let Some(p) = &progress {
            p.finish(result.successful, total);
        }

        result.total_duration_ms = start_time.elapsed().as_millis() as u64;
        result
    }
}

fn task_label(op: &BatchOperation) -> String {
    match op.action {
        BatchAction::Stake => format!("Staking {} to {}", format_tao(op.amount), op.label()),
        BatchAction::Unstake => format!("Unstaking {} from {}", format_tao(op.amount), op.label()),
    }
}
