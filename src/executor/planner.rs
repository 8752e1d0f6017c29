use crate::translator::TranslatedError;
use crate::ui::render::format_tao;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// 이보다 작은 배분은 버린다
const MIN_ALLOCATION: f64 = 0.001;
const LARGE_TOTAL_TAO: f64 = 100.0;
const HIGH_TAKE: f64 = 0.15;

/// 재분배 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RebalanceMode {
    /// 균등 분배
    Equal,
    /// 검증자 stake 비율대로
    Weighted,
    /// 1순위에 50%, 나머지 균등
    TopHeavy,
}

impl RebalanceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Weighted => "weighted",
            Self::TopHeavy => "top_heavy",
        }
    }
}

/// 상위 협력자가 넘겨주는 대상 검증자
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatorTarget {
    pub hotkey: String,
    pub name: Option<String>,
    pub stake: f64,
    /// 0.0 ~ 1.0
    pub take: f64,
}

impl ValidatorTarget {
    pub fn new(hotkey: impl Into<String>) -> Self {
        Self {
            hotkey: hotkey.into(),
            name: None,
            stake: 0.0,
            take: 0.0,
        }
    }

    fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.hotkey.chars().take(8).collect(),
        }
    }
}

/// `HOTKEY[:STAKE[:TAKE]]`
impl FromStr for ValidatorTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let hotkey = parts
            .next()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| "missing validator hotkey".to_string())?;

        let mut target = Self::new(hotkey);
        if let Some(stake) = parts.next() {
            target.stake = stake
                .trim()
                .parse()
                .map_err(|_| format!("invalid stake '{}'", stake))?;
        }
        if let Some(take) = parts.next() {
            target.take = take
                .trim()
                .parse()
                .map_err(|_| format!("invalid take '{}'", take))?;
        }
        if parts.next().is_some() {
            return Err(format!("expected HOTKEY[:STAKE[:TAKE]], got '{}'", s));
        }
        Ok(target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchAction {
    Stake,
    Unstake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// 배치 안의 단일 작업
#[derive(Debug, Clone, Serialize)]
pub struct BatchOperation {
    pub action: BatchAction,
    pub amount: f64,
    pub validator_hotkey: String,
    pub validator_name: Option<String>,
    pub netuid: u16,
    pub status: OperationStatus,
    pub error: Option<String>,
    pub tx_hash: Option<String>,
    pub diagnosis: Option<TranslatedError>,
}

impl BatchOperation {
    pub fn new(action: BatchAction, amount: f64, validator_hotkey: impl Into<String>, netuid: u16) -> Self {
        Self {
            action,
            amount,
            validator_hotkey: validator_hotkey.into(),
            validator_name: None,
            netuid,
            status: OperationStatus::Pending,
            error: None,
            tx_hash: None,
            diagnosis: None,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.validator_name = name;
        self
    }

    pub fn label(&self) -> String {
        match &self.validator_name {
            Some(name) => name.clone(),
            None => self.validator_hotkey.chars().take(12).collect(),
        }
    }
}

/// 배치 실행 계획
#[derive(Debug, Clone, Serialize)]
pub struct BatchPlan {
    pub operations: Vec<BatchOperation>,
    pub total_amount: f64,
    pub netuid: u16,
    pub mode: String,
    pub description: String,
    pub warnings: Vec<String>,
}

/// 대상 검증자들에게 `total`을 배분하는 stake 계획
pub fn calculate_rebalance_plan(
    targets: &[ValidatorTarget],
    total: f64,
    mode: RebalanceMode,
    netuid: u16,
) -> BatchPlan {
    if targets.is_empty() {
        return BatchPlan {
            operations: Vec::new(),
            total_amount: total,
            netuid,
            mode: mode.as_str().to_string(),
            description: "No target validators found".to_string(),
            warnings: vec!["No validators available for staking".to_string()],
        };
    }

    let count = targets.len();
    let (allocations, description): (Vec<(&ValidatorTarget, f64)>, String) = match mode {
        RebalanceMode::Equal => {
            let per = total / count as f64;
            (
                targets.iter().map(|v| (v, per)).collect(),
                format!("Equal split: {} each to {} validators", format_tao(per), count),
            )
        }
        RebalanceMode::TopHeavy => {
            let allocations = if count == 1 {
                vec![(&targets[0], total)]
            } else {
                let rest = total * 0.5 / (count - 1) as f64;
                std::iter::once((&targets[0], total * 0.5))
                    .chain(targets[1..].iter().map(|v| (v, rest)))
                    .collect()
            };
            (
                allocations,
                format!("Top-heavy: 50% to top, rest split to {} others", count - 1),
            )
        }
        RebalanceMode::Weighted => {
            let total_stake: f64 = targets.iter().map(|v| v.stake).sum();
            let allocations = if total_stake > 0.0 {
                targets.iter().map(|v| (v, total * v.stake / total_stake)).collect()
            } else {
                // stake 정보가 없으면 균등
                let per = total / count as f64;
                targets.iter().map(|v| (v, per)).collect()
            };
            (allocations, format!("Weighted by stake to {} validators", count))
        }
    };

    let operations = allocations
        .iter()
        .filter(|(_, amount)| *amount >= MIN_ALLOCATION)
        .map(|(v, amount)| {
            BatchOperation::new(BatchAction::Stake, *amount, v.hotkey.clone(), netuid)
                .with_name(v.name.clone())
        })
        .collect();

    let mut warnings = Vec::new();
    if total >= LARGE_TOTAL_TAO {
        warnings.push(format!("Large stake amount: {}", format_tao(total)));
    }

    let high_take: Vec<String> = allocations
        .iter()
        .filter(|(v, _)| v.take > HIGH_TAKE)
        .take(3)
        .map(|(v, _)| v.label())
        .collect();
    if !high_take.is_empty() {
        warnings.push(format!("High take rate (>15%): {}", high_take.join(", ")));
    }

    BatchPlan {
        operations,
        total_amount: total,
        netuid,
        mode: mode.as_str().to_string(),
        description,
        warnings,
    }
}
