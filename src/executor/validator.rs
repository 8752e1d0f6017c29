use crate::error::{PilotError, Result};
use serde::Serialize;

/// 실행 허용된 (group, subcommand) 목록과 위험도 판정
pub struct CommandValidator;

impl CommandValidator {
    const ALLOWED: &'static [(&'static str, &'static [&'static str])] = &[
        ("wallet", &["list", "balance", "create", "transfer", "new-coldkey", "new-hotkey"]),
        ("stake", &["add", "remove", "list", "move", "wizard"]),
        ("subnets", &["list", "metagraph", "hyperparameters", "register", "burn-cost"]),
        ("config", &["set", "get", "clear"]),
        ("sudo", &["get-take", "set-take"]),
        ("root", &["list", "weights"]),
    ];

    // 자금 이동이 되돌릴 수 없는 명령
    const HIGH_RISK: &'static [(&'static str, &'static str)] = &[
        ("wallet", "transfer"),
        ("subnets", "register"),
        ("sudo", "set-take"),
        ("root", "weights"),
    ];

    const MEDIUM_RISK_GROUPS: &'static [&'static str] = &["stake"];

    const MEDIUM_RISK: &'static [(&'static str, &'static str)] = &[
        ("wallet", "create"),
        ("wallet", "new-coldkey"),
        ("wallet", "new-hotkey"),
        ("config", "set"),
        ("config", "clear"),
    ];

    pub fn new() -> Self {
        Self
    }

    pub fn is_allowed(group: &str, subcommand: &str) -> bool {
        Self::ALLOWED
            .iter()
            .any(|(g, subs)| *g == group && subs.contains(&subcommand))
    }

    /// 프로세스 생성 전에 호출. 목록에 없으면 에러.
    pub fn validate(&self, group: &str, subcommand: &str) -> Result<RiskLevel> {
        if !Self::is_allowed(group, subcommand) {
            return Err(PilotError::CommandNotAllowed {
                group: group.to_string(),
                subcommand: subcommand.to_string(),
            });
        }

        let risk_level = if Self::HIGH_RISK.contains(&(group, subcommand)) {
            RiskLevel::High
        } else if (Self::MEDIUM_RISK_GROUPS.contains(&group) && subcommand != "list")
            || Self::MEDIUM_RISK.contains(&(group, subcommand))
        {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        Ok(risk_level)
    }
}

impl Default for CommandValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}
