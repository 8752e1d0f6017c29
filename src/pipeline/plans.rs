//! 트랜잭션 계획 생성기

use super::{PlanItem, TxPlan, VerificationLevel};
use crate::config::Config;
use crate::executor::commands;
use crate::ui::render::{format_tao, short_address};

/// 이 금액 이상이면 고액 경고
const HIGH_VALUE_TAO: f64 = 10.0;

const EST_FEE: &str = "~0.0001 τ";

/// 주소 확인에 요구하는 앞글자 수
const CONFIRM_PREFIX_CHARS: usize = 6;

/// 계획에 공통으로 들어가는 실행 문맥
#[derive(Debug, Clone)]
pub struct PlanContext {
    pub network: String,
    pub wallet: String,
    pub hotkey: String,
    /// 이 금액 이상 송금은 주소 앞자리 확인
    pub large_tx_threshold: f64,
}

impl PlanContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            network: config.network.clone(),
            wallet: config.default_wallet.clone(),
            hotkey: config.default_hotkey.clone(),
            large_tx_threshold: config.large_tx_threshold,
        }
    }
}

fn high_value_warnings(amount: f64) -> Vec<String> {
    if amount >= HIGH_VALUE_TAO {
        vec![format!("High-value transaction (≥{} τ)", HIGH_VALUE_TAO)]
    } else {
        Vec::new()
    }
}

fn portfolio_next_steps() -> Vec<String> {
    vec![
        "txpilot run wallet balance".to_string(),
        "txpilot run stake list".to_string(),
    ]
}

pub fn stake_plan(
    ctx: &PlanContext,
    amount: f64,
    validator_hotkey: &str,
    validator_name: Option<&str>,
    netuid: u16,
) -> TxPlan {
    let mut items = vec![
        PlanItem::new("Action", "Stake TAO"),
        PlanItem::new("Amount", format_tao(amount)),
    ];
    if let Some(name) = validator_name {
        items.push(PlanItem::new("Validator", name));
    }
    items.push(PlanItem::new("Hotkey", short_address(validator_hotkey)));
    items.push(PlanItem::new("Subnet", format!("SN{}", netuid)));
    items.push(PlanItem::new("Est. Fee", EST_FEE));

    TxPlan {
        title: "Stake Plan".to_string(),
        command_name: "Stake".to_string(),
        items,
        warnings: high_value_warnings(amount),
        network: ctx.network.clone(),
        wallet: Some(ctx.wallet.clone()),
        hotkey: Some(ctx.hotkey.clone()),
        command: commands::stake_add(amount, validator_hotkey, netuid, Some(ctx.wallet.as_str()), true),
        requires_password: true,
        verification_level: VerificationLevel::Stdout,
        next_steps: portfolio_next_steps(),
        confirm_prefix: None,
    }
}

pub fn unstake_plan(
    ctx: &PlanContext,
    amount: f64,
    validator_hotkey: &str,
    validator_name: Option<&str>,
    netuid: u16,
) -> TxPlan {
    let mut items = vec![
        PlanItem::new("Action", "Unstake TAO"),
        PlanItem::new("Amount", format_tao(amount)),
    ];
    if let Some(name) = validator_name {
        items.push(PlanItem::new("Validator", name));
    }
    items.push(PlanItem::new("Hotkey", short_address(validator_hotkey)));
    items.push(PlanItem::new("Subnet", format!("SN{}", netuid)));
    items.push(PlanItem::new("Est. Fee", EST_FEE));

    TxPlan {
        title: "Unstake Plan".to_string(),
        command_name: "Unstake".to_string(),
        items,
        warnings: high_value_warnings(amount),
        network: ctx.network.clone(),
        wallet: Some(ctx.wallet.clone()),
        hotkey: Some(ctx.hotkey.clone()),
        command: commands::stake_remove(amount, validator_hotkey, netuid, Some(ctx.wallet.as_str())),
        requires_password: true,
        verification_level: VerificationLevel::Stdout,
        next_steps: portfolio_next_steps(),
        confirm_prefix: None,
    }
}

pub fn transfer_plan(ctx: &PlanContext, amount: f64, destination: &str) -> TxPlan {
    let items = vec![
        PlanItem::new("Action", "Transfer TAO"),
        PlanItem::new("Amount", format_tao(amount)),
        PlanItem::new("To", short_address(destination)),
        PlanItem::new("Est. Fee", EST_FEE),
    ];

    let mut warnings = high_value_warnings(amount);
    warnings.push("Transfers are irreversible".to_string());

    let confirm_prefix = (amount >= ctx.large_tx_threshold)
        .then(|| destination.chars().take(CONFIRM_PREFIX_CHARS).collect::<String>());

    TxPlan {
        title: "Transfer Plan".to_string(),
        command_name: "Transfer".to_string(),
        items,
        warnings,
        network: ctx.network.clone(),
        wallet: Some(ctx.wallet.clone()),
        hotkey: None,
        command: commands::transfer(amount, destination, Some(ctx.wallet.as_str())),
        requires_password: true,
        verification_level: VerificationLevel::Stdout,
        next_steps: vec!["txpilot run wallet balance".to_string()],
        confirm_prefix,
    }
}

/// `burn_cost`는 상위 협력자가 조회해서 넘긴다 (없으면 미표시)
pub fn register_plan(ctx: &PlanContext, netuid: u16, burn_cost: Option<f64>) -> TxPlan {
    let mut items = vec![
        PlanItem::new("Action", "Register on Subnet"),
        PlanItem::new("Subnet", format!("SN{}", netuid)),
    ];
    let warning = match burn_cost {
        Some(cost) => {
            items.push(PlanItem::new("Burn Cost", format_tao(cost)));
            format!("This will burn {:.4} τ (non-refundable)", cost)
        }
        None => {
            items.push(PlanItem::new("Burn Cost", "unknown (check: btcli subnets burn-cost)"));
            "Registration burns TAO (non-refundable)".to_string()
        }
    };
    items.push(PlanItem::new("Wallet", ctx.wallet.clone()));
    items.push(PlanItem::new("Hotkey", ctx.hotkey.clone()));

    TxPlan {
        title: "Registration Plan".to_string(),
        command_name: "Register".to_string(),
        items,
        warnings: vec![warning],
        network: ctx.network.clone(),
        wallet: Some(ctx.wallet.clone()),
        hotkey: Some(ctx.hotkey.clone()),
        command: commands::register(netuid, &ctx.wallet, &ctx.hotkey),
        requires_password: true,
        verification_level: VerificationLevel::Stdout,
        next_steps: vec![format!("txpilot run subnets metagraph --netuid {}", netuid)],
        confirm_prefix: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::commands::ArgValue;

    const ADDR: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";

    fn ctx() -> PlanContext {
        PlanContext::from_config(&Config::default())
    }

    #[test]
    fn test_stake_plan() {
        let plan = stake_plan(&ctx(), 12.5, ADDR, Some("Foundry"), 1);

        assert_eq!(plan.title, "Stake Plan");
        assert_eq!(plan.command.name(), "stake add");
        assert_eq!(plan.command.get("amount"), Some(&ArgValue::Float(12.5)));
        assert!(plan.items.iter().any(|i| i.label == "Validator" && i.value == "Foundry"));
        assert!(plan.items.iter().any(|i| i.value == "5FHneW46...M694ty"));
        assert_eq!(plan.warnings, vec!["High-value transaction (≥10 τ)"]);
        assert!(plan.requires_password);
    }

    #[test]
    fn test_small_stake_has_no_warning() {
        let plan = stake_plan(&ctx(), 1.0, ADDR, None, 1);
        assert!(plan.warnings.is_empty());
        assert!(!plan.items.iter().any(|i| i.label == "Validator"));
    }

    #[test]
    fn test_unstake_plan() {
        let plan = unstake_plan(&ctx(), 2.0, ADDR, None, 3);
        assert_eq!(plan.command.name(), "stake remove");
        assert_eq!(plan.command.get("netuid"), Some(&ArgValue::Int(3)));
    }

    #[test]
    fn test_transfer_plan_warnings() {
        let plan = transfer_plan(&ctx(), 1.0, ADDR);
        assert_eq!(plan.warnings, vec!["Transfers are irreversible"]);
        assert_eq!(plan.confirm_prefix, None);

        let plan = transfer_plan(&ctx(), 25.0, ADDR);
        assert_eq!(plan.warnings.len(), 2);
        assert_eq!(plan.confirm_prefix.as_deref(), Some("5FHneW"));
    }

    #[test]
    fn test_register_plan() {
        let plan = register_plan(&ctx(), 18, Some(0.5));
        assert_eq!(plan.command.name(), "subnets register");
        assert_eq!(plan.warnings, vec!["This will burn 0.5000 τ (non-refundable)"]);

        let plan = register_plan(&ctx(), 18, None);
        assert_eq!(plan.warnings, vec!["Registration burns TAO (non-refundable)"]);
    }
}
