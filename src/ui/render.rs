//! 사람이 읽는 출력은 stderr, JSON은 stdout

use crate::executor::batch::BatchResult;
use crate::executor::planner::BatchPlan;
use crate::executor::runner::CommandResult;
use crate::pipeline::{TxPhase, TxPlan, TxResult};
use crate::translator::TranslatedError;
use colored::*;
use serde_json::json;

/// 1234.5 → "1,234.5000 τ"
pub fn format_tao(amount: f64) -> String {
    let formatted = format!("{:.4}", amount.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((&formatted, "0000"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}{}.{} τ", sign, grouped, frac_part)
}

/// 앞 8자 ... 뒤 6자
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 16 {
        return address.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{}...{}", head, tail)
}

pub fn print_info(message: &str) {
    eprintln!("{} {}", "[i]".cyan(), message);
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "[!]".yellow().bold(), message.yellow());
}

pub fn print_success(message: &str) {
    eprintln!("{} {}", "[OK]".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "[X]".red().bold(), message.red());
}

pub fn print_plan(plan: &TxPlan, dry_run: bool) {
    let mut context = format!("network: {}", plan.network);
    if let Some(wallet) = &plan.wallet {
        context.push_str(&format!(" | wallet: {}", wallet));
    }
    if let Some(hotkey) = &plan.hotkey {
        context.push_str(&format!(" | hotkey: {}", hotkey));
    }

    eprintln!("\n{} {}", "[>]".cyan().bold(), plan.command_name.bold());
    eprintln!("  {}", context.dimmed());
    eprintln!("\n{}", plan.title.cyan().bold());

    let width = plan.items.iter().map(|i| i.label.len()).max().unwrap_or(0);
    for item in &plan.items {
        eprintln!("  {:width$}  {}", item.label.dimmed(), item.value, width = width);
    }

    if !plan.warnings.is_empty() {
        eprintln!();
        for warning in &plan.warnings {
            eprintln!("  {} {}", "[!]".yellow().bold(), warning.yellow());
        }
    }

    if dry_run {
        eprintln!("\n  {}", "[DRY RUN] nothing will be sent".yellow());
    }
    eprintln!();
}

pub fn plan_json(plan: &TxPlan, dry_run: bool) -> String {
    let value = json!({
        "type": "plan",
        "title": plan.title,
        "command": plan.command_name,
        "network": plan.network,
        "wallet": plan.wallet,
        "hotkey": plan.hotkey,
        "items": plan.items,
        "warnings": plan.warnings,
        "dry_run": dry_run,
    });
    format!("{:#}", value)
}

pub fn print_phase(phase: TxPhase, message: &str) {
    let tag = match phase {
        TxPhase::Planning => "[..]".normal(),
        TxPhase::Signing | TxPhase::Broadcasting => "[>>]".cyan(),
        TxPhase::InBlock | TxPhase::Finalized => "[OK]".green().bold(),
        TxPhase::Failed => "[X]".red().bold(),
    };
    eprintln!("{} {}", tag, message);
}

pub fn print_result(result: &TxResult) {
    eprintln!();
    print_phase(result.phase, &result.message);

    if let Some(hash) = &result.tx_hash {
        eprintln!("  {} {}", "tx:".dimmed(), hash);
    }
    if let Some(block) = result.block_number {
        eprintln!("  {} {}", "block:".dimmed(), block);
    }

    match &result.diagnosis {
        Some(diagnosis) => print_translated_error(diagnosis),
        None => {
            if let Some(error) = &result.error {
                eprintln!("  {}", error.red());
            }
        }
    }

    if !result.next_steps.is_empty() {
        eprintln!("\n{}", "Next steps:".bold());
        for step in &result.next_steps {
            eprintln!("  {} {}", "->".cyan(), step);
        }
    }
}

pub fn result_json(result: &TxResult) -> String {
    let value = json!({
        "type": "result",
        "success": result.success,
        "phase": result.phase,
        "message": result.message,
        "tx_hash": result.tx_hash,
        "block_number": result.block_number,
        "error": result.error,
        "diagnosis": result.diagnosis,
        "next_steps": result.next_steps,
    });
    format!("{:#}", value)
}

pub fn print_translated_error(error: &TranslatedError) {
    eprintln!(
        "\n{} {} {}",
        "[X]".red().bold(),
        error.user_message.red(),
        format!("({})", error.category).dimmed()
    );

    if !error.recommended_actions.is_empty() {
        eprintln!("{}", "What to do:".bold());
        for action in &error.recommended_actions {
            eprintln!("  {} {}", "->".cyan(), action);
        }
    }

    if let Some(hint) = error.retry_hint() {
        eprintln!("  {} {}", "[i]".cyan(), hint);
    }

    if let Some(original) = &error.original_error {
        let first = original.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        eprintln!("  {} {}", "details:".dimmed(), first.dimmed());
    }
}

pub fn print_command_result(result: &CommandResult) {
    let output = result.output().trim_end();
    if result.success() {
        if !output.is_empty() {
            eprintln!("{}", output);
        }
        print_success(&format!("{} ({}ms)", result.status, result.elapsed_ms));
    } else {
        if !result.stdout.trim().is_empty() {
            eprintln!("{}", result.stdout.trim_end());
        }
        print_error(result.error_message.as_deref().unwrap_or("Command failed"));
    }

    if let Some(hash) = &result.tx_hash {
        eprintln!("  {} {}", "tx:".dimmed(), hash);
    }
    if let Some(path) = &result.log_path {
        eprintln!("  {} {}", "log:".dimmed(), path);
    }
}

pub fn print_batch_plan(plan: &BatchPlan) {
    eprintln!("\n{}", "Batch Operation Plan".cyan().bold());
    eprintln!(
        "  {}",
        format!(
            "Mode: {} | Subnet: {} | Total: {}",
            plan.mode,
            plan.netuid,
            format_tao(plan.total_amount)
        )
        .dimmed()
    );
    eprintln!("  {}\n", plan.description);

    for (i, op) in plan.operations.iter().enumerate() {
        eprintln!(
            "  {:>3}. {:<8} {:>16}  {}",
            i + 1,
            format!("{:?}", op.action).to_uppercase(),
            format_tao(op.amount),
            op.validator_name
                .clone()
                .unwrap_or_else(|| short_address(&op.validator_hotkey))
        );
    }

    if !plan.warnings.is_empty() {
        eprintln!("\n{}", "Warnings:".yellow().bold());
        for warning in &plan.warnings {
            eprintln!("  {} {}", "[!]".yellow(), warning);
        }
    }
    eprintln!();
}

pub fn print_batch_result(result: &BatchResult) {
    eprintln!();
    if result.stopped_due_to_rate_limit {
        print_warning("Batch stopped due to rate limit");
        eprintln!("  Wait a few minutes and run again to continue.\n");
    }
    if result.stopped_due_to_interrupt {
        print_warning("Batch stopped by user");
        eprintln!("  Remaining operations were not sent.\n");
    }

    eprintln!("{}", "Batch Result:".bold());
    eprintln!("  {} Successful: {}", "[OK]".green(), result.successful);
    eprintln!("  {} Failed: {}", "[X]".red(), result.failed);
    if result.skipped > 0 {
        eprintln!("  {} Skipped: {}", "[!]".yellow(), result.skipped);
    }

    for op in result.failed_operations() {
        if let Some(diagnosis) = &op.diagnosis {
            eprintln!("\n  {} {}", "->".dimmed(), op.label());
            print_translated_error(diagnosis);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::plans::{self, PlanContext};

    #[test]
    fn test_format_tao() {
        assert_eq!(format_tao(1.0), "1.0000 τ");
        assert_eq!(format_tao(1234.5), "1,234.5000 τ");
        assert_eq!(format_tao(1_000_000.0), "1,000,000.0000 τ");
        assert_eq!(format_tao(0.00012), "0.0001 τ");
    }

    #[test]
    fn test_short_address() {
        assert_eq!(
            short_address("5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty"),
            "5FHneW46...M694ty"
        );
        assert_eq!(short_address("5Short"), "5Short");
    }

    #[test]
    fn test_plan_json() {
        let ctx = PlanContext::from_config(&Config::default());
        let plan = plans::transfer_plan(&ctx, 1.0, "5DestAddressThatIsLongEnough");

        let value: serde_json::Value = serde_json::from_str(&plan_json(&plan, true)).unwrap();
        assert_eq!(value["type"], "plan");
        assert_eq!(value["command"], "Transfer");
        assert_eq!(value["dry_run"], true);
        assert_eq!(value["items"][0]["label"], "Action");
    }

    #[test]
    fn test_result_json() {
        let result = TxResult::cancelled("Cancelled by user");
        let value: serde_json::Value = serde_json::from_str(&result_json(&result)).unwrap();
        assert_eq!(value["type"], "result");
        assert_eq!(value["success"], false);
        assert_eq!(value["phase"], "failed");
    }
}
