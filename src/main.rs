use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use tokio::sync::watch;
use tracing::debug;

mod cli;

use cli::{Cli, Command, ConfigAction};
use txpilot::audit::AuditLogger;
use txpilot::config::Config;
use txpilot::error::PilotError;
use txpilot::executor::planner::{calculate_rebalance_plan, RebalanceMode, ValidatorTarget};
use txpilot::executor::{
    BatchCoordinator, BatchSettings, CommandExecutor, CommandValidator, ExecutionMode,
    ExecutorSettings, RiskLevel,
};
use txpilot::pipeline::plans::{self, PlanContext};
use txpilot::pipeline::{ConfirmationInput, PipelineOptions, TransactionPipeline, TxPlan};
use txpilot::translator::translate_error;
use txpilot::ui::{create_spinner, render, ConfirmPrompt, TerminalInput};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    txpilot::logging::init(cli.debug);

    let mut config = Config::load().context("failed to load ~/.txpilot/config.toml")?;
    apply_cli_overrides(&mut config, &cli);
    debug!(network = %config.network, demo = config.demo_mode, "configuration loaded");

    // Ctrl-C → 구동 중인 지갑 CLI 종료
    let (interrupt_tx, interrupt_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = interrupt_tx.send(true);
        }
    });

    let executor = CommandExecutor::new(ExecutorSettings::from_config(&config))
        .with_audit(AuditLogger::from_config(&config))
        .with_interrupt(interrupt_rx);

    let ok = match &cli.command {
        Command::Run {
            group,
            subcommand,
            args,
            interactive,
        } => run_command(&cli, &config, &executor, group, subcommand, args, *interactive).await?,
        Command::Stake {
            amount,
            hotkey,
            netuid,
            name,
        } => {
            let plan = plans::stake_plan(
                &PlanContext::from_config(&config),
                *amount,
                hotkey,
                name.as_deref(),
                *netuid,
            );
            run_pipeline(&cli, &config, executor, plan).await
        }
        Command::Unstake {
            amount,
            hotkey,
            netuid,
            name,
        } => {
            let plan = plans::unstake_plan(
                &PlanContext::from_config(&config),
                *amount,
                hotkey,
                name.as_deref(),
                *netuid,
            );
            run_pipeline(&cli, &config, executor, plan).await
        }
        Command::Transfer { amount, dest } => {
            let plan = plans::transfer_plan(&PlanContext::from_config(&config), *amount, dest);
            run_pipeline(&cli, &config, executor, plan).await
        }
        Command::Register { netuid, burn_cost } => {
            let plan = plans::register_plan(&PlanContext::from_config(&config), *netuid, *burn_cost);
            run_pipeline(&cli, &config, executor, plan).await
        }
        Command::Rebalance {
            amount,
            netuid,
            mode,
            validators,
        } => rebalance(&cli, &config, &executor, *amount, *netuid, *mode, validators).await?,
        Command::Explain {
            text,
            exit_code,
            netuid,
        } => {
            let translated = translate_error(text, *exit_code, *netuid);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&translated)?);
            } else {
                render::print_translated_error(&translated);
            }
            true
        }
        Command::Config { action } => manage_config(&cli, &config, action)?,
    };

    if !ok {
        std::process::exit(1);
    }

    Ok(())
}

/// 플래그 > 환경 변수 > 설정 파일
fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(network) = &cli.network {
        config.network = network.clone();
    }
    if cli.demo {
        config.demo_mode = true;
    }
    if cli.audit_log {
        config.audit_log = true;
    }
}

/// `txpilot config init|show`
fn manage_config(cli: &Cli, config: &Config, action: &ConfigAction) -> Result<bool> {
    match action {
        ConfigAction::Init { force } => {
            let path = Config::config_path();
            if path.exists() && !force {
                render::print_warning(&format!(
                    "Config already exists at {} (use --force to overwrite)",
                    path.display()
                ));
                return Ok(true);
            }
            let path = Config::init().context("failed to write config file")?;
            render::print_success(&format!("Config written to {}", path.display()));
        }
        ConfigAction::Show => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("{}", toml::to_string_pretty(config)?);
            }
        }
    }
    Ok(true)
}

fn skip_confirmation(cli: &Cli, config: &Config) -> bool {
    cli.yes || !config.require_confirmation
}

/// `txpilot run <group> <sub> [--k v ...]`
async fn run_command(
    cli: &Cli,
    config: &Config,
    executor: &CommandExecutor,
    group: &str,
    subcommand: &str,
    args: &[String],
    interactive: bool,
) -> Result<bool> {
    let spec = match cli::build_run_spec(group, subcommand, args) {
        Ok(spec) => spec,
        Err(e) => {
            render::print_error(&e);
            return Ok(false);
        }
    };

    let risk = match CommandValidator::new().validate(group, subcommand) {
        Ok(risk) => risk,
        Err(e) => {
            render::print_error(&e.to_string());
            return Ok(false);
        }
    };

    let needs_confirm = risk != RiskLevel::Low
        && !cli.dry_run
        && !config.demo_mode
        && !skip_confirmation(cli, config);
    if needs_confirm {
        let display = executor.display_command(&spec);
        if !declined_on_cancel(ConfirmPrompt::new().confirm_execution(&display, risk))? {
            render::print_warning("Cancelled");
            return Ok(true);
        }
    }

    let mode = if interactive {
        ExecutionMode::Interactive
    } else {
        ExecutionMode::Normal
    };

    // 비밀번호 프롬프트와 겹치지 않게 비대화형일 때만 스피너
    let spinner = (mode == ExecutionMode::Normal && !cli.json && !cli.dry_run)
        .then(|| create_spinner(&format!("Running {}...", spec.name())));
    let result = executor.execute(&spec, mode, cli.dry_run, None).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if cli.json {
        println!("{}", result.to_json()?);
    } else {
        render::print_command_result(&result);
        if !result.success() && result.exit_code.is_some() {
            render::print_translated_error(&translate_error(result.error_text(), result.exit_code, None));
        }
    }

    Ok(result.success())
}

/// 확인 창에서의 Ctrl-C/Esc는 거절과 같다
fn declined_on_cancel(answer: txpilot::Result<bool>) -> txpilot::Result<bool> {
    match answer {
        Err(PilotError::UserCancelled) => Ok(false),
        other => other,
    }
}

/// 계획 → 확인 → 실행 → 검증
async fn run_pipeline(cli: &Cli, config: &Config, executor: CommandExecutor, plan: TxPlan) -> bool {
    let options = PipelineOptions {
        dry_run: cli.dry_run,
        json_output: cli.json,
    };
    let pipeline = TransactionPipeline::new(executor, options, Box::new(TerminalInput));

    let result = pipeline.run(&plan, None, skip_confirmation(cli, config)).await;

    // 취소/dry-run은 실패가 아니다
    result.success || result.diagnosis.is_none()
}

async fn rebalance(
    cli: &Cli,
    config: &Config,
    executor: &CommandExecutor,
    amount: f64,
    netuid: u16,
    mode: RebalanceMode,
    validators: &[ValidatorTarget],
) -> Result<bool> {
    let plan = calculate_rebalance_plan(validators, amount, mode, netuid);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        render::print_batch_plan(&plan);
    }

    if plan.operations.is_empty() {
        render::print_warning("Nothing to do");
        return Ok(true);
    }

    if cli.dry_run {
        render::print_info("Dry run - no transaction sent");
        return Ok(true);
    }

    if !skip_confirmation(cli, config) && !config.demo_mode {
        let prompt = format!("Type 'yes' to execute {} operations", plan.operations.len());
        let answer = TerminalInput.read_response(&prompt).unwrap_or_default();
        if !matches!(answer.trim().to_lowercase().as_str(), "yes" | "y") {
            render::print_warning("Cancelled");
            return Ok(true);
        }
    }

    let settings = BatchSettings {
        chunk_size: config.batch_chunk_size,
        chunk_delay: config.chunk_delay(),
        dry_run: false,
        wallet_name: Some(config.default_wallet.clone()),
        safe_staking: true,
        show_progress: !cli.json,
    };

    eprintln!(
        "{} Executing {} operations in chunks of {}",
        "[>>]".cyan().bold(),
        plan.operations.len(),
        settings.chunk_size.max(1)
    );

    let result = BatchCoordinator::new(executor, settings).execute(plan, None).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        render::print_batch_result(&result);
    }

    Ok(result.failed == 0 && !result.stopped_early())
}
