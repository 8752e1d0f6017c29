use clap::{Parser, Subcommand};
use txpilot::executor::commands::CommandSpec;
use txpilot::executor::planner::{RebalanceMode, ValidatorTarget};

#[derive(Parser, Debug)]
#[command(name = "txpilot")]
#[command(version)]
#[command(about = "Safe transaction driver for the Bittensor wallet CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// 네트워크 (finney, test, local). 미지정시 설정 파일 값
    #[arg(long, global = true)]
    pub network: Option<String>,

    /// 계획만 보여주고 실행하지 않음
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// 확인 없이 바로 실행 (위험)
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// 결과를 JSON으로 stdout에 출력
    #[arg(long, global = true)]
    pub json: bool,

    /// 데모 모드: 지갑 CLI를 실행하지 않음
    #[arg(long, global = true)]
    pub demo: bool,

    /// 명령별 감사 로그 기록
    #[arg(long, global = true)]
    pub audit_log: bool,

    /// 디버그 로그
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 허용된 지갑 CLI 명령 실행 (예: run wallet balance --wallet-name alice)
    Run {
        group: String,
        subcommand: String,
        /// `--key value` 또는 `--flag`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
        /// 비밀번호 프롬프트에 응답하며 실행
        #[arg(short = 'i', long)]
        interactive: bool,
    },

    /// 검증자에게 stake
    Stake {
        amount: f64,
        /// 검증자 hotkey (ss58)
        hotkey: String,
        #[arg(long, default_value_t = 0)]
        netuid: u16,
        /// 검증자 표시 이름
        #[arg(long)]
        name: Option<String>,
    },

    /// 검증자에게서 unstake
    Unstake {
        amount: f64,
        hotkey: String,
        #[arg(long, default_value_t = 0)]
        netuid: u16,
        #[arg(long)]
        name: Option<String>,
    },

    /// TAO 송금
    Transfer {
        amount: f64,
        /// 받는 주소 (ss58)
        dest: String,
    },

    /// 서브넷 등록 (burn)
    Register {
        netuid: u16,
        /// 미리 조회한 burn 비용
        #[arg(long)]
        burn_cost: Option<f64>,
    },

    /// 여러 검증자에게 나눠서 stake
    Rebalance {
        /// 총 금액
        amount: f64,
        #[arg(long, default_value_t = 0)]
        netuid: u16,
        #[arg(long, value_enum, default_value_t = RebalanceMode::Equal)]
        mode: RebalanceMode,
        /// HOTKEY[:STAKE[:TAKE]] (여러 번 지정)
        #[arg(short = 'v', long = "validator", required = true)]
        validators: Vec<ValidatorTarget>,
    },

    /// 지갑 CLI 에러 메시지 풀이
    Explain {
        /// 에러 출력 원문
        text: String,
        #[arg(long)]
        exit_code: Option<i32>,
        #[arg(long)]
        netuid: Option<u16>,
    },

    /// 설정 파일 관리 (~/.txpilot/config.toml)
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// 기본값으로 설정 파일 생성
    Init {
        /// 기존 파일 덮어쓰기
        #[arg(long)]
        force: bool,
    },
    /// 현재 적용되는 설정 출력
    Show,
}

/// `run` 뒤의 `--key value` / `--flag` 목록을 [`CommandSpec`]으로
///
/// `--network`는 실행기가 붙이므로 여기서는 무시한다.
pub fn build_run_spec(group: &str, subcommand: &str, args: &[String]) -> Result<CommandSpec, String> {
    let mut spec = CommandSpec::new(group, subcommand);
    let mut iter = args.iter().peekable();

    while let Some(token) = iter.next() {
        let key = token
            .strip_prefix("--")
            .filter(|k| !k.is_empty())
            .ok_or_else(|| format!("unexpected argument '{}' (expected --key value)", token))?;

        let value = match iter.peek() {
            Some(next) if !next.starts_with("--") => iter.next().cloned(),
            _ => None,
        };

        if key == "network" {
            continue;
        }

        spec = match value {
            Some(value) => spec.arg(key, value),
            None => spec.flag(key),
        };
    }

    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use txpilot::executor::commands::ArgValue;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_run_spec() {
        let args = strings(&["--wallet-name", "alice", "--all", "--network", "test", "--json-output"]);
        let spec = build_run_spec("wallet", "balance", &args).unwrap();

        assert_eq!(spec.name(), "wallet balance");
        assert_eq!(spec.get("wallet-name"), Some(&ArgValue::Text("alice".to_string())));
        assert_eq!(spec.get("network"), None);
        assert_eq!(spec.flags, vec!["all", "json-output"]);
    }

    #[test]
    fn test_build_run_spec_rejects_positional() {
        assert!(build_run_spec("wallet", "balance", &strings(&["alice"])).is_err());
        assert!(build_run_spec("wallet", "balance", &strings(&["--"])).is_err());
    }

    #[test]
    fn test_parse_rebalance() {
        let cli = Cli::try_parse_from([
            "txpilot", "rebalance", "10", "--mode", "top-heavy", "-v", "5Abc:100", "-v", "5Def",
        ])
        .unwrap();

        match cli.command {
            Command::Rebalance { amount, mode, validators, .. } => {
                assert_eq!(amount, 10.0);
                assert_eq!(mode, RebalanceMode::TopHeavy);
                assert_eq!(validators.len(), 2);
                assert_eq!(validators[0].stake, 100.0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_init() {
        let cli = Cli::try_parse_from(["txpilot", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config { action: ConfigAction::Init { force: true } }
        ));
    }
}
