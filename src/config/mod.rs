use crate::error::{PilotError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// txpilot 사용자 설정
///
/// 설정 파일은 ~/.txpilot/config.toml에 저장됩니다.
/// `TXPILOT_*` 환경 변수가 파일 값을 덮어씁니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 지갑 CLI 실행 파일 이름
    #[serde(default = "default_binary")]
    pub binary: String,

    /// 네트워크 이름 (finney, test, local ...)
    #[serde(default = "default_network")]
    pub network: String,

    /// 기본 지갑 이름
    #[serde(default = "default_wallet")]
    pub default_wallet: String,

    /// 기본 hotkey 이름
    #[serde(default = "default_hotkey")]
    pub default_hotkey: String,

    /// 비대화형 명령 전체 타임아웃 (초)
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// 대화형 실행 중 다음 출력을 기다리는 시간 (초)
    #[serde(default = "default_prompt_timeout")]
    pub prompt_timeout_secs: u64,

    /// 비밀번호 프롬프트 허용 횟수
    #[serde(default = "default_max_password_attempts")]
    pub max_password_attempts: u32,

    /// 데모 모드: 지갑 CLI를 실행하지 않음
    #[serde(default)]
    pub demo_mode: bool,

    /// 명령별 감사 로그 기록 여부
    #[serde(default)]
    pub audit_log: bool,

    /// 감사 로그 디렉토리 (None이면 ~/.txpilot/logs)
    #[serde(default)]
    pub log_dir: Option<String>,

    /// 배치 청크 크기
    #[serde(default = "default_chunk_size")]
    pub batch_chunk_size: usize,

    /// 청크 사이 대기 시간 (초)
    #[serde(default = "default_chunk_delay")]
    pub batch_chunk_delay_secs: f64,

    /// 고액 트랜잭션 기준 (주소 접두어 확인)
    #[serde(default = "default_large_tx_threshold")]
    pub large_tx_threshold: f64,

    /// 실행 전 확인 필요 여부
    #[serde(default = "default_require_confirmation")]
    pub require_confirmation: bool,
}

fn default_binary() -> String {
    "btcli".to_string()
}

fn default_network() -> String {
    "finney".to_string()
}

fn default_wallet() -> String {
    "default".to_string()
}

fn default_hotkey() -> String {
    "default".to_string()
}

fn default_command_timeout() -> u64 {
    120
}

fn default_prompt_timeout() -> u64 {
    60
}

fn default_max_password_attempts() -> u32 {
    2
}

fn default_chunk_size() -> usize {
    3
}

fn default_chunk_delay() -> f64 {
    5.0
}

fn default_large_tx_threshold() -> f64 {
    10.0
}

fn default_require_confirmation() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            network: default_network(),
            default_wallet: default_wallet(),
            default_hotkey: default_hotkey(),
            command_timeout_secs: default_command_timeout(),
            prompt_timeout_secs: default_prompt_timeout(),
            max_password_attempts: default_max_password_attempts(),
            demo_mode: false,
            audit_log: false,
            log_dir: None,
            batch_chunk_size: default_chunk_size(),
            batch_chunk_delay_secs: default_chunk_delay(),
            large_tx_threshold: default_large_tx_threshold(),
            require_confirmation: default_require_confirmation(),
        }
    }
}

impl Config {
    /// 설정 디렉토리 경로 (~/.txpilot)
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".txpilot")
    }

    /// 설정 파일 경로 가져오기
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// 설정 파일에서 로드 (없으면 기본값 사용) 후 환경 변수 적용
    ///
    /// # Examples
    /// ```no_run
    /// use txpilot::config::Config;
    ///
    /// let config = Config::load().unwrap();
    /// println!("network = {}", config.network);
    /// ```
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// TOML 문자열 파싱
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| PilotError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if Duration::try_from_secs_f64(self.batch_chunk_delay_secs).is_err() {
            return Err(PilotError::ConfigError(format!(
                "batch_chunk_delay_secs must be a finite, non-negative number (got {})",
                self.batch_chunk_delay_secs
            )));
        }
        Ok(())
    }

    /// 환경 변수 덮어쓰기 (`TXPILOT_*`)
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("TXPILOT_DEMO_MODE") {
            self.demo_mode = parse_bool(&value);
        }
        if let Some(value) = lookup("TXPILOT_AUDIT_LOG") {
            self.audit_log = parse_bool(&value);
        }
        if let Some(value) = lookup("TXPILOT_NETWORK") {
            if !value.trim().is_empty() {
                self.network = value.trim().to_string();
            }
        }
        if let Some(value) = lookup("TXPILOT_BINARY") {
            if !value.trim().is_empty() {
                self.binary = value.trim().to_string();
            }
        }
    }

    /// 설정을 파일에 저장
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let toml_string =
            toml::to_string_pretty(self).map_err(|e| PilotError::ConfigError(e.to_string()))?;

        fs::write(path, toml_string)?;

        Ok(())
    }

    /// 설정 파일 초기화 (기본값으로), 저장한 경로 반환
    pub fn init() -> Result<PathBuf> {
        Self::default().save()?;
        Ok(Self::config_path())
    }

    /// 감사 로그 디렉토리
    pub fn log_dir(&self) -> PathBuf {
        match &self.log_dir {
            Some(dir) => PathBuf::from(dir),
            None => Self::config_dir().join("logs"),
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }

    /// 음수는 0, 표현 불가능한 값(inf, NaN)은 기본값
    pub fn chunk_delay(&self) -> Duration {
        if self.batch_chunk_delay_secs.is_nan() {
            return Duration::from_secs_f64(default_chunk_delay());
        }
        Duration::try_from_secs_f64(self.batch_chunk_delay_secs.max(0.0))
            .unwrap_or_else(|_| Duration::from_secs_f64(default_chunk_delay()))
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
