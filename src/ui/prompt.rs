use crate::error::{PilotError, Result};
use crate::executor::validator::RiskLevel;
use crate::pipeline::ConfirmationInput;
use crate::security::CredentialProvider;
use colored::*;
use dialoguer::{Confirm, Input, Password};
use secrecy::SecretString;

/// `run` 서브커맨드용 y/N 확인
pub struct ConfirmPrompt;

impl ConfirmPrompt {
    pub fn new() -> Self {
        Self
    }

    pub fn confirm_execution(&self, command: &str, risk_level: RiskLevel) -> Result<bool> {
        // stdout은 JSON 출력용이므로 stderr에
        eprintln!("\n{}", "[>] Wallet command:".cyan().bold());

        let colored_command = match risk_level {
            RiskLevel::Low => command.green(),
            RiskLevel::Medium => command.yellow(),
            RiskLevel::High => command.red().bold(),
        };

        eprintln!("  {}", colored_command);

        let (risk_msg, risk_level_str) = match risk_level {
            RiskLevel::Low => ("Low".green(), "[*] Read-only"),
            RiskLevel::Medium => ("Medium".yellow(), "[!] Changes stake"),
            RiskLevel::High => ("High".red().bold(), "[!!!] Irreversible"),
        };

        eprintln!("\n{} {} - {}", "Risk level:".bold(), risk_msg, risk_level_str);

        let result = Confirm::new()
            .with_prompt("Execute this command?")
            .default(false)
            .interact()
            .map_err(|_| PilotError::UserCancelled)?;

        Ok(result)
    }
}

impl Default for ConfirmPrompt {
    fn default() -> Self {
        Self::new()
    }
}

/// 마스킹된 비밀번호 입력창. 입력값은 바로 [`SecretString`]으로 감싼다.
pub struct PromptCredentials {
    prompt: String,
}

impl PromptCredentials {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

impl Default for PromptCredentials {
    fn default() -> Self {
        Self::new("Wallet password")
    }
}

impl CredentialProvider for PromptCredentials {
    fn obtain(&self) -> Result<SecretString> {
        Password::new()
            .with_prompt(&self.prompt)
            .interact()
            .map(SecretString::from)
            .map_err(|e| PilotError::CredentialUnavailable(e.to_string()))
    }
}

/// 터미널에서 한 줄 입력 (트랜잭션 확인용)
pub struct TerminalInput;

impl ConfirmationInput for TerminalInput {
    fn read_response(&self, prompt: &str) -> Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|_| PilotError::UserCancelled)
    }
}
