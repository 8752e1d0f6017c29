//! Turns raw wallet CLI failure text into a category, a short explanation,
//! next steps and retry guidance.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds per block used to turn block counts into wall-clock estimates.
pub const SECONDS_PER_BLOCK: u64 = 12;

const MAX_ORIGINAL_ERROR_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    RateLimit,
    IntervalFull,
    InsufficientBalance,
    InvalidAddress,
    NetworkError,
    InvalidTransaction,
    WalletNotFound,
    HotkeyNotFound,
    AlreadyRegistered,
    NotRegistered,
    PermissionDenied,
    Timeout,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::IntervalFull => "interval_full",
            Self::InsufficientBalance => "insufficient_balance",
            Self::InvalidAddress => "invalid_address",
            Self::NetworkError => "network_error",
            Self::InvalidTransaction => "invalid_transaction",
            Self::WalletNotFound => "wallet_not_found",
            Self::HotkeyNotFound => "hotkey_not_found",
            Self::AlreadyRegistered => "already_registered",
            Self::NotRegistered => "not_registered",
            Self::PermissionDenied => "permission_denied",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A human-friendly error with guidance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedError {
    pub category: ErrorCategory,
    pub user_message: String,
    pub recommended_actions: Vec<String>,
    pub safe_to_retry_now: bool,
    pub retry_after_blocks: Option<u64>,
    pub retry_after_seconds: Option<u64>,
    pub original_error: Option<String>,
}

impl TranslatedError {
    /// Wall-clock delay implied by the retry fields, blocks taking precedence.
    pub fn retry_delay_seconds(&self) -> Option<u64> {
        self.retry_after_blocks
            .map(|blocks| blocks.saturating_mul(SECONDS_PER_BLOCK))
            .or(self.retry_after_seconds)
    }

    pub fn retry_hint(&self) -> Option<String> {
        if self.safe_to_retry_now {
            return Some("Safe to retry immediately".to_string());
        }

        let seconds = self.retry_delay_seconds().filter(|s| *s > 0)?;
        if seconds > 60 {
            Some(format!("Wait ~{} minute(s) before retrying", seconds / 60))
        } else {
            Some(format!("Wait ~{} seconds before retrying", seconds))
        }
    }
}

struct ErrorRule {
    pattern: Regex,
    category: ErrorCategory,
    message: &'static str,
    actions: &'static [&'static str],
    safe_to_retry: bool,
    retry_seconds: Option<u64>,
    extract_blocks: Option<Regex>,
}

impl ErrorRule {
    fn new(
        pattern: &str,
        category: ErrorCategory,
        message: &'static str,
        actions: &'static [&'static str],
        safe_to_retry: bool,
    ) -> Self {
        Self {
            pattern: Regex::new(&format!("(?i){}", pattern)).unwrap(),
            category,
            message,
            actions,
            safe_to_retry,
            retry_seconds: None,
            extract_blocks: None,
        }
    }

    fn retry_after(mut self, seconds: u64) -> Self {
        self.retry_seconds = Some(seconds);
        self
    }

    fn with_block_extractor(mut self, pattern: &str) -> Self {
        self.extract_blocks = Some(Regex::new(&format!("(?i){}", pattern)).unwrap());
        self
    }
}

static ERROR_RULES: Lazy<Vec<ErrorRule>> = Lazy::new(|| {
    vec![
        ErrorRule::new(
            r"RateLimitExceeded|rate.?limit|Custom error:?\s*6\b",
            ErrorCategory::RateLimit,
            "You're rate limited. Stop retrying and wait before trying again.",
            &["Wait 2-5 minutes before retrying", "Do not resend the same transaction right away"],
            false,
        )
        .retry_after(180),
        ErrorRule::new(
            r"registration.*full|interval.*full|try again in\s*\d+\s*blocks?",
            ErrorCategory::IntervalFull,
            "Subnet registration is full right now.",
            &["Try again in a few blocks", "Do not spam retries"],
            false,
        )
        .with_block_extractor(r"try again in\s*(\d+)\s*blocks?"),
        ErrorRule::new(
            r"insufficient|not enough|balance too low",
            ErrorCategory::InsufficientBalance,
            "Not enough free balance to cover amount + fee.",
            &["Check balance: btcli wallet balance", "Reduce the amount or wait for unstaking"],
            false,
        ),
        ErrorRule::new(
            r"invalid.*address|invalid.*ss58|bad address",
            ErrorCategory::InvalidAddress,
            "The address you provided is invalid.",
            &["Double-check the SS58 address", "Make sure it's a valid address (starts with 5)"],
            true,
        ),
        ErrorRule::new(
            r"network error|connection refused|timeout|could not connect|rpc.*error|endpoint.*unreachable",
            ErrorCategory::NetworkError,
            "Cannot reach the network. Check your connection or RPC endpoint.",
            &["Check your internet connection", "Try again in a few seconds"],
            true,
        )
        .retry_after(10),
        ErrorRule::new(
            r"invalid.*transaction|transaction.*rejected|stale nonce|bad signature",
            ErrorCategory::InvalidTransaction,
            "Transaction was rejected by the network.",
            &["Possible causes: stale nonce, insufficient fees, rate limit", "Check balance: btcli wallet balance"],
            false,
        )
        .retry_after(30),
        ErrorRule::new(
            r"wallet.*not found|no wallet|cannot find wallet|coldkey.*not found",
            ErrorCategory::WalletNotFound,
            "Wallet not found.",
            &["Check wallet name: btcli wallet list", "Create a new wallet: btcli wallet new-coldkey"],
            true,
        ),
        ErrorRule::new(
            r"hotkey.*not found|no hotkey|cannot find hotkey",
            ErrorCategory::HotkeyNotFound,
            "Hotkey not found.",
            &["Check hotkey: btcli wallet list", "Create a new hotkey: btcli wallet new-hotkey"],
            true,
        ),
        ErrorRule::new(
            r"already registered",
            ErrorCategory::AlreadyRegistered,
            "You're already registered on this subnet.",
            &["No action needed - you're already registered", "Check your registration: btcli subnets metagraph --netuid {netuid}"],
            false,
        ),
        ErrorRule::new(
            r"not registered|must be registered",
            ErrorCategory::NotRegistered,
            "You need to be registered on this subnet first.",
            &["Register: btcli subnets register --netuid {netuid}"],
            false,
        ),
        ErrorRule::new(
            r"permission denied|access denied|unauthorized|wrong password",
            ErrorCategory::PermissionDenied,
            "Permission denied. Check your password or permissions.",
            &["Make sure you entered the correct password", "Check file permissions on wallet files"],
            true,
        ),
        ErrorRule::new(
            r"timed? ?out|deadline exceeded|took too long",
            ErrorCategory::Timeout,
            "Operation timed out.",
            &["The network may be congested", "Try again in a few seconds"],
            true,
        )
        .retry_after(15),
    ]
});

/// Translate raw error output into a categorized, actionable error.
///
/// Rules are tried in table order and the first match wins. `netuid` fills
/// `{netuid}` placeholders in the recommended actions.
///
/// # Examples
/// ```
/// use txpilot::translator::{translate_error, ErrorCategory};
///
/// let translated = translate_error("try again in 150 blocks", None, None);
/// assert_eq!(translated.category, ErrorCategory::IntervalFull);
/// assert_eq!(translated.retry_after_blocks, Some(150));
/// ```
pub fn translate_error(raw: &str, exit_code: Option<i32>, netuid: Option<u16>) -> TranslatedError {
    let original_error = bounded_original(raw);

    for rule in ERROR_RULES.iter() {
        if !rule.pattern.is_match(raw) {
            continue;
        }

        let mut message = rule.message.to_string();
        let mut actions: Vec<String> = rule.actions.iter().map(|a| a.to_string()).collect();
        let mut retry_blocks = None;

        if let Some(extractor) = &rule.extract_blocks {
            let blocks = extractor
                .captures(raw)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok());

            if let Some(blocks) = blocks {
                let seconds = blocks.saturating_mul(SECONDS_PER_BLOCK);
                message = format!(
                    "Subnet registration is full. Try again in {} blocks (~{} seconds).",
                    blocks, seconds
                );
                actions = vec![
                    format!("Wait ~{} blocks (~{} seconds)", blocks, seconds),
                    "Do not spam retries - you'll get rate limited".to_string(),
                ];
                retry_blocks = Some(blocks);
            }
        }

        let netuid_text = netuid
            .map(|n| n.to_string())
            .unwrap_or_else(|| "<netuid>".to_string());
        let actions = actions
            .into_iter()
            .map(|a| a.replace("{netuid}", &netuid_text))
            .collect();

        return TranslatedError {
            category: rule.category,
            user_message: message,
            recommended_actions: actions,
            safe_to_retry_now: rule.safe_to_retry,
            retry_after_blocks: retry_blocks,
            retry_after_seconds: rule.retry_seconds,
            original_error,
        };
    }

    let user_message = match exit_code {
        Some(code) if code != 0 => format!(
            "Something went wrong (exit code {}). Check the error details below.",
            code
        ),
        _ => "Something went wrong. Check the error details below.".to_string(),
    };

    TranslatedError {
        category: ErrorCategory::Unknown,
        user_message,
        recommended_actions: vec![
            "Re-run with --debug for more detail".to_string(),
            "Enable --audit-log and inspect the command log".to_string(),
        ],
        safe_to_retry_now: false,
        retry_after_blocks: None,
        retry_after_seconds: None,
        original_error,
    }
}

/// Categories that are safe to retry immediately.
pub fn is_retryable(category: ErrorCategory) -> bool {
    matches!(
        category,
        ErrorCategory::NetworkError
            | ErrorCategory::Timeout
            | ErrorCategory::InvalidAddress
            | ErrorCategory::WalletNotFound
            | ErrorCategory::HotkeyNotFound
            | ErrorCategory::PermissionDenied
    )
}

fn bounded_original(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    Some(raw.chars().take(MAX_ORIGINAL_ERROR_CHARS).collect())
}
