use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 지갑 CLI 실행 결과 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Timeout,
    /// 프롬프트 대기 중 사용자 인터럽트
    Cancelled,
    DryRun,
    DemoMode,
    Unknown,
}

impl ExecutionStatus {
    /// 실제 실패가 아닌 상태 (dry-run, 데모 포함)
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::DryRun | Self::DemoMode)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::DryRun => "dry_run",
            Self::DemoMode => "demo_mode",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 성공 표식. 실패 표식보다 먼저 검사한다.
static SUCCESS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"✅",
        r"(?i)\bsuccess(?:ful|fully)?\b",
        r"(?i)\bfinalized\b",
        r"(?i)\btransaction submitted\b",
        r"(?i)\bextrinsic submitted\b",
        r"(?i)\bblock hash\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static FAILURE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"❌",
        r"(?i)\berror\b",
        r"(?i)\bfail(?:ed|ure|s)?\b",
        r"(?i)\binsufficient\b",
        r"(?i)\bnot found\b",
        r"(?i)\binvalid\b",
        r"(?i)\bdenied\b",
        r"(?i)\brejected\b",
        r"(?i)\bcancell?ed\b",
        r"(?i)\babort(?:ed)?\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TX_HASH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:0x)?([0-9a-fA-F]{64})").unwrap());

/// 에러 문구 → 사용자 메시지. 위에서부터 첫 매치가 이긴다.
static ERROR_MESSAGES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)insufficient\s*(?:free\s*)?balance|\binsufficient\b", "Insufficient balance for this transaction"),
        (r"(?i)invalid.*address", "Invalid destination address"),
        (r"(?i)not registered", "Hotkey is not registered on this subnet"),
        (r"(?i)wrong password|password incorrect|incorrect password", "Incorrect wallet password"),
        (r"(?i)decryption failed|failed to decrypt", "Failed to decrypt wallet (wrong password?)"),
        (r"(?i)connection refused", "Cannot connect to network"),
        (r"(?i)timed? ?out", "Operation timed out"),
        (r"(?i)coldkey.*not found", "Coldkey not found"),
        (r"(?i)hotkey.*not found", "Hotkey not found"),
        (r"(?i)no wallet|wallet.*not found", "Wallet not found"),
    ]
    .into_iter()
    .map(|(p, msg)| (Regex::new(p).unwrap(), msg))
    .collect()
});

const MAX_FALLBACK_MESSAGE_CHARS: usize = 200;

/// 지갑 CLI 텍스트 출력 분류기
///
/// 구조화된 프로토콜이 없으므로 휴리스틱 패턴으로 상태를 판단한다.
pub struct OutputParser;

impl OutputParser {
    /// 출력과 종료 코드로 실행 상태 판단
    ///
    /// `exit_code`가 `None`이면 종료 코드를 얻지 못한 경우다 (시그널 종료 등).
    ///
    /// # Examples
    /// ```
    /// use txpilot::executor::classifier::{ExecutionStatus, OutputParser};
    ///
    /// let status = OutputParser::determine_status("Transfer complete ✅", "", Some(0));
    /// assert_eq!(status, ExecutionStatus::Success);
    /// ```
    pub fn determine_status(stdout: &str, stderr: &str, exit_code: Option<i32>) -> ExecutionStatus {
        // 1. 0이 아닌 종료 코드는 텍스트보다 우선
        if let Some(code) = exit_code {
            if code != 0 {
                return ExecutionStatus::Failed;
            }
        }

        // 2. 성공 표식 (실패 표식보다 먼저)
        if SUCCESS_PATTERNS.iter().any(|re| re.is_match(stdout)) {
            return ExecutionStatus::Success;
        }

        // 3. 실패 표식 (stdout + stderr)
        let combined = format!("{}\n{}", stdout, stderr);
        if FAILURE_PATTERNS.iter().any(|re| re.is_match(&combined)) {
            return ExecutionStatus::Failed;
        }

        // 4. 표식 없이 정상 종료
        if exit_code == Some(0) {
            return ExecutionStatus::Success;
        }

        ExecutionStatus::Unknown
    }

    /// 첫 번째 64자리 hex 해시 추출 ("0x" 접두어로 정규화)
    pub fn extract_tx_hash(output: &str) -> Option<String> {
        TX_HASH_REGEX
            .captures(output)
            .and_then(|caps| caps.get(1))
            .map(|m| format!("0x{}", m.as_str()))
    }

    /// 알려진 에러 문구를 사람이 읽을 메시지로 변환
    ///
    /// 매치가 없으면 stderr 첫 줄(최대 200자), stderr가 비어 있으면 `None`.
    pub fn parse_error_message(stdout: &str, stderr: &str) -> Option<String> {
        let combined = format!("{}\n{}", stdout, stderr);

        for (re, message) in ERROR_MESSAGES.iter() {
            if re.is_match(&combined) {
                return Some(message.to_string());
            }
        }

        let first_line = stderr.trim().lines().next()?.trim();
        if first_line.is_empty() {
            return None;
        }
        Some(first_line.chars().take(MAX_FALLBACK_MESSAGE_CHARS).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";

    #[test]
    fn test_success_markers() {
        for stdout in [
            "Transfer complete ✅\nBlock: 12345",
            "Transaction Finalized",
            "Extrinsic submitted successfully",
            "Successfully staked 10 TAO",
            "Transaction submitted to network",
            "Block hash: 0xabc123",
        ] {
            assert_eq!(
                OutputParser::determine_status(stdout, "", Some(0)),
                ExecutionStatus::Success,
                "{stdout}"
            );
        }
    }

    #[test]
    fn test_success_marker_with_unset_exit_code() {
        let status = OutputParser::determine_status("Finalized block #123456", "", None);
        assert_eq!(status, ExecutionStatus::Success);
    }

    #[test]
    fn test_success_checked_before_failure_words() {
        // 성공 문구에 에러처럼 보이는 단어가 섞여 있는 경우
        let stdout = "✅ Finalized. No error encountered";
        assert_eq!(
            OutputParser::determine_status(stdout, "", Some(0)),
            ExecutionStatus::Success
        );
    }

    #[test]
    fn test_nonzero_exit_code_wins() {
        let status = OutputParser::determine_status("Transfer complete ✅", "", Some(1));
        assert_eq!(status, ExecutionStatus::Failed);

        let status = OutputParser::determine_status("Some output", "", Some(2));
        assert_eq!(status, ExecutionStatus::Failed);
    }

    #[test]
    fn test_failure_markers() {
        for stdout in [
            "Transaction failed ❌",
            "Error: Something went wrong",
            "Insufficient balance",
            "Address not found",
            "Invalid netuid specified",
            "Permission denied",
            "Request rejected by validator",
            "Operation cancelled",
            "Abort: User cancelled",
        ] {
            assert_eq!(
                OutputParser::determine_status(stdout, "", None),
                ExecutionStatus::Failed,
                "{stdout}"
            );
        }
    }

    #[test]
    fn test_failure_in_stderr_only() {
        let status = OutputParser::determine_status("Processing...", "failed to connect", Some(0));
        assert_eq!(status, ExecutionStatus::Failed);
    }

    #[test]
    fn test_zero_exit_without_markers_is_success() {
        let status = OutputParser::determine_status("Command completed\n", "", Some(0));
        assert_eq!(status, ExecutionStatus::Success);
    }

    #[test]
    fn test_unset_exit_without_markers_is_unknown() {
        let status = OutputParser::determine_status("Ambiguous output", "", None);
        assert_eq!(status, ExecutionStatus::Unknown);
    }

    #[test]
    fn test_extract_hash_with_prefix() {
        let output = format!("Block hash: 0x{}", HASH);
        assert_eq!(OutputParser::extract_tx_hash(&output), Some(format!("0x{}", HASH)));
    }

    #[test]
    fn test_extract_hash_without_prefix_is_normalized() {
        let output = format!("Hash: {}", HASH);
        assert_eq!(OutputParser::extract_tx_hash(&output), Some(format!("0x{}", HASH)));
    }

    #[test]
    fn test_first_hash_returned() {
        let output = format!(
            "Extrinsic hash: 0x{}\nBlock hash: 0x{}",
            "1".repeat(64),
            "2".repeat(64)
        );
        assert_eq!(
            OutputParser::extract_tx_hash(&output),
            Some(format!("0x{}", "1".repeat(64)))
        );
    }

    #[test]
    fn test_short_hex_is_not_a_hash() {
        assert_eq!(OutputParser::extract_tx_hash("0xabcd1234"), None);
        assert_eq!(OutputParser::extract_tx_hash("no hash here"), None);
    }

    #[test]
    fn test_parse_known_error_messages() {
        let cases = [
            ("Error: Account has insufficient balance for transfer", "", "Insufficient balance for this transaction"),
            ("Invalid address format provided", "", "Invalid destination address"),
            ("Decryption failed: password incorrect", "", "Incorrect wallet password"),
            ("Decryption failed", "", "Failed to decrypt wallet (wrong password?)"),
            ("", "ConnectionRefusedError: Connection refused by server", "Cannot connect to network"),
            ("Operation timed out after 120 seconds", "", "Operation timed out"),
            ("", "Error: No wallet found at path", "Wallet not found"),
            ("", "Hotkey miner1 not found", "Hotkey not found"),
            ("", "Hotkey is not registered on subnet 1", "Hotkey is not registered on this subnet"),
        ];

        for (stdout, stderr, expected) in cases {
            assert_eq!(
                OutputParser::parse_error_message(stdout, stderr).as_deref(),
                Some(expected),
                "{stdout} / {stderr}"
            );
        }
    }

    #[test]
    fn test_parse_error_fallback_to_stderr_first_line() {
        let stderr = "Something odd occurred\nMore details here";
        assert_eq!(
            OutputParser::parse_error_message("", stderr).as_deref(),
            Some("Something odd occurred")
        );
    }

    #[test]
    fn test_parse_error_fallback_is_bounded() {
        let stderr = "x".repeat(500);
        let message = OutputParser::parse_error_message("", &stderr).unwrap();
        assert_eq!(message.chars().count(), 200);
    }

    #[test]
    fn test_parse_error_none_for_empty_stderr() {
        assert_eq!(OutputParser::parse_error_message("", ""), None);
        assert_eq!(OutputParser::parse_error_message("all good", "  \n "), None);
    }

    #[test]
    fn test_status_success_flags() {
        assert!(ExecutionStatus::Success.is_success());
        assert!(ExecutionStatus::DryRun.is_success());
        assert!(ExecutionStatus::DemoMode.is_success());
        assert!(!ExecutionStatus::Timeout.is_success());
        assert!(!ExecutionStatus::Unknown.is_success());
    }
}
