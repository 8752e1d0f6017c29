use once_cell::sync::Lazy;
use regex::Regex;

const SECRET_KEYS: &str = r"password|passphrase|passwd|secret|private[_\-]?key|api[_\-]?key|token";

/// (패턴, 치환) 순서대로 적용
static REDACTION_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        // 니모닉/시드는 줄 끝까지 가린다
        (
            r"(?im)\b(mnemonic|seed(?:[ _\-]?phrase)?)([ \t]*[:=][ \t]*)[^\r\n]+".to_string(),
            "${1}${2}[REDACTED]",
        ),
        // 명령줄 형태: --password hunter2
        (
            format!(r"(?i)(--(?:{}))([ \t]+|=)(\S+)", SECRET_KEYS),
            "${1}${2}[REDACTED]",
        ),
        // JSON/설정 형태: "password": "hunter2", token = 'a b'
        (
            format!(r#"(?i)\b({})\b("?[ \t]*[:=][ \t]*)"[^"\r\n]*""#, SECRET_KEYS),
            r#"${1}${2}"[REDACTED]""#,
        ),
        (
            format!(r"(?i)\b({})\b('?[ \t]*[:=][ \t]*)'[^'\r\n]*'", SECRET_KEYS),
            "${1}${2}'[REDACTED]'",
        ),
        (
            format!(r#"(?i)\b({})\b(["']?[ \t]*[:=][ \t]*)([^\s"']\S*)"#, SECRET_KEYS),
            "${1}${2}[REDACTED]",
        ),
        (r"(?i)\b(bearer)\s+[a-z0-9._\-~+/]+=*".to_string(), "${1} [REDACTED]"),
        (r"(?i)\bsk-[a-z0-9\-]{10,}\b".to_string(), "sk-[REDACTED]"),
        (r"\b(?:0x)?[0-9a-fA-F]{64}\b".to_string(), "[REDACTED_KEY]"),
    ]
    .into_iter()
    .map(|(p, r)| (Regex::new(&p).unwrap(), r))
    .collect()
});

/// 로그에 쓰기 전 민감 정보 가리기
pub fn redact(raw: &str) -> String {
    let mut value = raw.to_string();
    for (re, replacement) in REDACTION_RULES.iter() {
        value = re.replace_all(&value, *replacement).into_owned();
    }
    value
}
