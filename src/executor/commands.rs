use serde::Serialize;
use std::fmt;

/// 지갑 CLI 인자 값
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Text(String),
    Int(i64),
    Float(f64),
    /// true면 `--key`만, false면 생략
    Bool(bool),
}

impl ArgValue {
    pub fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Int(n) => n.to_string(),
            // 10 → "10.0" (지갑 CLI가 정수를 rao로 해석하지 않도록)
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => format!("{:.1}", v),
            Self::Float(v) => v.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&String> for ArgValue {
    fn from(v: &String) -> Self {
        Self::Text(v.clone())
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u16> for ArgValue {
    fn from(v: u16) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for ArgValue {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// 실행할 지갑 CLI 명령
///
/// # Examples
/// ```
/// use txpilot::executor::commands::CommandSpec;
///
/// let spec = CommandSpec::new("wallet", "balance")
///     .arg_opt("wallet-name", Some("alice"))
///     .flag("all");
/// assert_eq!(spec.name(), "wallet balance");
/// assert_eq!(spec.args.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandSpec {
    pub group: String,
    pub subcommand: String,
    /// 순서가 유지되는 `--key value` 인자
    pub args: Vec<(String, ArgValue)>,
    pub flags: Vec<String>,
}

impl CommandSpec {
    pub fn new(group: impl Into<String>, subcommand: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            subcommand: subcommand.into(),
            args: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.push((key.into(), value.into()));
        self
    }

    /// 값이 없으면 인자를 넣지 않는다
    pub fn arg_opt<V: Into<ArgValue>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.arg(key, v),
            None => self,
        }
    }

    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    pub fn flag_if(self, flag: impl Into<String>, enabled: bool) -> Self {
        if enabled {
            self.flag(flag)
        } else {
            self
        }
    }

    pub fn name(&self) -> String {
        format!("{} {}", self.group, self.subcommand)
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.args.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

// 자주 쓰는 명령 생성기

pub fn stake_add(
    amount: f64,
    hotkey: &str,
    netuid: u16,
    wallet_name: Option<&str>,
    safe_staking: bool,
) -> CommandSpec {
    CommandSpec::new("stake", "add")
        .arg("amount", amount)
        .arg("include-hotkeys", hotkey)
        .arg("netuid", netuid)
        .arg_opt("wallet-name", wallet_name)
        .flag_if("safe", safe_staking)
}

pub fn stake_remove(amount: f64, hotkey: &str, netuid: u16, wallet_name: Option<&str>) -> CommandSpec {
    CommandSpec::new("stake", "remove")
        .arg("amount", amount)
        .arg("include-hotkeys", hotkey)
        .arg("netuid", netuid)
        .arg_opt("wallet-name", wallet_name)
}

pub fn transfer(amount: f64, destination: &str, wallet_name: Option<&str>) -> CommandSpec {
    CommandSpec::new("wallet", "transfer")
        .arg("amount", amount)
        .arg("dest", destination)
        .arg_opt("wallet-name", wallet_name)
}

pub fn balance(wallet_name: Option<&str>, all_wallets: bool) -> CommandSpec {
    CommandSpec::new("wallet", "balance")
        .arg_opt("wallet-name", wallet_name)
        .flag_if("all", all_wallets)
}

pub fn metagraph(netuid: u16, json_output: bool) -> CommandSpec {
    CommandSpec::new("subnets", "metagraph")
        .arg("netuid", netuid)
        .flag_if("json-output", json_output)
}

pub fn register(netuid: u16, wallet_name: &str, hotkey_name: &str) -> CommandSpec {
    CommandSpec::new("subnets", "register")
        .arg("netuid", netuid)
        .arg("wallet-name", wallet_name)
        .arg("hotkey-name", hotkey_name)
}
