//! 대화형 지갑 CLI 드라이버
//!
//! 자식 프로세스의 출력 스트림을 읽으면서 비밀번호/확인 프롬프트에 응답한다.
//! 매 단계는 다음 이벤트 하나를 기다린다:
//! 비밀번호 프롬프트, 확인 프롬프트, 스트림 종료, 타임아웃, 사용자 인터럽트.

use crate::audit::AuditLog;
use crate::security::SharedCredentials;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

/// 매칭 대기 중인 버퍼에 남겨둘 최대 꼬리 길이
const PENDING_TAIL_BYTES: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Password,
    Confirmation,
}

/// 비밀번호 패턴이 확인 패턴보다 앞선다 (같은 위치일 때 우선)
static PROMPT_PATTERNS: Lazy<Vec<(Regex, PromptKind)>> = Lazy::new(|| {
    [
        (
            r"(?i)enter (?:your |the )?(?:coldkey |hotkey )?password(?:\s*:)?",
            PromptKind::Password,
        ),
        (r"(?i)unlock your (?:coldkey|hotkey)(?:[^\n]*?:)?", PromptKind::Password),
        (r"(?i)password\s*:", PromptKind::Password),
        (
            r"(?i)(?:do you want to (?:continue|proceed)|would you like to)(?:[^\n]*?(?:\[y/n\]|\(y/n\)))?",
            PromptKind::Confirmation,
        ),
        (r"(?i)\[y/n\]|\(y/n\)", PromptKind::Confirmation),
    ]
    .into_iter()
    .map(|(p, kind)| (Regex::new(p).unwrap(), kind))
    .collect()
});

/// 버퍼에서 가장 먼저 나타나는 프롬프트 찾기
///
/// 반환값은 (종류, 매치 끝 위치). 시작 위치가 같으면 표 순서가 이긴다.
pub fn find_prompt(buffer: &[u8]) -> Option<(PromptKind, usize)> {
    let mut best: Option<(usize, usize, PromptKind)> = None;

    for (re, kind) in PROMPT_PATTERNS.iter() {
        if let Some(m) = re.find(buffer) {
            let earlier = match best {
                Some((start, _, _)) => m.start() < start,
                None => true,
            };
            if earlier {
                best = Some((m.start(), m.end(), *kind));
            }
        }
    }

    best.map(|(_, end, kind)| (kind, end))
}

/// 드라이버 종료 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverOutcome {
    /// 스트림 종료까지 정상 진행
    Done,
    /// 다음 출력을 기다리다 시간 초과
    TimedOut,
    /// 비밀번호 프롬프트 허용 횟수 초과
    PasswordLimit,
    /// 자격 증명을 얻지 못함
    CredentialUnavailable(String),
    /// 사용자 인터럽트
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct DriverOutput {
    pub outcome: DriverOutcome,
    /// stdout과 stderr를 도착 순서대로 이어 붙인 전체 출력
    pub output: String,
    pub exit_code: Option<i32>,
    pub password_attempts: u32,
}

#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// 다음 출력 이벤트 대기 시간
    pub prompt_timeout: Duration,
    pub max_password_attempts: u32,
    /// 타임아웃 후 남은 출력을 모으는 시간
    pub drain_timeout: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            prompt_timeout: Duration::from_secs(60),
            max_password_attempts: 2,
            drain_timeout: Duration::from_secs(5),
        }
    }
}

enum Event {
    Output(Option<Vec<u8>>),
    TimedOut,
    Interrupted,
}

pub struct InteractiveDriver {
    settings: DriverSettings,
}

impl InteractiveDriver {
    pub fn new(settings: DriverSettings) -> Self {
        Self { settings }
    }

    /// 자식 프로세스를 끝까지 구동
    pub async fn run(
        &self,
        mut child: Child,
        credentials: SharedCredentials,
        mut interrupt: Option<watch::Receiver<bool>>,
        mut audit: Option<&mut AuditLog>,
    ) -> DriverOutput {
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(64);
        let mut readers: Vec<JoinHandle<()>> = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(pump(stdout, tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(pump(stderr, tx.clone())));
        }
        drop(tx);

        let mut stdin = child.stdin.take();
        let mut pending: Vec<u8> = Vec::new();
        let mut captured: Vec<u8> = Vec::new();
        let mut password_attempts = 0u32;

        let outcome = loop {
            if let Some((kind, end)) = find_prompt(&pending) {
                captured.extend(pending.drain(..end));

                match kind {
                    PromptKind::Password => {
                        password_attempts += 1;
                        if password_attempts > self.settings.max_password_attempts {
                            warn!(attempts = password_attempts, "password prompt limit reached");
                            break DriverOutcome::PasswordLimit;
                        }

                        // 입력창은 블로킹이므로 별도 스레드에서, 인터럽트와 경쟁시킨다
                        let provider = SharedCredentials::clone(&credentials);
                        let obtained = tokio::select! {
                            joined = tokio::task::spawn_blocking(move || provider.obtain()) => Some(joined),
                            _ = interrupted(&mut interrupt) => None,
                        };
                        let secret = match obtained {
                            Some(Ok(Ok(secret))) => secret,
                            Some(Ok(Err(e))) => break DriverOutcome::CredentialUnavailable(e.to_string()),
                            Some(Err(e)) => break DriverOutcome::CredentialUnavailable(e.to_string()),
                            None => {
                                warn!("interrupted at credential prompt");
                                break DriverOutcome::Cancelled;
                            }
                        };
                        write_line(&mut stdin, secret.expose_secret().as_bytes()).await;
                        drop(secret);

                        debug!(attempt = password_attempts, "credential supplied");
                        if let Some(log) = audit.as_deref_mut() {
                            log.action("credential supplied");
                        }
                    }
                    PromptKind::Confirmation => {
                        write_line(&mut stdin, b"y").await;

                        debug!("confirmation answered");
                        if let Some(log) = audit.as_deref_mut() {
                            log.action("confirmation answered: y");
                        }
                    }
                }
                continue;
            }

            // 프롬프트가 걸칠 수 있는 꼬리만 남기고 확정
            if pending.len() > PENDING_TAIL_BYTES {
                let cut = pending.len() - PENDING_TAIL_BYTES;
                captured.extend(pending.drain(..cut));
            }

            let event = tokio::select! {
                chunk = timeout(self.settings.prompt_timeout, rx.recv()) => match chunk {
                    Ok(chunk) => Event::Output(chunk),
                    Err(_) => Event::TimedOut,
                },
                _ = interrupted(&mut interrupt) => Event::Interrupted,
            };

            match event {
                Event::Output(Some(bytes)) => pending.extend(bytes),
                Event::Output(None) => break DriverOutcome::Done,
                Event::TimedOut => {
                    let _ = timeout(self.settings.drain_timeout, async {
                        while let Some(bytes) = rx.recv().await {
                            pending.extend(bytes);
                        }
                    })
                    .await;
                    warn!(timeout_secs = self.settings.prompt_timeout.as_secs(), "wallet CLI stopped responding");
                    break DriverOutcome::TimedOut;
                }
                Event::Interrupted => {
                    warn!("interrupted while driving wallet CLI");
                    break DriverOutcome::Cancelled;
                }
            }
        };

        captured.extend(pending.drain(..));
        drop(stdin);

        let exit_code = match outcome {
            DriverOutcome::Done => reap(&mut child, self.settings.drain_timeout).await,
            _ => {
                let _ = child.start_kill();
                child.wait().await.ok().and_then(|s| s.code())
            }
        };

        // 종료 후 남은 출력 수거
        while let Ok(bytes) = rx.try_recv() {
            captured.extend(bytes);
        }
        for reader in readers {
            reader.abort();
        }

        DriverOutput {
            outcome,
            output: String::from_utf8_lossy(&captured).into_owned(),
            exit_code,
            password_attempts,
        }
    }
}

async fn pump<R>(mut reader: R, tx: mpsc::Sender<Vec<u8>>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn write_line(stdin: &mut Option<ChildStdin>, line: &[u8]) {
    let Some(pipe) = stdin.as_mut() else {
        return;
    };

    let result = async {
        pipe.write_all(line).await?;
        pipe.write_all(b"\n").await?;
        pipe.flush().await
    }
    .await;

    if let Err(e) = result {
        // 자식이 이미 종료된 경우 (broken pipe)
        debug!(error = %e, "stdin write failed");
    }
}

/// 인터럽트 신호가 true가 될 때까지 대기. 송신자가 사라지면 영원히 대기.
pub(crate) async fn interrupted(rx: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = rx.as_mut() else {
        return std::future::pending().await;
    };

    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

/// 스트림이 닫힌 뒤 종료 코드 수거. 닫고도 살아있으면 kill.
async fn reap(child: &mut Child, grace: Duration) -> Option<i32> {
    match timeout(grace, child.wait()).await {
        Ok(status) => status.ok().and_then(|s| s.code()),
        Err(_) => {
            let _ = child.start_kill();
            child.wait().await.ok().and_then(|s| s.code())
        }
    }
}
