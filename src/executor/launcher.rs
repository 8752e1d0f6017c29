use std::io;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// 자식 프로세스 생성 창구. 테스트에서 생성 횟수를 셀 수 있도록 분리.
pub trait ProcessLauncher: Send + Sync {
    /// `argv[0]`을 실행. stdin/stdout/stderr는 모두 파이프, drop 시 kill.
    fn spawn(&self, argv: &[String]) -> io::Result<Child>;
}

/// 실제 바이너리 실행
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn spawn(&self, argv: &[String]) -> io::Result<Child> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

        Command::new(program)
            .args(args)
            // 색상 코드가 패턴 매칭을 방해하지 않도록
            .env("NO_COLOR", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// `sh -c` 스크립트를 순서대로 실행하는 테스트용 launcher.
    /// 스크립트가 모자라면 마지막 것을 반복한다.
    pub struct ScriptLauncher {
        scripts: Vec<String>,
        spawned: AtomicUsize,
        argvs: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptLauncher {
        pub fn new<S: Into<String>>(scripts: impl IntoIterator<Item = S>) -> Arc<Self> {
            Arc::new(Self {
                scripts: scripts.into_iter().map(Into::into).collect(),
                spawned: AtomicUsize::new(0),
                argvs: Mutex::new(Vec::new()),
            })
        }

        pub fn spawn_count(&self) -> usize {
            self.spawned.load(Ordering::SeqCst)
        }

        pub fn argvs(&self) -> Vec<Vec<String>> {
            self.argvs.lock().unwrap().clone()
        }
    }

    impl ProcessLauncher for ScriptLauncher {
        fn spawn(&self, argv: &[String]) -> io::Result<Child> {
            let index = self.spawned.fetch_add(1, Ordering::SeqCst);
            self.argvs.lock().unwrap().push(argv.to_vec());

            let script = self
                .scripts
                .get(index)
                .or_else(|| self.scripts.last())
                .cloned()
                .unwrap_or_default();

            Command::new("sh")
                .arg("-c")
                .arg(script)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
        }
    }

    /// 항상 실패하는 launcher (바이너리 없음)
    pub struct MissingBinaryLauncher;

    impl ProcessLauncher for MissingBinaryLauncher {
        fn spawn(&self, _argv: &[String]) -> io::Result<Child> {
            Err(io::Error::new(io::ErrorKind::NotFound, "No such file or directory"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_argv_rejected() {
        let err = SystemLauncher.spawn(&[]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_launcher_pipes_output() {
        let argv = vec!["echo".to_string(), "hello".to_string()];
        let child = SystemLauncher.spawn(&argv).unwrap();
        let output = child.wait_with_output().await.unwrap();

        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let argv = vec!["txpilot-definitely-missing-binary".to_string()];
        let err = SystemLauncher.spawn(&argv).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
