use colored::*;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// 스피너 (단일 명령 실행 중)
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(TICKS)
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// 배치 작업용 프로그레스 디스플레이 (stderr)
pub struct BatchProgressDisplay {
    multi: MultiProgress,
    main_bar: ProgressBar,
}

impl BatchProgressDisplay {
    /// 새 배치 프로그레스 생성
    pub fn new(total: usize, title: &str) -> Self {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::stderr());
        let main_bar = ProgressBar::new(total as u64);

        main_bar.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} {} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{percent}}%) {{msg}}",
                    title
                ))
                .unwrap()
                .progress_chars("█▓▒░ "),
        );

        let main_bar = multi.add(main_bar);

        Self { multi, main_bar }
    }

    /// 현재 청크 등 상태 메시지
    pub fn set_message(&self, message: &str) {
        self.main_bar.set_message(message.to_string());
    }

    /// 개별 작업 스피너 추가
    pub fn add_task(&self, name: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_strings(TICKS)
                .template(&format!("  {{spinner:.cyan}} {}: {{msg}}", name))
                .unwrap(),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.multi.add(spinner)
    }

    /// 작업 성공 완료
    pub fn finish_task(&self, spinner: &ProgressBar, duration_ms: u64) {
        spinner.finish_with_message(format!("{} ({}ms)", "[OK]".green(), duration_ms));
        self.main_bar.inc(1);
    }

    /// 작업 실패
    pub fn fail_task(&self, spinner: &ProgressBar, error: &str) {
        let short: String = error.lines().next().unwrap_or("").chars().take(60).collect();
        spinner.finish_with_message(format!("{} {}", "[X]".red(), short.dimmed()));
        self.main_bar.inc(1);
    }

    /// 전체 완료
    pub fn finish(&self, success: usize, total: usize) {
        self.main_bar.finish_with_message(format!(
            "{} done (success: {}, not successful: {})",
            "[OK]".green().bold(),
            success.to_string().green(),
            total.saturating_sub(success).to_string().red()
        ));
    }
}
