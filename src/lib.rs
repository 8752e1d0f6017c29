//! txpilot: 지갑 CLI(btcli) 트랜잭션을 계획하고, 확인받고, 구동하고, 검증한다.
//!
//! 흐름: [`pipeline::TransactionPipeline`] → [`executor::CommandExecutor`] →
//! [`executor::driver::InteractiveDriver`]. 실패 출력은 [`translator`]가 풀어서 설명하고,
//! 모든 실행은 [`audit`]에 마스킹된 채로 남는다.

pub mod audit;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod pipeline;
pub mod security;
pub mod translator;
pub mod ui;

pub use error::{PilotError, Result};
