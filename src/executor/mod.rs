pub mod batch;
pub mod classifier;
pub mod commands;
pub mod driver;
pub mod launcher;
pub mod planner;
pub mod runner;
pub mod validator;

// main.rs, pipeline 에서 쓰는 것들
pub use batch::{BatchCoordinator, BatchResult, BatchSettings};
pub use classifier::{ExecutionStatus, OutputParser};
pub use commands::{ArgValue, CommandSpec};
pub use runner::{CommandExecutor, CommandResult, ExecutionMode, ExecutorSettings};
pub use validator::{CommandValidator, RiskLevel};
