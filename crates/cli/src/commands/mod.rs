//! One module per subcommand.

pub mod chain;
pub mod collaborate;
pub mod parallel;
pub mod plan;
pub mod reflect;
pub mod route;
pub mod tools;

use patternkit_config::AppConfig;
use patternkit_patterns::ModelInvoker;

/// Everything a command needs, built once in `main`.
pub struct Context {
    pub config: AppConfig,
    pub invoker: ModelInvoker,
}

pub fn rule() -> String {
    "=".repeat(80)
}

pub fn banner(title: &str) {
    println!("{}", rule());
    println!("{title}");
    println!("{}", rule());
}
