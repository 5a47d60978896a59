/// Per-tool output parsers
///
/// Each external tool gets its own grammar behind [`OutputParser`], so drift in
/// one tool's output format cannot leak into another's.
pub mod bandit;
pub mod basedpyright;
pub mod eslint;
pub mod prettier;
pub mod ruff;
pub mod tsc;

pub use bandit::BanditParser;
pub use basedpyright::BasedpyrightParser;
pub use eslint::EslintParser;
pub use prettier::PrettierParser;
pub use ruff::RuffParser;
pub use tsc::TscParser;

pub use crate::diagnostics::OutputParser;
