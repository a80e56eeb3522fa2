mod git_cli;
mod pointer_scanner;

pub use git_cli::GitCli;
pub use pointer_scanner::GitPointerScanner;
