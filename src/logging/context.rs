use crate::cli::Command;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// One-shot commands that read a definition, print a result and exit.
    Interactive,
    /// Long-running status polling; stdout carries the refreshed overlay.
    Watch,
}

impl ExecutionContext {
    /// Returns `true` when the console sink is off unless configured otherwise.
    pub fn quiet_by_default(self) -> bool {
        matches!(self, ExecutionContext::Watch)
    }
}

/// Derive the active execution context from a parsed CLI command.
pub fn detect_context(command: &Command) -> ExecutionContext {
    match command {
        Command::Status(args) if args.watch => ExecutionContext::Watch,
        Command::Inspect(_)
        | Command::Check(_)
        | Command::Layout(_)
        | Command::Dot(_)
        | Command::Status(_) => ExecutionContext::Interactive,
    }
}
