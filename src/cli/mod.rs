// CLI module
// Command-line interface, argument parsing and interactive prompts

mod args;
pub mod prompt;

pub use args::{CliArgs, OperationType, StrategyType};
pub use prompt::Prompter;

use crate::types::BenchError;
use clap::Parser;
use std::io::{BufRead, Write};

/// Parse command-line arguments using clap
///
/// If parsing fails (e.g., invalid arguments or --help flag), clap displays
/// an error message or help text and exits the process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Ask for the operation and strategy when they were not given as flags
///
/// # Errors
///
/// Returns `InvalidConfiguration` when a choice is missing and prompting is
/// disabled, or when an answer is not valid.
pub fn fill_missing_choices<R: BufRead, W: Write>(
    args: &mut CliArgs,
    prompter: &mut Prompter<R, W>,
) -> Result<(), BenchError> {
    if args.operation.is_none() {
        if args.no_prompt {
            return Err(BenchError::invalid_configuration("--operation is required"));
        }
        args.operation = Some(prompter.choose(
            "The following operation types are available:",
            "Specify the desired operation type:",
            &OperationType::ALL,
        )?);
    }

    // Retrieve always pages, so it never needs a strategy
    if args.strategy.is_none() && args.operation == Some(OperationType::Retrieve) {
        args.strategy = Some(StrategyType::Single);
    }
    if args.strategy.is_none() {
        if args.no_prompt {
            return Err(BenchError::invalid_configuration("--strategy is required"));
        }
        args.strategy = Some(prompter.choose(
            "The following dispatch strategies are available:",
            "Specify the desired dispatch strategy:",
            &StrategyType::ALL,
        )?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(answers: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(answers.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_prompts_for_missing_choices() {
        let mut args = CliArgs::try_parse_from(["program"]).unwrap();
        fill_missing_choices(&mut args, &mut prompter("2\n1\n")).unwrap();

        assert_eq!(args.operation, Some(OperationType::Update));
        assert_eq!(args.strategy, Some(StrategyType::ExecuteMultiple));
    }

    #[test]
    fn test_flags_skip_prompts() {
        let mut args = CliArgs::try_parse_from([
            "program",
            "--operation",
            "delete",
            "--strategy",
            "single",
        ])
        .unwrap();
        // No answers available: any prompt would fail
        fill_missing_choices(&mut args, &mut prompter("")).unwrap();

        assert_eq!(args.operation, Some(OperationType::Delete));
        assert_eq!(args.strategy, Some(StrategyType::Single));
    }

    #[test]
    fn test_retrieve_needs_no_strategy() {
        let mut args = CliArgs::try_parse_from(["program", "--operation", "retrieve"]).unwrap();
        fill_missing_choices(&mut args, &mut prompter("")).unwrap();
        assert_eq!(args.strategy, Some(StrategyType::Single));
    }

    #[test]
    fn test_no_prompt_rejects_missing_choice() {
        let mut args = CliArgs::try_parse_from(["program", "--no-prompt"]).unwrap();
        let result = fill_missing_choices(&mut args, &mut prompter("0\n"));
        assert!(matches!(result, Err(BenchError::InvalidConfiguration { .. })));
    }
}
