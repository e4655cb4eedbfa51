//! Interactive fallback for choices missing from the command line
//!
//! Menus are numbered from zero. Anything other than a listed number, or
//! anything other than y/n for a yes/no question, is an invalid configuration.

use std::fmt::Display;
use std::io::{BufRead, Write};

use crate::types::{BenchError, EntityMetadata};

/// Numbered menus and yes/no questions over any reader and writer
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// Create a prompter reading answers from `input`
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Show `options` as a numbered list and return the one picked
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when the answer is not a listed number,
    /// or `IoError` when the terminal cannot be read or written.
    pub fn choose<T: Display + Clone>(
        &mut self,
        heading: &str,
        question: &str,
        options: &[T],
    ) -> Result<T, BenchError> {
        if options.is_empty() {
            return Err(BenchError::not_found(format!("Nothing to choose from: {}", heading)));
        }
        writeln!(self.output, "\n{}", heading)?;
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "({}) {}", i, option)?;
        }
        let answer = self.ask(question)?;

        answer
            .parse::<usize>()
            .ok()
            .and_then(|index| options.get(index))
            .cloned()
            .ok_or_else(|| {
                BenchError::invalid_configuration(format!(
                    "the specified choice is not valid: {}",
                    answer
                ))
            })
    }

    /// Ask a y/n question
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for any answer other than y/Y/n/N.
    pub fn confirm(&mut self, question: &str) -> Result<bool, BenchError> {
        let answer = self.ask(&format!("{} (y/n)?", question))?;
        match answer.as_str() {
            "y" | "Y" => Ok(true),
            "n" | "N" => Ok(false),
            _ => Err(BenchError::invalid_configuration(format!(
                "expected y/Y or n/N but received: {}",
                answer
            ))),
        }
    }

    /// Ask whether to list OOB or custom entities, then pick one of them
    ///
    /// `candidates` maps the answer (true for OOB) to the entities offered.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the chosen kind has no entities.
    pub fn choose_entity<F>(&mut self, candidates: F) -> Result<String, BenchError>
    where
        F: Fn(bool) -> Vec<EntityMetadata>,
    {
        let oob = self.confirm("\nDo you want to work with OOB entities")?;
        let kind = if oob { "OOB Entities" } else { "Custom Entities" };
        let names: Vec<String> = candidates(oob)
            .into_iter()
            .map(|metadata| metadata.logical_name)
            .collect();
        if names.is_empty() {
            return Err(BenchError::not_found(format!("No {} are available", kind)));
        }

        self.choose(
            &format!("The following {} are available:", kind),
            "Specify the desired entity:",
            &names,
        )
    }

    /// Print "Press <Enter> to exit." and wait for a line
    ///
    /// # Errors
    ///
    /// Returns `IoError` when the terminal cannot be read or written.
    pub fn pause(&mut self) -> Result<(), BenchError> {
        self.ask("Press <Enter> to exit.").map(|_| ())
    }

    fn ask(&mut self, question: &str) -> Result<String, BenchError> {
        write!(self.output, "{} ", question)?;
        self.output.flush()?;
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{OperationType, StrategyType};
    use rstest::rstest;
    use std::io::Cursor;

    fn prompter(answers: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(answers.as_bytes().to_vec()), Vec::new())
    }

    #[rstest]
    #[case::first("0\n", OperationType::Create)]
    #[case::last("3\n", OperationType::Delete)]
    #[case::padded("  2 \n", OperationType::Update)]
    fn test_choose_operation(#[case] answer: &str, #[case] expected: OperationType) {
        let mut prompter = prompter(answer);
        let chosen = prompter
            .choose("Operations:", "Pick:", &OperationType::ALL)
            .unwrap();
        assert_eq!(chosen, expected);
    }

    #[test]
    fn test_menu_is_numbered_from_zero() {
        let mut prompter = prompter("1\n");
        prompter
            .choose("Strategies:", "Pick:", &StrategyType::ALL)
            .unwrap();

        let shown = String::from_utf8(prompter.output).unwrap();
        assert!(shown.contains("(0) Execute Single"));
        assert!(shown.contains("(1) Execute Multiple"));
        assert!(shown.contains("(2) Parallel Execute Multiple"));
    }

    #[rstest]
    #[case::out_of_range("7\n")]
    #[case::not_a_number("create\n")]
    #[case::empty("\n")]
    fn test_invalid_choice(#[case] answer: &str) {
        let mut prompter = prompter(answer);
        let result = prompter.choose("Operations:", "Pick:", &OperationType::ALL);
        assert!(matches!(result, Err(BenchError::InvalidConfiguration { .. })));
    }

    #[rstest]
    #[case::lower_yes("y\n", Some(true))]
    #[case::upper_yes("Y\n", Some(true))]
    #[case::lower_no("n\n", Some(false))]
    #[case::upper_no("N\n", Some(false))]
    #[case::word("yes\n", None)]
    fn test_confirm(#[case] answer: &str, #[case] expected: Option<bool>) {
        let mut prompter = prompter(answer);
        assert_eq!(prompter.confirm("Continue").ok(), expected);
    }

    #[test]
    fn test_choose_custom_entity() {
        let catalog = vec![
            EntityMetadata::new("account", "accountid", "name"),
            EntityMetadata::new("new_project", "new_projectid", "new_name").custom(),
        ];
        let mut prompter = prompter("n\n0\n");

        let chosen = prompter
            .choose_entity(|oob| {
                catalog
                    .iter()
                    .filter(|m| m.is_custom != oob)
                    .cloned()
                    .collect()
            })
            .unwrap();

        assert_eq!(chosen, "new_project");
        let shown = String::from_utf8(prompter.output).unwrap();
        assert!(shown.contains("The following Custom Entities are available:"));
    }

    #[test]
    fn test_choose_entity_with_nothing_offered() {
        let mut prompter = prompter("y\n");
        let result = prompter.choose_entity(|_| Vec::new());
        assert!(matches!(result, Err(BenchError::NotFound { .. })));
    }
}
