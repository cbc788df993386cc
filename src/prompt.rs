//! Blocking operator prompts.
//!
//! Every interactive question the lifecycle asks goes through [`Operator`],
//! so runs can be driven by a terminal user ([`TerminalOperator`]) or by a
//! scripted answer list in tests.

use inquire::validator::Validation;
use inquire::{Confirm, CustomUserError, InquireError, Text};

use crate::error::{LifecycleError, Result};

pub trait Operator {
    /// Yes/no question. Blocks until answered.
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool>;

    /// Pick one of `options`. There is no default; blocks until a valid choice is made.
    fn select(&mut self, question: &str, options: &[String]) -> Result<String>;

    /// Free text. `default` is returned for an empty answer when given.
    fn text(&mut self, question: &str, default: Option<&str>) -> Result<String>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalOperator;

fn prompt_error(e: InquireError) -> LifecycleError {
    match e {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            LifecycleError::Declined("prompt".to_string())
        }
        other => LifecycleError::Prompt(other.to_string()),
    }
}

impl Operator for TerminalOperator {
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        Confirm::new(question)
            .with_default(default)
            .prompt()
            .map_err(prompt_error)
    }

    /// Numbered menu answered by number or name. Nothing is preselected, so
    /// an empty answer is rejected and asked again.
    fn select(&mut self, question: &str, options: &[String]) -> Result<String> {
        let menu = menu(options);
        let choices = options.to_vec();
        let answer = Text::new(question)
            .with_help_message(&menu)
            .with_validator(move |input: &str| -> std::result::Result<Validation, CustomUserError> {
                Ok(match pick(input, &choices) {
                    Some(_) => Validation::Valid,
                    None => Validation::Invalid("Enter one of the listed numbers or names".into()),
                })
            })
            .prompt()
            .map_err(prompt_error)?;
        pick(&answer, options).ok_or_else(|| LifecycleError::Prompt(format!("invalid choice: {answer}")))
    }

    fn text(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        let mut prompt = Text::new(question);
        if let Some(default) = default {
            prompt = prompt.with_default(default);
        }
        prompt.prompt().map_err(prompt_error)
    }
}

fn menu(options: &[String]) -> String {
    options
        .iter()
        .enumerate()
        .map(|(i, o)| format!("{}) {o}", i + 1))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Resolve a menu answer given as an option's text or its 1-based position.
fn pick(answer: &str, options: &[String]) -> Option<String> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }
    if let Some(hit) = options.iter().find(|o| *o == answer) {
        return Some(hit.clone());
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=options.len()).contains(&n) => Some(options[n - 1].clone()),
        _ => None,
    }
}

/// Answers questions from a fixed script, in order. Used by tests and by
/// non-interactive runs that must never block.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: std::collections::VecDeque<String>,
    /// Every question asked, in order.
    pub asked: Vec<String>,
}

impl ScriptedOperator {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    fn next(&mut self, question: &str) -> Result<String> {
        self.asked.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| LifecycleError::Prompt(format!("no scripted answer for: {question}")))
    }
}

impl Operator for ScriptedOperator {
    fn confirm(&mut self, question: &str, _default: bool) -> Result<bool> {
        let answer = self.next(question)?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes" | "true"))
    }

    /// Answers are either an option's text or its 1-based position.
    /// Anything else is skipped and the next answer is tried, like a re-prompt.
    fn select(&mut self, question: &str, options: &[String]) -> Result<String> {
        loop {
            let answer = self.next(question)?;
            if let Some(hit) = pick(&answer, options) {
                return Ok(hit);
            }
        }
    }

    fn text(&mut self, question: &str, default: Option<&str>) -> Result<String> {
        let answer = self.next(question)?;
        match (answer.is_empty(), default) {
            (true, Some(default)) => Ok(default.to_string()),
            _ => Ok(answer),
        }
    }
}
