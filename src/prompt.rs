// Input seam for the interactive flows. `TermPrompt` reads from the terminal
// with `dialoguer`; `ScriptedPrompt` replays answers from a list, which lets
// the flows run unattended.

use anyhow::{anyhow, Result};
use dialoguer::Input;
use std::collections::VecDeque;

pub trait Prompt {
    /// Read one line of free text. An empty answer is allowed.
    fn text(&mut self, prompt: &str) -> Result<String>;

    /// Ask an `e`/`h` question until one of the accepted answers is given.
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        loop {
            let answer = self.text(&format!("{} (e/h)", prompt))?;
            match parse_yes_no(&answer) {
                Some(yes) => return Ok(yes),
                None => println!("Invalid input. Please enter 'e' or 'h'."),
            }
        }
    }

    /// Pick one of `count` numbered items. Returns the zero-based index, or
    /// `None` when the user enters `0`.
    fn choose(&mut self, prompt: &str, count: usize) -> Result<Option<usize>> {
        loop {
            let answer = self.text(&format!("{} (0 to cancel)", prompt))?;
            match parse_choice(&answer, count) {
                Ok(choice) => return Ok(choice),
                Err(msg) => println!("{}", msg),
            }
        }
    }

    fn pause(&mut self) -> Result<()> {
        self.text("Press Enter to continue").map(|_| ())
    }
}

/// `e`/`y` mean yes, `h`/`n` mean no, in either case.
pub fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "e" | "y" => Some(true),
        "h" | "n" => Some(false),
        _ => None,
    }
}

pub fn parse_choice(answer: &str, count: usize) -> Result<Option<usize>, &'static str> {
    match answer.trim().parse::<usize>() {
        Ok(0) => Ok(None),
        Ok(n) if n <= count => Ok(Some(n - 1)),
        Ok(_) => Err("Invalid selection. Please pick a number from the list."),
        Err(_) => Err("Please enter a valid number."),
    }
}

/// Reads answers from the terminal.
#[derive(Default)]
pub struct TermPrompt;

impl Prompt for TermPrompt {
    fn text(&mut self, prompt: &str) -> Result<String> {
        let answer: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(answer)
    }
}

/// Replays a fixed list of answers and records the prompts it was shown.
/// Running out of answers is an error rather than a hang.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedPrompt {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompt for ScriptedPrompt {
    fn text(&mut self, prompt: &str) -> Result<String> {
        self.asked.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| anyhow!("no answer left for prompt '{}'", prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_no_answers() {
        assert_eq!(parse_yes_no("e"), Some(true));
        assert_eq!(parse_yes_no(" H "), Some(false));
        assert_eq!(parse_yes_no("y"), Some(true));
        assert_eq!(parse_yes_no("evet"), None);
    }

    #[test]
    fn choices() {
        assert_eq!(parse_choice("0", 3), Ok(None));
        assert_eq!(parse_choice("3", 3), Ok(Some(2)));
        assert!(parse_choice("4", 3).is_err());
        assert!(parse_choice("two", 3).is_err());
    }

    #[test]
    fn confirm_and_choose_reprompt() {
        let mut prompt = ScriptedPrompt::new(["maybe", "E", "9", "x", "2"]);
        assert!(prompt.confirm("Continue?").unwrap());
        assert_eq!(prompt.choose("Workflow number", 2).unwrap(), Some(1));
        assert_eq!(prompt.asked().len(), 5);
        assert_eq!(prompt.asked()[0], "Continue? (e/h)");
        assert!(prompt.text("extra").is_err());
    }
}
