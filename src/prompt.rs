use crate::error::{ErrorKind, Result};
use dialoguer::Confirm;
use exn::ResultExt;

/// Yes/no questions asked during a command.
pub trait Prompt {
    fn confirm(&self, question: &str, default: bool) -> Result<bool>;
}

/// Asks on the controlling terminal.
pub struct Terminal;

impl Prompt for Terminal {
    fn confirm(&self, question: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(question)
            .default(default)
            .interact()
            .or_raise(|| ErrorKind::Prompt)
    }
}

/// Gives the same answer to every question.
#[cfg(test)]
pub struct Always(pub bool);

#[cfg(test)]
impl Prompt for Always {
    fn confirm(&self, _question: &str, _default: bool) -> Result<bool> {
        Ok(self.0)
    }
}
