use anyhow::{Context, Result};
use inquire::{CustomUserError, Text, validator::Validation};

//Input the login flow asks for, None when the user backs out
pub trait Prompt {
    fn numeric(&mut self, heading: &str) -> Result<Option<String>>;
}

pub struct Terminal;

impl Prompt for Terminal {
    fn numeric(&mut self, heading: &str) -> Result<Option<String>> {
        let input = Text::new(heading)
            .with_validator(digits)
            .with_help_message("Esc to cancel")
            .prompt_skippable()
            .context("Failed to read input")?;

        Ok(input.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()))
    }
}

fn digits(input: &str) -> Result<Validation, CustomUserError> {
    if input.trim().bytes().all(|b| b.is_ascii_digit()) {
        Ok(Validation::Valid)
    } else {
        Ok(Validation::Invalid("Digits only".into()))
    }
}
