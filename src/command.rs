//! `:` command grammar.

use crate::context::validate_url;
use crate::error::ErrorKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Runs,
    Pipelines,
    Contexts,
    Context(String),
    Url(String),
    Quit,
}

/// Case-sensitive and whitespace-delimited. The leading `:` is optional.
pub fn parse(input: &str) -> Result<Command, ErrorKind> {
    let trimmed = input.trim();
    let body = trimmed.strip_prefix(':').unwrap_or(trimmed);
    let words: Vec<&str> = body.split_whitespace().collect();

    match words.as_slice() {
        ["runs"] => Ok(Command::Runs),
        ["pipelines"] => Ok(Command::Pipelines),
        ["contexts"] => Ok(Command::Contexts),
        ["context", name] => Ok(Command::Context((*name).to_string())),
        ["url", url] => {
            validate_url(url)?;
            Ok(Command::Url((*url).to_string()))
        }
        ["q"] => Ok(Command::Quit),
        _ => Err(ErrorKind::UnknownCommand(body.to_string())),
    }
}
