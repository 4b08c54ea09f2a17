use anyhow::{Result, bail};

use crate::config::SessionTarget;

/// One line typed at the terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// `/list`
    List,
    /// `/focus <query>`
    Focus(String),
    /// `/rename <name>`
    Rename(String),
    /// `/close`
    Close,
    /// `/connect host:port [name]`
    Connect(SessionTarget),
    /// `/quit`
    Quit,
    /// Anything else goes to the focused session. `//` escapes a leading slash.
    Send(String),
}

impl Input {
    pub fn parse(line: &str) -> Result<Self> {
        let trimmed = line.trim();
        if let Some(escaped) = trimmed.strip_prefix("//") {
            return Ok(Self::Send(format!("/{escaped}")));
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Ok(Self::Send(line.to_string()));
        };

        let (command, arg) = match rest.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (rest, ""),
        };

        match command {
            "list" => Ok(Self::List),
            "quit" | "exit" => Ok(Self::Quit),
            "close" => Ok(Self::Close),
            "focus" => Ok(Self::Focus(required(command, arg)?.to_string())),
            "rename" => Ok(Self::Rename(required(command, arg)?.to_string())),
            "connect" => {
                let mut parts = required(command, arg)?.split_whitespace();
                let addr = parts.next().unwrap_or_default();
                let mut target = SessionTarget::parse(addr)?;
                if let Some(name) = parts.next() {
                    target.name = Some(name.to_string());
                }
                Ok(Self::Connect(target))
            }
            other => bail!("Unknown command '/{other}'"),
        }
    }
}

fn required<'a>(command: &str, arg: &'a str) -> Result<&'a str> {
    if arg.is_empty() {
        bail!("/{command} needs an argument");
    }
    Ok(arg)
}
