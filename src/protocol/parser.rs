//! Text command parser.
//!
//! One command per line, whitespace separated:
//!
//! ```text
//! join <id> <name...>
//! start <id> <code> [<height> <width> <armies> <per_turn> [cards]]
//! restart <id> <code> [<height> <width> <armies> <per_turn> [cards]]
//! deploy <id> <row> <col>
//! attack <id> <row> <col> <row> <col>
//! cease <id>
//! eject <id>
//! disconnect <id>
//! status <id>
//! quit
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use thiserror::Error;

use crate::board::{Location, PlayerId};
use crate::game::GameStartOptions;
use crate::session::Command;

/// Errors from parsing one line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("{command}: missing {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("{command}: '{value}' is not a valid integer")]
    InvalidNumber { command: &'static str, value: String },

    #[error("{command}: unexpected argument '{value}'")]
    UnexpectedArgument { command: &'static str, value: String },
}

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Command(Command),
    /// Stop reading input.
    Quit,
}

/// Parses a single line.
///
/// Returns `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<Line>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut tokens = Tokens::new(trimmed);
    let Some(keyword) = tokens.next_raw() else {
        return Ok(None);
    };

    let command = match keyword {
        "quit" => {
            tokens.finish("quit")?;
            return Ok(Some(Line::Quit));
        }
        "join" => {
            let player = tokens.player("join")?;
            let name = tokens.rest();
            if name.is_empty() {
                return Err(ParseError::MissingArgument {
                    command: "join",
                    argument: "name",
                });
            }
            Command::Join { player, name }
        }
        "start" => {
            let (requester, secret_code, options) = parse_start(&mut tokens, "start")?;
            Command::Start {
                requester,
                secret_code,
                options,
            }
        }
        "restart" => {
            let (requester, secret_code, options) = parse_start(&mut tokens, "restart")?;
            Command::Restart {
                requester,
                secret_code,
                options,
            }
        }
        "deploy" => {
            let player = tokens.player("deploy")?;
            let location = tokens.location("deploy")?;
            tokens.finish("deploy")?;
            Command::Deploy { player, location }
        }
        "attack" => {
            let player = tokens.player("attack")?;
            let from = tokens.location("attack")?;
            let to = tokens.location("attack")?;
            tokens.finish("attack")?;
            Command::Attack { player, from, to }
        }
        "cease" => {
            let player = tokens.player("cease")?;
            tokens.finish("cease")?;
            Command::CeaseAttacking { player }
        }
        "eject" => {
            let player = tokens.player("eject")?;
            tokens.finish("eject")?;
            Command::PlayerEjected { player }
        }
        "disconnect" => {
            let player = tokens.player("disconnect")?;
            tokens.finish("disconnect")?;
            Command::PlayerDisconnected { player }
        }
        "status" => {
            let requester = tokens.player("status")?;
            tokens.finish("status")?;
            Command::Status { requester }
        }
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(Some(Line::Command(command)))
}

/// Parses the shared tail of `start` and `restart`.
fn parse_start(
    tokens: &mut Tokens<'_>,
    command: &'static str,
) -> Result<(PlayerId, String, Option<GameStartOptions>), ParseError> {
    let requester = tokens.player(command)?;
    let secret_code = tokens.word(command, "secret code")?.to_string();
    if tokens.is_empty() {
        return Ok((requester, secret_code, None));
    }

    let height = tokens.number(command, "height")?;
    let width = tokens.number(command, "width")?;
    let armies = tokens.number(command, "starting armies")?;
    let per_turn = tokens.number(command, "armies per turn")?;
    let mut options = GameStartOptions::new(height, width, armies, per_turn);
    match tokens.next_raw() {
        None => {}
        Some("cards") => options = options.with_territory_cards(true),
        Some(other) => {
            return Err(ParseError::UnexpectedArgument {
                command,
                value: other.to_string(),
            })
        }
    }
    tokens.finish(command)?;
    Ok((requester, secret_code, Some(options)))
}

struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Tokens<'a> {
    fn new(line: &'a str) -> Self {
        Tokens { rest: line.trim() }
    }

    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    fn next_raw(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let (token, rest) = match self.rest.find(char::is_whitespace) {
            Some(i) => self.rest.split_at(i),
            None => (self.rest, ""),
        };
        self.rest = rest.trim_start();
        Some(token)
    }

    /// Everything left on the line, inner whitespace preserved.
    fn rest(&mut self) -> String {
        let rest = self.rest.trim_end().to_string();
        self.rest = "";
        rest
    }

    fn word(&mut self, command: &'static str, argument: &'static str) -> Result<&'a str, ParseError> {
        self.next_raw()
            .ok_or(ParseError::MissingArgument { command, argument })
    }

    fn player(&mut self, command: &'static str) -> Result<PlayerId, ParseError> {
        self.word(command, "player id").map(PlayerId::from)
    }

    fn number<T: std::str::FromStr>(
        &mut self,
        command: &'static str,
        argument: &'static str,
    ) -> Result<T, ParseError> {
        let value = self.word(command, argument)?;
        value.parse().map_err(|_| ParseError::InvalidNumber {
            command,
            value: value.to_string(),
        })
    }

    fn location(&mut self, command: &'static str) -> Result<Location, ParseError> {
        let row = self.number(command, "row")?;
        let column = self.number(command, "column")?;
        Ok(Location::new(row, column))
    }

    fn finish(&mut self, command: &'static str) -> Result<(), ParseError> {
        match self.next_raw() {
            None => Ok(()),
            Some(extra) => Err(ParseError::UnexpectedArgument {
                command,
                value: extra.to_string(),
            }),
        }
    }
}
