//! Line commands read from stdin.

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Jump to a position. `startpos` selects the initial position.
    Fen(String),
    Move { from: String, to: String },
    Depth(u32),
    Back,
    Forward,
    Reset,
    Show,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
commands:
  fen <FEN>|startpos   analyze a position
  move <from><to>      play a move from the current position (e.g. e2e4)
  depth <n>            change the search depth
  back | forward       step through played positions
  reset                return to the starting position
  show                 print the latest analysis
  quit                 exit";

/// Parse a command line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match head.to_ascii_lowercase().as_str() {
        "fen" | "position" => {
            if rest.is_empty() {
                return Err(CommandError::Usage("fen <FEN>|startpos"));
            }
            match rest.as_slice() {
                ["startpos"] => Command::Fen(chess::STARTING_FEN.to_string()),
                _ => Command::Fen(rest.join(" ")),
            }
        }
        "move" | "m" => parse_move(&rest)?,
        "depth" | "d" => match rest.as_slice() {
            [n] => Command::Depth(n.parse().map_err(|_| CommandError::Usage("depth <n>"))?),
            _ => return Err(CommandError::Usage("depth <n>")),
        },
        "back" | "b" => Command::Back,
        "forward" | "f" => Command::Forward,
        "reset" => Command::Reset,
        "show" | "s" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_move(args: &[&str]) -> Result<Command, CommandError> {
    const USAGE: &str = "move <from><to>";
    let (from, to) = match args {
        [uci] if uci.len() == 4 && uci.is_ascii() => (&uci[0..2], &uci[2..4]),
        [from, to] => (*from, *to),
        _ => return Err(CommandError::Usage(USAGE)),
    };
    Ok(Command::Move {
        from: from.to_ascii_lowercase(),
        to: to.to_ascii_lowercase(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fen_keeps_all_fields() {
        let cmd = parse_command("fen 8/8/8/8/8/8/8/K6k w - - 0 1").unwrap();
        assert_eq!(
            cmd,
            Some(Command::Fen("8/8/8/8/8/8/8/K6k w - - 0 1".to_string()))
        );
        assert_eq!(
            parse_command("fen startpos").unwrap(),
            Some(Command::Fen(chess::STARTING_FEN.to_string()))
        );
        assert!(parse_command("fen").is_err());
    }

    #[test]
    fn test_move_forms() {
        let expected = Some(Command::Move {
            from: "e2".to_string(),
            to: "e4".to_string(),
        });
        assert_eq!(parse_command("move e2e4").unwrap(), expected);
        assert_eq!(parse_command("m E2 E4").unwrap(), expected);
        assert_eq!(
            parse_command("move e2"),
            Err(CommandError::Usage("move <from><to>"))
        );
    }

    #[test]
    fn test_depth() {
        assert_eq!(parse_command("depth 22").unwrap(), Some(Command::Depth(22)));
        assert!(parse_command("depth deep").is_err());
    }

    #[test]
    fn test_misc() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(parse_command("QUIT").unwrap(), Some(Command::Quit));
        assert_eq!(parse_command("back").unwrap(), Some(Command::Back));
        assert_eq!(
            parse_command("castle"),
            Err(CommandError::Unknown("castle".to_string()))
        );
    }
}
