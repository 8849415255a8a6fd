//! Inbound message grammar: `(:<prefix> )?<command> <params>`.

/// One parsed protocol line.
///
/// Params are space-delimited tokens, except that a token introduced by
/// `:` consumes the remainder of the line verbatim as the final param.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Optional source prefix (without the leading `:`). Clients rarely
    /// send one; it is parsed and ignored by the chat engine.
    pub prefix: Option<String>,
    /// The command verb, as received. Matching is case-insensitive.
    pub command: String,
    /// Positional parameters, trailing parameter last.
    pub params: Vec<String>,
}

impl Message {
    /// Parses one line. Returns `None` for lines with no command.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_start_matches(' ');

        let prefix = if let Some(tail) = rest.strip_prefix(':') {
            let (prefix, tail) = tail.split_once(' ')?;
            rest = tail.trim_start_matches(' ');
            Some(prefix.to_string())
        } else {
            None
        };

        let (command, mut rest) = match rest.split_once(' ') {
            Some((cmd, tail)) => (cmd, tail),
            None => (rest, ""),
        };
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((token, tail)) => {
                    params.push(token.to_string());
                    rest = tail;
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Some(Self {
            prefix,
            command: command.to_string(),
            params,
        })
    }

    /// Case-insensitive command comparison.
    pub fn is(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_command_and_params() {
        let m = Message::parse("JOIN #Lob_21_0 zotclot9").unwrap();
        assert_eq!(m.prefix, None);
        assert_eq!(m.command, "JOIN");
        assert_eq!(m.params, vec!["#Lob_21_0", "zotclot9"]);
    }

    #[test]
    fn test_trailing_param_runs_to_end_of_line() {
        let m = Message::parse("PRIVMSG #chat :hello there world").unwrap();
        assert_eq!(m.params, vec!["#chat", "hello there world"]);
    }

    #[test]
    fn test_trailing_param_may_be_empty() {
        let m = Message::parse("TOPIC #g :").unwrap();
        assert_eq!(m.params, vec!["#g", ""]);
    }

    #[test]
    fn test_bare_command_has_no_params() {
        let m = Message::parse("QUIT").unwrap();
        assert_eq!(m.command, "QUIT");
        assert!(m.params.is_empty());
    }

    #[test]
    fn test_prefix_is_captured() {
        let m = Message::parse(":someone PONG x").unwrap();
        assert_eq!(m.prefix.as_deref(), Some("someone"));
        assert_eq!(m.command, "PONG");
        assert_eq!(m.params, vec!["x"]);
    }

    #[test]
    fn test_command_matching_is_case_insensitive() {
        let m = Message::parse("join #x").unwrap();
        assert!(m.is("JOIN"));
    }

    #[test]
    fn test_extra_spaces_between_tokens_are_tolerated() {
        let m = Message::parse("LIST  0   21").unwrap();
        assert_eq!(m.params, vec!["0", "21"]);
    }

    #[test]
    fn test_blank_line_is_rejected() {
        assert!(Message::parse("").is_none());
        assert!(Message::parse("   ").is_none());
    }
}
