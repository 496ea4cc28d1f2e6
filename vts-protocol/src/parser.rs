//! Command Parser: tokenizes one input line into a verb and its
//! arguments, per `spec.md` §4.5. No semantic validation beyond
//! well-formed quoting — arity and argument-domain checks belong to the
//! dispatcher.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unterminated quote")]
    UnterminatedQuote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub verb: String,
    pub args: Vec<String>,
}

/// Parses one line, already stripped of its `\n`. A trailing `\r` (from a
/// client that sent `\r\n`) is trimmed here.
pub fn parse_line(line: &str) -> Result<ParsedCommand, ParseError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let tokens = tokenize(line)?;
    let mut iter = tokens.into_iter();
    let verb = iter.next().unwrap_or_default().to_ascii_uppercase();
    let args = iter.collect();
    Ok(ParsedCommand { verb, args })
}

fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '"' {
            chars.next();
            let mut token = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                if c == '"' {
                    closed = true;
                    break;
                }
                token.push(c);
            }
            if !closed {
                return Err(ParseError::UnterminatedQuote);
            }
            tokens.push(token);
        } else {
            let mut token = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
            tokens.push(token);
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_is_uppercased() {
        let cmd = parse_line("play").unwrap();
        assert_eq!(cmd.verb, "PLAY");
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn trailing_cr_is_trimmed() {
        let cmd = parse_line("STATUS\r").unwrap();
        assert_eq!(cmd.verb, "STATUS");
    }

    #[test]
    fn quoted_path_with_spaces() {
        let cmd = parse_line(r#"LOAD "a b/c.mp4""#).unwrap();
        assert_eq!(cmd.verb, "LOAD");
        assert_eq!(cmd.args, vec!["a b/c.mp4".to_owned()]);
    }

    #[test]
    fn unquoted_path_without_spaces() {
        let cmd = parse_line("LOAD a.mp4").unwrap();
        assert_eq!(cmd.args, vec!["a.mp4".to_owned()]);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert_eq!(
            parse_line(r#"LOAD "a b/c.mp4"#).unwrap_err(),
            ParseError::UnterminatedQuote
        );
    }

    #[test]
    fn multiple_whitespace_separated_args() {
        let cmd = parse_line("FORMAT  NTSC   RGB24").unwrap();
        assert_eq!(cmd.args, vec!["NTSC".to_owned(), "RGB24".to_owned()]);
    }

    #[test]
    fn empty_line_has_empty_verb() {
        let cmd = parse_line("").unwrap();
        assert_eq!(cmd.verb, "");
        assert!(cmd.args.is_empty());
    }
}
