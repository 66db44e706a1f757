//! Line tokenizer shared by all configuration parsers
//!
//! Splits a line into whitespace-separated tokens with double-quote quoting, so
//! zone aliases and display strings may contain spaces.

/// Split a configuration line into tokens.
///
/// Tokens are separated by runs of whitespace. A token beginning with `"` runs
/// until the closing quote (the quotes are stripped); an unterminated quote
/// consumes the rest of the line.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let mut token = String::new();
        if c == '"' {
            chars.next();
            for q in chars.by_ref() {
                if q == '"' {
                    break;
                }
                token.push(q);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        tokens.push(token);
    }

    tokens
}

/// True for lines every parser skips: blank lines and `/`-prefixed comments.
pub fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(
            tokenize("Zone Channel|1-8 Strip"),
            vec!["Zone", "Channel|1-8", "Strip"]
        );
    }

    #[test]
    fn quoted_tokens_keep_spaces() {
        assert_eq!(
            tokenize(r#"Zone VocalComp "Vocal Compressor""#),
            vec!["Zone", "VocalComp", "Vocal Compressor"]
        );
    }

    #[test]
    fn unterminated_quote_runs_to_end_of_line() {
        assert_eq!(tokenize(r#"Label "half open"#), vec!["Label", "half open"]);
    }

    #[test]
    fn tabs_and_runs_of_spaces() {
        assert_eq!(tokenize("\tFader1\t  TrackVolume "), vec!["Fader1", "TrackVolume"]);
    }

    #[test]
    fn empty_and_comment_lines_are_skippable() {
        assert!(is_skippable(""));
        assert!(is_skippable("   "));
        assert!(is_skippable("/ comment"));
        assert!(is_skippable("// comment"));
        assert!(!is_skippable("Zone Home"));
    }
}
