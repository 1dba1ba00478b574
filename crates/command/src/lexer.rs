//! Chat-text tokenizer.
//!
//! Token kinds: bare words, double-quoted strings (honoring `\"` and `\\`),
//! short options (`-x`, `-xvf`), long options (`--name`), assignments, and
//! a trailing EOF. Whitespace separates tokens; quoted strings may contain
//! whitespace.
//!
//! An option directly followed by `=value` lexes as option + assign +
//! value. A trailing `=` with nothing attached (`--port=`) lexes as the
//! bare option, which downstream degrades to a boolean flag.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Quoted,
    ShortOption,
    LongOption,
    Assign,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the token start in the source text.
    pub offset: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            offset,
        }
    }
}

/// Tokenize one line of chat text.
#[must_use]
pub fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        if chars[i] == '"' {
            let (content, next) = read_quoted(&chars, i);
            tokens.push(Token::new(TokenKind::Quoted, content, start));
            i = next;
        } else if chars[i] == '-' && i + 1 < chars.len() && !chars[i + 1].is_whitespace() {
            i = read_option(&chars, i, &mut tokens);
        } else {
            let (word, next) = read_run(&chars, i);
            i = next;
            if word == "=" {
                tokens.push(Token::new(TokenKind::Assign, "=", start));
            } else {
                tokens.push(Token::new(TokenKind::Word, word, start));
            }
        }
    }

    tokens.push(Token::new(TokenKind::Eof, "", chars.len()));
    tokens
}

/// Read a `"..."` string starting at `start`; returns the unescaped content
/// and the index past the closing quote. An unterminated quote swallows the
/// rest of the line.
fn read_quoted(chars: &[char], start: usize) -> (String, usize) {
    let mut content = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() && matches!(chars[i + 1], '"' | '\\') => {
                content.push(chars[i + 1]);
                i += 2;
            },
            '"' => return (content, i + 1),
            c => {
                content.push(c);
                i += 1;
            },
        }
    }
    (content, i)
}

/// Read an unquoted run up to the next whitespace.
fn read_run(chars: &[char], start: usize) -> (String, usize) {
    let mut i = start;
    while i < chars.len() && !chars[i].is_whitespace() {
        i += 1;
    }
    (chars[start..i].iter().collect(), i)
}

/// Read a short or long option starting at `start` (which points at `-`).
/// Emits the option token, plus assign + value tokens when `=value` is
/// attached. Returns the index after everything consumed.
fn read_option(chars: &[char], start: usize, tokens: &mut Vec<Token>) -> usize {
    let (kind, name_start) = if chars.get(start + 1) == Some(&'-') {
        (TokenKind::LongOption, start + 2)
    } else {
        (TokenKind::ShortOption, start + 1)
    };

    let mut i = name_start;
    while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '=' {
        i += 1;
    }
    let name: String = chars[name_start..i].iter().collect();

    // A bare "-" or "--" is not an option.
    if name.is_empty() {
        let (word, next) = read_run(chars, start);
        tokens.push(Token::new(TokenKind::Word, word, start));
        return next;
    }

    tokens.push(Token::new(kind, name, start));

    if chars.get(i) == Some(&'=') {
        let assign_at = i;
        i += 1;
        if i < chars.len() && !chars[i].is_whitespace() {
            tokens.push(Token::new(TokenKind::Assign, "=", assign_at));
            if chars[i] == '"' {
                let (content, next) = read_quoted(chars, i);
                tokens.push(Token::new(TokenKind::Quoted, content, i));
                i = next;
            } else {
                let value_start = i;
                let (value, next) = read_run(chars, i);
                tokens.push(Token::new(TokenKind::Word, value, value_start));
                i = next;
            }
        }
        // Trailing '=' with no attached value: option stays a bare flag.
    }

    i
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<(TokenKind, String)> {
        tokenize(text)
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn words_and_whitespace() {
        assert_eq!(
            kinds("backup now"),
            vec![
                (TokenKind::Word, "backup".into()),
                (TokenKind::Word, "now".into()),
                (TokenKind::Eof, String::new()),
            ]
        );
        assert_eq!(kinds("   "), vec![(TokenKind::Eof, String::new())]);
        assert_eq!(kinds(""), vec![(TokenKind::Eof, String::new())]);
    }

    #[test]
    fn quoted_strings_keep_whitespace_and_escapes() {
        assert_eq!(
            kinds(r#""my files" "say \"hi\" \\ back""#),
            vec![
                (TokenKind::Quoted, "my files".into()),
                (TokenKind::Quoted, r#"say "hi" \ back"#.into()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn short_and_long_options() {
        assert_eq!(
            kinds("-v --verbose -xvf"),
            vec![
                (TokenKind::ShortOption, "v".into()),
                (TokenKind::LongOption, "verbose".into()),
                (TokenKind::ShortOption, "xvf".into()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn option_assignments() {
        assert_eq!(
            kinds("-p=8080 --host=localhost"),
            vec![
                (TokenKind::ShortOption, "p".into()),
                (TokenKind::Assign, "=".into()),
                (TokenKind::Word, "8080".into()),
                (TokenKind::LongOption, "host".into()),
                (TokenKind::Assign, "=".into()),
                (TokenKind::Word, "localhost".into()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn quoted_assignment_values() {
        assert_eq!(
            kinds(r#"--env="NODE_ENV=production""#),
            vec![
                (TokenKind::LongOption, "env".into()),
                (TokenKind::Assign, "=".into()),
                (TokenKind::Quoted, "NODE_ENV=production".into()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn trailing_equals_degrades_to_bare_option() {
        assert_eq!(
            kinds("--config="),
            vec![
                (TokenKind::LongOption, "config".into()),
                (TokenKind::Eof, String::new()),
            ]
        );
        assert_eq!(
            kinds("--config= next"),
            vec![
                (TokenKind::LongOption, "config".into()),
                (TokenKind::Word, "next".into()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn lone_equals_is_assign() {
        assert_eq!(
            kinds("="),
            vec![
                (TokenKind::Assign, "=".into()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn bare_dash_is_a_word() {
        assert_eq!(
            kinds("- --"),
            vec![
                (TokenKind::Word, "-".into()),
                (TokenKind::Word, "--".into()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn words_keep_embedded_punctuation() {
        assert_eq!(
            kinds("nginx:latest /bak a=b"),
            vec![
                (TokenKind::Word, "nginx:latest".into()),
                (TokenKind::Word, "/bak".into()),
                (TokenKind::Word, "a=b".into()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn offsets_point_at_token_starts() {
        let tokens = tokenize("-v hello");
        assert_eq!(tokens[0].offset, 0);
        assert_eq!(tokens[1].offset, 3);
        assert_eq!(tokens[2].offset, 8);
    }
}
