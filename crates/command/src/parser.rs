//! Token partitioner: splits a token stream into boolean options, named
//! parameters, and ordered positional elements.

use std::collections::BTreeMap;

use crate::lexer::{Token, TokenKind};

/// One positional element, with its ordinal among elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub content: String,
    pub position: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCommand {
    /// Boolean flags: each letter of a short run, or a long name.
    pub options: BTreeMap<String, bool>,
    /// `name=value` pairs from `-k=v` / `--key=v`.
    pub named: BTreeMap<String, String>,
    /// Words and quoted strings, in source order.
    pub elements: Vec<Element>,
}

/// Partition a lexed token stream.
///
/// A short option run (`-xvf`) without an assignment expands into one flag
/// per letter. With an assignment the whole run is the parameter name.
/// Stray assign tokens are skipped.
#[must_use]
pub fn parse(tokens: &[Token]) -> ParsedCommand {
    let mut out = ParsedCommand::default();
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        match token.kind {
            TokenKind::ShortOption | TokenKind::LongOption => {
                let assigned_value = match (tokens.get(i + 1), tokens.get(i + 2)) {
                    (Some(assign), Some(value))
                        if assign.kind == TokenKind::Assign
                            && matches!(value.kind, TokenKind::Word | TokenKind::Quoted) =>
                    {
                        Some(value.text.clone())
                    },
                    _ => None,
                };

                match assigned_value {
                    Some(value) => {
                        out.named.insert(token.text.clone(), value);
                        i += 3;
                    },
                    None => {
                        if token.kind == TokenKind::ShortOption {
                            for letter in token.text.chars() {
                                out.options.insert(letter.to_string(), true);
                            }
                        } else {
                            out.options.insert(token.text.clone(), true);
                        }
                        i += 1;
                    },
                }
            },
            TokenKind::Word | TokenKind::Quoted => {
                let position = out.elements.len();
                out.elements.push(Element {
                    content: token.text.clone(),
                    position,
                });
                i += 1;
            },
            TokenKind::Assign => i += 1,
            TokenKind::Eof => break,
        }
    }

    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::lexer::tokenize};

    fn run(text: &str) -> ParsedCommand {
        parse(&tokenize(text))
    }

    fn contents(parsed: &ParsedCommand) -> Vec<&str> {
        parsed.elements.iter().map(|e| e.content.as_str()).collect()
    }

    #[test]
    fn short_option_runs_expand_to_flags() {
        let p = run("-xvf");
        assert_eq!(p.options.len(), 3);
        assert!(p.options["x"] && p.options["v"] && p.options["f"]);
        assert!(p.named.is_empty());
        assert!(p.elements.is_empty());
    }

    #[test]
    fn mixed_options() {
        let p = run("-v --debug -xf --help");
        let expected: Vec<&str> = vec!["debug", "f", "help", "v", "x"];
        assert_eq!(p.options.keys().map(String::as_str).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn assignments_become_named_parameters() {
        let p = run("-p=8080 --host=localhost");
        assert!(p.options.is_empty());
        assert_eq!(p.named["p"], "8080");
        assert_eq!(p.named["host"], "localhost");
    }

    #[test]
    fn quoted_assignment_values_keep_content() {
        let p = run(r#"--message="hello world" -c="gzip""#);
        assert_eq!(p.named["message"], "hello world");
        assert_eq!(p.named["c"], "gzip");
    }

    #[test]
    fn elements_keep_positions() {
        let p = run(r#"backup "my files" document.txt"#);
        assert_eq!(contents(&p), vec!["backup", "my files", "document.txt"]);
        for (i, element) in p.elements.iter().enumerate() {
            assert_eq!(element.position, i);
        }
    }

    #[test]
    fn elements_skip_interleaved_options() {
        let p = run("cmd1 --opt1 arg2 -p=val arg3 --flag arg4");
        assert_eq!(contents(&p), vec!["cmd1", "arg2", "arg3", "arg4"]);
        assert!(p.options["opt1"] && p.options["flag"]);
        assert_eq!(p.named["p"], "val");
    }

    #[test]
    fn full_mixed_command() {
        let p = run(r#"backup "my files" --dest=/backup -xvf --compress=gzip document.txt --verbose"#);
        assert_eq!(
            p.options.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["f", "v", "verbose", "x"]
        );
        assert_eq!(p.named["dest"], "/backup");
        assert_eq!(p.named["compress"], "gzip");
        assert_eq!(contents(&p), vec!["backup", "my files", "document.txt"]);
    }

    #[test]
    fn trailing_equals_is_a_boolean_flag() {
        let p = run("--config=");
        assert_eq!(p.options["config"], true);
        assert!(p.named.is_empty());
    }

    #[test]
    fn lone_assign_is_skipped() {
        let p = run("=");
        assert!(p.options.is_empty() && p.named.is_empty() && p.elements.is_empty());
    }

    #[test]
    fn docker_style_command() {
        let p = run(r#"docker run --name=myapp -p=8080:80 -d "nginx:latest" --env="NODE_ENV=prod""#);
        assert_eq!(p.options.keys().map(String::as_str).collect::<Vec<_>>(), vec!["d"]);
        assert_eq!(p.named["name"], "myapp");
        assert_eq!(p.named["p"], "8080:80");
        assert_eq!(p.named["env"], "NODE_ENV=prod");
        assert_eq!(contents(&p), vec!["docker", "run", "nginx:latest"]);
    }
}
