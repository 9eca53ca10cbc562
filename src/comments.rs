use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    // Non-greedy triple-quoted block, allowed to span newlines.
    static ref BLOCK_COMMENT_RE: Regex = Regex::new(r#"(?s)"""(.*?)""""#).unwrap();
}

/// Rewrites every triple-quoted block in `text` into `#` line comments.
///
/// Docstrings read like prose but parse like expressions, so downstream
/// consumers can mistake them for executable text. Turning them into line
/// comments removes the ambiguity. Each line inside a block is trimmed and
/// prefixed with `# `; comments already in line form are left alone.
///
/// Idempotent: the output contains no triple-quoted blocks, so a second
/// pass is a no-op.
pub fn neutralize_block_comments(text: &str) -> String {
    BLOCK_COMMENT_RE
        .replace_all(text, |caps: &Captures<'_>| {
            caps[1]
                .trim()
                .split('\n')
                .map(|line| format!("# {}", line.trim()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_comment_becomes_line_comments() {
        let code = "\n\"\"\"\nHotdog\nBanana mango!! # WOW\n\"\"\"\ndef foo():\n    return 1\n# ok now\n";
        let expected = "\n# Hotdog\n# Banana mango!! # WOW\ndef foo():\n    return 1\n# ok now\n";
        assert_eq!(neutralize_block_comments(code), expected);
    }

    #[test]
    fn test_line_comments_untouched() {
        let code = "# already a comment\nx = 1\n";
        assert_eq!(neutralize_block_comments(code), code);
    }

    #[test]
    fn test_idempotent() {
        let code = "\"\"\"doc\nstring\"\"\"\ny = 2\n";
        let once = neutralize_block_comments(code);
        let twice = neutralize_block_comments(&once);
        assert_eq!(once, twice);
    }
}
