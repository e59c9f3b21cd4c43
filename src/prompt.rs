//! Interactive questions asked before a batch starts.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut answer = String::new();
    let read = input
        .read_line(&mut answer)
        .context("reading answer from stdin")?;
    if read == 0 {
        bail!("stdin closed while waiting for: {}", question.trim());
    }
    Ok(answer)
}

/// Ask for a folder. Whitespace and surrounding double quotes are removed, so a
/// path pasted from a file manager works as-is.
pub fn folder<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> Result<PathBuf> {
    let answer = ask(input, output, &format!("Enter {label} folder path: "))?;
    let cleaned = answer.trim().trim_matches('"');
    if cleaned.is_empty() {
        bail!("no {label} folder given");
    }
    Ok(PathBuf::from(cleaned))
}

/// `y/N` question. Anything other than `y` counts as no.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<bool> {
    let answer = ask(input, output, &format!("\n{question} (y/N): "))?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Remind the user that the terminal needs accessibility access, then wait for Enter.
pub fn accessibility_gate<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<()> {
    writeln!(output, "\n⚠️  Make sure Terminal has accessibility permissions:")?;
    writeln!(
        output,
        "   System Settings > Privacy & Security > Accessibility"
    )?;
    ask(input, output, "   Press Enter when ready...")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_folder_strips_quotes() {
        let mut input = Cursor::new("  \"/Users/me/My Photos\" \n");
        let mut output = Vec::new();
        let path = folder(&mut input, &mut output, "input").unwrap();
        assert_eq!(path, PathBuf::from("/Users/me/My Photos"));
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Enter input folder path: "
        );
    }

    #[test]
    fn test_folder_rejects_empty() {
        let mut input = Cursor::new("\n");
        assert!(folder(&mut input, &mut Vec::new(), "output").is_err());
    }

    #[test]
    fn test_confirm_answers() {
        for (answer, expected) in [("y\n", true), ("Y\n", true), ("yes\n", false), ("\n", false), ("n\n", false)] {
            let mut input = Cursor::new(answer);
            assert_eq!(
                confirm(&mut input, &mut Vec::new(), "Proceed?").unwrap(),
                expected,
                "{answer:?}"
            );
        }
    }

    #[test]
    fn test_closed_stdin_is_an_error() {
        let mut input = Cursor::new("");
        assert!(confirm(&mut input, &mut Vec::new(), "Proceed?").is_err());
        assert!(accessibility_gate(&mut Cursor::new(""), &mut Vec::new()).is_err());
    }
}
