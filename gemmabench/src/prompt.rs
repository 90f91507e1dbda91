use anyhow::{bail, Context, Result};
use std::fmt::Display;
use std::io::{self, BufRead, Stdout, StdinLock, Write};

/// Line-oriented terminal dialogue over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: impl Display) -> Result<()> {
        writeln!(self.output, "{}", line).context("Failed to write to terminal")
    }

    /// Returns the trimmed answer. End of input is an error so that a closed
    /// stdin cannot spin a validation loop forever.
    pub fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}", question).context("Failed to write to terminal")?;
        self.output.flush().context("Failed to flush terminal")?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read from terminal")?;
        if read == 0 {
            bail!("Input closed while waiting for: {}", question.trim());
        }
        Ok(line.trim().to_string())
    }

    /// `y`/`Y` means yes, anything else (including empty) means no.
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        Ok(self.ask(question)?.eq_ignore_ascii_case("y"))
    }

    /// Re-prompts until `parse` accepts the answer; its error text is shown
    /// to the user between attempts.
    pub fn ask_until<T, F>(&mut self, question: &str, mut parse: F) -> Result<T>
    where
        F: FnMut(&str) -> Result<T, String>,
    {
        loop {
            let answer = self.ask(question)?;
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(message) => self.say(message)?,
            }
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_ask_until_reprompts_with_message() -> Result<()> {
        let mut p = prompter("abc\n-1\n  7 \n");
        let value = p.ask_until("n? ", |answer| {
            answer
                .parse::<u32>()
                .map_err(|_| format!("'{}' is not a number", answer))
        })?;

        assert_eq!(value, 7);
        let output = String::from_utf8(p.into_output())?;
        assert_eq!(output.matches("n? ").count(), 3);
        assert!(output.contains("'abc' is not a number"));
        assert!(output.contains("'-1' is not a number"));
        Ok(())
    }

    #[test]
    fn test_confirm() -> Result<()> {
        let mut p = prompter("Y\n\nno\n");
        assert!(p.confirm("? ")?);
        assert!(!p.confirm("? ")?);
        assert!(!p.confirm("? ")?);
        Ok(())
    }

    #[test]
    fn test_closed_input_is_an_error() {
        let mut p = prompter("bad\n");
        let result: Result<u32> = p.ask_until("n? ", |_| Err("again".to_string()));
        assert!(result.is_err());
    }
}
