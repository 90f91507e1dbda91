use std::borrow::Cow;
use std::path::PathBuf;
use std::process::Command;

/// A fully resolved harness invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchCommand {
    pub program: String,
    pub args: Vec<String>,
    pub output_dir: PathBuf,
}

impl BenchCommand {
    /// The child inherits the current environment, so an exported `HF_TOKEN`
    /// reaches the harness untouched.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }

    /// Shell-quoted rendering, safe to paste into a POSIX shell.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|arg| arg == flag)
    }

    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

fn quote(arg: &str) -> Cow<'_, str> {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        Cow::Borrowed(arg)
    } else {
        Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
    }
}
