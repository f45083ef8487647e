//! User interaction for the console command.
//!
//! [`LineConsole`] works over any reader/writer pair, which covers piped input
//! and tests. With the `cli` feature, [`TerminalConsole`] drives an
//! interactive terminal through `inquire`.

use std::io::{BufRead, Write};

use crate::ApiClientError;

pub trait Console {
    fn print(&mut self, message: &str) -> Result<(), ApiClientError>;

    fn print_error(&mut self, message: &str) -> Result<(), ApiClientError>;

    /// Asks for one line of free text, returned without the line ending.
    fn prompt(&mut self, message: &str) -> Result<String, ApiClientError>;

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, ApiClientError>;

    /// Asks the user to pick one of `options`, given as `(key, label)` pairs,
    /// and returns the chosen key.
    fn select(
        &mut self,
        message: &str,
        options: &[(String, String)],
    ) -> Result<String, ApiClientError>;

    /// Offers to open `url` in a browser. Consoles without one do nothing.
    fn open_url(&mut self, _url: &str) -> Result<(), ApiClientError> {
        Ok(())
    }
}

/// Line-oriented console: prompts go to `out`, errors to `err`, answers are
/// read from `input` one line at a time.
#[derive(Debug)]
pub struct LineConsole<R, O, E> {
    input: R,
    out: O,
    err: E,
}

impl<R: BufRead, O: Write, E: Write> LineConsole<R, O, E> {
    pub fn new(input: R, out: O, err: E) -> Self {
        Self { input, out, err }
    }

    pub fn out(&self) -> &O {
        &self.out
    }

    pub fn err(&self) -> &E {
        &self.err
    }

    fn read_line(&mut self) -> Result<String, ApiClientError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(ApiClientError::Prompt("input closed".to_string()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn ask(&mut self, message: &str) -> Result<String, ApiClientError> {
        write!(self.out, "{message} ")?;
        self.out.flush()?;
        self.read_line()
    }
}

impl<R: BufRead, O: Write, E: Write> Console for LineConsole<R, O, E> {
    fn print(&mut self, message: &str) -> Result<(), ApiClientError> {
        writeln!(self.out, "{message}")?;
        Ok(())
    }

    fn print_error(&mut self, message: &str) -> Result<(), ApiClientError> {
        writeln!(self.err, "{message}")?;
        Ok(())
    }

    fn prompt(&mut self, message: &str) -> Result<String, ApiClientError> {
        self.ask(message)
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, ApiClientError> {
        let hint = if default { "(yes|no) [yes]:" } else { "(yes|no) [no]:" };
        loop {
            let answer = self.ask(&format!("{message} {hint}"))?;
            match answer.trim().to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => continue,
            }
        }
    }

    fn select(
        &mut self,
        message: &str,
        options: &[(String, String)],
    ) -> Result<String, ApiClientError> {
        if options.is_empty() {
            return Err(ApiClientError::Prompt("nothing to choose from".to_string()));
        }
        let keys: Vec<&str> = options.iter().map(|(key, _)| key.as_str()).collect();
        let question = format!("{message} [{},?]:", keys.join(","));
        loop {
            let answer = self.ask(&question)?;
            let answer = answer.trim();
            if answer == "?" {
                for (key, label) in options {
                    writeln!(self.out, " {key} - {label}")?;
                }
                writeln!(self.out, " ? - Show help")?;
                continue;
            }
            if let Some((key, _)) = options.iter().find(|(key, _)| key == answer) {
                return Ok(key.clone());
            }
        }
    }
}

#[cfg(feature = "cli")]
pub use terminal::TerminalConsole;

#[cfg(feature = "cli")]
mod terminal {
    use inquire::{Confirm, InquireError, Select, Text};

    use super::Console;
    use crate::ApiClientError;

    /// Interactive console backed by `inquire`.
    #[derive(Debug, Default)]
    pub struct TerminalConsole {
        open_browser: bool,
    }

    impl TerminalConsole {
        pub fn new(open_browser: bool) -> Self {
            Self { open_browser }
        }
    }

    fn prompt_error(err: InquireError) -> ApiClientError {
        ApiClientError::Prompt(err.to_string())
    }

    impl Console for TerminalConsole {
        fn print(&mut self, message: &str) -> Result<(), ApiClientError> {
            println!("{message}");
            Ok(())
        }

        fn print_error(&mut self, message: &str) -> Result<(), ApiClientError> {
            eprintln!("{message}");
            Ok(())
        }

        fn prompt(&mut self, message: &str) -> Result<String, ApiClientError> {
            Text::new(message).prompt().map_err(prompt_error)
        }

        fn confirm(&mut self, message: &str, default: bool) -> Result<bool, ApiClientError> {
            Confirm::new(message)
                .with_default(default)
                .prompt()
                .map_err(prompt_error)
        }

        fn select(
            &mut self,
            message: &str,
            options: &[(String, String)],
        ) -> Result<String, ApiClientError> {
            let labels: Vec<String> = options
                .iter()
                .map(|(key, label)| format!("{key} - {label}"))
                .collect();
            let choice = Select::new(message, labels)
                .with_page_size(15)
                .raw_prompt()
                .map_err(prompt_error)?;
            Ok(options[choice.index].0.clone())
        }

        fn open_url(&mut self, url: &str) -> Result<(), ApiClientError> {
            if self.open_browser {
                if let Err(err) = webbrowser::open(url) {
                    eprintln!("Failed to open browser automatically: {err}");
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{Console, LineConsole};
    use crate::ApiClientError;

    fn console(input: &str) -> LineConsole<Cursor<Vec<u8>>, Vec<u8>, Vec<u8>> {
        LineConsole::new(Cursor::new(input.as_bytes().to_vec()), Vec::new(), Vec::new())
    }

    fn options() -> Vec<(String, String)> {
        vec![
            ("drive".to_string(), "Google Drive API".to_string()),
            ("gmail".to_string(), "Gmail API".to_string()),
        ]
    }

    #[test]
    fn select_repeats_until_a_known_key() {
        let mut console = console("calendar\n?\ngmail\n");
        let picked = console.select("Pick an API to connect to", &options()).unwrap();
        assert_eq!(picked, "gmail");

        let out = String::from_utf8(console.out().clone()).unwrap();
        assert_eq!(out.matches("Pick an API to connect to [drive,gmail,?]:").count(), 3);
        assert!(out.contains(" gmail - Gmail API"));
    }

    #[test]
    fn confirm_uses_default_on_empty_answer() {
        let mut console = console("\nmaybe\nn\n");
        assert!(console.confirm("Install preferred version?", true).unwrap());
        assert!(!console.confirm("Install preferred version?", true).unwrap());
    }

    #[test]
    fn closed_input_is_an_error() {
        let mut console = console("");
        let result = console.prompt("Enter the verification code:");
        assert!(matches!(result, Err(ApiClientError::Prompt(_))));
    }
}
