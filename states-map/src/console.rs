//! Dialogue en mode texte

use std::fmt::Display;
use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

/// Mot-clé affichant tous les favoris
pub const SHOW_ALL: &str = "showall";

/// `q` ou `Q` arrête le programme
pub fn is_quit(line: &str) -> bool {
    matches!(line.trim(), "q" | "Q")
}

pub fn is_show_all(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(SHOW_ALL)
}

/// Questions et messages sur une entrée et une sortie texte
pub struct Console<I, O> {
    input: I,
    output: O,
}

/// Console du terminal
pub type StdConsole = Console<BufReader<Stdin>, io::Stdout>;

/// Console branchée sur stdin/stdout
pub fn stdio() -> StdConsole {
    Console::new(BufReader::new(tokio::io::stdin()), io::stdout())
}

impl<I, O> Console<I, O>
where
    I: AsyncBufRead + Unpin,
    O: Write,
{
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }

    /// Affiche une ligne
    pub fn say(&mut self, message: impl Display) -> io::Result<()> {
        writeln!(self.output, "{}", message)?;
        self.output.flush()
    }

    /// Affiche une question et lit la réponse
    ///
    /// `None` si l'utilisateur demande l'arrêt (`q`) ou si l'entrée est fermée.
    pub async fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.say(prompt)?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Ok(None);
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if is_quit(line) {
            return Ok(None);
        }
        Ok(Some(line.to_string()))
    }

    pub fn output(&self) -> &O {
        &self.output
    }
}
