//! Line-oriented user surface.

use std::io::{BufRead, Write};
use std::sync::mpsc as std_mpsc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TurnloopError;
use crate::types::Turn;

/// Banner printed above the diagnostic log dump.
pub const LOG_BANNER: &str = "-------- LOGS --------";

/// Where the loop reads user lines and shows replies.
#[async_trait]
pub trait Console: Send {
    /// Next line of input, or `None` at end of input.
    async fn read_line(&mut self) -> Result<Option<String>, TurnloopError>;

    /// Show the model's final reply for a user message.
    fn show_reply(&mut self, text: &str);

    /// Show an out-of-band notice from the loop itself.
    fn show_notice(&mut self, text: &str);

    /// Show the full conversation log on exit.
    fn dump_log(&mut self, turns: &[Turn]);
}

/// Render the log dump: banner, then one JSON object per turn.
pub fn render_log(turns: &[Turn]) -> String {
    let mut out = format!("\n\n{LOG_BANNER}\n");
    for turn in turns {
        match serde_json::to_string(turn) {
            Ok(line) => {
                out.push_str(&line);
                out.push('\n');
            }
            Err(err) => tracing::warn!(error = %err, "Failed to serialize turn"),
        }
    }
    out
}

/// Console over the process's stdin and stdout.
///
/// Lines are read on a dedicated thread, one per request, so a read left
/// pending at Ctrl-C never holds up runtime shutdown.
pub struct StdConsole {
    requests: std_mpsc::Sender<()>,
    lines: mpsc::UnboundedReceiver<std::io::Result<Option<String>>>,
}

impl StdConsole {
    pub fn new() -> Self {
        Self::with_reader(std::io::BufReader::new(std::io::stdin()))
    }

    /// Read lines from `reader` instead of stdin.
    pub fn with_reader<R: BufRead + Send + 'static>(mut reader: R) -> Self {
        let (requests, request_rx) = std_mpsc::channel::<()>();
        let (line_tx, lines) = mpsc::unbounded_channel();

        let spawned = std::thread::Builder::new()
            .name("turnloop-stdin".into())
            .spawn(move || {
                for () in request_rx {
                    if line_tx.send(read_one_line(&mut reader)).is_err() {
                        break;
                    }
                }
            });
        if let Err(err) = spawned {
            tracing::warn!(error = %err, "Failed to start input reader thread");
        }

        Self { requests, lines }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

fn read_one_line(reader: &mut impl BufRead) -> std::io::Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(Some(line))
}

fn reader_gone() -> TurnloopError {
    TurnloopError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "input reader thread is gone",
    ))
}

#[async_trait]
impl Console for StdConsole {
    async fn read_line(&mut self) -> Result<Option<String>, TurnloopError> {
        print!("> ");
        std::io::stdout().flush()?;
        self.requests.send(()).map_err(|_| reader_gone())?;
        match self.lines.recv().await {
            Some(line) => Ok(line?),
            None => Err(reader_gone()),
        }
    }

    fn show_reply(&mut self, text: &str) {
        println!("{text}");
    }

    fn show_notice(&mut self, text: &str) {
        println!("[{text}]");
    }

    fn dump_log(&mut self, turns: &[Turn]) {
        print!("{}", render_log(turns));
        let _ = std::io::stdout().flush();
    }
}
