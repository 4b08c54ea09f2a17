use std::io::{Stdout, Write};
use std::sync::{Mutex, PoisonError};

use game_feed::{Element, RenderSurface};
use tracing::debug;

/// Render surface for a line terminal.
///
/// Prompts are written without a trailing newline so typed input follows
/// them; a replaced prompt is redrawn in place with a carriage return.
pub struct TextSurface<W> {
    out: Mutex<Output<W>>,
}

pub type StdoutSurface = TextSurface<Stdout>;

struct Output<W> {
    writer: W,
    /// The cursor sits after a prompt.
    at_prompt: bool,
    /// Session whose output was written last.
    last_session: Option<String>,
}

impl StdoutSurface {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TextSurface<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: Mutex::new(Output {
                writer,
                at_prompt: false,
                last_session: None,
            }),
        }
    }

    fn with_output<F>(&self, session: &str, f: F)
    where
        F: FnOnce(&mut Output<W>) -> std::io::Result<()>,
    {
        let mut guard = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = write_session(&mut guard, session, f) {
            debug!("stdout write failed: {}", e);
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .writer
    }
}

fn write_session<W, F>(out: &mut Output<W>, session: &str, f: F) -> std::io::Result<()>
where
    W: Write,
    F: FnOnce(&mut Output<W>) -> std::io::Result<()>,
{
    out.banner(session)?;
    f(out)?;
    out.writer.flush()
}

impl<W: Write> Output<W> {
    fn banner(&mut self, session: &str) -> std::io::Result<()> {
        if self.last_session.as_deref() == Some(session) {
            return Ok(());
        }
        self.end_prompt_line()?;
        writeln!(self.writer, "--- {session} ---")?;
        self.last_session = Some(session.to_string());
        Ok(())
    }

    fn end_prompt_line(&mut self) -> std::io::Result<()> {
        if self.at_prompt {
            writeln!(self.writer)?;
            self.at_prompt = false;
        }
        Ok(())
    }

    fn line(&mut self, text: &str) -> std::io::Result<()> {
        self.end_prompt_line()?;
        if text.ends_with('\n') {
            write!(self.writer, "{text}")
        } else {
            writeln!(self.writer, "{text}")
        }
    }

    fn prompt(&mut self, text: &str) -> std::io::Result<()> {
        self.end_prompt_line()?;
        write!(self.writer, "{text}")?;
        self.at_prompt = true;
        Ok(())
    }
}

impl<W: Write + Send> RenderSurface for TextSurface<W> {
    fn append(&self, session: &str, element: &Element) {
        let text = element.text();
        self.with_output(session, |out| {
            if element.is_prompt() {
                out.prompt(&text)
            } else {
                out.line(&text)
            }
        });
    }

    fn replace_tail(&self, session: &str, element: &Element) {
        let text = element.text();
        self.with_output(session, |out| {
            if element.is_prompt() && out.at_prompt {
                write!(out.writer, "\r{text}")
            } else if element.is_prompt() {
                out.prompt(&text)
            } else {
                out.line(&text)
            }
        });
    }

    fn idle(&self, session: &str) {
        debug!("Session '{}' left the screen", session);
    }

    fn reattach_head(&self, session: &str) {
        debug!("Session '{}' following its tail", session);
    }

    fn append_stream(&self, session: &str, stream: &str, element: &Element) {
        let text = element.text();
        self.with_output(session, |out| out.line(&format!("[{stream}] {}", text.trim_end())));
    }
}
