//! Credential loading.
//!
//! The bot token lives in a one-line file (`token.dat` by convention) so it
//! never ends up hardcoded or committed. [`LineReader`] does the actual line
//! extraction and copes with all three terminator forms a token file shows up
//! with in the wild: `\n`, `\r\n`, and no terminator at all.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Default credential file name, relative to the working directory.
pub const DEFAULT_TOKEN_FILE: &str = "token.dat";

// ---------------------------------------------------------------------------
// LineReader
// ---------------------------------------------------------------------------

/// Incremental line reader over any buffered byte source.
///
/// Each call to [`next_line`](Self::next_line) returns the next line with its
/// terminator stripped. A final line without a terminator is still returned;
/// only a read that accumulates zero bytes before end-of-stream yields
/// `None`.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next line, or `None` once the stream is exhausted.
    ///
    /// Recognizes `\n` and `\r\n` terminators. A lone `\r` also ends the
    /// line (the following byte is only consumed when it is the matching
    /// `\n`). Bytes are converted to UTF-8 lossily; a token is ASCII in
    /// practice, and garbage input must not take the process down.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line: Vec<u8> = Vec::new();

        loop {
            let byte = {
                let buf = self.inner.fill_buf()?;
                match buf.first() {
                    Some(&b) => b,
                    // End of stream: a partial line still counts, an empty
                    // accumulation means we are exhausted.
                    None => {
                        return Ok(if line.is_empty() {
                            None
                        } else {
                            Some(String::from_utf8_lossy(&line).into_owned())
                        });
                    }
                }
            };
            self.inner.consume(1);

            match byte {
                b'\n' => return Ok(Some(String::from_utf8_lossy(&line).into_owned())),
                b'\r' => {
                    // Swallow the `\n` of a `\r\n` pair, leave anything else.
                    if self.inner.fill_buf()?.first() == Some(&b'\n') {
                        self.inner.consume(1);
                    }
                    return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
                }
                other => line.push(other),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Token file
// ---------------------------------------------------------------------------

/// Read the bot token: the first line of the file at `path`.
///
/// A missing file surfaces as the underlying [`io::Error`]; an empty file is
/// reported as [`io::ErrorKind::UnexpectedEof`], since an empty token can
/// never authenticate. Callers treat either as fatal at startup.
pub fn read_token(path: impl AsRef<Path>) -> io::Result<String> {
    let file = File::open(path.as_ref())?;
    let mut reader = LineReader::new(BufReader::new(file));

    reader.next_line()?.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("credential file {} is empty", path.as_ref().display()),
        )
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
