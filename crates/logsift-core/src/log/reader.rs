use crate::Result;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

pub struct LogReader;

impl LogReader {
    /// Open a plain or gzip-compressed access log for line-by-line reading
    ///
    /// Compression is chosen by the `.gz` extension. The file stays open until
    /// the returned iterator is exhausted or dropped.
    pub fn open(path: &Path) -> Result<LogLines> {
        tracing::debug!("Opening log file: {}", path.display());

        let file = File::open(path)?;
        let reader: Box<dyn BufRead> = if is_gzip(path) {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(LogLines {
            reader,
            path: path.to_path_buf(),
            buf: Vec::new(),
            lines_read: 0,
        })
    }
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Single-pass iterator over the lines of a log file
///
/// Line terminators are stripped. Bytes that are not valid UTF-8 are replaced
/// so a corrupt line only fails to parse instead of ending the stream.
pub struct LogLines {
    reader: Box<dyn BufRead>,
    path: PathBuf,
    buf: Vec<u8>,
    lines_read: usize,
}

impl LogLines {
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }
}

impl Iterator for LogLines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.lines_read += 1;
                if self.buf.ends_with(b"\n") {
                    self.buf.pop();
                    if self.buf.ends_with(b"\r") {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => {
                tracing::debug!(
                    "Read error in {} after {} lines: {}",
                    self.path.display(),
                    self.lines_read,
                    e
                );
                Some(Err(e))
            }
        }
    }
}
