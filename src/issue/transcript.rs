//! Append-only issuance transcript.
//!
//! One handle is opened per invocation and flushed when dropped, so the
//! command line and tool output reach disk on every exit path. If the file
//! cannot be opened the lines go to the main log instead.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use log::{info, warn};

pub struct Transcript {
    subject: String,
    writer: Option<BufWriter<File>>,
}

impl Transcript {
    /// Open (or create) the transcript at `path` for `subject`.
    pub fn open(path: &Path, subject: &str) -> Self {
        let writer = match open_append(path) {
            Ok(file) => Some(BufWriter::new(file)),
            Err(e) => {
                warn!(
                    "Cannot open issuance transcript {}: {}, using main log",
                    path.display(),
                    e
                );
                None
            }
        };
        Self {
            subject: subject.to_string(),
            writer,
        }
    }

    /// Append one labelled entry; multi-line text is indented under it.
    pub fn record(&mut self, label: &str, text: &str) {
        let stamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        let mut entry = format!("[{}] {} {}:", stamp, self.subject, label);
        let text = text.trim_end();
        if text.contains('\n') {
            for line in text.lines() {
                entry.push_str("\n    ");
                entry.push_str(line);
            }
        } else if !text.is_empty() {
            entry.push(' ');
            entry.push_str(text);
        }

        match self.writer.as_mut() {
            Some(writer) => {
                if let Err(e) = writeln!(writer, "{}", entry) {
                    warn!("Issuance transcript write failed: {}", e);
                    info!("{}", entry);
                }
            }
            None => info!("{}", entry),
        }
    }
}

impl Drop for Transcript {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut()
            && let Err(e) = writer.flush()
        {
            warn!("Issuance transcript flush failed: {}", e);
        }
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
