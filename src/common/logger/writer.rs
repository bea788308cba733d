use std::{
  fs::{self, OpenOptions},
  io::{self, Write},
  path::PathBuf,
  sync::{Arc, Mutex},
};

/// Removes ANSI escape sequences so the log file stays plain text.
pub fn strip_ansi_escapes(s: &str) -> String {
  let mut result = String::with_capacity(s.len());
  let mut in_escape = false;
  for c in s.chars() {
    if c == '\x1b' {
      in_escape = true;
    } else if in_escape {
      if c.is_ascii_alphabetic() {
        in_escape = false;
      }
    } else {
      result.push(c);
    }
  }
  result
}

/// Appends log lines to a file and keeps only the newest `max_lines` of them.
#[derive(Clone)]
pub struct RollingLineWriter {
  path: PathBuf,
  max_lines: usize,
  written: Arc<Mutex<usize>>,
}

impl RollingLineWriter {
  pub fn new(path: impl Into<PathBuf>, max_lines: u32) -> Self {
    let path = path.into();
    let existing = fs::read_to_string(&path)
      .map(|s| s.lines().count())
      .unwrap_or(0);

    Self {
      path,
      max_lines: max_lines.max(1) as usize,
      written: Arc::new(Mutex::new(existing)),
    }
  }

  fn truncate_to_limit(&self) -> io::Result<usize> {
    let content = fs::read_to_string(&self.path)?;
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() <= self.max_lines {
      return Ok(lines.len());
    }

    let keep = &lines[lines.len() - self.max_lines..];
    let mut out = keep.join("\n");
    out.push('\n');
    fs::write(&self.path, out)?;
    Ok(keep.len())
  }
}

impl io::Write for RollingLineWriter {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    let clean = strip_ansi_escapes(&String::from_utf8_lossy(buf));

    let mut written = self.written.lock().unwrap_or_else(|e| e.into_inner());
    OpenOptions::new()
      .create(true)
      .append(true)
      .open(&self.path)?
      .write_all(clean.as_bytes())?;

    *written += clean.matches('\n').count();

    // allow 10% slack so we do not rewrite the file on every line
    if *written > self.max_lines + (self.max_lines / 10).max(1) {
      *written = self.truncate_to_limit()?;
    }

    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for RollingLineWriter {
  type Writer = Self;

  fn make_writer(&'a self) -> Self::Writer {
    self.clone()
  }
}
