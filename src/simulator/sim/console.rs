/// UART console capture with `@@START_<name>` / `@@END_<name>` phase markers
use std::collections::HashMap;

const START: &str = "@@START_";
const END: &str = "@@END_";

#[derive(Debug, Default)]
pub struct Console {
  line: Vec<u8>,
  lines: Vec<String>,
  starts: HashMap<String, u64>,
  /// Finished phases in the order their END marker first arrived. A repeated
  /// marker overwrites the earlier measurement.
  phases: Vec<(String, u64)>,
}

fn marker<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
  let pos = line.find(tag)?;
  let name = line[pos + tag.len()..].split_whitespace().next()?;
  Some(name)
}

impl Console {
  pub fn new() -> Self {
    Self::default()
  }

  /// Feed one byte written at `tick`. Returns the line it completed, if any.
  pub fn push(&mut self, byte: u8, tick: u64) -> Option<String> {
    match byte {
      b'\n' => {
        let line = String::from_utf8_lossy(&self.line).into_owned();
        self.line.clear();
        self.mark(&line, tick);
        self.lines.push(line.clone());
        Some(line)
      }
      b'\r' => None,
      b => {
        self.line.push(b);
        None
      }
    }
  }

  fn mark(&mut self, line: &str, tick: u64) {
    if let Some(name) = marker(line, START) {
      self.starts.insert(name.to_string(), tick);
    } else if let Some(name) = marker(line, END) {
      let Some(start) = self.starts.get(name) else {
        log::warn!("[console] @@END_{} without a start marker", name);
        return;
      };
      let elapsed = tick.saturating_sub(*start);
      match self.phases.iter_mut().find(|(n, _)| n == name) {
        Some(phase) => phase.1 = elapsed,
        None => self.phases.push((name.to_string(), elapsed)),
      }
    }
  }

  /// Ticks between the START and END markers of `name`
  pub fn elapsed(&self, name: &str) -> Option<u64> {
    self.phases.iter().find(|(n, _)| n == name).map(|(_, t)| *t)
  }

  pub fn phases(&self) -> &[(String, u64)] {
    &self.phases
  }

  pub fn lines(&self) -> &[String] {
    &self.lines
  }

  /// Bytes of the line still being written
  pub fn pending(&self) -> &[u8] {
    &self.line
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn feed(console: &mut Console, text: &str, tick: u64) {
    for b in text.bytes() {
      console.push(b, tick);
    }
  }

  #[test]
  fn test_marker_elapsed() {
    let mut console = Console::new();
    feed(&mut console, "boot\n", 1);
    feed(&mut console, "@@START_LAYER1\n", 10);
    feed(&mut console, "@@END_LAYER1\n", 250);
    assert_eq!(console.elapsed("LAYER1"), Some(240));
    assert_eq!(console.elapsed("LAYER2"), None);
    assert_eq!(console.lines().len(), 3);
  }

  #[test]
  fn test_marker_inside_line() {
    let mut console = Console::new();
    feed(&mut console, "x @@START_A tail\r\n", 3);
    feed(&mut console, "@@END_A\n", 5);
    assert_eq!(console.phases(), &[("A".to_string(), 2)]);
    assert_eq!(console.lines()[0], "x @@START_A tail");
  }

  #[test]
  fn test_repeated_marker_keeps_latest() {
    let mut console = Console::new();
    feed(&mut console, "@@START_A\n", 0);
    feed(&mut console, "@@END_A\n", 10);
    feed(&mut console, "@@START_B\n", 10);
    feed(&mut console, "@@END_B\n", 12);
    feed(&mut console, "@@START_A\n", 20);
    feed(&mut console, "@@END_A\n", 50);
    assert_eq!(console.elapsed("A"), Some(30));
    assert_eq!(console.phases(), &[("A".to_string(), 30), ("B".to_string(), 2)]);
  }

  #[test]
  fn test_end_without_start_is_ignored() {
    let mut console = Console::new();
    feed(&mut console, "@@END_B\n", 5);
    assert!(console.phases().is_empty());
  }

  #[test]
  fn test_partial_line_pending() {
    let mut console = Console::new();
    assert_eq!(console.push(b'h', 0), None);
    assert_eq!(console.pending(), b"h");
    assert_eq!(console.push(b'\n', 1), Some("h".to_string()));
    assert!(console.pending().is_empty());
  }
}
