/// JSON-lines bus trace, one record per tick with bus activity
use crate::bus::{BusReq, BusResp};
use crate::error::{Result, SimError};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
  pub tick: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub addr: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub write: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub wdata: Option<u32>,
  /// Byte enables of a write
  #[serde(skip_serializing_if = "Option::is_none")]
  pub be: Option<u8>,
  pub grant: bool,
  pub valid: bool,
  pub rdata: u32,
}

impl TraceRecord {
  pub fn new(tick: u64, req: Option<&BusReq>, resp: &BusResp) -> Self {
    Self {
      tick,
      addr: req.map(|r| r.addr),
      write: req.map(|r| r.write),
      wdata: req.filter(|r| r.write).map(|r| r.wdata),
      be: req.filter(|r| r.write).map(|r| r.be),
      grant: resp.grant,
      valid: resp.valid,
      rdata: resp.rdata,
    }
  }

  /// Nothing happened on the bus
  pub fn is_idle(&self) -> bool {
    self.addr.is_none() && !self.valid
  }
}

pub struct TraceWriter<W: Write> {
  path: PathBuf,
  out: W,
}

impl TraceWriter<BufWriter<File>> {
  pub fn create(path: &Path) -> Result<Self> {
    let file = File::create(path).map_err(|e| SimError::file(path, e))?;
    Ok(Self::new(path, BufWriter::new(file)))
  }
}

impl<W: Write> TraceWriter<W> {
  pub fn new(path: impl Into<PathBuf>, out: W) -> Self {
    Self { path: path.into(), out }
  }

  pub fn record(&mut self, record: &TraceRecord) -> Result<()> {
    if record.is_idle() {
      return Ok(());
    }
    serde_json::to_writer(&mut self.out, record)?;
    writeln!(self.out).map_err(|e| SimError::file(&self.path, e))
  }

  pub fn flush(&mut self) -> Result<()> {
    self.out.flush().map_err(|e| SimError::file(&self.path, e))
  }

  pub fn into_inner(self) -> W {
    self.out
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_json_lines_skip_idle() {
    let mut trace = TraceWriter::new("mem", Vec::new());
    let req = BusReq::write(0x400, 7);
    trace.record(&TraceRecord::new(0, Some(&req), &BusResp { grant: true, valid: false, rdata: 0 })).unwrap();
    trace.record(&TraceRecord::new(1, None, &BusResp { grant: false, valid: true, rdata: 0 })).unwrap();
    trace.record(&TraceRecord::new(2, None, &BusResp::default())).unwrap();

    let text = String::from_utf8(trace.into_inner()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["addr"], 0x400);
    assert_eq!(first["wdata"], 7);
    let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["tick"], 1);
    assert!(second.get("addr").is_none());
  }

  #[test]
  fn test_masked_write_keeps_byte_enables() {
    let mut trace = TraceWriter::new("mem", Vec::new());
    let granted = BusResp { grant: true, valid: false, rdata: 0 };
    trace.record(&TraceRecord::new(0, Some(&BusReq::write_masked(0x40, 0xff, 0b0001)), &granted)).unwrap();
    trace.record(&TraceRecord::new(2, Some(&BusReq::write(0x40, 0xff)), &granted)).unwrap();
    trace.record(&TraceRecord::new(4, Some(&BusReq::read(0x40)), &granted)).unwrap();

    let text = String::from_utf8(trace.into_inner()).unwrap();
    let records: Vec<serde_json::Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(records[0]["be"], 0b0001);
    assert_eq!(records[1]["be"], 0b1111);
    assert!(records[2].get("be").is_none());
  }
}
