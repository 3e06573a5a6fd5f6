use std::fs;
use std::path::Path;

use log::info;

use crate::constants::Pid;
use crate::error::{TraceError, VmError};
use crate::swap::SwapStore;
use crate::translation::Access;
use crate::vm_manager::VmManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOp {
    Access { va: u32, access: Access },
    Exit,
}

/// One line of a trace: what a simulated process does next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEvent {
    /// 1-based source line, for diagnostics
    pub line: usize,
    pub pid: Pid,
    pub op: TraceOp,
}

/// A parsed access trace.
///
/// One event per line: `<pid> r <vaddr>`, `<pid> w <vaddr> <byte>` or
/// `<pid> exit`. Blank lines and `#` comments are skipped; numbers may be
/// decimal or `0x` hex.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Trace {
    pub events: Vec<TraceEvent>,
}

fn parse_number(token: &str, what: &str, line: usize) -> Result<u64, TraceError> {
    let parsed = match token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => token.parse(),
    };
    parsed.map_err(|_| TraceError::Parse {
        line,
        msg: format!("Invalid {}: {}", what, token),
    })
}

fn narrow<T: TryFrom<u64>>(value: u64, what: &str, line: usize) -> Result<T, TraceError> {
    T::try_from(value).map_err(|_| TraceError::Parse {
        line,
        msg: format!("{} {} is out of range", what, value),
    })
}

impl Trace {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TraceError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, TraceError> {
        let mut events = Vec::new();
        for (idx, raw) in content.lines().enumerate() {
            let line = idx + 1;
            let text = raw.split('#').next().unwrap_or("").trim();
            if text.is_empty() {
                continue;
            }
            events.push(Self::parse_line(text, line)?);
        }
        Ok(Trace { events })
    }

    fn parse_line(text: &str, line: usize) -> Result<TraceEvent, TraceError> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let err = |msg: String| TraceError::Parse { line, msg };

        let pid = narrow(parse_number(tokens[0], "process id", line)?, "process id", line)?;
        let op = match (tokens.get(1).copied(), tokens.len()) {
            (Some("r" | "R"), 3) => TraceOp::Access {
                va: narrow(parse_number(tokens[2], "address", line)?, "address", line)?,
                access: Access::Read,
            },
            (Some("w" | "W"), 4) => TraceOp::Access {
                va: narrow(parse_number(tokens[2], "address", line)?, "address", line)?,
                access: Access::Write(narrow(
                    parse_number(tokens[3], "data byte", line)?,
                    "data byte",
                    line,
                )?),
            },
            (Some("exit"), 2) => TraceOp::Exit,
            (Some(op @ ("r" | "R" | "w" | "W" | "exit")), n) => {
                return Err(err(format!("'{}' takes a different number of fields, got {}", op, n)));
            }
            (Some(op), _) => return Err(err(format!("Unknown operation: {}", op))),
            (None, _) => return Err(err("Missing operation".to_string())),
        };
        Ok(TraceEvent { line, pid, op })
    }

    /// Drive a session through the trace.
    ///
    /// Processes are admitted on first reference and switched to whenever
    /// the pid changes. Returns the byte produced by every access.
    pub fn replay<S: SwapStore>(&self, vm: &mut VmManager<S>) -> Result<Vec<u8>, TraceError> {
        let mut results = Vec::new();
        for event in &self.events {
            let wrap = |source: VmError| TraceError::Replay {
                line: event.line,
                source,
            };
            match event.op {
                TraceOp::Access { va, access } => {
                    if vm.process(event.pid).is_none() {
                        vm.process_init(event.pid).map_err(wrap)?;
                    }
                    if vm.context().map(|ctx| ctx.pid) != Some(event.pid) {
                        vm.context_switch(event.pid).map_err(wrap)?;
                    }
                    results.push(vm.mem_access(va, access).map_err(wrap)?);
                }
                TraceOp::Exit => vm.process_cleanup(event.pid).map_err(wrap)?,
            }
        }
        info!("replayed {} trace events", self.events.len());
        Ok(results)
    }
}

pub fn write_results<P: AsRef<Path>>(path: P, results: &[u8]) -> Result<(), TraceError> {
    let output: Vec<String> = results.iter().map(|r| r.to_string()).collect();
    fs::write(path.as_ref(), output.join(" "))?;
    Ok(())
}
