//! JSON summary of where a run stopped.

use cpu_vax::{HaltReason, StopReason, Vax};
use emu_core::{Observable, Value};
use serde::Serialize;
use serde_json::{Map, json};

#[derive(Debug, Serialize)]
pub struct Report {
    pub stop: &'static str,
    pub state: Map<String, serde_json::Value>,
}

impl Report {
    pub fn new(cpu: &Vax, stop: StopReason) -> Self {
        let stop = match stop {
            StopReason::Halted(HaltReason::Instruction) => "halt",
            StopReason::Halted(HaltReason::DoubleFault) => "double-fault",
            StopReason::Limit => "limit",
        };
        let state = cpu
            .query_paths()
            .iter()
            .filter_map(|&path| cpu.query(path).map(|v| (path.to_string(), to_json(v))))
            .collect();
        Self { stop, state }
    }
}

/// Register-width values print as hex, counters as plain numbers.
fn to_json(value: Value) -> serde_json::Value {
    match value {
        Value::Bool(b) => json!(b),
        Value::U8(v) => json!(v),
        Value::U32(v) => json!(format!("{v:#010X}")),
        Value::U64(v) => json!(v),
        Value::String(s) => json!(s),
    }
}
