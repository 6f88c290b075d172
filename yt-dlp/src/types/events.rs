use serde_json::Value;

/// What a running `--print-json` invocation reports, in arrival order.
#[derive(Debug, Clone)]
pub enum JsonEvent {
    Spawned { command: String },
    /// A complete stdout line that parsed as a JSON object.
    Record(Value),
    /// Any other stdout line.
    Line(String),
    Exited { code: i32, stderr: String }
}

/// Everything collected from one finished, successful invocation.
#[derive(Debug, Clone)]
pub struct JsonRun {
    pub command: String,
    pub records: Vec<Value>,
    pub stderr: String
}
