pub const DEFAULT_MAX_TOOL_TURNS: usize = 8;
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_QUIT_COMMAND: &str = "quit";
