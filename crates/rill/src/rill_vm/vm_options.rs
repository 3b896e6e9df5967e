/// Resource limits for one VM instance.
#[derive(Debug, Clone)]
pub struct VmOptions {
    /// Maximum operand stack depth (slots).
    pub max_stack_size: usize,
    /// Maximum nesting of active calls, native frames included.
    pub max_call_depth: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            max_stack_size: 1_000_000,
            max_call_depth: 256,
        }
    }
}
