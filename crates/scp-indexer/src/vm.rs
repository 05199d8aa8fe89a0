use scp_rpc::Transaction;

/// Bytecode virtual machine offered every message before the built-in protocol.
///
/// Bytecode and built-in SCP messages are mutually exclusive: once the VM reports that it
/// executed a message, no built-in processing happens for that transaction.
#[async_trait::async_trait]
pub trait BytecodeVm: Send + Sync {
    /// Returns `true` if `message` was executed as bytecode.
    async fn run(&self, tx: &Transaction, message: &str) -> bool;
}

/// VM that never executes anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopVm;

#[async_trait::async_trait]
impl BytecodeVm for NoopVm {
    async fn run(&self, _tx: &Transaction, _message: &str) -> bool {
        false
    }
}
