pub mod flow;
pub mod frame;
pub mod liveness;
pub mod optimize;
pub mod riscv;

pub use flow::{BasicBlock, EndKind, FlowGraph};
pub use frame::StackFrame;
pub use riscv::{dump_flow_graphs, emit_assembly};
