use proptest::prelude::*;

/// One operation against a thread's override stacks.
#[derive(Debug, Clone)]
pub enum StackOp {
    Push { name: usize, tag: u8 },
    Pop { name: usize },
}

/// Small fixed pool of callback names so operations collide often.
pub const NAMES: [&str; 3] = ["full-authentication", "ask-question", "status-message"];

/// Strategy for generating push/pop operations over [`NAMES`]
pub fn stack_op_strategy() -> impl Strategy<Value = StackOp> {
    prop_oneof![
        3 => (0..NAMES.len(), any::<u8>()).prop_map(|(name, tag)| StackOp::Push { name, tag }),
        2 => (0..NAMES.len()).prop_map(|name| StackOp::Pop { name }),
    ]
}

/// Strategy for generating operation sequences
pub fn stack_ops_strategy() -> impl Strategy<Value = Vec<StackOp>> {
    prop::collection::vec(stack_op_strategy(), 0..64)
}

/// Strategy for generating callback names
pub fn callback_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9:-]{0,31}"
}
