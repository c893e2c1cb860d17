use crate::protocol::Answer;

/// Per-connection session state.
#[derive(Debug, Default)]
pub struct Context {
    pub db_index: usize,
    pub in_transaction: bool,
    pub queued: Vec<Answer>,
    pub should_close: bool,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }
}
