use crate::connection::Context;
use crate::persistence::aof::AofLog;
use crate::protocol::ReplyValue;
use crate::store::Store;

pub fn multi(ctx: &mut Context) -> ReplyValue {
    ctx.in_transaction = true;
    ReplyValue::ok()
}

pub fn discard(ctx: &mut Context) -> ReplyValue {
    ctx.in_transaction = false;
    ctx.queued.clear();
    ReplyValue::ok()
}

/// Replay the queued answers and collect their replies. The transaction flag
/// is cleared before replaying so the queued statements run (and are
/// recorded) as ordinary commands; a failing statement does not abort the
/// batch — its error travels in its array slot.
pub fn exec(ctx: &mut Context, store: &Store, aof: Option<&AofLog>) -> ReplyValue {
    ctx.in_transaction = false;

    let queued = std::mem::take(&mut ctx.queued);
    let mut replies = Vec::with_capacity(queued.len());
    for answer in queued {
        replies.push(crate::command::dispatch(ctx, answer, store, aof));
    }

    ReplyValue::Array(replies)
}
