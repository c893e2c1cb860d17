pub mod hash;
pub mod key;
pub mod list;
pub mod string;
pub mod transaction;

use crate::connection::Context;
use crate::error::StoreError;
use crate::persistence::aof::AofLog;
use crate::protocol::{Answer, Reply, ReplyValue};
use crate::store::Store;

/// Route one answer to its operator and stamp the session header onto the
/// reply. Write commands are appended to the AOF buffer after execution;
/// replay passes `aof = None` to run with recording disabled.
pub fn dispatch(ctx: &mut Context, answer: Answer, store: &Store, aof: Option<&AofLog>) -> Reply {
    let statement = answer.statement().to_string();
    let (command, rest) = split_first(&statement);

    // MULTI/EXEC/DISCARD act on the session even mid-transaction; everything
    // else queues while one is open.
    let value = match command {
        "MULTI" => transaction::multi(ctx),
        "EXEC" => transaction::exec(ctx, store, aof),
        "DISCARD" => transaction::discard(ctx),
        _ if ctx.in_transaction => {
            ctx.queued.push(answer);
            return stamp(ctx, ReplyValue::queued());
        }
        _ => route(ctx, store, command, rest),
    };

    if is_write_command(command) {
        if let Some(aof) = aof {
            aof.record(&answer.serialize());
        }
    }

    stamp(ctx, value)
}

fn stamp(ctx: &Context, value: ReplyValue) -> Reply {
    Reply {
        db_index: ctx.db_index as u64,
        in_transaction: ctx.in_transaction,
        value,
    }
}

fn route(ctx: &mut Context, store: &Store, command: &str, statement: &str) -> ReplyValue {
    let db = store.db(ctx.db_index);

    match command {
        "SELECT" => select(ctx, store, statement),
        "QUIT" => {
            ctx.should_close = true;
            ReplyValue::ok()
        }

        "DEL" => key::del(db, statement),
        "EXISTS" => key::exists(db, statement),
        "MOVE" => key::move_key(store, ctx.db_index, statement),
        "RENAME" => key::rename(db, statement),
        "RENAMENX" => key::rename_nx(db, statement),
        "TYPE" => key::key_type(db, statement),

        "SET" => string::set(db, statement),
        "GET" => string::get(db, statement),
        "GETRANGE" => string::get_range(db, statement),
        "GETBIT" => string::get_bit(db, statement),
        "SETBIT" => string::set_bit(db, statement),
        "MGET" => string::mget(db, statement),
        "SETNX" => string::set_nx(db, statement),
        "SETRANGE" => string::set_range(db, statement),
        "STRLEN" => string::strlen(db, statement),
        "MSET" => string::mset(db, statement),
        "MSETNX" => string::mset_nx(db, statement),
        "INCR" => string::incr(db, statement),
        "INCRBY" => string::incr_by(db, statement),
        "DECR" => string::decr(db, statement),
        "DECRBY" => string::decr_by(db, statement),
        "APPEND" => string::append(db, statement),

        "HDEL" => hash::hdel(db, statement),
        "HEXISTS" => hash::hexists(db, statement),
        "HGET" => hash::hget(db, statement),
        "HGETALL" => hash::hgetall(db, statement),
        "HINCRBY" => hash::hincr_by(db, statement),
        "HKEYS" => hash::hkeys(db, statement),
        "HLEN" => hash::hlen(db, statement),
        "HSET" => hash::hset(db, statement),
        "HVALS" => hash::hvals(db, statement),

        "LINDEX" => list::lindex(db, statement),
        "LLEN" => list::llen(db, statement),
        "LPOP" => list::lpop(db, statement),
        "LPUSH" => list::lpush(db, statement),
        "LPUSHX" => list::lpush_x(db, statement),

        _ => ReplyValue::error(StoreError::UnknownCommand(command.to_string())),
    }
}

fn select(ctx: &mut Context, store: &Store, statement: &str) -> ReplyValue {
    match statement.parse::<usize>() {
        Ok(index) if index < store.len() => {
            ctx.db_index = index;
            ReplyValue::ok()
        }
        _ => ReplyValue::error(StoreError::NotInteger),
    }
}

/// Commands whose effects must be replayable from the AOF. SELECT is included
/// so replay restores the database selector for the records that follow.
fn is_write_command(cmd: &str) -> bool {
    matches!(
        cmd,
        "DEL" | "MOVE" | "RENAME" | "RENAMENX"
            | "SET" | "SETBIT" | "SETNX" | "SETRANGE" | "MSET" | "MSETNX"
            | "INCR" | "INCRBY" | "DECR" | "DECRBY" | "APPEND"
            | "HDEL" | "HINCRBY" | "HSET"
            | "LPOP" | "LPUSH" | "LPUSHX"
            | "SELECT"
    )
}

/// Split at the first space: `(command, remainder)`.
pub(crate) fn split_first(statement: &str) -> (&str, &str) {
    match statement.find(' ') {
        Some(pos) => (&statement[..pos], &statement[pos + 1..]),
        None => (statement, ""),
    }
}

pub(crate) fn parse_int(token: &str) -> Result<i64, StoreError> {
    token.parse::<i64>().map_err(|_| StoreError::NotInteger)
}

pub(crate) fn wrong_args(cmd: &str) -> ReplyValue {
    ReplyValue::error(StoreError::WrongArgCount(cmd.to_lowercase()))
}
