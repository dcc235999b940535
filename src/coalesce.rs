use indexmap::IndexMap;

use crate::promise::Promise;
use crate::types::Value;

/// A command still waiting to be flushed, paired with the promise a caller
/// is holding for it.
pub(crate) struct PendingCommand {
    pub name: &'static str,
    pub args: Vec<bytes::Bytes>,
    pub promise: Promise<Value>,
}

/// A command as it will actually go out on the wire: either a caller's
/// command unchanged, or a batched stand-in for several coalesced ones.
pub(crate) struct EffectiveCommand {
    pub name: &'static str,
    pub args: Vec<bytes::Bytes>,
    pub promise: Promise<Value>,
}

/// Maps a single-key command name to the batched command that replaces a
/// run of them, and whether the batched reply scatters element-wise
/// (`true`, list shape like `MGET`) or broadcasts as-is to every member
/// (`false`, scalar shape like `MSET`).
///
/// Kept as data rather than a hardcoded match so callers can extend or
/// disable coalescing without touching the flush path.
#[derive(Debug, Clone)]
pub struct CoalesceTable {
    entries: IndexMap<&'static str, (&'static str, bool)>,
}

impl Default for CoalesceTable {
    fn default() -> Self {
        let mut entries = IndexMap::new();
        entries.insert("GET", ("MGET", true));
        entries.insert("SET", ("MSET", false));
        Self { entries }
    }
}

impl CoalesceTable {
    pub fn empty() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn with_entry(
        mut self,
        single: &'static str,
        batched: &'static str,
        list_response: bool,
    ) -> Self {
        self.entries.insert(single, (batched, list_response));
        self
    }

    fn lookup(&self, name: &'static str) -> Option<(&'static str, bool)> {
        self.entries.get(name).copied()
    }
}

/// Groups consecutive commands that share the same coalescible name into
/// one batched wire command, in place, preserving overall FIFO order.
///
/// A run of length one is passed through unchanged (no point wrapping a
/// single `GET` in an `MGET`). Coalescing never reorders commands: a run is
/// only ever commands that arrived back to back with the same name.
pub(crate) fn coalesce(
    commands: Vec<PendingCommand>,
    table: &CoalesceTable,
) -> Vec<EffectiveCommand> {
    let mut out = Vec::with_capacity(commands.len());
    let mut group: Vec<PendingCommand> = Vec::new();
    let mut group_name: Option<&'static str> = None;

    for command in commands {
        let coalescible = table.lookup(command.name).is_some();
        if coalescible && group_name == Some(command.name) {
            group.push(command);
            continue;
        }

        if let Some(name) = group_name.take() {
            flush_group(&mut out, name, std::mem::take(&mut group), table);
        }

        if coalescible {
            group_name = Some(command.name);
            group.push(command);
        } else {
            out.push(EffectiveCommand {
                name: command.name,
                args: command.args,
                promise: command.promise,
            });
        }
    }

    if let Some(name) = group_name.take() {
        flush_group(&mut out, name, group, table);
    }

    out
}

fn flush_group(
    out: &mut Vec<EffectiveCommand>,
    name: &'static str,
    mut group: Vec<PendingCommand>,
    table: &CoalesceTable,
) {
    if group.len() == 1 {
        let command = group.pop().unwrap();
        out.push(EffectiveCommand {
            name: command.name,
            args: command.args,
            promise: command.promise,
        });
        return;
    }

    let (batched_name, list_response) = table
        .lookup(name)
        .expect("only coalescible names form a group");

    let members: Vec<Promise<Value>> = group.iter().map(|c| c.promise.clone()).collect();
    let mut merged_args = Vec::new();
    for command in &group {
        merged_args.extend(command.args.iter().cloned());
    }

    let batch_promise = Promise::new();

    let scatter_targets = members.clone();
    batch_promise.on_success(move |value| {
        if list_response {
            if let Value::Array(items) = value {
                for (item, target) in items.iter().zip(scatter_targets.iter()) {
                    let _ = target.resolve(item.clone());
                }
            } else {
                for target in &scatter_targets {
                    let _ = target.resolve(value.clone());
                }
            }
        } else {
            for target in &scatter_targets {
                let _ = target.resolve(value.clone());
            }
        }
    });

    batch_promise.on_failure(move |error| {
        for target in &members {
            let _ = target.reject(error.clone());
        }
    });

    out.push(EffectiveCommand {
        name: batched_name,
        args: merged_args,
        promise: batch_promise,
    });
}
