//! The stats-tree walk: materialize the channel's child/sibling-linked
//! namespace into a nested mapping.
//!
//! The traversal is iterative with an explicit stack and a visited-path
//! guard; the remote namespace is not guaranteed acyclic, so both the
//! sibling chain and the overall depth are bounded defensively.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use zorpctl_common::{CommandResult, Instance};
use zorpctl_szig::{SzigChannel, SzigError, SzigResult};

use crate::handler::{channel_error, CommandHandler, ProcessContext};

/// Paths deeper than this abort the walk as a misbehaving peer.
const MAX_WALK_DEPTH: usize = 64;

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

fn depth(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.split('.').count()
    }
}

/// Walk the namespace under `root`.
///
/// A node with a scalar value is a leaf; otherwise its children are the
/// first-child / next-sibling chain. Nodes with neither value nor
/// children materialize as `null`.
fn walk(channel: &mut dyn SzigChannel, root: &str) -> SzigResult<Value> {
    let mut resolved: HashMap<String, Value> = HashMap::new();
    let mut internal: Vec<(String, Vec<String>)> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut stack = vec![root.to_string()];

    while let Some(path) = stack.pop() {
        if !visited.insert(path.clone()) {
            continue;
        }
        if depth(&path) > MAX_WALK_DEPTH {
            return Err(SzigError::protocol(format!(
                "stats tree deeper than {} levels at '{}'",
                MAX_WALK_DEPTH, path
            )));
        }

        if let Some(value) = channel.get_value(&path)? {
            resolved.insert(path, Value::String(value));
            continue;
        }

        let mut children = Vec::new();
        let mut next = channel.get_child(&path)?;
        while let Some(child) = next {
            if children.contains(&child) {
                // Sibling chain loops back on itself.
                break;
            }
            next = channel.get_sibling(&child)?;
            children.push(child);
        }

        if children.is_empty() {
            resolved.insert(path, Value::Null);
        } else {
            stack.extend(children.iter().cloned());
            internal.push((path, children));
        }
    }

    // Internal nodes were discovered parents-first; assembling in reverse
    // resolves children before their parent.
    for (path, children) in internal.into_iter().rev() {
        let mut object = Map::new();
        for child in children {
            let value = resolved.get(&child).cloned().unwrap_or(Value::Null);
            object.insert(last_segment(&child).to_string(), value);
        }
        resolved.insert(path, Value::Object(object));
    }

    Ok(resolved.remove(root).unwrap_or(Value::Null))
}

/// Materialize the stats namespace of one instance process.
pub struct SzigWalkAlgorithm<'a> {
    ctx: &'a ProcessContext<'a>,
    root: String,
}

impl<'a> SzigWalkAlgorithm<'a> {
    /// An empty `root` walks the whole namespace.
    pub fn new(ctx: &'a ProcessContext<'a>, root: impl Into<String>) -> Self {
        Self {
            ctx,
            root: root.into(),
        }
    }
}

impl CommandHandler for SzigWalkAlgorithm<'_> {
    fn execute(&mut self, instance: &Instance) -> CommandResult {
        let process_name = instance.process_name();

        if let Err(err) = self.ctx.liveness.check(&process_name) {
            // Nothing to walk.
            return CommandResult::success(err.to_string());
        }
        let mut channel = match self.ctx.open_channel(&process_name) {
            Ok(channel) => channel,
            Err(failure) => return failure,
        };

        let tree = match walk(channel.as_mut(), &self.root) {
            Ok(tree) => tree,
            Err(err) => return CommandResult::from(channel_error(err)),
        };

        // The result always nests under the instance key; a non-empty
        // root adds one more level under its own key.
        let wrapped = if self.root.is_empty() {
            serde_json::json!({ process_name: tree })
        } else {
            serde_json::json!({ process_name: { self.root.clone(): tree } })
        };

        CommandResult::success_with(String::new(), wrapped)
    }
}
