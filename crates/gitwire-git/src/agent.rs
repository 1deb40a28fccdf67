//! Repository-agent interface: the façade the protocol state machines run
//! against, plus a minimal in-memory implementation for tests and local use.
//!
//! The wire protocol (PKT-LINE framing, advertisement, upload-pack and
//! receive-pack state machines) never touches an object database directly.
//! It only ever calls through [`RepositoryAgent`]. A production deployment
//! is expected to bring its own implementation backed by a real Git object
//! store; [`InMemoryAgent`] exists so this crate is testable on its own.

use crate::pack::{PackBuilder, PackParser};
use crate::{GitError, Result};
use gitwire_storage::{ObjectId, ObjectType, Repository};
use std::collections::HashSet;
use std::sync::Arc;

/// A single advertised reference: a name paired with the object it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref {
    /// Full ref name, e.g. `refs/heads/main` or `HEAD`.
    pub name: String,
    /// The object the ref currently points to.
    pub oid: ObjectId,
}

/// A single ref-update command sent by a `git-receive-pack` client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Old object ID the client believes the ref is at (all-zero for create).
    pub old_id: ObjectId,
    /// New object ID to move the ref to (all-zero for delete).
    pub new_id: ObjectId,
    /// Reference name being updated.
    pub ref_name: String,
}

impl Command {
    /// Returns true if this command creates a new ref.
    pub fn is_create(&self) -> bool {
        self.old_id.is_zero()
    }

    /// Returns true if this command deletes an existing ref.
    pub fn is_delete(&self) -> bool {
        self.new_id.is_zero()
    }
}

/// Per-command outcome of [`RepositoryAgent::apply_updates`].
pub type CommandResult = std::result::Result<(), String>;

/// The result of unpacking and applying a push.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    /// Whether the received pack unpacked and stored cleanly.
    pub unpack_ok: bool,
    /// Reason the unpack failed, if it did.
    pub unpack_error: Option<String>,
    /// Per-ref outcome, in the order the commands were received.
    pub ref_results: Vec<(String, CommandResult)>,
}

/// Collaborator contract the wire-protocol state machines are built against.
///
/// Implementations are not required to be thread-safe across handles: the
/// protocol core opens one handle per request and never shares it with
/// another concurrent request.
pub trait RepositoryAgent {
    /// The ref `HEAD` currently resolves to, if the repository is non-empty.
    fn head(&self) -> Option<Ref>;

    /// All `refs/heads/*` refs, in the agent's own order.
    fn branches(&self) -> Vec<Ref>;

    /// All `refs/tags/*` refs, in the agent's own order.
    fn tags(&self) -> Vec<Ref>;

    /// Whether an object with this id is present in the backing store.
    fn object_exists(&self, id: &ObjectId) -> bool;

    /// Walks the commit graph from every `want`, hiding everything reachable
    /// from any `have`. The returned sequence is the set of commits the
    /// pack needs to cover; it does not include each commit's tree/blob
    /// closure (that expansion happens in `build_pack`).
    fn revwalk(&self, wants: &[ObjectId], haves: &[ObjectId]) -> Result<Vec<ObjectId>>;

    /// Builds a packfile covering every object reachable from `walk`
    /// (commits, their trees, and the trees' blobs/subtrees).
    fn build_pack(&self, walk: &[ObjectId]) -> Result<Vec<u8>>;

    /// Unpacks `pack_bytes` into the object store, then atomically applies
    /// `commands` to the ref store. Either everything in `commands` lands
    /// together with the pack, or nothing does.
    fn apply_updates(&self, commands: &[Command], pack_bytes: &[u8]) -> Result<UpdateReport>;
}

/// A [`RepositoryAgent`] backed by the in-process [`Repository`] primitives.
///
/// Production deployments are expected to supply their own agent wrapping a
/// real object database; this one is for tests and local/demo use.
pub struct InMemoryAgent {
    repo: Arc<Repository>,
}

impl InMemoryAgent {
    /// Wraps a repository as an agent handle.
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    fn to_ref(name: String, oid: ObjectId) -> Ref {
        Ref { name, oid }
    }

    /// Expands one walked id into the pack: for a commit, its tree/blob
    /// closure; for any other object type, just the object itself.
    fn collect_closure(
        &self,
        commit_id: &ObjectId,
        seen: &mut HashSet<ObjectId>,
        builder: &mut PackBuilder,
    ) -> Result<()> {
        if !seen.insert(*commit_id) {
            return Ok(());
        }

        let commit = self
            .repo
            .objects
            .get(commit_id)
            .map_err(|_| GitError::ObjectNotFound(commit_id.to_hex()))?;
        if commit.object_type != ObjectType::Commit {
            // wants may reference tags/trees/blobs directly; include the
            // object itself with no further expansion.
            builder.add(commit);
            return Ok(());
        }

        let parsed = commit.parse_commit()?;
        builder.add(commit);

        self.collect_tree(&parsed.tree, seen, builder)?;
        Ok(())
    }

    /// Validates and applies a single ref-update command against current ref
    /// state, per the create/delete/update rules in the command's contract.
    fn apply_one(&self, cmd: &Command) -> CommandResult {
        let current = self.repo.refs.get(&cmd.ref_name).ok().and_then(|r| r.as_direct());

        if cmd.is_create() {
            if current.is_some() {
                return Err(format!("cannot create {}: already exists", cmd.ref_name));
            }
            self.repo.update_ref(&cmd.ref_name, cmd.new_id);
            return Ok(());
        }

        match current {
            None => Err(format!("cannot update {}: does not exist", cmd.ref_name)),
            Some(oid) if oid != cmd.old_id => Err(format!(
                "stale info for {}: expected {}, found {}",
                cmd.ref_name, cmd.old_id, oid
            )),
            Some(_) => {
                if cmd.is_delete() {
                    self.repo.delete_ref(&cmd.ref_name).map_err(|e| e.to_string())
                } else {
                    self.repo.update_ref(&cmd.ref_name, cmd.new_id);
                    Ok(())
                }
            }
        }
    }

    fn collect_tree(
        &self,
        tree_id: &ObjectId,
        seen: &mut HashSet<ObjectId>,
        builder: &mut PackBuilder,
    ) -> Result<()> {
        if !seen.insert(*tree_id) {
            return Ok(());
        }
        let tree_obj = self
            .repo
            .objects
            .get(tree_id)
            .map_err(|_| GitError::ObjectNotFound(tree_id.to_hex()))?;
        let entries = tree_obj.parse_tree()?;
        builder.add(tree_obj);

        for entry in entries {
            if entry.is_tree() {
                self.collect_tree(&entry.oid, seen, builder)?;
            } else if seen.insert(entry.oid) {
                let blob = self
                    .repo
                    .objects
                    .get(&entry.oid)
                    .map_err(|_| GitError::ObjectNotFound(entry.oid.to_hex()))?;
                builder.add(blob);
            }
        }
        Ok(())
    }
}

impl RepositoryAgent for InMemoryAgent {
    fn head(&self) -> Option<Ref> {
        self.repo
            .head()
            .ok()
            .map(|oid| Self::to_ref("HEAD".to_string(), oid))
    }

    fn branches(&self) -> Vec<Ref> {
        self.repo
            .branches()
            .into_iter()
            .map(|(name, oid)| Self::to_ref(format!("refs/heads/{}", name), oid))
            .collect()
    }

    fn tags(&self) -> Vec<Ref> {
        self.repo
            .tags()
            .into_iter()
            .map(|(name, oid)| Self::to_ref(format!("refs/tags/{}", name), oid))
            .collect()
    }

    fn object_exists(&self, id: &ObjectId) -> bool {
        self.repo.objects.contains(id)
    }

    fn revwalk(&self, wants: &[ObjectId], haves: &[ObjectId]) -> Result<Vec<ObjectId>> {
        let mut hidden = HashSet::new();
        let mut frontier: Vec<ObjectId> = haves.to_vec();
        while let Some(id) = frontier.pop() {
            if !hidden.insert(id) {
                continue;
            }
            if let Ok(obj) = self.repo.objects.get(&id) {
                if obj.object_type == ObjectType::Commit {
                    if let Ok(parsed) = obj.parse_commit() {
                        frontier.extend(parsed.parents);
                    }
                }
            }
        }

        let mut reachable = Vec::new();
        let mut visited = HashSet::new();
        let mut frontier: Vec<ObjectId> = wants.to_vec();
        while let Some(id) = frontier.pop() {
            if hidden.contains(&id) || !visited.insert(id) {
                continue;
            }
            reachable.push(id);
            if let Ok(obj) = self.repo.objects.get(&id) {
                if obj.object_type == ObjectType::Commit {
                    if let Ok(parsed) = obj.parse_commit() {
                        frontier.extend(parsed.parents);
                    }
                }
            }
        }

        Ok(reachable)
    }

    fn build_pack(&self, walk: &[ObjectId]) -> Result<Vec<u8>> {
        let mut builder = PackBuilder::new();
        let mut seen = HashSet::new();
        for id in walk {
            self.collect_closure(id, &mut seen, &mut builder)?;
        }
        builder.build()
    }

    fn apply_updates(&self, commands: &[Command], pack_bytes: &[u8]) -> Result<UpdateReport> {
        let unpack_result = if pack_bytes.is_empty() {
            Ok(())
        } else {
            let mut parser = PackParser::new(pack_bytes);
            parser
                .parse(&self.repo.objects)
                .map(|_| ())
                .map_err(|e| e.to_string())
        };

        let (unpack_ok, unpack_error) = match &unpack_result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg.clone())),
        };

        if !unpack_ok {
            return Ok(UpdateReport {
                unpack_ok,
                unpack_error,
                ref_results: commands
                    .iter()
                    .map(|c| (c.ref_name.clone(), Err("unpack failed".to_string())))
                    .collect(),
            });
        }

        let mut ref_results = Vec::with_capacity(commands.len());
        for cmd in commands {
            let result = self.apply_one(cmd);
            ref_results.push((cmd.ref_name.clone(), result));
        }

        Ok(UpdateReport {
            unpack_ok,
            unpack_error,
            ref_results,
        })
    }
}
