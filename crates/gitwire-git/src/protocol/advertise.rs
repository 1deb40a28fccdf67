//! Reference advertisement (C2): HEAD, then branches, then tags, with the
//! service's capability set attached to the first line.

use crate::agent::RepositoryAgent;
use crate::pktline::PktLineWriter;
use crate::Result;
use gitwire_storage::ObjectId;

/// Capabilities advertised for `git-upload-pack`.
pub const UPLOAD_PACK_CAPABILITIES: &str = "thin-pack multi_ack multi_ack_detailed";

/// Capabilities advertised for `git-receive-pack`.
pub const RECEIVE_PACK_CAPABILITIES: &str = "report-status delete-refs";

/// Produces the ref-advertisement lines (no `# service=` preamble — that
/// framing belongs to the HTTP adapter) terminated by a flush packet.
pub fn advertise_refs(agent: &dyn RepositoryAgent, capabilities: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut writer = PktLineWriter::new(&mut buf);

        let mut lines: Vec<(String, String)> = Vec::new();
        if let Some(head) = agent.head() {
            lines.push((head.oid.to_hex(), "HEAD".to_string()));
        }
        for branch in agent.branches() {
            lines.push((branch.oid.to_hex(), branch.name));
        }
        for tag in agent.tags() {
            lines.push((tag.oid.to_hex(), tag.name));
        }

        if lines.is_empty() {
            writer.write_line(&format!(
                "{} capabilities^{{}}\0{}",
                ObjectId::zero(),
                capabilities
            ))?;
        } else {
            let (oid, name) = &lines[0];
            writer.write_line(&format!("{} {}\0{}", oid, name, capabilities))?;
            for (oid, name) in &lines[1..] {
                writer.write_line(&format!("{} {}", oid, name))?;
            }
        }

        writer.flush_pkt()?;
        writer.flush()?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::InMemoryAgent;
    use gitwire_storage::{GitObject, Repository};
    use std::sync::Arc;

    #[test]
    fn test_advertise_empty_repo() {
        let repo = Arc::new(Repository::new("empty", "alice"));
        let agent = InMemoryAgent::new(repo);
        let out = advertise_refs(&agent, UPLOAD_PACK_CAPABILITIES).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("capabilities^{}"));
        assert!(text.contains(UPLOAD_PACK_CAPABILITIES));
        assert!(out.ends_with(b"0000"));
    }

    #[test]
    fn test_advertise_head_first_then_branches_then_tags() {
        let repo = Arc::new(Repository::new("demo", "alice"));
        let blob = GitObject::blob(b"hi".to_vec());
        let blob_id = repo.objects.put(blob);
        let tree = GitObject::tree(&[gitwire_storage::TreeEntry {
            mode: "100644".to_string(),
            name: "f".to_string(),
            oid: blob_id,
        }]);
        let tree_id = repo.objects.put(tree);
        let commit_id = repo
            .commit(&tree_id, "msg", "a <a@b> 0 +0000", "a <a@b> 0 +0000")
            .unwrap();
        repo.update_ref("refs/heads/feature", commit_id);
        repo.update_ref("refs/tags/v1", commit_id);

        let agent = InMemoryAgent::new(repo);
        let out = advertise_refs(&agent, RECEIVE_PACK_CAPABILITIES).unwrap();
        let text = String::from_utf8_lossy(&out);

        let head_pos = text.find("HEAD").unwrap();
        let feature_pos = text.find("refs/heads/feature").unwrap();
        let main_pos = text.find("refs/heads/main").unwrap();
        let tag_pos = text.find("refs/tags/v1").unwrap();
        assert!(head_pos < feature_pos);
        assert!(head_pos < main_pos);
        assert!(main_pos.min(feature_pos) < tag_pos);
        assert!(text.contains(RECEIVE_PACK_CAPABILITIES));
    }
}
