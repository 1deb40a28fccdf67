//! UploadPack state machine (C3): `disco -> wants -> haves -> done`.
//!
//! `disco` is [`crate::protocol::advertise_refs`]; this module drives the
//! remaining states from a fully-buffered request body.

use super::parse_capabilities;
use crate::agent::RepositoryAgent;
use crate::pktline::{PktLine, PktLineReader, PktLineWriter};
use crate::{GitError, Result};
use gitwire_storage::ObjectId;
use std::collections::HashSet;
use std::io::{Read, Write};

const KNOWN_CAPS: &[&str] = &["thin-pack", "multi_ack", "multi_ack_detailed"];

/// Drives `wants -> haves -> done` for an upload-pack request and returns
/// the fully-buffered response body (ACK/NAK lines followed by the raw
/// packfile, with no framing around the pack bytes).
pub fn run_upload_pack<R: Read>(agent: &dyn RepositoryAgent, input: &mut R) -> Result<Vec<u8>> {
    let mut reader = PktLineReader::new(input);
    let (wants, _shallow, caps) = read_wants(&mut reader)?;

    let mut output = Vec::new();
    if wants.is_empty() {
        // Flush with no wants: the client hung up. Nothing to emit.
        return Ok(output);
    }

    // `NotOurRef` is a protocol-level error, not an HTTP one: it is reported
    // as an `ERR` line inside an otherwise-200 response body, per the
    // "protocol errors over HTTP errors once the response has started"
    // policy, which for upload-pack starts as soon as advertisement has run.
    for want in &wants {
        if !agent.object_exists(want) {
            let mut writer = PktLineWriter::new(&mut output);
            writer.write_line(&format!("ERR upload-pack: not our ref {}", want))?;
            writer.flush()?;
            return Ok(output);
        }
    }

    let mut writer = PktLineWriter::new(&mut output);
    let haves = read_haves_and_ack(&mut reader, &mut writer, agent, &caps)?;

    let walk = agent.revwalk(&wants, &haves)?;
    let pack = agent.build_pack(&walk)?;
    writer.write_raw(&pack)?;
    writer.flush()?;

    Ok(output)
}

fn split_oid_and_tail(rest: &str) -> (&str, &str) {
    if rest.len() > 40 {
        let (hex, tail) = rest.split_at(40);
        (hex, tail.trim_start())
    } else {
        (rest, "")
    }
}

fn read_wants<R: Read>(
    reader: &mut PktLineReader<R>,
) -> Result<(Vec<ObjectId>, Vec<ObjectId>, HashSet<String>)> {
    let mut wants = Vec::new();
    let mut shallow = Vec::new();
    let mut caps = HashSet::new();
    let mut first = true;

    loop {
        match reader.read()? {
            Some(PktLine::Flush) | None => break,
            Some(PktLine::Pack(_)) => {
                return Err(GitError::BadCommandLine("unexpected pack in wants".into()))
            }
            Some(PktLine::Data(data)) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                let line = text.trim_end_matches('\n');

                if let Some(rest) = line.strip_prefix("want ") {
                    let (hex, tail) = split_oid_and_tail(rest);
                    let oid = ObjectId::from_hex(hex).map_err(|_| GitError::BadOidHex(hex.into()))?;
                    if first {
                        caps = parse_capabilities(tail, KNOWN_CAPS);
                        first = false;
                    }
                    if !wants.contains(&oid) {
                        wants.push(oid);
                    }
                } else if let Some(hex) = line.strip_prefix("shallow ") {
                    let oid = ObjectId::from_hex(hex).map_err(|_| GitError::BadOidHex(hex.into()))?;
                    shallow.push(oid);
                } else {
                    return Err(GitError::BadCommandLine(line.to_string()));
                }
            }
        }
    }

    Ok((wants, shallow, caps))
}

fn read_haves_and_ack<R: Read, W: Write>(
    reader: &mut PktLineReader<R>,
    writer: &mut PktLineWriter<W>,
    agent: &dyn RepositoryAgent,
    caps: &HashSet<String>,
) -> Result<Vec<ObjectId>> {
    let mut haves = Vec::new();
    let mut matched_any = false;
    let multi_ack = caps.contains("multi_ack") || caps.contains("multi_ack_detailed");

    loop {
        match reader.read()? {
            Some(PktLine::Flush) => continue,
            Some(PktLine::Pack(_)) => {
                return Err(GitError::BadCommandLine("unexpected pack in haves".into()))
            }
            Some(PktLine::Data(data)) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                let line = text.trim_end_matches('\n');

                if line == "done" {
                    break;
                }

                let hex = line
                    .strip_prefix("have ")
                    .ok_or_else(|| GitError::BadCommandLine(line.to_string()))?;
                let oid = ObjectId::from_hex(hex).map_err(|_| GitError::BadOidHex(hex.into()))?;

                if agent.object_exists(&oid) {
                    matched_any = true;
                    haves.push(oid);

                    if caps.contains("multi_ack_detailed") {
                        writer.write_line(&format!("ACK {} common", oid))?;
                    } else if caps.contains("multi_ack") {
                        writer.write_line(&format!("ACK {} continue", oid))?;
                    } else {
                        // Baseline (no multi_ack): ACK the first match and
                        // move straight to the packfile rather than
                        // continuing to drain haves the client won't send
                        // more of without multi_ack negotiated.
                        writer.write_line(&format!("ACK {}", oid))?;
                        break;
                    }
                }
            }
            None => break,
        }
    }

    if matched_any && multi_ack {
        let last = *haves.last().expect("matched_any implies non-empty haves");
        if caps.contains("multi_ack_detailed") {
            writer.write_line(&format!("ACK {} ready", last))?;
        } else {
            writer.write_line(&format!("ACK {}", last))?;
        }
    } else if !matched_any {
        writer.write_line("NAK")?;
    }

    Ok(haves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::InMemoryAgent;
    use gitwire_storage::{GitObject, Repository, TreeEntry};
    use std::io::Cursor;
    use std::sync::Arc;

    fn repo_with_commit() -> (Arc<Repository>, ObjectId) {
        let repo = Arc::new(Repository::new("demo", "alice"));
        let blob = GitObject::blob(b"hello".to_vec());
        let blob_id = repo.objects.put(blob);
        let tree = GitObject::tree(&[TreeEntry {
            mode: "100644".to_string(),
            name: "f".to_string(),
            oid: blob_id,
        }]);
        let tree_id = repo.objects.put(tree);
        let commit_id = repo
            .commit(&tree_id, "msg", "a <a@b> 0 +0000", "a <a@b> 0 +0000")
            .unwrap();
        (repo, commit_id)
    }

    #[test]
    fn test_upload_pack_no_wants_is_noop() {
        let (repo, _) = repo_with_commit();
        let agent = InMemoryAgent::new(repo);
        let mut input = Cursor::new(b"0000".to_vec());
        let out = run_upload_pack(&agent, &mut input).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_upload_pack_basic_clone() {
        let (repo, commit_id) = repo_with_commit();
        let agent = InMemoryAgent::new(repo);

        let mut request = Vec::new();
        {
            let mut w = PktLineWriter::new(&mut request);
            w.write_line(&format!(
                "want {} {}",
                commit_id,
                "multi_ack_detailed thin-pack"
            ))
            .unwrap();
            w.flush_pkt().unwrap();
            w.write_line("done").unwrap();
        }

        let mut input = Cursor::new(request);
        let out = run_upload_pack(&agent, &mut input).unwrap();
        assert!(out.windows(4).any(|w| w == b"PACK"));
    }

    #[test]
    fn test_upload_pack_not_our_ref() {
        let (repo, _) = repo_with_commit();
        let agent = InMemoryAgent::new(repo);
        let missing = ObjectId::from_bytes([0xaa; 20]);

        let mut request = Vec::new();
        {
            let mut w = PktLineWriter::new(&mut request);
            w.write_line(&format!("want {} multi_ack", missing)).unwrap();
            w.flush_pkt().unwrap();
            w.write_line("done").unwrap();
        }

        let mut input = Cursor::new(request);
        let out = run_upload_pack(&agent, &mut input).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("ERR upload-pack: not our ref"));
    }

    #[test]
    fn test_upload_pack_have_matching_acks() {
        let (repo, commit_id) = repo_with_commit();
        let agent = InMemoryAgent::new(repo);

        let mut request = Vec::new();
        {
            let mut w = PktLineWriter::new(&mut request);
            w.write_line(&format!("want {} multi_ack", commit_id)).unwrap();
            w.flush_pkt().unwrap();
            w.write_line(&format!("have {}", commit_id)).unwrap();
            w.write_line("done").unwrap();
        }

        let mut input = Cursor::new(request);
        let out = run_upload_pack(&agent, &mut input).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains(&format!("ACK {}", commit_id)));
    }

    #[test]
    fn test_upload_pack_baseline_acks_first_match_only() {
        // No multi_ack/multi_ack_detailed negotiated: the server must ACK
        // the first matching have and stop, rather than reading through
        // every have line the client sent.
        let (repo, commit_id) = repo_with_commit();
        let agent = InMemoryAgent::new(repo);

        let mut request = Vec::new();
        {
            let mut w = PktLineWriter::new(&mut request);
            w.write_line(&format!("want {}", commit_id)).unwrap();
            w.flush_pkt().unwrap();
            w.write_line(&format!("have {}", commit_id)).unwrap();
            // If the server kept reading haves after the first ACK instead
            // of breaking out, this malformed line would surface as
            // BadOidHex instead of the request completing successfully.
            w.write_line("have not-a-valid-oid").unwrap();
            w.write_line("done").unwrap();
        }

        let mut input = Cursor::new(request);
        let out = run_upload_pack(&agent, &mut input).unwrap();
        assert!(out.windows(4).any(|w| w == b"PACK"));
        let ack_pos = out.windows(3).position(|w| w == b"ACK").unwrap();
        let text = String::from_utf8_lossy(&out[ack_pos..]);
        assert!(text.starts_with(&format!("ACK {}", commit_id)));
    }
}
