//! ReceivePack state machine (C4): `disco -> commands -> buffer -> report -> done`.
//!
//! `disco` is [`crate::protocol::advertise_refs`]; this module drives the
//! remaining states from a fully-buffered request body.

use super::parse_capabilities;
use crate::agent::{Command, RepositoryAgent};
use crate::pktline::{PktLine, PktLineReader, PktLineWriter};
use crate::{GitError, Result};
use gitwire_storage::ObjectId;
use std::collections::HashSet;
use std::io::Read;

const KNOWN_CAPS: &[&str] = &["report-status", "delete-refs"];

/// Drives `commands -> buffer -> report -> done` for a receive-pack request
/// and returns the fully-buffered response body (empty unless the client
/// negotiated `report-status`).
pub fn run_receive_pack<R: Read>(agent: &dyn RepositoryAgent, input: &mut R) -> Result<Vec<u8>> {
    let mut reader = PktLineReader::new(input);
    let (commands, caps) = read_commands(&mut reader)?;

    if commands.is_empty() {
        return Ok(Vec::new());
    }

    // `buffer`: whatever remains is the packfile (and its trailer), read
    // raw since it is not PKT-LINE framed.
    let mut pack_bytes = Vec::new();
    reader.inner_mut().read_to_end(&mut pack_bytes)?;

    let report = agent.apply_updates(&commands, &pack_bytes)?;

    if !caps.contains("report-status") {
        return Ok(Vec::new());
    }

    let mut output = Vec::new();
    {
        let mut writer = PktLineWriter::new(&mut output);
        match &report.unpack_error {
            None => writer.write_line("unpack ok")?,
            Some(reason) => writer.write_line(&format!("unpack {}", reason))?,
        }
        for (ref_name, result) in &report.ref_results {
            match result {
                Ok(()) => writer.write_line(&format!("ok {}", ref_name))?,
                Err(reason) => writer.write_line(&format!("ng {} {}", ref_name, reason))?,
            }
        }
        writer.flush_pkt()?;
        writer.flush()?;
    }

    Ok(output)
}

fn read_commands<R: Read>(
    reader: &mut PktLineReader<R>,
) -> Result<(Vec<Command>, HashSet<String>)> {
    let mut commands = Vec::new();
    let mut caps = HashSet::new();
    let mut first = true;

    loop {
        match reader.read()? {
            Some(PktLine::Flush) | None => break,
            Some(PktLine::Pack(_)) => {
                return Err(GitError::BadCommandLine(
                    "unexpected pack in commands".into(),
                ))
            }
            Some(PktLine::Data(data)) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                let mut line = text.trim_end_matches('\n').to_string();

                if first {
                    if let Some(nul) = line.find('\0') {
                        let tail = line[nul + 1..].to_string();
                        caps = parse_capabilities(&tail, KNOWN_CAPS);
                        line.truncate(nul);
                    }
                    first = false;
                }

                let mut parts = line.splitn(3, ' ');
                let old = parts
                    .next()
                    .ok_or_else(|| GitError::BadCommandLine(line.clone()))?;
                let new = parts
                    .next()
                    .ok_or_else(|| GitError::BadCommandLine(line.clone()))?;
                let ref_name = parts
                    .next()
                    .ok_or_else(|| GitError::BadCommandLine(line.clone()))?;

                let old_id = ObjectId::from_hex(old).map_err(|_| GitError::BadOidHex(old.into()))?;
                let new_id = ObjectId::from_hex(new).map_err(|_| GitError::BadOidHex(new.into()))?;

                commands.push(Command {
                    old_id,
                    new_id,
                    ref_name: ref_name.to_string(),
                });
            }
        }
    }

    Ok((commands, caps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::InMemoryAgent;
    use crate::pack::PackBuilder;
    use gitwire_storage::{GitObject, Repository};
    use std::io::Cursor;
    use std::sync::Arc;

    #[test]
    fn test_receive_pack_no_commands_is_noop() {
        let repo = Arc::new(Repository::new("demo", "alice"));
        let agent = InMemoryAgent::new(repo);
        let mut input = Cursor::new(b"0000".to_vec());
        let out = run_receive_pack(&agent, &mut input).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_receive_pack_create_ref_with_report_status() {
        let repo = Arc::new(Repository::new("demo", "alice"));
        let agent = InMemoryAgent::new(repo);

        let blob = GitObject::blob(b"content".to_vec());
        let blob_id = blob.id;
        let mut builder = PackBuilder::new();
        builder.add(blob);
        let pack = builder.build().unwrap();

        let mut request = Vec::new();
        {
            let mut w = PktLineWriter::new(&mut request);
            w.write_line(&format!(
                "{} {} refs/heads/feature\0report-status delete-refs",
                ObjectId::zero(),
                blob_id
            ))
            .unwrap();
            w.flush_pkt().unwrap();
        }
        request.extend_from_slice(&pack);

        let mut input = Cursor::new(request);
        let out = run_receive_pack(&agent, &mut input).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("unpack ok"));
        assert!(text.contains("ok refs/heads/feature"));
        assert_eq!(
            agent.branches(),
            vec![crate::agent::Ref {
                name: "refs/heads/feature".to_string(),
                oid: blob_id,
            }]
        );
    }

    #[test]
    fn test_receive_pack_without_report_status_is_silent() {
        let repo = Arc::new(Repository::new("demo", "alice"));
        let agent = InMemoryAgent::new(repo);
        let target = ObjectId::from_bytes([9u8; 20]);

        let mut request = Vec::new();
        {
            let mut w = PktLineWriter::new(&mut request);
            w.write_line(&format!(
                "{} {} refs/heads/feature",
                ObjectId::zero(),
                target
            ))
            .unwrap();
            w.flush_pkt().unwrap();
        }

        let mut input = Cursor::new(request);
        let out = run_receive_pack(&agent, &mut input).unwrap();
        assert!(out.is_empty());
        assert_eq!(agent.branches().len(), 1);
    }

    #[test]
    fn test_receive_pack_delete_ref() {
        let repo = Arc::new(Repository::new("demo", "alice"));
        let target = ObjectId::from_bytes([3u8; 20]);
        repo.update_ref("refs/heads/doomed", target);
        let agent = InMemoryAgent::new(repo);

        let mut request = Vec::new();
        {
            let mut w = PktLineWriter::new(&mut request);
            w.write_line(&format!(
                "{} {} refs/heads/doomed\0report-status",
                target,
                ObjectId::zero()
            ))
            .unwrap();
            w.flush_pkt().unwrap();
        }

        let mut input = Cursor::new(request);
        let out = run_receive_pack(&agent, &mut input).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("ok refs/heads/doomed"));
        assert!(agent.branches().is_empty());
    }
}
