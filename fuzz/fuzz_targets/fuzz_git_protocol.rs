//! Fuzz target for the upload-pack and receive-pack state machines.
//!
//! Feeds arbitrary bytes as the post-advertisement request body of each
//! service, running against a small seeded in-memory repository, and checks
//! that neither state machine panics.

#![no_main]

use gitwire_git::{InMemoryAgent, Service, ServiceKind};
use gitwire_storage::{GitObject, Repository, TreeEntry};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use std::sync::Arc;

fn seeded_agent() -> InMemoryAgent {
    let repo = Arc::new(Repository::new("fuzz", "fuzzer"));
    let blob = GitObject::blob(b"seed".to_vec());
    let blob_id = repo.objects.put(blob);
    let tree = GitObject::tree(&[TreeEntry {
        mode: "100644".to_string(),
        name: "seed.txt".to_string(),
        oid: blob_id,
    }]);
    let tree_id = repo.objects.put(tree);
    repo.commit(
        &tree_id,
        "seed commit",
        "fuzz <fuzz@example.com> 0 +0000",
        "fuzz <fuzz@example.com> 0 +0000",
    )
    .unwrap();
    InMemoryAgent::new(repo)
}

fuzz_target!(|data: &[u8]| {
    let agent = seeded_agent();

    let upload = Service::new(ServiceKind::UploadPack, &agent);
    let mut input = Cursor::new(data);
    let _ = upload.step(&mut input);

    let receive = Service::new(ServiceKind::ReceivePack, &agent);
    let mut input = Cursor::new(data);
    let _ = receive.step(&mut input);
});
