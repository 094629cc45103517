//! JSON request/response envelopes

use blockfs::api::{Request, Response};
use blockfs::{BlockFs, BlockFsBuilder, ErrorKind};
use serde_json::{json, Value};

fn call(fs: &BlockFs, request: Value) -> Value {
    serde_json::from_str(&fs.dispatch_json(&request.to_string())).unwrap()
}

#[test]
fn test_full_session() {
    let fs = BlockFs::new().unwrap();

    let out = call(&fs, json!({"op": "list", "path": "/documents"}));
    assert_eq!(out["success"], true);
    assert_eq!(out["items"][1]["name"], "readme.txt");
    assert_eq!(out["items"][1]["isDirectory"], false);
    assert!(out["items"][1]["modifiedAt"].is_string());

    let out = call(&fs, json!({"op": "mkdir", "path": "/projects"}));
    assert_eq!(out, json!({"success": true}));

    let out = call(
        &fs,
        json!({"op": "createOrOverwrite", "path": "/projects/plan.md", "content": "# Plan"}),
    );
    assert_eq!(out["success"], true);

    let out = call(
        &fs,
        json!({"op": "write", "path": "/projects/plan.md", "content": "\n- ship", "append": true}),
    );
    assert_eq!(out["success"], true);

    let out = call(&fs, json!({"op": "read", "path": "/projects/plan.md"}));
    assert_eq!(out["content"], "# Plan\n- ship");

    let out = call(
        &fs,
        json!({"op": "rename", "oldPath": "/projects", "newPath": "/archive"}),
    );
    assert_eq!(out["success"], true);

    let out = call(&fs, json!({"op": "delete", "path": "/archive"}));
    assert_eq!(out["success"], true);
    assert_eq!(fs.stats().file_count, 5);
}

#[test]
fn test_snapshot_shape() {
    let fs = BlockFsBuilder::new()
        .total_blocks(8)
        .block_size(8)
        .without_sample()
        .build()
        .unwrap();
    fs.create_or_overwrite("/x.txt", b"0123456789").unwrap();

    let out = call(&fs, json!({"op": "snapshot"}));
    let blocks = out["snapshot"]["blocks"].as_array().unwrap();
    assert_eq!(blocks.len(), 8);
    assert_eq!(blocks[0], json!({"state": "data", "owner": "/x.txt"}));
    assert_eq!(blocks[2], json!({"state": "free"}));

    let file = &out["snapshot"]["files"]["/x.txt"];
    assert_eq!(file["content"], "0123456789");
    assert_eq!(
        file["allocation"],
        json!({"strategy": "contiguous", "start": 0, "count": 2})
    );
}

#[test]
fn test_stats_and_defragment() {
    let fs = BlockFsBuilder::new()
        .total_blocks(10)
        .block_size(1)
        .without_sample()
        .build()
        .unwrap();
    fs.create_or_overwrite("/a", b"aa").unwrap();
    fs.create_or_overwrite("/b", b"bb").unwrap();
    fs.delete("/a").unwrap();

    let out = call(&fs, json!({"op": "stats"}));
    assert_eq!(out["stats"]["usedBlocks"], 2);
    assert_eq!(out["stats"]["freeBlocks"], 8);
    assert_eq!(out["stats"]["totalBlocks"], 10);
    assert_eq!(out["stats"]["blocksByStrategy"]["contiguous"], 2);

    let out = call(&fs, json!({"op": "defragment"}));
    assert_eq!(out, json!({"success": true, "movedBlocks": 2}));
}

#[test]
fn test_errors_carry_kind() {
    let fs = BlockFs::new().unwrap();

    let out = call(&fs, json!({"op": "read", "path": "/music"}));
    assert_eq!(out["success"], false);
    assert_eq!(out["kind"], "not_a_file");
    assert!(out["error"].as_str().unwrap().contains("/music"));

    let out = call(&fs, json!({"op": "delete", "path": "/"}));
    assert_eq!(out["kind"], "root_violation");

    let out = call(&fs, json!({"op": "teleport", "path": "/"}));
    assert_eq!(out["kind"], "invalid_argument");
}

#[test]
fn test_typed_dispatch() {
    let fs = BlockFs::new().unwrap();
    let response = fs.dispatch(Request::List {
        path: "/nope".to_string(),
    });
    assert_eq!(
        response,
        Response {
            success: false,
            error: Some("No such file or directory: /nope".to_string()),
            kind: Some(ErrorKind::NotFound),
            ..Default::default()
        }
    );
}
