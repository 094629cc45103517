//! Request/response layer for collaborators
//!
//! Every call returns a [`Response`] envelope with `success` set; failures
//! carry a human-readable `error` and a machine-readable `kind`. The JSON form
//! uses camelCase field names and tags requests by `op`:
//!
//! ```json
//! {"op": "createOrOverwrite", "path": "/notes.txt", "content": "hello"}
//! {"op": "rename", "oldPath": "/notes.txt", "newPath": "/documents/notes.txt"}
//! ```

use crate::{BlockFs, Entry, ErrorKind, FsError, FsStats, Result, Snapshot};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One operation against the file system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    List {
        path: String,
    },
    Mkdir {
        path: String,
    },
    CreateOrOverwrite {
        path: String,
        #[serde(default)]
        content: String,
    },
    Write {
        path: String,
        content: String,
        #[serde(default)]
        append: bool,
    },
    Read {
        path: String,
    },
    Delete {
        path: String,
    },
    Rename {
        old_path: String,
        new_path: String,
    },
    Snapshot,
    Stats,
    Defragment,
}

/// Result envelope; only the fields relevant to the request are set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Entry>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<FsStats>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_blocks: Option<usize>,
}

impl Response {
    pub fn ok() -> Self {
        Response {
            success: true,
            ..Default::default()
        }
    }

    pub fn failure(err: &FsError) -> Self {
        Response {
            success: false,
            error: Some(err.to_string()),
            kind: Some(err.kind()),
            ..Default::default()
        }
    }

    fn from_result<T>(result: Result<T>, fill: impl FnOnce(&mut Response, T)) -> Self {
        match result {
            Ok(value) => {
                let mut response = Response::ok();
                fill(&mut response, value);
                response
            }
            Err(err) => {
                debug!("Request failed: {}", err);
                Response::failure(&err)
            }
        }
    }
}

impl BlockFs {
    /// Execute one request
    pub fn dispatch(&self, request: Request) -> Response {
        match request {
            Request::List { path } => {
                Response::from_result(self.list(path), |r, items| r.items = Some(items))
            }
            Request::Mkdir { path } => Response::from_result(self.mkdir(path), |_, ()| {}),
            Request::CreateOrOverwrite { path, content } => Response::from_result(
                self.create_or_overwrite(path, content.as_bytes()),
                |_, ()| {},
            ),
            Request::Write {
                path,
                content,
                append,
            } => Response::from_result(self.write(path, content.as_bytes(), append), |_, ()| {}),
            Request::Read { path } => Response::from_result(self.read_to_string(path), |r, text| {
                r.content = Some(text)
            }),
            Request::Delete { path } => Response::from_result(self.delete(path), |_, ()| {}),
            Request::Rename { old_path, new_path } => {
                Response::from_result(self.rename(old_path, new_path), |_, ()| {})
            }
            Request::Snapshot => Response {
                snapshot: Some(self.snapshot()),
                ..Response::ok()
            },
            Request::Stats => Response {
                stats: Some(self.stats()),
                ..Response::ok()
            },
            Request::Defragment => Response {
                moved_blocks: Some(self.defragment()),
                ..Response::ok()
            },
        }
    }

    /// Execute one JSON-encoded request and encode the response
    ///
    /// Malformed requests produce an `invalid_argument` failure.
    pub fn dispatch_json(&self, request: &str) -> String {
        let response = match serde_json::from_str::<Request>(request) {
            Ok(request) => self.dispatch(request),
            Err(e) => Response::failure(&FsError::InvalidArgument(format!(
                "malformed request: {}",
                e
            ))),
        };

        serde_json::to_string(&response).unwrap_or_else(|e| {
            format!(
                r#"{{"success":false,"error":"response encoding failed: {}","kind":"inconsistent"}}"#,
                e
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockFsBuilder;
    use serde_json::{json, Value};

    fn fs() -> BlockFs {
        BlockFsBuilder::new()
            .total_blocks(32)
            .block_size(4)
            .without_sample()
            .build()
            .unwrap()
    }

    #[test]
    fn test_request_wire_format() {
        let request: Request = serde_json::from_value(json!({
            "op": "rename",
            "oldPath": "/a",
            "newPath": "/b"
        }))
        .unwrap();
        assert_eq!(
            request,
            Request::Rename {
                old_path: "/a".to_string(),
                new_path: "/b".to_string()
            }
        );

        let request: Request =
            serde_json::from_value(json!({"op": "write", "path": "/a", "content": "x"})).unwrap();
        assert!(matches!(request, Request::Write { append: false, .. }));
    }

    #[test]
    fn test_success_and_failure_envelopes() {
        let fs = fs();
        let ok = fs.dispatch(Request::Mkdir {
            path: "/docs".to_string(),
        });
        assert!(ok.success);
        assert!(ok.error.is_none());

        let dup = fs.dispatch(Request::Mkdir {
            path: "/docs".to_string(),
        });
        assert!(!dup.success);
        assert_eq!(dup.kind, Some(ErrorKind::AlreadyExists));

        let json: Value = serde_json::to_value(&dup).unwrap();
        assert_eq!(json["kind"], "already_exists");
        assert!(json.get("items").is_none());
    }

    #[test]
    fn test_list_and_read() {
        let fs = fs();
        fs.create_or_overwrite("/hello.txt", b"hi there").unwrap();

        let listed = fs.dispatch(Request::List {
            path: "/".to_string(),
        });
        let items = listed.items.unwrap();
        assert_eq!(items[0].name, "hello.txt");
        assert_eq!(items[0].size_bytes, 8);

        let read = fs.dispatch(Request::Read {
            path: "/hello.txt".to_string(),
        });
        assert_eq!(read.content.as_deref(), Some("hi there"));
    }

    #[test]
    fn test_dispatch_json() {
        let fs = fs();
        let out: Value = serde_json::from_str(&fs.dispatch_json(
            r#"{"op":"createOrOverwrite","path":"/a.txt","content":"abc"}"#,
        ))
        .unwrap();
        assert_eq!(out["success"], true);

        let out: Value = serde_json::from_str(&fs.dispatch_json(r#"{"op":"stats"}"#)).unwrap();
        assert_eq!(out["stats"]["usedBlocks"], 1);
        assert_eq!(out["stats"]["filesByStrategy"]["contiguous"], 1);

        let out: Value = serde_json::from_str(&fs.dispatch_json("not json")).unwrap();
        assert_eq!(out["success"], false);
        assert_eq!(out["kind"], "invalid_argument");
    }

    #[test]
    fn test_insufficient_storage_kind() {
        let fs = fs();
        let response = fs.dispatch(Request::CreateOrOverwrite {
            path: "/huge".to_string(),
            content: "x".repeat(1000),
        });
        assert!(!response.success);
        assert_eq!(response.kind, Some(ErrorKind::InsufficientStorage));
        assert_eq!(fs.stats().used_blocks, 0);
    }
}
