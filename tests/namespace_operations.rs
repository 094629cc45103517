//! Namespace tree operations through the public API

use blockfs::{BlockFs, BlockFsBuilder, ErrorKind, FsError};

fn empty_fs() -> BlockFs {
    BlockFsBuilder::new()
        .total_blocks(200)
        .block_size(8)
        .without_sample()
        .build()
        .unwrap()
}

#[test]
fn test_sample_namespace_layout() {
    let fs = BlockFs::new().unwrap();

    let root: Vec<String> = fs.list("/").unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(root, vec!["documents", "music", "pictures"]);

    let docs = fs.list("/documents").unwrap();
    let names: Vec<&str> = docs.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["personal", "readme.txt", "work"]);
    assert!(docs[0].is_directory);
    assert_eq!(docs[1].size_bytes, "This is a sample readme file.".len() as u64);
    assert_eq!(docs[1].path, "/documents/readme.txt");

    assert_eq!(
        fs.read_to_string("/documents/work/report.txt").unwrap(),
        "Annual report content would go here."
    );
    assert_eq!(
        fs.read_to_string("/pictures/vacation.jpg").unwrap(),
        "[BINARY IMAGE DATA]"
    );
    fs.check_consistency().unwrap();
}

#[test]
fn test_list_errors() {
    let fs = empty_fs();
    fs.create_or_overwrite("/file", b"x").unwrap();

    assert_eq!(fs.list("/missing").unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(fs.list("/file").unwrap_err().kind(), ErrorKind::NotADirectory);
    assert!(fs.list("/").unwrap().len() == 1);
}

#[test]
fn test_path_normalization() {
    let fs = empty_fs();
    fs.mkdir("/a").unwrap();
    fs.create_or_overwrite("//a/./b.txt", b"hello").unwrap();

    assert_eq!(fs.read("/a/b.txt").unwrap(), b"hello");
    assert_eq!(fs.read("/a/../a/b.txt").unwrap(), b"hello");
    assert!(matches!(fs.read("a/b.txt"), Err(FsError::InvalidArgument(_))));
    assert!(matches!(fs.mkdir("/.."), Err(FsError::RootViolation(_))));
}

#[test]
fn test_overwrite_and_append() {
    let fs = empty_fs();
    fs.create_or_overwrite("/log", b"first").unwrap();
    fs.create_or_overwrite("/log", b"second").unwrap();
    assert_eq!(fs.read("/log").unwrap(), b"second");

    fs.append("/log", b" third").unwrap();
    assert_eq!(fs.read("/log").unwrap(), b"second third");
    assert_eq!(fs.allocation("/log").unwrap().block_count(), 2);

    assert!(matches!(
        fs.append("/nope", b"x"),
        Err(FsError::NotFound(_))
    ));
    fs.mkdir("/dir").unwrap();
    assert!(matches!(
        fs.write("/dir", b"x", false),
        Err(FsError::NotAFile(_))
    ));
    assert!(matches!(fs.read("/dir"), Err(FsError::NotAFile(_))));
}

#[test]
fn test_failed_rewrite_keeps_content_and_blocks() {
    let fs = BlockFsBuilder::new()
        .total_blocks(10)
        .block_size(1)
        .large_file_threshold(100)
        .without_sample()
        .build()
        .unwrap();
    fs.create_or_overwrite("/keep", b"abcd").unwrap();
    fs.create_or_overwrite("/other", b"efgh").unwrap();
    let record = fs.allocation("/keep").unwrap();
    let snapshot = fs.snapshot();

    assert!(fs.append("/keep", b"ijklmn").is_err());

    assert_eq!(fs.read("/keep").unwrap(), b"abcd");
    assert_eq!(fs.allocation("/keep").unwrap(), record);
    assert_eq!(fs.snapshot(), snapshot);
}

#[test]
fn test_recursive_delete() {
    let fs = empty_fs();
    fs.mkdir("/top").unwrap();
    fs.mkdir("/top/mid").unwrap();
    fs.mkdir("/top/mid/leaf").unwrap();
    fs.create_or_overwrite("/top/a", &[1; 20]).unwrap();
    fs.create_or_overwrite("/top/mid/b", &[2; 50]).unwrap();
    fs.create_or_overwrite("/top/mid/leaf/c", &[3; 9]).unwrap();
    fs.create_or_overwrite("/outside", b"stay").unwrap();
    let outside = fs.allocation("/outside").unwrap().block_count();

    fs.delete("/top").unwrap();

    let stats = fs.stats();
    assert_eq!(stats.used_blocks, outside);
    assert_eq!(stats.file_count, 1);
    assert_eq!(stats.directory_count, 0);
    assert!(matches!(fs.delete("/"), Err(FsError::RootViolation(_))));
    fs.check_consistency().unwrap();
}

#[test]
fn test_rename_file_and_directory() {
    let fs = BlockFs::new().unwrap();

    fs.rename("/documents/readme.txt", "/documents/README").unwrap();
    assert_eq!(
        fs.read_to_string("/documents/README").unwrap(),
        "This is a sample readme file."
    );

    fs.rename("/documents", "/music/docs").unwrap();
    assert!(!fs.exists("/documents").unwrap());
    assert_eq!(
        fs.read_to_string("/music/docs/work/report.txt").unwrap(),
        "Annual report content would go here."
    );

    let snapshot = fs.snapshot();
    let record = fs.allocation("/music/docs/personal/notes.txt").unwrap();
    for block in record.blocks() {
        assert_eq!(
            snapshot.blocks[block].owner(),
            Some("/music/docs/personal/notes.txt")
        );
    }
    fs.check_consistency().unwrap();
}

#[test]
fn test_rename_rejections() {
    let fs = BlockFs::new().unwrap();

    assert_eq!(
        fs.rename("/", "/x").unwrap_err().kind(),
        ErrorKind::RootViolation
    );
    assert_eq!(
        fs.rename("/music", "/pictures").unwrap_err().kind(),
        ErrorKind::AlreadyExists
    );
    assert_eq!(
        fs.rename("/ghost", "/x").unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        fs.rename("/music", "/nowhere/music").unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        fs.rename("/documents", "/documents/work/inner").unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    fs.check_consistency().unwrap();
}

#[test]
fn test_timestamps_move_forward() {
    let fs = empty_fs();
    fs.create_or_overwrite("/t", b"1").unwrap();
    let created = fs.list("/").unwrap()[0].modified_at;

    fs.write("/t", b"2", false).unwrap();
    let modified = fs.list("/").unwrap()[0].modified_at;
    assert!(modified >= created);
}
