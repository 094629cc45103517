#![no_main]
use blockfs::BlockFsBuilder;
use libfuzzer_sys::{
    arbitrary::{Arbitrary, Unstructured},
    fuzz_target,
};

const PATHS: &[&str] = &["/a", "/b", "/d", "/d/x", "/d/e", "/d/e/y", "/test/linked/z"];

#[derive(Debug, Arbitrary)]
enum FsOp {
    Mkdir { path_idx: u8 },
    Create { path_idx: u8, data: Vec<u8> },
    Append { path_idx: u8, data: Vec<u8> },
    Delete { path_idx: u8 },
    Rename { from_idx: u8, to_idx: u8 },
    Defragment,
}

fn path(idx: u8) -> &'static str {
    PATHS[idx as usize % PATHS.len()]
}

// Random operation sequences must never break the block invariants
fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);

    let auto_defragment: bool = u.arbitrary().unwrap_or(true);
    let ops: Vec<FsOp> = match u.arbitrary() {
        Ok(ops) => ops,
        Err(_) => return,
    };

    let fs = match BlockFsBuilder::new()
        .total_blocks(48)
        .block_size(8)
        .auto_defragment(auto_defragment)
        .without_sample()
        .build()
    {
        Ok(fs) => fs,
        Err(_) => return,
    };
    let _ = fs.mkdir("/test");
    let _ = fs.mkdir("/test/linked");

    for op in ops.iter().take(64) {
        let _ = match op {
            FsOp::Mkdir { path_idx } => fs.mkdir(path(*path_idx)),
            FsOp::Create { path_idx, data } => fs.create_or_overwrite(path(*path_idx), data),
            FsOp::Append { path_idx, data } => fs.append(path(*path_idx), data),
            FsOp::Delete { path_idx } => fs.delete(path(*path_idx)),
            FsOp::Rename { from_idx, to_idx } => fs.rename(path(*from_idx), path(*to_idx)),
            FsOp::Defragment => {
                fs.defragment();
                Ok(())
            }
        };

        if let Err(e) = fs.check_consistency() {
            panic!("invariant broken after {:?}: {}", op, e);
        }
    }
});
