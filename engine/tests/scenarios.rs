//! The six concrete scenarios a freshly mounted empty image must satisfy.

mod common;

use ext2sim_engine::open_file::OpenMode;
use ext2sim_engine::permissions::FileType;
use ext2sim_engine::Simulator;

fn fresh_simulator() -> (tempfile::TempDir, Simulator) {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("disk0");
    common::format_image(&image);
    let sim = Simulator::new(&image).expect("mount fresh image");
    (dir, sim)
}

#[test]
fn scenario_1_mkdir_nested_creat_stat() {
    let (_dir, mut sim) = fresh_simulator();
    sim.mkdir("/a").unwrap();
    sim.mkdir("/a/b").unwrap();
    sim.creat("/a/b/f").unwrap();

    let info = sim.stat("/a/b/f").unwrap();
    assert_eq!(info.size, 0);
    assert_eq!(FileType::from_mode(info.mode), FileType::Regular);
}

#[test]
fn scenario_2_write_then_cat() {
    let (_dir, mut sim) = fresh_simulator();
    sim.creat("/x").unwrap();
    let fd = sim.open("/x", OpenMode::Write).unwrap();
    sim.write(fd, b"hello").unwrap();
    sim.close(fd).unwrap();

    assert_eq!(sim.cat("/x").unwrap(), b"hello");
}

#[test]
fn scenario_3_link_unlink_cat() {
    let (_dir, mut sim) = fresh_simulator();
    sim.creat("/y").unwrap();
    let fd = sim.open("/y", OpenMode::Write).unwrap();
    sim.write(fd, b"payload").unwrap();
    sim.close(fd).unwrap();

    sim.link("/y", "/z").unwrap();
    sim.unlink("/y").unwrap();

    assert_eq!(sim.cat("/z").unwrap(), b"payload");
}

#[test]
fn scenario_4_rmdir_empty_vs_nonempty() {
    let (_dir, mut sim) = fresh_simulator();
    sim.mkdir("/d").unwrap();
    sim.rmdir("/d").unwrap();

    sim.mkdir("/d").unwrap();
    sim.creat("/d/f").unwrap();
    let err = sim.rmdir("/d").unwrap_err();
    assert!(err.to_string().contains("not empty"));
}

#[test]
fn scenario_5_open_already_open_diagnostic() {
    let (_dir, mut sim) = fresh_simulator();
    sim.creat("/p").unwrap();
    sim.open("/p", OpenMode::Read).unwrap();
    sim.open("/p", OpenMode::Read).unwrap();
    let err = sim.open("/p", OpenMode::Write).unwrap_err();
    assert!(err.to_string().contains("already open"));
}

#[test]
fn scenario_6_symlink_ls() {
    let (_dir, mut sim) = fresh_simulator();
    sim.mkdir("/a").unwrap();
    sim.mkdir("/a/b").unwrap();
    sim.symlink("/a/b", "/sym").unwrap();

    let listing = sim.ls("/sym").unwrap().join("\n");
    assert!(listing.contains("sym -> /a/b"));
}

#[test]
fn link_onto_the_filesystem_root_is_refused() {
    let (_dir, mut sim) = fresh_simulator();
    sim.creat("/a").unwrap();
    let err = sim.link("/a", "/").unwrap_err();
    assert!(err.to_string().contains("refused"));

    assert_eq!(sim.ls("/").unwrap().len(), 3, "\".\", \"..\" and \"a\"; no zero-length entry was inserted");
}
