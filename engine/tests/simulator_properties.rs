//! Whole-engine properties driven through `Simulator`: a write survives an
//! unmount/remount round trip, link/unlink preserve or remove data by the
//! right names, a mounted device is transparent to path resolution, and
//! `dup`/`dup2` alias the same open-file description.

mod common;

use ext2sim_engine::open_file::OpenMode;
use ext2sim_engine::Simulator;

fn fresh_image(dir: &std::path::Path, name: &str) -> std::path::PathBuf {
    let image = dir.join(name);
    common::format_image(&image);
    image
}

#[test]
fn write_survives_flush_and_remount() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = fresh_image(dir.path(), "disk0");

    {
        let mut sim = Simulator::new(&image).expect("mount");
        sim.creat("/f").unwrap();
        let fd = sim.open("/f", OpenMode::Write).unwrap();
        sim.write(fd, b"round trip").unwrap();
        sim.close(fd).unwrap();
        sim.flush().expect("flush dirty inodes before drop");
    }

    let mut sim = Simulator::new(&image).expect("remount");
    assert_eq!(sim.cat("/f").unwrap(), b"round trip");
}

#[test]
fn link_then_unlink_preserves_data_under_the_surviving_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = fresh_image(dir.path(), "disk0");
    let mut sim = Simulator::new(&image).unwrap();

    sim.creat("/a").unwrap();
    let fd = sim.open("/a", OpenMode::Write).unwrap();
    sim.write(fd, b"shared").unwrap();
    sim.close(fd).unwrap();

    sim.link("/a", "/b").unwrap();
    assert_eq!(sim.stat("/a").unwrap().inode_num, sim.stat("/b").unwrap().inode_num);
    assert_eq!(sim.cat("/b").unwrap(), b"shared");

    sim.unlink("/a").unwrap();
    assert_eq!(sim.cat("/b").unwrap(), b"shared", "data must survive under the other name");
    assert!(sim.stat("/a").is_err(), "the unlinked name must be gone");
}

#[test]
fn unlinking_the_last_name_removes_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = fresh_image(dir.path(), "disk0");
    let mut sim = Simulator::new(&image).unwrap();

    sim.creat("/solo").unwrap();
    sim.unlink("/solo").unwrap();
    assert!(sim.stat("/solo").is_err());
}

#[test]
fn mounted_device_is_transparent_to_path_resolution() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root_image = fresh_image(dir.path(), "disk0");
    let child_image = fresh_image(dir.path(), "disk1");

    let mut sim = Simulator::new(&root_image).unwrap();
    sim.mkdir("/mnt").unwrap();
    sim.mount(&child_image, "/mnt").unwrap();

    sim.creat("/mnt/inner").unwrap();
    let info = sim.stat("/mnt/inner").unwrap();
    assert_eq!(info.size, 0);

    let listing = sim.ls("/mnt").unwrap().join("\n");
    assert!(listing.contains("inner"));
}

#[test]
fn umount_detaches_a_quiescent_device() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root_image = fresh_image(dir.path(), "disk0");
    let child_image = fresh_image(dir.path(), "disk1");

    let mut sim = Simulator::new(&root_image).unwrap();
    sim.mkdir("/mnt").unwrap();
    sim.mount(&child_image, "/mnt").unwrap();
    sim.umount("/mnt").unwrap();

    assert_eq!(sim.ls("/mnt").unwrap().len(), 2, "only \".\" and \"..\" remain once the mounted device is detached");
}

#[test]
fn dup_aliases_the_same_offset() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = fresh_image(dir.path(), "disk0");
    let mut sim = Simulator::new(&image).unwrap();

    sim.creat("/f").unwrap();
    let fd = sim.open("/f", OpenMode::Write).unwrap();
    sim.write(fd, b"0123456789").unwrap();
    sim.close(fd).unwrap();

    let fd = sim.open("/f", OpenMode::Read).unwrap();
    let alias = sim.dup(fd).unwrap();
    sim.read(fd, 4).unwrap();
    assert_eq!(sim.read(alias, 100).unwrap(), b"456789", "dup must share fd's advanced offset");
}

#[test]
fn dup2_aliases_fd_onto_new_fd_and_drops_its_previous_target() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = fresh_image(dir.path(), "disk0");
    let mut sim = Simulator::new(&image).unwrap();

    sim.creat("/f").unwrap();
    let fd = sim.open("/f", OpenMode::Write).unwrap();
    sim.write(fd, b"0123456789").unwrap();
    sim.close(fd).unwrap();
    let fd = sim.open("/f", OpenMode::Read).unwrap();
    sim.read(fd, 4).unwrap();

    sim.creat("/g").unwrap();
    let other = sim.open("/g", OpenMode::Read).unwrap();
    sim.dup2(fd, other).unwrap();

    assert_eq!(sim.read(other, 100).unwrap(), b"456789", "dup2 must alias fd's file and offset onto other");
}
