//! Interactive front end: mounts a disk image and runs a REPL over
//! [`ext2sim_engine::Simulator`].
//!
//! Grounded on `apps/shell/src/main.rs`'s `BTreeMap<&str, fn>` dispatch table
//! and `original_source/FileSystem.cpp::execute`'s flat command list; argument
//! parsing is whitespace splitting only, same as the original's single-space
//! tokenizer.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use argh::FromArgs;
use ext2sim_engine::open_file::OpenMode;
use ext2sim_engine::{EngineError, Simulator};

#[derive(FromArgs)]
/// ext2 file system simulator
struct Args {
    /// path to the disk image to mount as the root (default "disk0")
    #[argh(positional, default = "PathBuf::from(\"disk0\")")]
    image: PathBuf,
}

type CommandHandler = fn(&mut Simulator, &[&str]) -> Result<Option<String>>;

fn usage(name: &str) -> anyhow::Error {
    anyhow!("usage: {name} ...")
}

fn cmd_pwd(sim: &mut Simulator, _args: &[&str]) -> Result<Option<String>> {
    Ok(Some(sim.pwd()?))
}

fn cmd_cd(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let path = args.first().ok_or_else(|| usage("cd"))?;
    sim.cd(path)?;
    Ok(None)
}

fn cmd_ls(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let path = args.first().copied().unwrap_or(".");
    Ok(Some(sim.ls(path)?.join("\n")))
}

fn cmd_mkdir(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let path = args.first().ok_or_else(|| usage("mkdir"))?;
    sim.mkdir(path)?;
    Ok(None)
}

fn cmd_creat(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let path = args.first().ok_or_else(|| usage("creat"))?;
    sim.creat(path)?;
    Ok(None)
}

fn cmd_rmdir(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let path = args.first().ok_or_else(|| usage("rmdir"))?;
    sim.rmdir(path)?;
    Ok(None)
}

fn cmd_link(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let [src, dst] = two_args("link", args)?;
    sim.link(src, dst)?;
    Ok(None)
}

fn cmd_unlink(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let path = args.first().ok_or_else(|| usage("unlink"))?;
    sim.unlink(path)?;
    Ok(None)
}

fn cmd_symlink(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let [src, dst] = two_args("symlink", args)?;
    sim.symlink(src, dst)?;
    Ok(None)
}

fn cmd_stat(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let path = args.first().ok_or_else(|| usage("stat"))?;
    let info = sim.stat(path)?;
    Ok(Some(format!(
        "device={} inode={:?} size={} uid={} gid={} mode={:o} mtime={}",
        info.device,
        info.inode_num,
        info.size,
        info.uid.0,
        info.gid.0,
        info.mode,
        info.mtime.0
    )))
}

fn cmd_chmod(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let [mode, path] = two_args("chmod", args)?;
    let mode = u16::from_str_radix(mode, 8).with_context(|| format!("{mode}: not an octal mode"))?;
    sim.chmod(path, mode)?;
    Ok(None)
}

fn cmd_utime(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let path = args.first().ok_or_else(|| usage("utime"))?;
    sim.utime(path)?;
    Ok(None)
}

fn cmd_cp(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let [src, dst] = two_args("cp", args)?;
    sim.cp(src, dst)?;
    Ok(None)
}

fn cmd_mv(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let [src, dst] = two_args("mv", args)?;
    sim.mv(src, dst)?;
    Ok(None)
}

fn cmd_mount(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    if args.is_empty() {
        return Ok(Some(sim.mounts().join("\n")));
    }
    let [image, path] = two_args("mount", args)?;
    sim.mount(&PathBuf::from(image), path)?;
    Ok(None)
}

fn cmd_umount(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let path = args.first().ok_or_else(|| usage("umount"))?;
    sim.umount(path)?;
    Ok(None)
}

fn cmd_open(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let [path, mode] = two_args("open", args)?;
    let mode = mode.parse::<u8>().with_context(|| format!("{mode}: not an open mode"))?;
    let fd = sim.open(path, OpenMode::from_u8(mode)?)?;
    Ok(Some(fd.to_string()))
}

fn cmd_close(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let fd = one_usize("close", args)?;
    sim.close(fd)?;
    Ok(None)
}

fn cmd_dup(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let fd = one_usize("dup", args)?;
    Ok(Some(sim.dup(fd)?.to_string()))
}

fn cmd_dup2(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let [fd, new_fd] = two_usize("dup2", args)?;
    sim.dup2(fd, new_fd)?;
    Ok(None)
}

fn cmd_lseek(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let [fd, offset] = two_args("lseek", args)?;
    let fd = fd.parse::<usize>().with_context(|| format!("{fd}: not a descriptor"))?;
    let offset = offset.parse::<u32>().with_context(|| format!("{offset}: not an offset"))?;
    Ok(Some(sim.lseek(fd, offset)?.to_string()))
}

fn cmd_read(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let [fd, n] = two_args("read", args)?;
    let fd = fd.parse::<usize>().with_context(|| format!("{fd}: not a descriptor"))?;
    let n = n.parse::<u32>().with_context(|| format!("{n}: not a byte count"))?;
    let bytes = sim.read(fd, n)?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

fn cmd_write(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let fd = args.first().ok_or_else(|| usage("write"))?.parse::<usize>().with_context(|| "not a descriptor".to_string())?;
    let text = args.get(1..).unwrap_or_default().join(" ");
    let written = sim.write(fd, text.as_bytes())?;
    Ok(Some(written.to_string()))
}

fn cmd_cat(sim: &mut Simulator, args: &[&str]) -> Result<Option<String>> {
    let path = args.first().ok_or_else(|| usage("cat"))?;
    let bytes = sim.cat(path)?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

fn cmd_pfd(sim: &mut Simulator, _args: &[&str]) -> Result<Option<String>> {
    Ok(Some(sim.pfd().join("\n")))
}

fn cmd_quit(sim: &mut Simulator, _args: &[&str]) -> Result<Option<String>> {
    sim.flush()?;
    std::process::exit(0);
}

fn cmd_menu(_sim: &mut Simulator, _args: &[&str]) -> Result<Option<String>> {
    Ok(Some(
        "pwd cd ls mkdir creat rmdir link unlink symlink stat chmod utime\n\
         pfd open close lseek dup dup2 read cat write cp mv mount umount\n\
         quit exit help menu"
            .to_owned(),
    ))
}

fn two_args<'a>(name: &str, args: &[&'a str]) -> Result<[&'a str; 2]> {
    match args {
        [a, b, ..] => Ok([*a, *b]),
        _ => Err(usage(name)),
    }
}

fn one_usize(name: &str, args: &[&str]) -> Result<usize> {
    args.first()
        .ok_or_else(|| usage(name))?
        .parse::<usize>()
        .with_context(|| format!("{name}: not a descriptor"))
}

fn two_usize(name: &str, args: &[&str]) -> Result<[usize; 2]> {
    let [a, b] = two_args(name, args)?;
    Ok([
        a.parse::<usize>().with_context(|| format!("{name}: not a descriptor"))?,
        b.parse::<usize>().with_context(|| format!("{name}: not a descriptor"))?,
    ])
}

fn dispatch_table() -> BTreeMap<&'static str, CommandHandler> {
    let mut table = BTreeMap::<&'static str, CommandHandler>::new();
    table.insert("pwd", cmd_pwd);
    table.insert("cd", cmd_cd);
    table.insert("ls", cmd_ls);
    table.insert("dir", cmd_ls);
    table.insert("mkdir", cmd_mkdir);
    table.insert("md", cmd_mkdir);
    table.insert("creat", cmd_creat);
    table.insert("rmdir", cmd_rmdir);
    table.insert("rd", cmd_rmdir);
    table.insert("link", cmd_link);
    table.insert("unlink", cmd_unlink);
    table.insert("rm", cmd_unlink);
    table.insert("symlink", cmd_symlink);
    table.insert("stat", cmd_stat);
    table.insert("chmod", cmd_chmod);
    table.insert("utime", cmd_utime);
    table.insert("touch", cmd_utime);
    table.insert("cp", cmd_cp);
    table.insert("mv", cmd_mv);
    table.insert("mount", cmd_mount);
    table.insert("umount", cmd_umount);
    table.insert("open", cmd_open);
    table.insert("close", cmd_close);
    table.insert("dup", cmd_dup);
    table.insert("dup2", cmd_dup2);
    table.insert("lseek", cmd_lseek);
    table.insert("read", cmd_read);
    table.insert("write", cmd_write);
    table.insert("cat", cmd_cat);
    table.insert("pfd", cmd_pfd);
    table.insert("quit", cmd_quit);
    table.insert("exit", cmd_quit);
    table.insert("menu", cmd_menu);
    table.insert("help", cmd_menu);
    table
}

fn run(sim: &mut Simulator, table: &BTreeMap<&'static str, CommandHandler>) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "\n{}$ ", sim.pwd().unwrap_or_default())?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((command, args)) = tokens.split_first() else {
            continue;
        };

        let Some(handler) = table.get(command) else {
            eprintln!("* invalid command");
            continue;
        };

        match handler(sim, args) {
            Ok(Some(output)) if !output.is_empty() => println!("{output}"),
            Ok(_) => {}
            Err(err) => match err.downcast_ref::<EngineError>() {
                Some(engine_err) if engine_err.is_fatal() => bail!("fatal: {engine_err}"),
                _ => eprintln!("* {err}"),
            },
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut sim = match Simulator::new(&args.image) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    println!("Enter menu or help to see a summary of available commands");
    let table = dispatch_table();
    match run(&mut sim, &table) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
