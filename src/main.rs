use sectorfs::{Error, Filesystem};

use sectorfs::structs::DIRENT_SIZE;

fn prompt(separator: &str) -> Option<Vec<String>> {
    use std::io::Write;
    let mut line = String::new();
    print!("{separator}");
    std::io::stdout().flush().unwrap();
    match std::io::stdin().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line.trim().split_whitespace().map(str::to_string).collect()),
        Err(_) => None,
    }
}

fn list(fs: &Filesystem, path: &str) -> Result<(), Error> {
    let bytes = fs.dir_size(path)?;
    let mut buffer = vec![0u8; bytes];
    let count = fs.read_dir(path, &mut buffer)?;
    for entry in buffer.chunks_exact(DIRENT_SIZE).take(count) {
        let end = entry.iter().position(|b| *b == 0).unwrap_or(16);
        if end == 0 {
            continue;
        }
        let name = String::from_utf8_lossy(&entry[..end]);
        let inode = u32::from_ne_bytes(entry[16..20].try_into().unwrap());
        println!("{inode:6}  {name}");
    }
    Ok(())
}

fn execute(fs: &mut Filesystem, cmd: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if cmd.is_empty() {
        return Ok(());
    }
    match (cmd[0].as_str(), &cmd[1..]) {
        ("ls", [path]) => list(fs, path)?,
        ("mkdir", [path]) => fs.create_dir(path)?,
        ("touch", [path]) => fs.create_file(path)?,
        ("rm", [path]) => fs.unlink_file(path)?,
        ("rmdir", [path]) => fs.unlink_dir(path)?,
        ("open", [path]) => println!("fd {}", fs.open(path)?),
        ("close", [fd]) => fs.close(fd.parse()?)?,
        ("seek", [fd, offset]) => fs.seek(fd.parse()?, offset.parse()?)?,
        ("write", [fd, text]) => {
            println!("{} bytes", fs.write(fd.parse()?, text.as_bytes())?);
        }
        ("read", [fd, count]) => {
            let mut buffer = vec![0u8; count.parse()?];
            let read = fs.read(fd.parse()?, &mut buffer)?;
            println!("{} bytes: {}", read, String::from_utf8_lossy(&buffer[..read]));
        }
        ("sync", []) => fs.sync()?,
        ("help", _) => {
            println!("ls mkdir touch rm rmdir open close seek write read sync quit");
        }
        _ => println!("unknown command, try 'help'"),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let backstore = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/tmp/sectorfs.img".to_owned());
    let mut fs = Filesystem::boot(backstore)?;
    loop {
        let cmd = match prompt(">> ") {
            Some(cmd) => cmd,
            None => break,
        };
        if cmd.first().map(String::as_str) == Some("quit") {
            break;
        }
        if let Err(e) = execute(&mut fs, &cmd) {
            eprintln!("{e}");
        }
    }
    fs.sync()?;
    Ok(())
}
