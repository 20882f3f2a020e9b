use std::os::unix::process::CommandExt;

use color_eyre::eyre::Result;

use crate::config::runtime_dir;
use crate::logging::log_files;

pub fn run(lines: usize, follow: bool) -> Result<()> {
    let files = log_files();

    let Some(path) = files.last() else {
        println!("No log files found in {:?}", runtime_dir());
        println!("Log files are written by the background monitor.");
        return Ok(());
    };

    if follow {
        let err = std::process::Command::new("tail")
            .args(["-f", "-n", &lines.to_string()])
            .arg(path)
            .exec();
        return Err(err.into());
    }

    std::process::Command::new("tail")
        .args(["-n", &lines.to_string()])
        .arg(path)
        .status()?;

    Ok(())
}
