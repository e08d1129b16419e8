use std::path::PathBuf;

use mtrack_core::config::write_default_config;

/// Write the commented default configuration.
///
/// Without a path the file goes to `~/mtrack/mtrack.yml`, the last place
/// config discovery looks. Existing files are kept unless `force` is true.
pub fn cmd_init(path: Option<PathBuf>, force: bool) -> Result<(), String> {
    let target = match path {
        Some(path) => path,
        None => dirs::home_dir()
            .ok_or("Could not determine home directory")?
            .join("mtrack")
            .join("mtrack.yml"),
    };

    if target.exists() && !force {
        println!("  Skipped: {} (exists, use --force to overwrite)", target.display());
        return Ok(());
    }

    write_default_config(&target, force)
        .map_err(|e| format!("Failed to write {}: {}", target.display(), e))?;
    println!("  Wrote: {}", target.display());
    println!();
    println!("Edit this file to set acquisition parameters and filter defaults.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtrack_core::config::load_config_file;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("mtrack.yml");
        cmd_init(Some(path.clone()), false).unwrap();
        assert!(load_config_file(&path).is_ok());

        std::fs::write(&path, "acquisition:\n  fps: 9.0\n").unwrap();
        cmd_init(Some(path.clone()), false).unwrap();
        assert_eq!(load_config_file(&path).unwrap().acquisition.fps, 9.0);

        cmd_init(Some(path.clone()), true).unwrap();
        assert_eq!(load_config_file(&path).unwrap().acquisition.fps, 1.0);
    }
}
