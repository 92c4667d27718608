use std::path::Path;

use anyhow::{Context, Result};

pub fn init_command(path: &Path) -> Result<()> {
    segzone::create_example_config(path)
        .with_context(|| format!("Failed to write example configuration to {}", path.display()))?;
    println!("Wrote example configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_writes_loadable_config() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("segzone.yaml");
        init_command(&path)?;
        segzone::load_config(&path)?;

        // A second init must not clobber the file.
        assert!(init_command(&path).is_err());
        Ok(())
    }
}
