//! `nakalator init` command implementation
//!
//! Scaffolds a Nakalator workspace: the data, metadata and output
//! directories, a credentials file and an example job file.

use crate::config::{Workspace, WORKSPACE_DIR_NAME};
use crate::error::{CliError, Result};
use crate::templates;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Create `<path>/nakalator_workspace`
pub async fn run(path: String, force: bool) -> Result<PathBuf> {
    let root = PathBuf::from(&path).join(WORKSPACE_DIR_NAME);
    let workspace = Workspace::new(&root);

    if root.exists() && !force {
        return Err(CliError::AlreadyInitialized(root.display().to_string()));
    }

    create_workspace(&workspace)?;
    info!(workspace = %root.display(), "Workspace initialized");
    print_tree(&root);

    Ok(root)
}

fn create_workspace(workspace: &Workspace) -> Result<()> {
    fs::create_dir_all(workspace.data_dir())?;
    fs::create_dir_all(workspace.metadatas_dir())?;
    fs::create_dir_all(workspace.output_dir())?;

    // Keys already filled in are never overwritten, even with --force.
    let credentials = workspace.credentials_path();
    if !credentials.exists() {
        fs::write(&credentials, templates::CREDENTIALS)?;
    }

    fs::write(
        workspace.metadatas_dir().join(templates::METADATA_EXAMPLE_FILE),
        templates::METADATA_EXAMPLE,
    )?;
    Ok(())
}

fn print_tree(root: &Path) {
    println!("{} Initialized Nakalator workspace", "✓".green());
    println!();
    println!("  {}", root.display().to_string().cyan().bold());
    println!("  ├── data/         files to send (images, pdf, xml, audio...)");
    println!("  ├── metadatas/    job files (YAML)");
    println!("  │   └── {}", templates::METADATA_EXAMPLE_FILE);
    println!("  ├── output/       mapping reports");
    println!("  └── credentials.yml");
    println!();
    println!("Next steps:");
    println!("  1. cd {}", root.display());
    println!("  2. Fill in your Nakala API keys in credentials.yml");
    println!("  3. Put the files to send under data/<project>/");
    println!("  4. Describe them in metadatas/ (start from {})", templates::METADATA_EXAMPLE_FILE);
    println!("  5. Run {}", "nakalator main".yellow());
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_command() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_string_lossy().to_string();

        let root = run(path, false).await.unwrap();

        assert_eq!(root, temp_dir.path().join(WORKSPACE_DIR_NAME));
        assert!(root.join("data").is_dir());
        assert!(root.join("output").is_dir());
        assert!(root.join("credentials.yml").is_file());
        assert!(root.join("metadatas").join(templates::METADATA_EXAMPLE_FILE).is_file());
    }

    #[tokio::test]
    async fn test_init_twice_needs_force_and_keeps_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_string_lossy().to_string();

        let root = run(path.clone(), false).await.unwrap();
        fs::write(root.join("credentials.yml"), "API_NAKALA_KEY_TEST: \"mine\"\n").unwrap();

        assert!(matches!(
            run(path.clone(), false).await,
            Err(CliError::AlreadyInitialized(_))
        ));

        run(path, true).await.unwrap();
        let credentials = fs::read_to_string(root.join("credentials.yml")).unwrap();
        assert!(credentials.contains("mine"));
    }
}
