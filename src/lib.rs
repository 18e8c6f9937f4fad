pub mod config;
pub mod error;
pub mod organize;

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Command;
use clap_complete::Shell;
use colored::{ColoredString, Colorize};

/// Format bool value as a coloured string.
#[must_use]
pub fn colorize_bool(value: bool) -> ColoredString {
    if value { "true".green() } else { "false".red() }
}

/// Check if entry is a hidden file or directory (starts with '.')
#[must_use]
pub fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    let name_bytes = entry.file_name().as_encoded_bytes();
    !name_bytes.is_empty() && name_bytes[0] == b'.'
}

/// Resolves the provided input path to a directory or file to an absolute path.
///
/// If `path` is `None`, the current working directory is used.
/// The function verifies that the provided path exists and is accessible,
/// returning an error if it does not.
/// ```rust
/// use std::path::{Path, PathBuf};
/// use viewsort::resolve_input_path;
///
/// let path = Path::new("src");
/// let absolute_path = resolve_input_path(Some(path)).unwrap();
/// ```
#[inline]
pub fn resolve_input_path(path: Option<&Path>) -> Result<PathBuf> {
    let input_path = path
        .map(|p| p.to_str().unwrap_or(""))
        .unwrap_or_default()
        .trim()
        .to_string();

    let filepath = if input_path.is_empty() {
        env::current_dir().context("Failed to get current working directory")?
    } else {
        PathBuf::from(input_path)
    };
    if !filepath.exists() {
        anyhow::bail!(
            "Input path does not exist or is not accessible: '{}'",
            filepath.display()
        );
    }

    let absolute_input_path = dunce::canonicalize(&filepath)?;

    // Canonicalize fails for network drives on Windows :(
    if path_to_string(&absolute_input_path).starts_with(r"\\?") && !path_to_string(&filepath).starts_with(r"\\?") {
        Ok(filepath)
    } else {
        Ok(absolute_input_path)
    }
}

/// Resolves the output directory, which does not need to exist yet.
///
/// Relative paths are joined to the current working directory.
#[inline]
pub fn resolve_output_path(path: &Path) -> Result<PathBuf> {
    let output_path = path_to_string(path).trim().to_string();
    if output_path.is_empty() {
        anyhow::bail!("Output path is empty");
    }
    let output_path = PathBuf::from(output_path);
    if output_path.is_absolute() {
        return Ok(dunce::simplified(&output_path).to_path_buf());
    }
    let current_dir = env::current_dir().context("Failed to get current working directory")?;
    Ok(dunce::simplified(&current_dir.join(output_path)).to_path_buf())
}

/// Gets the relative path or filename from a full path based on a root directory.
///
/// If the full path is within the root directory, the function returns the relative path.
/// Otherwise, it returns just the filename. If the filename cannot be determined, the
/// full path is returned.
///
/// ```rust
/// use std::path::Path;
/// use viewsort::get_relative_path_or_filename;
///
/// let root = Path::new("/root/dir");
/// let full_path = root.join("subdir/file.txt");
/// let relative_path = get_relative_path_or_filename(&full_path, root);
/// assert_eq!(relative_path, "subdir/file.txt");
///
/// let outside_path = Path::new("/other/dir/another.txt");
/// let relative_or_filename = get_relative_path_or_filename(&outside_path, root);
/// assert_eq!(relative_or_filename, "another.txt");
/// ```
#[must_use]
pub fn get_relative_path_or_filename(full_path: &Path, root: &Path) -> String {
    if full_path == root {
        return full_path.file_name().unwrap_or_default().to_string_lossy().to_string();
    }
    full_path.strip_prefix(root).map_or_else(
        |_| {
            full_path.file_name().map_or_else(
                || full_path.display().to_string(),
                |name| name.to_string_lossy().to_string(),
            )
        },
        |relative_path| relative_path.display().to_string(),
    )
}

/// Convert `OsStr` to String with invalid Unicode handling.
pub fn os_str_to_string(name: &OsStr) -> String {
    name.to_str().map_or_else(
        || name.to_string_lossy().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to string with invalid Unicode handling.
pub fn path_to_string(path: &Path) -> String {
    path.to_str().map_or_else(
        || path.to_string_lossy().to_string().replace('\u{FFFD}', ""),
        std::string::ToString::to_string,
    )
}

/// Convert given path to filename string with invalid Unicode handling.
#[must_use]
pub fn path_to_filename_string(path: &Path) -> String {
    os_str_to_string(path.file_name().unwrap_or_default())
}

/// Convert given path to file extension lowercase string with invalid Unicode handling.
#[must_use]
pub fn path_to_file_extension_string(path: &Path) -> String {
    os_str_to_string(path.extension().unwrap_or_default()).to_lowercase()
}

#[inline]
pub fn print_bold(message: &str) {
    println!("{}", message.bold());
}

#[macro_export]
macro_rules! print_bold {
    ($($arg:tt)*) => {
        $crate::print_bold(&format!($($arg)*))
    };
}

#[inline]
pub fn print_error(message: &str) {
    eprintln!("{}", format!("Error: {message}").red());
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        $crate::print_error(&format!($($arg)*))
    };
}

#[inline]
pub fn print_warning(message: &str) {
    eprintln!("{}", message.yellow());
}

#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {
        $crate::print_warning(&format!($($arg)*))
    };
}

/// Generate a shell completion script for the given shell.
pub fn generate_shell_completion(shell: Shell, mut command: Command, install: bool, command_name: &str) -> Result<()> {
    if install {
        let out_dir = get_shell_completion_dir(shell, command_name)?;
        let path = clap_complete::generate_to(shell, &mut command, command_name, out_dir)?;
        println!("Completion file generated to: {}", path.display());
    } else {
        clap_complete::generate(shell, &mut command, command_name, &mut std::io::stdout());
    }
    Ok(())
}

/// Determine the appropriate directory for storing shell completions.
///
/// First checks if the user-specific directory exists,
/// then checks for the global directory.
/// If neither exist, creates and uses the user-specific dir.
fn get_shell_completion_dir(shell: Shell, name: &str) -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to get home directory")?;

    // Special handling for oh-my-zsh.
    // Create custom "plugin", which will then have to be loaded in .zshrc
    if shell == Shell::Zsh {
        let omz_plugins = home.join(".oh-my-zsh/custom/plugins");
        if omz_plugins.exists() {
            let plugin_dir = omz_plugins.join(name);
            std::fs::create_dir_all(&plugin_dir)?;
            return Ok(plugin_dir);
        }
    }

    let user_dir = match shell {
        Shell::PowerShell => {
            if cfg!(windows) {
                home.join(r"Documents\PowerShell\completions")
            } else {
                home.join(".config/powershell/completions")
            }
        }
        Shell::Bash => home.join(".bash_completion.d"),
        Shell::Elvish => home.join(".elvish"),
        Shell::Fish => home.join(".config/fish/completions"),
        Shell::Zsh => home.join(".zsh/completions"),
        _ => anyhow::bail!("Unsupported shell"),
    };

    if user_dir.exists() {
        return Ok(user_dir);
    }

    let global_dir = match shell {
        Shell::PowerShell => user_dir.clone(),
        Shell::Bash => PathBuf::from("/etc/bash_completion.d"),
        Shell::Fish => PathBuf::from("/usr/share/fish/completions"),
        Shell::Zsh => PathBuf::from("/usr/share/zsh/site-functions"),
        _ => anyhow::bail!("Unsupported shell"),
    };

    if global_dir.exists() {
        return Ok(global_dir);
    }

    std::fs::create_dir_all(&user_dir)?;
    Ok(user_dir)
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    use std::fs::File;

    use tempfile::tempdir;
    use walkdir::WalkDir;

    #[test]
    fn test_is_hidden_file() {
        let dir = tempdir().unwrap();
        let hidden_file_path = dir.path().join(".hidden");
        File::create(hidden_file_path).unwrap();

        let entry = WalkDir::new(dir.path())
            .into_iter()
            .filter_map(Result::ok)
            .find(|e| e.file_name().to_string_lossy().eq(".hidden"))
            .unwrap();

        assert!(is_hidden(&entry));

        let normal_file_path = dir.path().join("visible.csv");
        File::create(normal_file_path).unwrap();

        let entry = WalkDir::new(dir.path())
            .into_iter()
            .filter_map(Result::ok)
            .find(|e| e.file_name().to_string_lossy().eq("visible.csv"))
            .unwrap();

        assert!(!is_hidden(&entry));
    }

    #[test]
    fn test_resolve_input_path_valid() {
        let dir = tempdir().unwrap();
        let path = dir.path();
        let resolved = resolve_input_path(Some(path));
        assert!(resolved.is_ok());
    }

    #[test]
    fn test_resolve_input_path_nonexistent() {
        let path = Path::new("nonexistent");
        let resolved = resolve_input_path(Some(path));
        assert!(resolved.is_err());
    }

    #[test]
    fn test_resolve_input_path_empty() {
        let path = Path::new("  \n");
        let resolved = resolve_input_path(Some(path));
        assert!(resolved.is_ok());
        assert_eq!(resolved.unwrap(), env::current_dir().unwrap());
    }

    #[test]
    fn test_resolve_input_path_default() {
        let resolved = resolve_input_path(None);
        assert!(resolved.is_ok());
        assert_eq!(resolved.unwrap(), env::current_dir().unwrap());
    }

    #[test]
    fn test_resolve_output_path_absolute() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("organized");
        let resolved = resolve_output_path(&output).unwrap();
        assert_eq!(resolved, dunce::simplified(&output));
    }

    #[test]
    fn test_resolve_output_path_relative() {
        let resolved = resolve_output_path(Path::new("organized")).unwrap();
        assert_eq!(resolved, env::current_dir().unwrap().join("organized"));
    }

    #[test]
    fn test_resolve_output_path_empty() {
        assert!(resolve_output_path(Path::new(" ")).is_err());
    }

    #[test]
    fn test_path_to_file_extension_string_lowercase() {
        assert_eq!(path_to_file_extension_string(Path::new("a/M1_run1-cam.MP4")), "mp4");
        assert_eq!(path_to_file_extension_string(Path::new("README")), "");
    }

    #[test]
    fn test_relative_path_or_filename() {
        let root = Path::new("/data/source");
        assert_eq!(
            get_relative_path_or_filename(&root.join("G1/T1/M1_run1-SDE.csv"), root),
            "G1/T1/M1_run1-SDE.csv"
        );
        assert_eq!(
            get_relative_path_or_filename(Path::new("/elsewhere/M1_run1-SDE.csv"), root),
            "M1_run1-SDE.csv"
        );
    }
}
