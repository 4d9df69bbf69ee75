//! Default file locations derived from where the binary is installed.

use std::io;
use std::path::{Path, PathBuf};

/// Where the schema scripts and the database file live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub schema_dir: PathBuf,
    pub database_file: PathBuf,
}

/// Locates the running executable and derives default paths from it.
pub fn discover() -> io::Result<AppPaths> {
    let exe = std::env::current_exe()?.canonicalize()?;
    let bin_dir = exe
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "executable has no parent"))?;
    Ok(defaults_for(bin_dir, dirs::home_dir().as_deref()))
}

/// Maps an install directory to its schema and database locations.
pub fn defaults_for(bin_dir: &Path, home: Option<&Path>) -> AppPaths {
    let system_db = PathBuf::from("/var/lib/linkshare/linkshare.db");

    if bin_dir == Path::new("/bin") || bin_dir == Path::new("/usr/bin") {
        return AppPaths {
            schema_dir: PathBuf::from("/usr/share/linkshare/schema"),
            database_file: system_db,
        };
    }

    if bin_dir == Path::new("/usr/local/bin") {
        return AppPaths {
            schema_dir: PathBuf::from("/usr/local/share/linkshare/schema"),
            database_file: system_db,
        };
    }

    if home.is_some_and(|home| bin_dir == home.join(".local/bin")) {
        return AppPaths {
            schema_dir: bin_dir.join("../share/linkshare"),
            database_file: bin_dir.join("../var/lib/linkshare/linkshare.db"),
        };
    }

    // Development checkout or unpacked archive.
    AppPaths {
        schema_dir: bin_dir.join("../schema"),
        database_file: bin_dir.join("../linkshare.db"),
    }
}
