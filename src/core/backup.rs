use crate::db::log::audit;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{success, warning};
use rusqlite::Connection;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::FileOptions;

fn confirm_overwrite(dest: &Path) -> AppResult<bool> {
    warning(format!("The file '{}' already exists.", dest.display()));
    print!("Overwrite? [y/N]: ");
    io::stdout().flush().ok();

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Copy the database to `dest_file`, optionally zipped.
/// Returns the final path, or `None` when the user declined the overwrite.
pub fn backup(db_path: &str, dest_file: &str, compress: bool, force: bool) -> AppResult<Option<PathBuf>> {
    let src = Path::new(db_path);
    let dest = Path::new(dest_file);

    if !src.exists() {
        return Err(AppError::from(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Database not found: {}", src.display()),
        )));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    if dest.exists() && !force && !confirm_overwrite(dest)? {
        warning("Backup cancelled.");
        return Ok(None);
    }

    // VACUUM INTO gives a consistent copy even while other operators write.
    let conn = Connection::open(src)?;
    if dest.exists() {
        fs::remove_file(dest)?;
    }
    conn.execute("VACUUM INTO ?1", [dest.to_string_lossy()])?;
    success(format!("Backup created: {}", dest.display()));

    let final_path = if compress {
        let zipped = compress_backup(dest)?;
        if let Err(e) = fs::remove_file(dest) {
            warning(format!("Failed to remove uncompressed backup: {e}"));
        }
        zipped
    } else {
        dest.to_path_buf()
    };

    audit(
        &conn,
        "backup",
        &final_path.to_string_lossy(),
        if compress {
            "Backup created and compressed"
        } else {
            "Backup created"
        },
    )?;

    Ok(Some(final_path))
}

fn compress_backup(path: &Path) -> AppResult<PathBuf> {
    let zip_path = path.with_extension("zip");
    let file = fs::File::create(&zip_path)?;
    let mut zip = ZipWriter::new(file);

    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "hydrolog.sqlite".to_string());

    let mut f = fs::File::open(path)?;
    zip.start_file(name, options).map_err(io::Error::other)?;
    io::copy(&mut f, &mut zip)?;
    zip.finish().map_err(io::Error::other)?;

    success(format!("Compressed: {}", zip_path.display()));
    Ok(zip_path)
}
