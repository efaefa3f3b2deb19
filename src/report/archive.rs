// Zip archives of the recipient folders.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::report::*;

/// Writes `<dest_dir>/<folder name>.zip` with the content of the folder.
/// The names inside the archive are relative to the folder. An existing archive is replaced.
pub fn zip_directory(folder: &Path, dest_dir: &Path) -> ReportResult<PathBuf> {
    let folder_s = folder.display().to_string();
    let name = folder
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .context(FileNotFoundSnafu {
            path: folder_s.clone(),
        })?;
    ensure!(
        folder.is_dir(),
        FileNotFoundSnafu {
            path: folder_s.clone()
        }
    );
    let dest = dest_dir.join(format!("{}.zip", name));
    let dest_s = dest.display().to_string();

    let file = File::create(&dest).context(WritingOutputSnafu {
        path: dest_s.clone(),
    })?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut count = 0usize;
    for entry_r in WalkDir::new(folder).min_depth(1).sort_by_file_name() {
        let entry = entry_r.context(WalkingDirectorySnafu {
            path: folder_s.clone(),
        })?;
        let rel: Vec<String> = match entry.path().strip_prefix(folder) {
            Ok(r) => r
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect(),
            Err(_) => continue,
        };
        let rel_name = rel.join("/");
        if entry.file_type().is_dir() {
            zip.add_directory(rel_name, options)
                .context(ArchiveSnafu {
                    path: dest_s.clone(),
                })?;
        } else {
            zip.start_file(rel_name, options).context(ArchiveSnafu {
                path: dest_s.clone(),
            })?;
            let mut f = File::open(entry.path()).context(OpeningFileSnafu {
                path: entry.path().display().to_string(),
            })?;
            io::copy(&mut f, &mut zip)
                .map_err(ZipError::from)
                .context(ArchiveSnafu {
                    path: dest_s.clone(),
                })?;
            count += 1;
        }
    }
    zip.finish().context(ArchiveSnafu {
        path: dest_s.clone(),
    })?;
    info!("Archived {} file(s) of {} in {}", count, folder_s, dest_s);
    Ok(dest)
}
