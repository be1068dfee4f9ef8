use std::{fs, io::Write, path::Path};

use zip::{write::FileOptions, CompressionMethod, ZipWriter};

/// Write a file with the given content, creating parent directories.
pub fn file(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, content).expect("write file");
}

/// Write a zip archive at `rel` containing the provided `(name, content)`
/// entries, stored without compression.
pub fn archive(root: &Path, rel: &str, entries: &[(&str, &[u8])]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }

    let file = fs::File::create(path).expect("create archive");
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, content) in entries {
        writer.start_file(*name, options).expect("start entry");
        writer.write_all(content).expect("write entry");
    }
    writer.finish().expect("finish archive");
}
