//! Petites briques système : répertoires, découpage de chemins, copie de fichiers.
//!
//! Tout échec I/O remonte en [`Error::Io`] avec le chemin concerné, pour que
//! le diagnostic final nomme toujours le fichier fautif.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};

use crate::{Error, Result};

/// Attache un chemin à une erreur I/O brute.
pub trait IoContext<T> {
    fn at(self, path: &Utf8Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: &Utf8Path) -> Result<T> {
        self.map_err(|e| Error::io(path, e))
    }
}

/* ───────────────────────────── Répertoires ───────────────────────────── */

pub fn is_regular_file(p: &Utf8Path) -> bool {
    fs::metadata(p).map(|m| m.is_file()).unwrap_or(false)
}

/// `mkdir -p` : crée `p` et ses parents ; un répertoire existant n’est pas une erreur.
pub fn make_dir_all(p: &Utf8Path) -> Result<()> {
    if p.as_str().is_empty() || p.as_str() == "." {
        return Ok(());
    }
    fs::create_dir_all(p).at(p)
}

/// Comme [`make_dir_all`], mais refuse un homonyme qui n’est pas un répertoire.
pub fn ensure_dir(p: &Utf8Path) -> Result<()> {
    if p.exists() && !p.is_dir() {
        return Err(Error::NotADirectory { path: p.to_path_buf() });
    }
    make_dir_all(p)
}

pub fn ensure_parent(p: &Utf8Path) -> Result<()> {
    match p.parent() {
        Some(dir) => make_dir_all(dir),
        None => Ok(()),
    }
}

/// Supprime les fichiers réguliers directement sous `dir` (pas de récursion).
/// Retourne le nombre de fichiers supprimés ; un dossier absent compte pour zéro.
pub fn remove_regular_files(dir: &Utf8Path) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut removed = 0usize;
    for entry in fs::read_dir(dir).at(dir)? {
        let entry = entry.at(dir)?;
        if !entry.file_type().at(dir)?.is_file() {
            continue;
        }
        let path = Utf8PathBuf::from_path_buf(entry.path())
            .map_err(|p| Error::Config(format!("chemin non UTF-8: {}", p.display())))?;
        fs::remove_file(&path).at(&path)?;
        removed += 1;
    }
    Ok(removed)
}

/* ───────────────────────────── Découpage de chemins ───────────────────────────── */

/// Partie répertoire de `name` : `"a/b/c"` → `"a/b"`, `"c"` → `"."`, `"/c"` → `"/"`.
pub fn dirname(name: &str) -> &str {
    let b = name.as_bytes();
    let mut end = b.len();
    while end > 1 && b[end - 1] == b'/' {
        end -= 1;
    }
    while end > 0 && b[end - 1] != b'/' {
        end -= 1;
    }
    while end > 1 && b[end - 1] == b'/' {
        end -= 1;
    }
    if end == 0 {
        return ".";
    }
    &name[..end]
}

/// Dernier composant de `name`, séparateurs finaux ignorés ; `"/"` reste `"/"`.
pub fn basename(name: &str) -> &str {
    let trimmed = name.trim_end_matches('/');
    if trimmed.is_empty() {
        return if name.starts_with('/') { "/" } else { "" };
    }
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// Extension du dernier composant, point compris (`".lai"`), ou `""`.
pub fn extname(name: &str) -> &str {
    let base = basename(name);
    match base.rfind('.') {
        Some(0) | None => "",
        Some(i) => &base[i..],
    }
}

/// `dir/stem.lai` → `dir/stem<ext>` (même répertoire, même nom de base).
pub fn sibling_with_extension(path: &Utf8Path, ext: &str) -> Utf8PathBuf {
    let base = basename(path.as_str());
    let stem = &base[..base.len() - extname(base).len()];
    let file = format!("{stem}{ext}");
    if path.as_str().contains('/') {
        Utf8Path::new(dirname(path.as_str())).join(file)
    } else {
        Utf8PathBuf::from(file)
    }
}

/* ───────────────────────────── Copie ───────────────────────────── */

/// Mode d’ouverture de la destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    Overwrite,
    Append,
}

/// Copie octet par octet, en flux ; retourne le nombre d’octets écrits.
pub fn copy_file(src: &Utf8Path, dst: &Utf8Path, mode: CopyMode) -> Result<u64> {
    let input = File::open(src).at(src)?;
    let output = match mode {
        CopyMode::Overwrite => File::create(dst),
        CopyMode::Append => OpenOptions::new().append(true).create(true).open(dst),
    }
    .at(dst)?;

    let mut reader = BufReader::new(input);
    let mut writer = BufWriter::new(output);
    let written = io::copy(&mut reader, &mut writer).map_err(|e| Error::io(src, e))?;
    writer.flush().at(dst)?;
    log::trace!("copie {src} → {dst} ({written} octets, {mode:?})");
    Ok(written)
}

pub fn write_all(p: &Utf8Path, bytes: &[u8]) -> Result<()> {
    ensure_parent(p)?;
    fs::write(p, bytes).at(p)
}

pub fn read_to_string(p: &Utf8Path) -> Result<String> {
    fs::read_to_string(p).at(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dirname_cases() {
        assert_eq!(dirname("a/b/c"), "a/b");
        assert_eq!(dirname("a/b/c/"), "a/b");
        assert_eq!(dirname("c"), ".");
        assert_eq!(dirname(""), ".");
        assert_eq!(dirname("/c"), "/");
        assert_eq!(dirname("/"), "/");
        assert_eq!(dirname("a//b"), "a");
    }

    #[test]
    fn basename_and_ext() {
        assert_eq!(basename("dir/script.lai"), "script.lai");
        assert_eq!(basename("dir/sub/"), "sub");
        assert_eq!(basename("/"), "/");
        assert_eq!(extname("dir/script.lai"), ".lai");
        assert_eq!(extname("dir.x/script"), "");
        assert_eq!(extname(".hidden"), "");
    }

    #[test]
    fn sibling_keeps_directory() {
        assert_eq!(sibling_with_extension(Utf8Path::new("a/b/t.lai"), ".du").as_str(), "a/b/t.du");
        assert_eq!(sibling_with_extension(Utf8Path::new("t.lai"), ".du").as_str(), "t.du");
        assert_eq!(sibling_with_extension(Utf8Path::new("noext"), ".du").as_str(), "noext.du");
    }

    #[test]
    fn copy_append_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let src = root.join("src.txt");
        let dst = root.join("dst.txt");
        fs::write(&src, "abc\n").unwrap();
        fs::write(&dst, "head\n").unwrap();

        copy_file(&src, &dst, CopyMode::Append).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "head\nabc\n");

        copy_file(&src, &dst, CopyMode::Overwrite).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "abc\n");
    }

    #[test]
    fn copy_missing_source_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let err = copy_file(&root.join("nope"), &root.join("out"), CopyMode::Overwrite).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn ensure_dir_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let f = root.join("encodings");
        fs::write(&f, "").unwrap();
        assert!(matches!(ensure_dir(&f), Err(Error::NotADirectory { .. })));
        ensure_dir(&root.join("x/y/z")).unwrap();
        assert!(root.join("x/y/z").is_dir());
    }

    #[test]
    fn clean_removes_only_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join("a.c"), "").unwrap();
        fs::write(root.join("b.h"), "").unwrap();
        fs::create_dir(root.join("encodings")).unwrap();
        assert_eq!(remove_regular_files(root).unwrap(), 2);
        assert!(root.join("encodings").is_dir());
        assert_eq!(remove_regular_files(&root.join("absent")).unwrap(), 0);
    }
}
