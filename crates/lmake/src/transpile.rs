//! transpile.rs — Traduction lai → Dictu, ligne par ligne.
//!
//! Volontairement rudimentaire : un jeu fixe de substitutions textuelles,
//! sans analyse lexicale. `script.lai` produit `script.du` à côté.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};

use crate::pipeline::LineBuffer;
use crate::util::fs::{sibling_with_extension, IoContext};
use crate::{Error, Result};

pub const DICTU_EXT: &str = ".du";

/// Substitutions appliquées partout dans la ligne, dans cet ordre.
const INLINE: [(&str, &str); 5] = [
    (" is ", " == "),
    (" isnot ", " != "),
    ("forever do", "while (true) {"),
    (" beg ", " { "),
    (" then ", " { "),
];

/// Fins de ligne : la première trouvée coupe la ligne et termine la réécriture.
const TERMINAL: [(&str, &str); 4] = [(" then\n", " {\n"), (" do\n", " {\n"), ("end\n", "}\n"), ("beg\n", "{\n")];

/// `orelse ` → `} else `, en absorbant un espace qui précède.
fn replace_orelse(line: &str) -> String {
    const KW: &str = "orelse ";
    let mut out = String::with_capacity(line.len() + 1);
    let mut rest = line;
    while let Some(i) = rest.find(KW) {
        let head = &rest[..i];
        out.push_str(head.strip_suffix(' ').unwrap_or(head));
        out.push_str("} else ");
        rest = &rest[i + KW.len()..];
    }
    out.push_str(rest);
    out
}

pub fn translate_line(line: &str) -> String {
    let (first, rest) = INLINE.split_at(2);
    let mut s = line.to_string();
    for &(from, to) in first {
        s = s.replace(from, to);
    }
    s = replace_orelse(&s);
    for &(from, to) in rest {
        s = s.replace(from, to);
    }

    for (pat, repl) in TERMINAL {
        if let Some(i) = s.find(pat) {
            s.truncate(i);
            s.push_str(repl);
            break;
        }
    }
    s
}

/// Traduit `path` vers `<dir>/<stem>.du` ; retourne le chemin écrit.
///
/// Les lignes non UTF-8 sont traduites octet pour octet (Latin-1).
/// Un script déjà en `.du` est refusé : il serait sa propre cible.
pub fn translate(path: &Utf8Path) -> Result<Utf8PathBuf> {
    let dest = sibling_with_extension(path, DICTU_EXT);
    if dest.as_path() == path {
        let e = io::Error::new(io::ErrorKind::AlreadyExists, format!("la cible {DICTU_EXT} est la source elle-même"));
        return Err(Error::io(path, e));
    }
    let mut reader = BufReader::new(File::open(path).at(path)?);
    let mut writer = BufWriter::new(File::create(&dest).at(&dest)?);

    let mut line = LineBuffer::new();
    let mut count = 0usize;
    loop {
        if line.read_line(&mut reader).at(path)? == 0 {
            break;
        }
        let text = line.text();
        let translated = translate_line(text.as_str());
        writer.write_all(&text.encode(&translated)).at(&dest)?;
        count += 1;
    }
    writer.flush().at(&dest)?;
    log::info!("{path} → {dest} ({count} lignes)");
    Ok(dest)
}

/// Traduit chaque fichier ; un échec n’empêche pas les suivants.
pub fn translate_all<P: AsRef<Utf8Path>>(paths: &[P]) -> Result<Vec<Utf8PathBuf>> {
    let mut written = Vec::with_capacity(paths.len());
    let mut failed = 0usize;
    for p in paths {
        match translate(p.as_ref()) {
            Ok(dest) => written.push(dest),
            Err(e) => {
                log::error!("{e}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        return Err(Error::Transpile { failed });
    }
    Ok(written)
}
