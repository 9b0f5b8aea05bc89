//! makefile.rs — Makefile du répertoire de build.
//!
//! Le fichier généré commence par un en-tête fixe :
//! ```text
//! NAME    := dictu
//! VERSION := 0.1
//! SYSDIR  := ../sys
//! ENABLE_HTTP := 0
//! ENABLE_REPL := 0
//! ENABLE_SQLITE := 0
//! DISABLE_EXIT := 0
//! ```
//! suivi du modèle `<src>/Makefile`. Les drapeaux actifs sont ensuite basculés
//! à `1` *en place* : un seul octet réécrit, la largeur du champ ne change jamais.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};

use camino::Utf8Path;

use crate::config::Features;
use crate::util::fs::{copy_file, write_all, CopyMode, IoContext};
use crate::{Result, VERSION};

pub const ENABLE_HTTP: &str = "ENABLE_HTTP";
pub const ENABLE_REPL: &str = "ENABLE_REPL";
pub const ENABLE_SQLITE: &str = "ENABLE_SQLITE";
pub const DISABLE_EXIT: &str = "DISABLE_EXIT";

/// Ordre d’écriture des drapeaux dans l’en-tête.
pub const FLAG_KEYS: [&str; 4] = [ENABLE_HTTP, ENABLE_REPL, ENABLE_SQLITE, DISABLE_EXIT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MakefileFlagRecord {
    pub key: &'static str,
    pub value: bool,
}

impl MakefileFlagRecord {
    pub fn off(key: &'static str) -> Self {
        Self { key, value: false }
    }

    pub fn render(&self) -> String {
        format!("{} := {}\n", self.key, if self.value { '1' } else { '0' })
    }
}

/// Drapeaux à basculer pour `features`.
pub fn enabled_flags(features: &Features) -> Vec<&'static str> {
    [
        (features.http, ENABLE_HTTP),
        (features.repl, ENABLE_REPL),
        (features.sqlite, ENABLE_SQLITE),
        (features.exit_disabled, DISABLE_EXIT),
    ]
    .into_iter()
    .filter_map(|(on, key)| on.then_some(key))
    .collect()
}

pub fn render_header(name: &str, sys_dir: &Utf8Path) -> String {
    let mut out = format!("NAME    := {name}\nVERSION := {VERSION}\nSYSDIR  := {sys_dir}\n");
    for key in FLAG_KEYS {
        out.push_str(&MakefileFlagRecord::off(key).render());
    }
    out
}

/// Écrit l’en-tête dans `dest` puis y ajoute le modèle `template`.
pub fn generate(dest: &Utf8Path, template: &Utf8Path, name: &str, sys_dir: &Utf8Path) -> Result<()> {
    write_all(dest, render_header(name, sys_dir).as_bytes())?;
    copy_file(template, dest, CopyMode::Append)?;
    log::info!("Makefile → {dest}");
    Ok(())
}

/// Bascule à `1` la première ligne exacte `"<FLAG> := 0\n"` de chaque drapeau.
/// Une ligne absente n’est pas une erreur (simple avertissement).
/// Retourne le nombre de drapeaux effectivement basculés.
pub fn patch_flags(path: &Utf8Path, flags: &[&str]) -> Result<usize> {
    if flags.is_empty() {
        return Ok(0);
    }
    let mut file = OpenOptions::new().read(true).write(true).open(path).at(path)?;

    let mut pending: Vec<(&str, String)> = flags.iter().map(|&f| (f, format!("{f} := 0\n"))).collect();
    let mut hits: Vec<(&str, u64)> = Vec::new();
    {
        let mut reader = BufReader::new(&file);
        let mut line = Vec::new();
        let mut offset = 0u64;
        while !pending.is_empty() {
            line.clear();
            let n = reader.read_until(b'\n', &mut line).at(path)?;
            if n == 0 {
                break;
            }
            if let Some(i) = pending.iter().position(|(_, l)| l.as_bytes() == line.as_slice()) {
                let (flag, _) = pending.remove(i);
                // le chiffre est l’avant-dernier octet de la ligne
                hits.push((flag, offset + n as u64 - 2));
            }
            offset += n as u64;
        }
    }

    for (flag, pos) in &hits {
        file.seek(SeekFrom::Start(*pos)).at(path)?;
        file.write_all(b"1").at(path)?;
        log::debug!("{path}: {flag} := 1");
    }
    file.flush().at(path)?;

    for (flag, _) in pending {
        log::warn!("{path}: pas de ligne `{flag} := 0`, drapeau ignoré");
    }
    Ok(hits.len())
}
