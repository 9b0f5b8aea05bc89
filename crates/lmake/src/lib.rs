//! lmake — Dictu en bibliothèque mono-fichier.
//!
//! - **Amalgamation** : concatène les fragments C de l’interpréteur (manifeste
//!   figé) en un `<name>.c` + `__<name>.h`, en renommant les symboles qui
//!   entreraient en collision et en gardant les modules optionnels derrière
//!   `#ifndef DISABLE_*`.
//! - **Artefacts** : Makefile généré puis patché, copies statiques (`main.c`,
//!   linenoise, argparse, utf8…), build `make` optionnel.
//! - **Dialecte lai** : réécriture ligne à ligne d’une syntaxe « humanisée »
//!   vers Dictu (`transpile`).
//!
//! Point d’entrée outil : [`ArtifactAssembler::run`] à partir d’un [`BuildConfig`].

pub mod assembler;
pub mod config;
pub mod makefile;
pub mod manifest;
pub mod pipeline;
pub mod rules;
pub mod transpile;
pub mod util;

use camino::Utf8PathBuf;
use thiserror::Error;

pub use assembler::ArtifactAssembler;
pub use config::{BuildConfig, CliOverrides};
pub use manifest::{Category, Fragment, FragmentKind};
pub use pipeline::{FragmentCounter, FragmentPipeline, FragmentRules};
pub use rules::AmalgamRules;
pub use transpile::{translate, translate_all, translate_line};

/// Version de l’outil (écrite dans le Makefile généré, champ `VERSION`).
pub const VERSION: &str = "0.1";

/* ───────────────────────────── Erreurs ───────────────────────────── */

#[derive(Debug, Error)]
pub enum Error {
    /// Configuration incohérente ; détectée avant de toucher au disque.
    #[error("configuration: {0}")]
    Config(String),

    #[error("{path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: existe mais n’est pas un répertoire")]
    NotADirectory { path: Utf8PathBuf },

    /// Admission ou réécriture refusée : toute la génération s’arrête.
    #[error("fragment {fragment}: {reason}")]
    Aborted { fragment: String, reason: String },

    #[error("`{program} {target}` a échoué ({status})")]
    Make {
        program: String,
        target: String,
        status: std::process::ExitStatus,
    },

    #[error("{failed} fichier(s) lai non traduit(s)")]
    Transpile { failed: usize },

    /// Fichier `--config` illisible en TOML.
    #[cfg(feature = "config-file")]
    #[error("{path}: TOML invalide: {source}")]
    Toml {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub(crate) fn aborted(fragment: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Aborted { fragment: fragment.into(), reason: reason.into() }
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
