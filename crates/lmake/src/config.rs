//! config.rs — Configuration d’une génération `lmake`.
//!
//! Couches, de la plus faible à la plus forte :
//!   1. `BuildConfig::default()`
//!   2. fichier TOML optionnel (`--config=FILE`, feature `config-file`)
//!   3. ENV (`BuildConfig::apply_env`)
//!   4. overrides CLI (`BuildConfig::apply_cli_overrides`)
//!
//! Puis `validate()` ; la config est ensuite figée (partagée par `&`).
//!
//! ENV supportés (tous facultatifs) :
//!   LMAKE_SYSDIR=<dir>
//!   LMAKE_BUILDDIR=<dir>
//!   LMAKE_LANGCDIR=<dir>
//!   LMAKE_SRCDIR=<dir>
//!   LMAKE_ENABLE_HTTP=0|1
//!   LMAKE_ENABLE_SQLITE=0|1
//!   LMAKE_ENABLE_REPL=0|1
//!   MAKE=<programme>

use camino::{Utf8Path, Utf8PathBuf};

#[cfg(feature = "config-file")]
use serde::Deserialize;

use crate::{Error, Result};

pub const DICTU_NAME: &str = "dictu";
pub const LAI_NAME: &str = "lai";

/* ─────────────────────────── Types publics ─────────────────────────── */

/// Modules optionnels et variantes du langage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Deserialize), serde(default, deny_unknown_fields))]
pub struct Features {
    pub http: bool,
    pub sqlite: bool,
    pub repl: bool,
    /// Remplace l’enregistrement de `exit` par un stub.
    pub exit_disabled: bool,
    /// Dialecte lai (nom de sortie `lai`, scanner remplacé).
    pub dialect: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Deserialize), serde(default, deny_unknown_fields))]
pub struct Paths {
    /// Sources propres à l’outil (`main.c`, `dictu.h`, Makefile modèle…).
    pub src_dir: Utf8PathBuf,
    /// `None` ⇒ `build/<name>`.
    pub build_dir: Option<Utf8PathBuf>,
    /// Répertoire système inscriptible, recopié dans le Makefile (`SYSDIR`).
    pub sys_dir: Utf8PathBuf,
    /// Sources C de l’interpréteur (`--langcdir`).
    pub runtime_src_dir: Utf8PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            src_dir: "src".into(),
            build_dir: None,
            sys_dir: "../sys".into(),
            runtime_src_dir: "src/Dictu".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Deserialize), serde(default, deny_unknown_fields))]
pub struct Generation {
    /// `--donot-generate` : seul le Makefile est (ré)écrit.
    pub skip_generation: bool,
    /// Vide les fichiers réguliers du répertoire de build avant génération.
    pub clean_build: bool,
    pub make_sys_dir: bool,
}

impl Default for Generation {
    fn default() -> Self {
        Self { skip_generation: false, clean_build: false, make_sys_dir: true }
    }
}

/// Cibles `make` à lancer après génération.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Deserialize), serde(default, deny_unknown_fields))]
pub struct Make {
    pub library: bool,
    pub interpreter: bool,
    pub clean_installed: bool,
    pub program: String,
}

impl Default for Make {
    fn default() -> Self {
        Self { library: false, interpreter: false, clean_installed: false, program: "make".into() }
    }
}

impl Make {
    pub fn any(&self) -> bool {
        self.library || self.interpreter || self.clean_installed
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Deserialize), serde(default, deny_unknown_fields))]
pub struct BuildConfig {
    pub features: Features,
    pub paths: Paths,
    pub generation: Generation,
    pub make: Make,
}

/* ─────────────────────── Overrides (CLI / couches) ─────────────────────── */

/// Overrides fournis par la CLI ; `None`/`false` = ne touche à rien.
#[derive(Default, Clone, Debug)]
pub struct CliOverrides {
    pub enable_http: bool,
    pub enable_sqlite: bool,
    pub enable_repl: bool,
    pub enable_dialect: bool,
    pub disable_exit: bool,

    pub build_library: bool,
    pub build_interpreter: bool,
    pub clean_installed: bool,
    pub clean_build: bool,
    pub skip_generation: bool,
    pub no_sys_dir: bool,

    pub sys_dir: Option<String>,
    pub build_dir: Option<String>,
    pub runtime_src_dir: Option<String>,
    pub src_dir: Option<String>,
}

impl BuildConfig {
    /// Valeurs par défaut + ENV.
    pub fn from_env() -> Self {
        let mut c = Self::default();
        c.apply_env();
        c
    }

    /// Charge un fichier TOML (sections `[features]`, `[paths]`, `[generation]`, `[make]`).
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: &Utf8Path) -> Result<Self> {
        let text = crate::util::fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|source| Error::Toml { path: path.to_path_buf(), source })
    }

    #[cfg(feature = "config-file")]
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Applique `LMAKE_*` et `MAKE`. Une valeur booléenne illisible est ignorée.
    pub fn apply_env(&mut self) {
        self.apply_vars(|k| std::env::var(k).ok());
    }

    fn apply_vars(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get("LMAKE_SYSDIR")        { self.paths.sys_dir = v.into(); }
        if let Some(v) = get("LMAKE_BUILDDIR")      { self.paths.build_dir = Some(v.into()); }
        if let Some(v) = get("LMAKE_LANGCDIR")      { self.paths.runtime_src_dir = v.into(); }
        if let Some(v) = get("LMAKE_SRCDIR")        { self.paths.src_dir = v.into(); }

        if let Some(b) = get("LMAKE_ENABLE_HTTP").as_deref().and_then(parse_bool)   { self.features.http = b; }
        if let Some(b) = get("LMAKE_ENABLE_SQLITE").as_deref().and_then(parse_bool) { self.features.sqlite = b; }
        if let Some(b) = get("LMAKE_ENABLE_REPL").as_deref().and_then(parse_bool)   { self.features.repl = b; }

        if let Some(v) = get("MAKE").filter(|v| !v.trim().is_empty()) { self.make.program = v; }
    }

    /// Dernier mot à la CLI. Un répertoire vide est une erreur de configuration.
    pub fn apply_cli_overrides(&mut self, o: &CliOverrides) -> Result<()> {
        if o.enable_http     { self.features.http = true; }
        if o.enable_sqlite   { self.features.sqlite = true; }
        if o.enable_repl     { self.features.repl = true; }
        if o.disable_exit    { self.features.exit_disabled = true; }
        if o.enable_dialect {
            self.features.dialect = true;
            self.features.exit_disabled = true;
        }

        if o.build_library     { self.make.library = true; }
        if o.build_interpreter { self.make.interpreter = true; }
        if o.clean_installed   { self.make.clean_installed = true; }
        if o.clean_build       { self.generation.clean_build = true; }
        if o.skip_generation   { self.generation.skip_generation = true; }
        if o.no_sys_dir        { self.generation.make_sys_dir = false; }

        if let Some(d) = &o.sys_dir         { self.paths.sys_dir = non_empty("--sysdir", d)?; }
        if let Some(d) = &o.build_dir       { self.paths.build_dir = Some(non_empty("--builddir", d)?); }
        if let Some(d) = &o.runtime_src_dir { self.paths.runtime_src_dir = non_empty("--langcdir", d)?; }
        if let Some(d) = &o.src_dir         { self.paths.src_dir = non_empty("--srcdir", d)?; }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.paths;
        let dirs = [
            ("sysdir", Some(&p.sys_dir)),
            ("builddir", p.build_dir.as_ref()),
            ("langcdir", Some(&p.runtime_src_dir)),
            ("srcdir", Some(&p.src_dir)),
        ];
        for (what, dir) in dirs {
            if dir.is_some_and(|d| d.as_str().is_empty()) {
                return Err(Error::Config(format!("{what} est une chaîne vide")));
            }
        }
        if self.make.program.trim().is_empty() {
            return Err(Error::Config("programme make vide".into()));
        }
        Ok(())
    }

    /* ───────────── Valeurs dérivées ───────────── */

    /// `lai` si le dialecte est actif, sinon `dictu`.
    pub fn dialect_name(&self) -> &'static str {
        if self.features.dialect { LAI_NAME } else { DICTU_NAME }
    }

    pub fn build_dir(&self) -> Utf8PathBuf {
        match &self.paths.build_dir {
            Some(d) => d.clone(),
            None => Utf8Path::new("build").join(self.dialect_name()),
        }
    }

    /// `<build>/<name>.c`
    pub fn source_artifact(&self) -> Utf8PathBuf {
        self.build_dir().join(format!("{}.c", self.dialect_name()))
    }

    /// `<build>/__<name>.h`
    pub fn header_artifact(&self) -> Utf8PathBuf {
        self.build_dir().join(format!("__{}.h", self.dialect_name()))
    }

    /// `<build>/<name>.h` (copie de l’API publique).
    pub fn api_header(&self) -> Utf8PathBuf {
        self.build_dir().join(format!("{}.h", self.dialect_name()))
    }

    /// Fragment externe qui remplace `identifierType()` dans le scanner.
    pub fn dialect_fragment(&self) -> Utf8PathBuf {
        self.paths.src_dir.join("lai_identifierType.c")
    }
}

/* ────────────────────────── Parsing ────────────────────────── */

fn non_empty(flag: &str, value: &str) -> Result<Utf8PathBuf> {
    if value.is_empty() {
        return Err(Error::Config(format!("{flag}= est une chaîne vide")));
    }
    Ok(value.into())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/* ───────────────────────────── Tests ───────────────────────────── */
