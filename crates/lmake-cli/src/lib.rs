//! lmake-cli/src/lib.rs — CLI lib pour lmake
//!
//! Deux modes :
//!   - génération (défaut) : amalgamation + Makefile + copies + `make` optionnel ;
//!   - `--parse-lai f1 f2…` : traduit des scripts lai en Dictu puis s’arrête.
//!
//! `--parse-lai` consomme toute la suite d’argv : on coupe avant de passer à clap,
//! si bien qu’un fichier nommé `--help` reste un fichier.

use std::ffi::OsString;

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use color_eyre::eyre::{eyre, Result, WrapErr};
use lmake::{ArtifactAssembler, BuildConfig, CliOverrides};

pub const PARSE_LAI: &str = "--parse-lai";

#[derive(Parser, Debug)]
#[command(name = "lmake", version, about = "Dictu en bibliothèque mono-fichier (+ dialecte lai)", long_about = None)]
pub struct Cli {
    /// Verbosité (répéter pour plus de bruit)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Module http (requiert libcurl)
    #[arg(long)]
    pub enable_http: bool,

    /// Module sqlite (requiert libsqlite3)
    #[arg(long)]
    pub enable_sqlite: bool,

    /// Session interactive dans l’interpréteur d’exemple
    #[arg(long)]
    pub enable_repl: bool,

    /// Dialecte lai (syntaxe « humanisée », à la Lua) ; implique --disable-exit
    #[arg(long)]
    pub enable_lai: bool,

    /// Remplace `exit()` par un stub
    #[arg(long)]
    pub disable_exit: bool,

    /// Lance `make library`
    #[arg(long)]
    pub build_library: bool,

    /// Lance `make interp`
    #[arg(long)]
    pub build_interp: bool,

    /// Lance `make clean`
    #[arg(long)]
    pub clean_installed: bool,

    /// Supprime les fichiers déjà générés dans le répertoire de build
    #[arg(long)]
    pub clean_build: bool,

    /// Ne génère rien (sauf le Makefile)
    #[arg(long)]
    pub donot_generate: bool,

    /// Ne crée pas le répertoire système
    #[arg(long)]
    pub donot_make_sysdir: bool,

    /// Répertoire système inscriptible [../sys]
    #[arg(long, value_name = "DIR")]
    pub sysdir: Option<String>,

    /// Sources C de Dictu [src/Dictu]
    #[arg(long, value_name = "DIR")]
    pub langcdir: Option<String>,

    /// Répertoire de build [build/dictu | build/lai]
    #[arg(long, value_name = "DIR")]
    pub builddir: Option<String>,

    /// Sources de l’outil (main.c, Makefile…) [src]
    #[arg(long, value_name = "DIR")]
    pub srcdir: Option<String>,

    /// Fichier de configuration TOML
    #[arg(long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Traduit des scripts lai en `.du` puis quitte (consomme le reste d’argv)
    #[arg(long = "parse-lai", value_name = "FILES", num_args = 0..)]
    pub parse_lai: Option<Vec<Utf8PathBuf>>,
}

impl Cli {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            enable_http: self.enable_http,
            enable_sqlite: self.enable_sqlite,
            enable_repl: self.enable_repl,
            enable_dialect: self.enable_lai,
            disable_exit: self.disable_exit,
            build_library: self.build_library,
            build_interpreter: self.build_interp,
            clean_installed: self.clean_installed,
            clean_build: self.clean_build,
            skip_generation: self.donot_generate,
            no_sys_dir: self.donot_make_sysdir,
            sys_dir: self.sysdir.clone(),
            build_dir: self.builddir.clone(),
            runtime_src_dir: self.langcdir.clone(),
            src_dir: self.srcdir.clone(),
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Coupe argv au premier `--parse-lai` : (options, fichiers éventuels).
pub fn split_parse_lai<I>(args: I) -> (Vec<OsString>, Option<Vec<OsString>>)
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let mut head: Vec<OsString> = args.into_iter().map(Into::into).collect();
    // argv[0] n’est jamais une option
    match head.iter().skip(1).position(|a| a == PARSE_LAI) {
        Some(i) => {
            let tail = head.split_off(i + 1);
            let files = tail.into_iter().skip(1).collect();
            (head, Some(files))
        }
        None => (head, None),
    }
}

/// Analyse argv complet (argv[0] compris).
pub fn parse<I>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let (head, files) = split_parse_lai(args);
    let mut cli = Cli::try_parse_from(head)?;
    if let Some(files) = files {
        let files = files
            .into_iter()
            .map(|f| {
                Utf8PathBuf::from_path_buf(f.into()).map_err(|p| {
                    clap::Error::raw(clap::error::ErrorKind::InvalidUtf8, format!("chemin non UTF-8: {}\n", p.display()))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        cli.parse_lai = Some(files);
    }
    Ok(cli)
}

pub fn init_logging(level: log::LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_target(false);
    // RUST_LOG garde le dernier mot
    builder.parse_default_env();
    // déjà initialisé (tests, hôte qui embarque la lib) : on garde le premier
    if let Err(e) = builder.try_init() {
        log::debug!("logger déjà en place: {e}");
    }
}

/// Configuration finale : défauts → fichier → ENV → CLI.
pub fn build_config(cli: &Cli) -> Result<BuildConfig> {
    let mut cfg = match &cli.config {
        Some(path) => {
            let mut c = load_config_file(path)?;
            c.apply_env();
            c
        }
        None => BuildConfig::from_env(),
    };
    cfg.apply_cli_overrides(&cli.overrides())?;
    cfg.validate()?;
    Ok(cfg)
}

fn load_config_file(path: &camino::Utf8Path) -> Result<BuildConfig> {
    BuildConfig::from_toml_file(path).wrap_err_with(|| format!("lecture de la configuration {path}"))
}

/// Point d’entrée du binaire (après analyse d’argv).
pub fn run(cli: Cli) -> Result<()> {
    if let Some(files) = &cli.parse_lai {
        if files.is_empty() {
            return Err(eyre!("{PARSE_LAI}: aucun fichier"));
        }
        let written = lmake::translate_all(files.as_slice())?;
        log::info!("{} script(s) traduit(s)", written.len());
        return Ok(());
    }

    let cfg = build_config(&cli)?;
    log::debug!("{cfg:?}");
    let report = ArtifactAssembler::new(&cfg).run()?;
    log::info!(
        "{} : {} fragment(s), {} fichier(s) écrit(s), {} drapeau(x) activé(s)",
        cfg.dialect_name(),
        report.fragments,
        report.written.len(),
        report.flags_patched
    );
    Ok(())
}
