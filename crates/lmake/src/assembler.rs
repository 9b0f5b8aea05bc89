//! assembler.rs — Orchestration d’une génération complète.
//!
//! Étapes (la première erreur interrompt la suite) :
//!   0. répertoires (`build`, `sys`), nettoyage optionnel du build ;
//!   1. `<build>/<name>.c`    (en-têtes standard + pipeline `.c`) ;
//!   2. `<build>/__<name>.h`  (garde d’inclusion + pipeline `.h`) ;
//!   3. `<build>/Makefile`    (toujours, même avec `--donot-generate`) ;
//!   4. copies statiques      (`main.c`, linenoise, argparse, utf8, API…) ;
//!   5. patch des drapeaux du Makefile ;
//!   6. `make` optionnel dans le répertoire de build.

use std::env;
use std::path::PathBuf;
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::BuildConfig;
use crate::manifest::{FragmentKind, CATEGORIES};
use crate::pipeline::{FragmentCounter, FragmentPipeline, Output};
use crate::rules::{gate, AmalgamRules};
use crate::util::fs::{self, CopyMode, IoContext};
use crate::{makefile, Error, Result, VERSION};

/// En-têtes standard inclus en tête de l’unité amalgamée.
const STD_HEADERS: [&str; 18] = [
    "stdint", "stddef", "stdbool", "stdio", "stdlib", "string", "stdarg", "unistd", "ctype", "time",
    "math", "sys/utsname", "sys/stat", "sys/types", "curl/curl", "sqlite3", "errno", "assert",
];

const MAIN_HEADERS: [&str; 7] = ["stdint", "stddef", "stdbool", "stdio", "stdlib", "string", "math"];

/// Copiés tels quels depuis les sources C, chemin relatif conservé.
const RUNTIME_STATIC: [&str; 8] = [
    "opcodes.h",
    "linenoise.h",
    "linenoise.c",
    "argparse.h",
    "argparse.c",
    "encodings/utf8.h",
    "encodings/utf8.c",
    "LICENSE",
];

/// Cibles du Makefile modèle.
pub const TARGET_CLEAN: &str = "clean";
pub const TARGET_LIBRARY: &str = "library";
pub const TARGET_INTERP: &str = "interp";

/// Bilan d’une génération (journalisé par la CLI).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub fragments: usize,
    pub written: Vec<Utf8PathBuf>,
    pub flags_patched: usize,
    pub make_targets: Vec<&'static str>,
}

pub struct ArtifactAssembler<'c> {
    cfg: &'c BuildConfig,
    name: &'static str,
    build_dir: Utf8PathBuf,
}

impl<'c> ArtifactAssembler<'c> {
    pub fn new(cfg: &'c BuildConfig) -> Self {
        Self { cfg, name: cfg.dialect_name(), build_dir: cfg.build_dir() }
    }

    pub fn run(&self) -> Result<BuildReport> {
        self.cfg.validate()?;
        let mut report = BuildReport::default();

        self.prepare_dirs()?;

        let generate = !self.cfg.generation.skip_generation;
        if generate {
            let mut counter = FragmentCounter::new();
            report.written.push(self.write_source(&mut counter)?);
            report.written.push(self.write_header(&mut counter)?);
            report.fragments = counter.admitted();
        }

        report.written.push(self.write_makefile()?);

        if generate {
            report.written.extend(self.copy_static()?);
            report.flags_patched = self.patch_makefile()?;
        }

        report.make_targets = self.make()?;
        Ok(report)
    }

    /* ───────────── 0. Répertoires ───────────── */

    fn prepare_dirs(&self) -> Result<()> {
        fs::ensure_dir(&self.build_dir)?;
        if self.cfg.generation.make_sys_dir {
            fs::make_dir_all(&self.cfg.paths.sys_dir)?;
        }
        if self.cfg.generation.clean_build {
            let n = fs::remove_regular_files(&self.build_dir)?;
            log::info!("{}: {n} fichier(s) supprimé(s)", self.build_dir);
        }
        Ok(())
    }

    /* ───────────── 1–2. Amalgamation ───────────── */

    fn amalgamate<W: std::io::Write>(
        &self,
        kind: FragmentKind,
        out: &mut Output<W>,
        counter: &mut FragmentCounter,
    ) -> Result<()> {
        let mut rules = AmalgamRules::new(self.cfg);
        let mut pipeline = FragmentPipeline::new(&mut rules);
        for cat in CATEGORIES {
            let base = cat.base_dir(&self.cfg.paths.runtime_src_dir);
            pipeline.run(cat.fragments(), &base, kind, out, counter)?;
        }
        Ok(())
    }

    fn write_source(&self, counter: &mut FragmentCounter) -> Result<Utf8PathBuf> {
        let path = self.cfg.source_artifact();
        let mut out = Output::create(&path)?;

        out.write_str(&format!("/* {}.c : généré par lmake {VERSION} */\n", self.name))?;
        let f = &self.cfg.features;
        out.write_str(&gate::disabled_defines(f.http, f.sqlite))?;
        for h in STD_HEADERS {
            out.write_str(&gate::std_include(h))?;
        }
        out.write_str(&format!("\n#include \"__{}.h\"\n", self.name))?;

        self.amalgamate(FragmentKind::Source, &mut out, counter)?;
        log::info!("source → {}", out.path());
        out.finish()?;
        Ok(path)
    }

    fn write_header(&self, counter: &mut FragmentCounter) -> Result<Utf8PathBuf> {
        let path = self.cfg.header_artifact();
        let guard = format!("LMAKE_{}_AMALGAM_H", self.name.to_ascii_uppercase());
        let mut out = Output::create(&path)?;

        out.write_str(&format!("#ifndef {guard}\n#define {guard}\n"))?;
        let f = &self.cfg.features;
        out.write_str(&gate::disabled_defines(f.http, f.sqlite))?;

        self.amalgamate(FragmentKind::Header, &mut out, counter)?;

        // prototypes des fonctions ajoutées à la fermeture des fragments
        out.write_str("\nTable vm_get_globals(VM *vm);\n")?;
        out.write_str(&format!("\n#endif /* {guard} */\n"))?;
        log::info!("en-tête → {}", out.path());
        out.finish()?;
        Ok(path)
    }

    /* ───────────── 3. Makefile ───────────── */

    fn makefile_path(&self) -> Utf8PathBuf {
        self.build_dir.join("Makefile")
    }

    fn write_makefile(&self) -> Result<Utf8PathBuf> {
        let dest = self.makefile_path();
        let template = self.cfg.paths.src_dir.join("Makefile");
        makefile::generate(&dest, &template, self.name, &self.cfg.paths.sys_dir)?;
        Ok(dest)
    }

    /* ───────────── 4. Copies ───────────── */

    fn copy_static(&self) -> Result<Vec<Utf8PathBuf>> {
        let mut written = Vec::new();
        fs::ensure_dir(&self.build_dir.join("encodings"))?;

        for rel in RUNTIME_STATIC {
            let dst = self.build_dir.join(rel);
            fs::copy_file(&self.cfg.paths.runtime_src_dir.join(rel), &dst, CopyMode::Overwrite)?;
            written.push(dst);
        }

        let src = &self.cfg.paths.src_dir;
        let main = self.build_dir.join("main.c");
        let mut prologue: String = MAIN_HEADERS.iter().map(|h| format!("#include <{h}.h>\n")).collect();
        prologue.push_str(&format!("\n#include <{}.h>\n", self.name));
        fs::write_all(&main, prologue.as_bytes())?;
        fs::copy_file(&src.join("main.c"), &main, CopyMode::Append)?;
        written.push(main);

        let api = self.cfg.api_header();
        fs::copy_file(&src.join("dictu.h"), &api, CopyMode::Overwrite)?;
        written.push(api);

        log::info!("{} fichier(s) copié(s) dans {}", written.len(), self.build_dir);
        Ok(written)
    }

    /* ───────────── 5. Drapeaux ───────────── */

    fn patch_makefile(&self) -> Result<usize> {
        let flags = makefile::enabled_flags(&self.cfg.features);
        makefile::patch_flags(&self.makefile_path(), &flags)
    }

    /* ───────────── 6. make ───────────── */

    fn make(&self) -> Result<Vec<&'static str>> {
        let m = &self.cfg.make;
        if !m.any() {
            return Ok(Vec::new());
        }
        let targets: Vec<&'static str> = [
            (m.clean_installed, TARGET_CLEAN),
            (m.library, TARGET_LIBRARY),
            (m.interpreter, TARGET_INTERP),
        ]
        .into_iter()
        .filter_map(|(on, t)| on.then_some(t))
        .collect();

        let _cwd = WorkdirGuard::enter(&self.build_dir)?;
        for &target in &targets {
            log::info!("{} {target} (dans {})", m.program, self.build_dir);
            let status = Command::new(&m.program)
                .arg(target)
                .status()
                .map_err(|e| Error::io(m.program.as_str(), e))?;
            if !status.success() {
                return Err(Error::Make { program: m.program.clone(), target: target.into(), status });
            }
        }
        Ok(targets)
    }
}

/// Change de répertoire courant ; l’ancien est restauré au `drop`, erreur ou pas.
struct WorkdirGuard {
    previous: PathBuf,
}

impl WorkdirGuard {
    fn enter(dir: &Utf8Path) -> Result<Self> {
        let previous = env::current_dir().at(Utf8Path::new("."))?;
        env::set_current_dir(dir).at(dir)?;
        Ok(Self { previous })
    }
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            log::warn!("retour à {} impossible: {e}", self.previous.display());
        }
    }
}
