// tests/amalgamate.rs — génération complète sur une arborescence factice.
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use indoc::indoc;
use pretty_assertions::assert_eq;

use lmake::config::{BuildConfig, CliOverrides};
use lmake::manifest::{FragmentKind, CATEGORIES};
use lmake::{ArtifactAssembler, Error};

const SCANNER_C: &str = indoc! {r#"
    #include "scanner.h"
    static char peek(Scanner *s) { return *s->current; }
    static TokenType identifierType() {
        switch (peek(s)) {
            case 'a': return TOKEN_AND;
        }
        return TOKEN_IDENTIFIER;
    }
    Token scanToken(Scanner *s) { advance(s); return makeToken(s); }
"#};

const SYSTEM_C: &str = indoc! {r#"
    void createSystemModule(VM *vm) {
        defineNativeMethod(vm, klass, "exit", exitNative);
    }
"#};

const OPTIONALS_H: &str = indoc! {r#"
    BuiltinModules modules[] = {
        {"Math", &createMathsModule},
        {"Sqlite", &createSqliteModule},
    };
"#};

struct Fixture {
    _dir: tempfile::TempDir,
    root: Utf8PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let langc = root.join("langc");

        for cat in CATEGORIES {
            let base = cat.base_dir(&langc);
            for f in cat.fragments() {
                for kind in [FragmentKind::Header, FragmentKind::Source] {
                    let body = format!("#include \"common.h\"\nint {}_{};\n", f.stem(), kind.ext());
                    write(&f.path(&base, kind), &body);
                }
            }
        }
        write(&langc.join("scanner.c"), SCANNER_C);
        write(&langc.join("compiler.c"), "static void number(Compiler *c) {}\n");
        write(&langc.join("optionals/system.c"), SYSTEM_C);
        write(&langc.join("optionals/optionals.h"), OPTIONALS_H);

        for rel in ["opcodes.h", "linenoise.h", "linenoise.c", "argparse.h", "argparse.c",
                    "encodings/utf8.h", "encodings/utf8.c", "LICENSE"] {
            write(&langc.join(rel), &format!("/* {rel} */\n"));
        }

        let src = root.join("src");
        write(&src.join("main.c"), "int main(void) { return 0; }\n");
        write(&src.join("dictu.h"), "/* api */\n");
        write(&src.join("Makefile"), "library:\n\t$(CC) -c $(NAME).c\n");
        write(&src.join("lai_identifierType.c"), "static TokenType identifierType() {\n    return laiKeyword(s);\n}\n");

        Self { _dir: dir, root }
    }

    fn config(&self, build: &str, o: CliOverrides) -> BuildConfig {
        let mut cfg = BuildConfig::default();
        let o = CliOverrides {
            src_dir: Some(self.root.join("src").into_string()),
            runtime_src_dir: Some(self.root.join("langc").into_string()),
            build_dir: Some(self.root.join(build).into_string()),
            sys_dir: Some(self.root.join("sys").into_string()),
            ..o
        };
        cfg.apply_cli_overrides(&o).unwrap();
        cfg
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root.join(rel)).unwrap()
    }
}

fn write(p: &Utf8Path, body: &str) {
    fs::create_dir_all(p.parent().unwrap()).unwrap();
    fs::write(p, body).unwrap();
}

fn count_lines(text: &str, prefix: &str) -> usize {
    text.lines().filter(|l| l.starts_with(prefix)).count()
}

#[test]
fn default_run_writes_every_artifact() {
    let fx = Fixture::new();
    let cfg = fx.config("build", CliOverrides::default());
    let report = ArtifactAssembler::new(&cfg).run().unwrap();

    for rel in ["dictu.c", "__dictu.h", "Makefile", "main.c", "opcodes.h", "linenoise.h", "linenoise.c",
                "argparse.h", "argparse.c", "encodings/utf8.h", "encodings/utf8.c", "dictu.h", "LICENSE"] {
        assert!(fx.root.join("build").join(rel).is_file(), "absent: {rel}");
    }
    assert!(fx.root.join("sys").is_dir());
    // 34 en-têtes + 32 sources (common.c et optionals.c écartés)
    assert_eq!(report.fragments, 66);
    assert_eq!(report.flags_patched, 0);
    assert!(report.make_targets.is_empty());

    let main = fx.read("build/main.c");
    assert!(main.starts_with("#include <stdint.h>\n"));
    assert!(main.ends_with("#include <dictu.h>\nint main(void) { return 0; }\n"));
}

#[test]
fn fragment_includes_are_stripped() {
    let fx = Fixture::new();
    ArtifactAssembler::new(&fx.config("build", CliOverrides::default())).run().unwrap();
    let source = fx.read("build/dictu.c");
    let header = fx.read("build/__dictu.h");
    assert!(!source.contains("#include \"common.h\""));
    assert!(!header.contains("#include \"common.h\""));
    assert_eq!(count_lines(&source, "#include \"__dictu.h\""), 1);
    assert!(!source.contains("int common_c;"));
    assert!(header.contains("int common_h;"));
}

#[test]
fn markers_number_the_whole_run() {
    let fx = Fixture::new();
    ArtifactAssembler::new(&fx.config("build", CliOverrides::default())).run().unwrap();
    let source = fx.read("build/dictu.c");
    let header = fx.read("build/__dictu.h");
    assert!(source.contains("\n/* [1] value.c */\n"));
    assert!(source.contains("/* [32] sqlite/sqlite.c */\n"));
    assert!(header.contains("\n/* [33] common.h */\n"));
    assert!(header.contains("/* [66] sqlite/sqlite.h */\n"));
}

#[test]
fn output_is_byte_deterministic() {
    let fx = Fixture::new();
    ArtifactAssembler::new(&fx.config("one", CliOverrides::default())).run().unwrap();
    ArtifactAssembler::new(&fx.config("two", CliOverrides::default())).run().unwrap();
    assert_eq!(fx.read("one/dictu.c"), fx.read("two/dictu.c"));
    assert_eq!(fx.read("one/__dictu.h"), fx.read("two/__dictu.h"));
}

/// Les `#ifndef` / `#endif` s’emboîtent correctement ; retourne la profondeur maximale.
fn assert_nested(text: &str, what: &str) -> usize {
    let (mut depth, mut max) = (0usize, 0usize);
    for (no, l) in text.lines().enumerate() {
        if l.starts_with("#ifndef") {
            depth += 1;
            max = max.max(depth);
        } else if l.starts_with("#endif") {
            assert!(depth > 0, "{what}:{}: #endif orphelin", no + 1);
            depth -= 1;
        }
    }
    assert_eq!(depth, 0, "{what}: #ifndef non refermé");
    max
}

#[test]
fn conditional_blocks_are_balanced() {
    let fx = Fixture::new();
    for (http, sqlite) in [(false, false), (true, false), (false, true), (true, true)] {
        let build = format!("build-{http}-{sqlite}");
        let o = CliOverrides { enable_http: http, enable_sqlite: sqlite, ..Default::default() };
        ArtifactAssembler::new(&fx.config(&build, o)).run().unwrap();

        let source = fx.read(&format!("{build}/dictu.c"));
        let header = fx.read(&format!("{build}/__dictu.h"));
        assert_nested(&source, &build);
        assert!(assert_nested(&header, &build) >= 2, "{build}: garde d’inclusion");

        for (name, on) in [("HTTP", http), ("SQLITE", sqlite)] {
            let define = format!("#define DISABLE_{name}\n");
            assert_eq!(source.contains(&define), !on, "{build}");
            assert_eq!(header.contains(&define), !on, "{build}");
            // gardes des fragments présentes quel que soit le drapeau
            let guard = format!("#ifndef DISABLE_{name}\n");
            assert!(count_lines(&source, guard.trim_end()) >= 2, "{build}");
        }
        assert!(source.contains("#ifndef DISABLE_HTTP\nint http_c;\n\n#endif /* DISABLE_HTTP */\n"));
        assert!(source.contains("#ifndef DISABLE_SQLITE\n#include <sqlite3.h>\n#endif\n"));
        assert!(header.contains("#ifndef DISABLE_SQLITE\n    {\"Sqlite\", &createSqliteModule},\n#endif\n"));
    }
}

#[test]
fn collisions_are_renamed_and_vm_accessor_added() {
    let fx = Fixture::new();
    ArtifactAssembler::new(&fx.config("build", CliOverrides::default())).run().unwrap();
    let source = fx.read("build/dictu.c");
    assert!(source.contains("static char scan_peek(Scanner *s)"));
    assert!(source.contains("scan_advance(s);"));
    assert!(source.contains("static void comp_number(Compiler *c) {}"));
    assert!(source.contains("int vm_c;\n\nTable vm_get_globals(VM *vm) {\n    return vm->globals;\n}\n"));
    // exit() reste actif par défaut
    assert!(source.contains(r#"defineNativeMethod(vm, klass, "exit", exitNative);"#));
    assert!(fx.read("build/__dictu.h").contains("Table vm_get_globals(VM *vm);\n"));
}

#[test]
fn dialect_build_injects_identifier_type() {
    let fx = Fixture::new();
    let cfg = fx.config("build", CliOverrides { enable_dialect: true, ..Default::default() });
    ArtifactAssembler::new(&cfg).run().unwrap();

    let source = fx.read("build/lai.c");
    assert!(source.contains("#include \"__lai.h\""));
    assert!(source.contains("    return laiKeyword(s);\n}\nToken scanToken"));
    assert!(!source.contains("case 'a': return TOKEN_AND;"));
    assert!(source.contains("    /* exit() disabled */ (void) exitNative;\n"));
    assert!(fx.root.join("build/__lai.h").is_file());
    assert_eq!(fx.read("build/lai.h"), "/* api */\n");
    assert!(fx.read("build/main.c").contains("#include <lai.h>\n"));
    assert!(fx.read("build/Makefile").contains("NAME    := lai\n"));
    assert!(fx.read("build/Makefile").contains("DISABLE_EXIT := 1\n"));
}

#[test]
fn latin1_scanner_lines_follow_the_rules() {
    let fx = Fixture::new();
    let scanner: &[u8] = b"static TokenType identifierType() {\n    /* \xe9 */\n    return peek();\n}\n/* \xe9 */ int y = peek();\n";
    fs::write(fx.root.join("langc/scanner.c"), scanner).unwrap();
    let cfg = fx.config("build", CliOverrides { enable_dialect: true, ..Default::default() });
    ArtifactAssembler::new(&cfg).run().unwrap();

    let source = fs::read(fx.root.join("build/lai.c")).unwrap();
    let expected: &[u8] = b"    return laiKeyword(s);\n}\n/* \xe9 */ int y = scan_peek();\n";
    assert!(source.windows(expected.len()).any(|w| w == expected));
    assert!(!source.windows(b"return peek();".len()).any(|w| w == b"return peek();"));
}

#[test]
fn dialect_without_replacement_aborts() {
    let fx = Fixture::new();
    fs::remove_file(fx.root.join("src/lai_identifierType.c")).unwrap();
    let cfg = fx.config("build", CliOverrides { enable_dialect: true, ..Default::default() });
    let err = ArtifactAssembler::new(&cfg).run().unwrap_err();
    assert!(matches!(err, Error::Aborted { ref fragment, .. } if fragment == "scanner.c"), "{err}");
    assert!(!fx.root.join("build/Makefile").exists());
}

#[test]
fn enabled_features_flip_makefile_flags() {
    let fx = Fixture::new();
    let o = CliOverrides { enable_http: true, enable_repl: true, enable_sqlite: true, ..Default::default() };
    let report = ArtifactAssembler::new(&fx.config("build", o)).run().unwrap();
    assert_eq!(report.flags_patched, 3);

    let mk = fx.read("build/Makefile");
    assert!(mk.contains("ENABLE_HTTP := 1\nENABLE_REPL := 1\nENABLE_SQLITE := 1\nDISABLE_EXIT := 0\n"));
    assert!(mk.ends_with("library:\n\t$(CC) -c $(NAME).c\n"));
    assert!(!fx.read("build/dictu.c").contains("#define DISABLE_HTTP"));
}

#[test]
fn skip_generation_writes_only_makefile() {
    let fx = Fixture::new();
    let o = CliOverrides { skip_generation: true, enable_http: true, ..Default::default() };
    let report = ArtifactAssembler::new(&fx.config("build", o)).run().unwrap();

    assert_eq!(report.written, vec![fx.root.join("build/Makefile")]);
    assert!(!fx.root.join("build/dictu.c").exists());
    assert!(fx.read("build/Makefile").contains("ENABLE_HTTP := 0\n"));
}

#[test]
fn clean_build_removes_stale_files() {
    let fx = Fixture::new();
    write(&fx.root.join("build/stale.o"), "");
    let o = CliOverrides { clean_build: true, no_sys_dir: true, ..Default::default() };
    ArtifactAssembler::new(&fx.config("build", o)).run().unwrap();
    assert!(!fx.root.join("build/stale.o").exists());
    assert!(fx.root.join("build/encodings").is_dir());
    assert!(!fx.root.join("sys").exists());
}

#[test]
fn encodings_must_be_a_directory() {
    let fx = Fixture::new();
    write(&fx.root.join("build/encodings"), "");
    let err = ArtifactAssembler::new(&fx.config("build", CliOverrides::default())).run().unwrap_err();
    assert!(matches!(err, Error::NotADirectory { .. }));
}

#[test]
fn missing_fragment_names_its_path() {
    let fx = Fixture::new();
    fs::remove_file(fx.root.join("langc/datatypes/sets.c")).unwrap();
    let err = ArtifactAssembler::new(&fx.config("build", CliOverrides::default())).run().unwrap_err();
    assert!(err.to_string().contains("datatypes/sets.c"), "{err}");
}

#[cfg(unix)]
#[test]
fn make_targets_run_in_build_dir() {
    let fx = Fixture::new();
    let cwd = std::env::current_dir().unwrap();

    let mut cfg = fx.config("build", CliOverrides { build_library: true, build_interpreter: true, ..Default::default() });
    cfg.make.program = "true".into();
    let report = ArtifactAssembler::new(&cfg).run().unwrap();
    assert_eq!(report.make_targets, vec!["library", "interp"]);
    assert_eq!(std::env::current_dir().unwrap(), cwd);

    cfg.make.program = "false".into();
    cfg.make.clean_installed = true;
    let err = ArtifactAssembler::new(&cfg).run().unwrap_err();
    assert!(matches!(err, Error::Make { ref target, .. } if target == "clean"));
    assert_eq!(std::env::current_dir().unwrap(), cwd);
}
