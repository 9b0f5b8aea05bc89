//! Compilation conditionnelle des modules optionnels et stub de `exit()`.

/// Macro de garde d’un fragment optionnel, d’après son dernier composant de nom.
pub fn guard_for(stem: &str) -> Option<&'static str> {
    match stem {
        "http" => Some("DISABLE_HTTP"),
        "sqlite" => Some("DISABLE_SQLITE"),
        _ => None,
    }
}

pub fn open(guard: &str) -> String {
    format!("#ifndef {guard}\n")
}

/// Le `\n` initial referme proprement un fragment sans saut de ligne final.
pub fn close(guard: &str) -> String {
    format!("\n#endif /* {guard} */\n")
}

/// `#define` émis en tête d’artefact pour chaque module désactivé.
pub fn disabled_defines(http: bool, sqlite: bool) -> String {
    let mut out = String::new();
    for (enabled, guard) in [(http, "DISABLE_HTTP"), (sqlite, "DISABLE_SQLITE")] {
        if !enabled {
            out.push_str(&format!("#ifndef {guard}\n#define {guard}\n#endif\n"));
        }
    }
    out
}

/// `#include <header.h>` sous garde quand l’en-tête vient d’un module optionnel.
pub fn std_include(header: &str) -> String {
    let guard = match header {
        "curl/curl" => Some("DISABLE_HTTP"),
        "sqlite3" => Some("DISABLE_SQLITE"),
        _ => None,
    };
    match guard {
        Some(g) => format!("#ifndef {g}\n#include <{header}.h>\n#endif\n"),
        None => format!("#include <{header}.h>\n"),
    }
}

/* ───────────── exit() ───────────── */

pub const EXIT_REGISTRATION: &str = "    defineNativeMethod(vm, klass, \"exit\", exitNative);\n";
pub const EXIT_STUB: &str = "    /* exit() disabled */ (void) exitNative;\n";

/// Ligne exacte d’enregistrement de `exit` → stub (garde `exitNative` « utilisé »).
pub fn stub_exit(line: &str) -> Option<String> {
    (line == EXIT_REGISTRATION).then(|| EXIT_STUB.to_string())
}

/// Registre des optionnels : une ligne qui mentionne `Sqlite` passe sous garde.
/// Seule réécriture qui ajoute des lignes.
pub fn wrap_registry_line(line: &str) -> Option<String> {
    if !line.contains("Sqlite") {
        return None;
    }
    let nl = if line.ends_with('\n') { "" } else { "\n" };
    Some(format!("#ifndef DISABLE_SQLITE\n{line}{nl}#endif\n"))
}
