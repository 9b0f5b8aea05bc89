//! Renommage de symboles : une table de réécritures par fragment.
//!
//! Tous les fragments finissent dans une seule unité de traduction ; deux
//! `static` homonymes (`peek`, `number`, `toString`…) y entreraient en
//! collision. Chaque table préfixe l’identifiant fautif dans son fragment.

use crate::manifest::FragmentKind;
use crate::pipeline::LineBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    First,
    All,
}

/// Une réécriture : cherche `pattern`, remplace `remove` octets à `pattern + at` par `insert`.
#[derive(Debug, Clone, Copy)]
pub struct Rename {
    pattern: &'static str,
    at: usize,
    remove: usize,
    insert: &'static str,
    occurrence: Occurrence,
    /// Le motif doit être un mot entier (ni précédé ni suivi d’un caractère d’identifiant).
    bare_word: bool,
}

impl Rename {
    const fn prefix(pattern: &'static str, at: usize, insert: &'static str, occurrence: Occurrence) -> Self {
        Self { pattern, at, remove: 0, insert, occurrence, bare_word: false }
    }

    const fn word(self) -> Self {
        Self { bare_word: true, ..self }
    }

    /// `None` si la ligne ne contient pas le motif.
    pub fn apply(&self, line: &str) -> Option<String> {
        let bytes = line.as_bytes();
        let mut out = String::with_capacity(line.len() + LineBuffer::MARGIN);
        let mut copied = 0usize;
        let mut from = 0usize;
        let mut changed = false;

        while let Some(rel) = line[from..].find(self.pattern) {
            let start = from + rel;
            let end = start + self.pattern.len();
            from = end;
            if self.bare_word && !is_bare(bytes, start, end) {
                continue;
            }
            let at = start + self.at;
            out.push_str(&line[copied..at]);
            out.push_str(self.insert);
            copied = at + self.remove;
            changed = true;
            if self.occurrence == Occurrence::First {
                break;
            }
        }

        if !changed {
            return None;
        }
        out.push_str(&line[copied..]);
        Some(out)
    }
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_bare(bytes: &[u8], start: usize, end: usize) -> bool {
    (start == 0 || !is_ident(bytes[start - 1])) && bytes.get(end).map_or(true, |&b| !is_ident(b))
}

/// Comment combiner les entrées d’une table sur une ligne.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Chaque entrée s’applique, l’une après l’autre.
    Each,
    /// Seule la première entrée trouvée (dans l’ordre de la table) s’applique.
    FirstMatch,
}

#[derive(Debug)]
pub struct RenameTable {
    renames: &'static [Rename],
    strategy: Strategy,
}

impl RenameTable {
    /// Réécrit `line`, ou `None` si aucune entrée ne s’applique.
    pub fn apply(&self, line: &str) -> Option<String> {
        match self.strategy {
            Strategy::FirstMatch => self.renames.iter().find_map(|r| r.apply(line)),
            Strategy::Each => {
                let mut current: Option<String> = None;
                for r in self.renames {
                    let input = current.as_deref().unwrap_or(line);
                    if let Some(next) = r.apply(input) {
                        current = Some(next);
                    }
                }
                current
            }
        }
    }
}

use Occurrence::{All, First};

static SCANNER: RenameTable = RenameTable {
    renames: &[
        Rename::prefix("peek", 0, "scan_", All),
        Rename::prefix("advance", 0, "scan_", First),
        Rename::prefix("match", 0, "scan_", First),
    ],
    strategy: Strategy::Each,
};

static COMPILER: RenameTable = RenameTable {
    renames: &[
        Rename::prefix("number(", 0, "comp_", First),
        Rename::prefix("{number,", 1, "comp_", First),
        Rename::prefix("string(", 0, "comp_", First),
        Rename::prefix("{string,", 1, "comp_", First),
        Rename::prefix("function(", 0, "comp_", First),
        Rename::prefix("call(", 0, "comp_", First),
        Rename::prefix(", call,", 2, "comp_", First),
    ],
    strategy: Strategy::FirstMatch,
};

static CLASS: RenameTable = RenameTable {
    renames: &[
        Rename::prefix("toString(", 0, "class_", First),
        Rename::prefix("toString)", 0, "class_", First),
    ],
    strategy: Strategy::Each,
};

static ENV: RenameTable = RenameTable {
    renames: &[Rename::prefix("get(", 0, "env_", First), Rename::prefix("get)", 0, "env_", First)],
    strategy: Strategy::Each,
};

static SQLITE: RenameTable = RenameTable {
    renames: &[Rename::prefix("execute", 0, "sqlite_", All)],
    strategy: Strategy::Each,
};

static JSON_PARSE: RenameTable = RenameTable {
    renames: &[Rename::prefix("uchar", 0, "j_", All).word()],
    strategy: Strategy::Each,
};

static JSON_BUILDER: RenameTable = RenameTable {
    renames: &[Rename { pattern: "default_opts", at: 0, remove: 1, insert: "D", occurrence: All, bare_word: false }],
    strategy: Strategy::Each,
};

/// Table applicable à un fragment (par son dernier composant de nom).
///
/// Les `static` de scanner, compiler, class et env ne sont définis que dans
/// le `.c` ; les autres renommages touchent aussi l’en-tête.
pub fn table_for(stem: &str, kind: FragmentKind) -> Option<&'static RenameTable> {
    match (stem, kind) {
        ("scanner", FragmentKind::Source) => Some(&SCANNER),
        ("compiler", FragmentKind::Source) => Some(&COMPILER),
        ("class", FragmentKind::Source) => Some(&CLASS),
        ("env", FragmentKind::Source) => Some(&ENV),
        ("sqlite", _) => Some(&SQLITE),
        ("jsonParseLib", _) => Some(&JSON_PARSE),
        ("jsonBuilderLib", _) => Some(&JSON_BUILDER),
        // point d’extension réservé : l’en-tête datetime passe tel quel
        ("datetime", FragmentKind::Header) => None,
        _ => None,
    }
}
