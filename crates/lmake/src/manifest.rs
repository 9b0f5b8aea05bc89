//! manifest.rs — Liste figée et ordonnée des fragments C de Dictu.
//!
//! L’ordre est un invariant : l’amalgamation renomme certains symboles
//! fragment par fragment, et un fragment ultérieur ne peut référencer un
//! identifiant renommé que si cet ordre est conservé. Ne pas trier.
//!
//! Disposition attendue sous le répertoire des sources C (`--langcdir`) :
//! ```text
//! <langc>/<core>.{c,h}
//! <langc>/datatypes/<name>.{c,h}
//! <langc>/optionals/<name>.{c,h}      (name peut contenir '/': "http/http")
//! ```

use camino::{Utf8Path, Utf8PathBuf};

/// Groupe de fragments (détermine le répertoire de base).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Core,
    DataType,
    Optional,
}

/// Variante d’un fragment : en-tête ou source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Header,
    Source,
}

impl FragmentKind {
    pub fn ext(self) -> &'static str {
        match self {
            FragmentKind::Header => "h",
            FragmentKind::Source => "c",
        }
    }
}

/// Un fichier du manifeste. Identité = `(name, category)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fragment {
    pub name: &'static str,
    pub category: Category,
}

impl Fragment {
    const fn new(name: &'static str, category: Category) -> Self {
        Self { name, category }
    }

    /// Dernier composant du nom (`"http/http"` → `"http"`) ; clé de dispatch des règles.
    pub fn stem(&self) -> &'static str {
        match self.name.rfind('/') {
            Some(i) => &self.name[i + 1..],
            None => self.name,
        }
    }

    pub fn file_name(&self, kind: FragmentKind) -> String {
        format!("{}.{}", self.name, kind.ext())
    }

    pub fn path(&self, base_dir: &Utf8Path, kind: FragmentKind) -> Utf8PathBuf {
        base_dir.join(self.file_name(kind))
    }
}

use Category::{Core, DataType, Optional};

pub static CORE: [Fragment; 11] = [
    Fragment::new("common", Core),
    Fragment::new("value", Core),
    Fragment::new("chunk", Core),
    Fragment::new("table", Core),
    Fragment::new("object", Core),
    Fragment::new("scanner", Core),
    Fragment::new("compiler", Core),
    Fragment::new("vm", Core),
    Fragment::new("natives", Core),
    Fragment::new("memory", Core),
    Fragment::new("util", Core),
];

pub static DATATYPES: [Fragment; 11] = [
    Fragment::new("bool", DataType),
    Fragment::new("class", DataType),
    Fragment::new("copy", DataType),
    Fragment::new("dicts", DataType),
    Fragment::new("files", DataType),
    Fragment::new("instance", DataType),
    Fragment::new("lists", DataType),
    Fragment::new("nil", DataType),
    Fragment::new("number", DataType),
    Fragment::new("sets", DataType),
    Fragment::new("strings", DataType),
];

pub static OPTIONALS: [Fragment; 12] = [
    Fragment::new("optionals", Optional),
    Fragment::new("c", Optional),
    Fragment::new("env", Optional),
    Fragment::new("http/http", Optional),
    Fragment::new("jsonParseLib", Optional),
    Fragment::new("jsonBuilderLib", Optional),
    Fragment::new("json", Optional),
    Fragment::new("math", Optional),
    Fragment::new("path", Optional),
    Fragment::new("system", Optional),
    Fragment::new("datetime", Optional),
    Fragment::new("sqlite/sqlite", Optional),
];

/// Ordre d’émission des catégories, identique pour l’en-tête et la source.
pub const CATEGORIES: [Category; 3] = [Core, DataType, Optional];

impl Category {
    pub fn fragments(self) -> &'static [Fragment] {
        match self {
            Core => &CORE,
            DataType => &DATATYPES,
            Optional => &OPTIONALS,
        }
    }

    /// Répertoire de base de la catégorie sous les sources C.
    pub fn base_dir(self, runtime_src_dir: &Utf8Path) -> Utf8PathBuf {
        match self {
            Core => runtime_src_dir.to_path_buf(),
            DataType => runtime_src_dir.join("datatypes"),
            Optional => runtime_src_dir.join("optionals"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn identities_are_unique() {
        let mut seen = HashSet::new();
        for cat in CATEGORIES {
            for f in cat.fragments() {
                assert_eq!(f.category, cat);
                assert!(seen.insert((f.name, f.category)), "doublon: {}", f.name);
            }
        }
    }

    #[test]
    fn paths_follow_layout() {
        let root = Utf8Path::new("src/Dictu");
        let http = OPTIONALS.iter().find(|f| f.stem() == "http").unwrap();
        let base = http.category.base_dir(root);
        assert_eq!(http.path(&base, FragmentKind::Source).as_str(), "src/Dictu/optionals/http/http.c");
        assert_eq!(CORE[0].path(&Core.base_dir(root), FragmentKind::Header).as_str(), "src/Dictu/common.h");
    }

    #[test]
    fn scanner_precedes_compiler() {
        let pos = |n: &str| CORE.iter().position(|f| f.name == n).unwrap();
        assert!(pos("scanner") < pos("compiler"));
        assert!(pos("compiler") < pos("vm"));
    }
}
