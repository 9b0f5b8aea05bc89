//! Règles d’amalgamation propres aux sources Dictu.
//!
//! [`AmalgamRules`] aiguille chaque fragment (par nom) vers :
//! - `disambiguate` : renommage des symboles en collision ;
//! - `gate` : gardes `DISABLE_*` et stub de `exit()` ;
//! - `dialect` : injection de `identifierType()` pour lai.

pub mod dialect;
pub mod disambiguate;
pub mod gate;

use crate::config::{BuildConfig, Features};
use crate::manifest::FragmentKind;
use crate::pipeline::{Admission, FragmentCursor, FragmentRules, LineAction};

use dialect::DialectInjector;

/// Accesseur ajouté à la fin de `vm.c` (la table des globales n’est pas exposée sinon).
pub const VM_GLOBALS_ACCESSOR: &str = "\nTable vm_get_globals(VM *vm) {\n    return vm->globals;\n}\n";

pub struct AmalgamRules {
    features: Features,
    dialect: Option<DialectInjector>,
}

impl AmalgamRules {
    pub fn new(cfg: &BuildConfig) -> Self {
        let dialect = cfg.features.dialect.then(|| DialectInjector::new(cfg.dialect_fragment()));
        Self { features: cfg.features.clone(), dialect }
    }
}

impl FragmentRules for AmalgamRules {
    fn admit(&mut self, c: &FragmentCursor) -> Admission {
        let stem = c.fragment.stem();
        // remplacés par l’amalgamation elle-même
        if c.kind == FragmentKind::Source && matches!(stem, "common" | "optionals") {
            return Admission::Skip;
        }
        if let Some(d) = &self.dialect {
            if c.is("scanner", FragmentKind::Source) && !d.available() {
                return Admission::Abort(format!("fragment du dialecte introuvable: {}", d.replacement()));
            }
        }
        Admission::Proceed { prologue: gate::guard_for(stem).map(gate::open) }
    }

    fn rewrite_line(&mut self, c: &mut FragmentCursor, line: &str) -> LineAction {
        if c.is("scanner", FragmentKind::Source) {
            if let Some(action) = self.dialect.as_ref().and_then(|d| d.rewrite(c, line)) {
                return action;
            }
        }
        if self.features.exit_disabled && c.is("system", FragmentKind::Source) {
            if let Some(stub) = gate::stub_exit(line) {
                return LineAction::Rewritten(stub);
            }
        }
        // `optionals.c` n’est jamais admis : le registre visé est celui de l’en-tête
        if c.is("optionals", FragmentKind::Header) {
            if let Some(wrapped) = gate::wrap_registry_line(line) {
                return LineAction::Rewritten(wrapped);
            }
        }
        match disambiguate::table_for(c.fragment.stem(), c.kind).and_then(|t| t.apply(line)) {
            Some(s) => LineAction::Rewritten(s),
            None => LineAction::Keep,
        }
    }

    fn on_close(&mut self, c: &FragmentCursor) -> Option<String> {
        let mut tail = String::new();
        if c.is("vm", FragmentKind::Source) {
            tail.push_str(VM_GLOBALS_ACCESSOR);
        }
        if let Some(g) = gate::guard_for(c.fragment.stem()) {
            tail.push_str(&gate::close(g));
        }
        (!tail.is_empty()).then_some(tail)
    }
}
