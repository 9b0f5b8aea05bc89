//! Dialecte lai : remplace le corps de `identifierType()` du scanner par une
//! version externe qui reconnaît aussi les mots-clés lai.

use camino::{Utf8Path, Utf8PathBuf};

use crate::pipeline::{FragmentCursor, LineAction};
use crate::util::fs::is_regular_file;

/// Ligne d’ouverture de la fonction remplacée (comparaison exacte).
pub const TRIGGER: &str = "static TokenType identifierType() {\n";
const FUNCTION_END: &str = "}\n";

#[derive(Debug, Clone)]
pub struct DialectInjector {
    replacement: Utf8PathBuf,
}

impl DialectInjector {
    pub fn new(replacement: impl Into<Utf8PathBuf>) -> Self {
        Self { replacement: replacement.into() }
    }

    pub fn replacement(&self) -> &Utf8Path {
        &self.replacement
    }

    pub fn available(&self) -> bool {
        is_regular_file(&self.replacement)
    }

    /// `None` : la ligne ne concerne pas l’injecteur.
    pub fn rewrite(&self, cursor: &mut FragmentCursor, line: &str) -> Option<LineAction> {
        if cursor.skip_function {
            if line == FUNCTION_END {
                cursor.skip_function = false;
            }
            return Some(LineAction::SkipLine);
        }
        if line == TRIGGER {
            log::debug!("{}:{}: identifierType() remplacée par {}", cursor.path, cursor.line_no, self.replacement);
            cursor.skip_function = true;
            return Some(LineAction::Splice(self.replacement.clone()));
        }
        None
    }
}
