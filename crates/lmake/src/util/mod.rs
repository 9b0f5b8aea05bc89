//! Utilitaires internes (fichiers, chemins).

pub mod fs;
