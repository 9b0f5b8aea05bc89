//! pipeline.rs — Moteur d’amalgamation : un flux de sortie, une tranche de manifeste.
//!
//! Pour chaque fragment, dans l’ordre du manifeste :
//!   admission → marqueur `/* [n] nom.ext */` → lignes (sans `#include`)
//!   passées à la règle → hook de fermeture.
//!
//! Les règles propres à Dictu vivent derrière le trait [`FragmentRules`]
//! (`crate::rules::AmalgamRules`) ; ce module ne connaît aucun nom de fragment.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};

use crate::manifest::{Fragment, FragmentKind};
use crate::util::fs::IoContext;
use crate::{Error, Result};

/* ───────────────────────────── Compteur ───────────────────────────── */

/// Numérotation des fragments admis, partagée par toutes les passes d’une génération.
#[derive(Debug, Default)]
pub struct FragmentCounter {
    next: usize,
}

impl FragmentCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index (à partir de 1) du prochain fragment admis.
    fn advance(&mut self) -> usize {
        self.next += 1;
        self.next
    }

    pub fn admitted(&self) -> usize {
        self.next
    }
}

/* ───────────────────────────── Ligne courante ───────────────────────────── */

/// Tampon de la ligne courante. Garde toujours au moins [`LineBuffer::MARGIN`]
/// octets libres pour qu’un préfixe de renommage tienne sans réallocation.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Longueur du plus long préfixe inséré (`sqlite_`).
    pub const MARGIN: usize = 7;

    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(256) }
    }

    /// Lit une ligne, `\n` compris. `Ok(0)` en fin de fichier.
    pub fn read_line<R: BufRead>(&mut self, reader: &mut R) -> io::Result<usize> {
        self.buf.clear();
        let n = reader.read_until(b'\n', &mut self.buf)?;
        if self.free() < Self::MARGIN {
            // croissance géométrique
            self.buf.reserve(self.buf.capacity().max(Self::MARGIN));
        }
        Ok(n)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Texte présenté aux règles. Une ligne non UTF-8 est lue en Latin-1 :
    /// un caractère par octet, réencodable sans perte.
    pub fn text(&self) -> LineText<'_> {
        match std::str::from_utf8(&self.buf) {
            Ok(s) => LineText::Utf8(s),
            Err(_) => LineText::Latin1(self.buf.iter().map(|&b| char::from(b)).collect()),
        }
    }

    pub fn free(&self) -> usize {
        self.buf.capacity() - self.buf.len()
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineText<'a> {
    Utf8(&'a str),
    Latin1(String),
}

impl LineText<'_> {
    pub fn as_str(&self) -> &str {
        match self {
            LineText::Utf8(s) => s,
            LineText::Latin1(s) => s,
        }
    }

    /// Réécriture d’une règle, ramenée à l’encodage de la ligne d’origine.
    pub fn encode<'s>(&self, rewritten: &'s str) -> Cow<'s, [u8]> {
        match self {
            LineText::Utf8(_) => Cow::Borrowed(rewritten.as_bytes()),
            LineText::Latin1(_) => {
                Cow::Owned(rewritten.chars().map(|c| u8::try_from(c).unwrap_or(b'?')).collect())
            }
        }
    }
}

/* ───────────────────────────── Curseur ───────────────────────────── */

/// État d’un fragment ouvert ; vit le temps de son traitement.
#[derive(Debug)]
pub struct FragmentCursor {
    pub fragment: Fragment,
    pub kind: FragmentKind,
    pub path: Utf8PathBuf,
    pub index: usize,
    pub line_no: usize,
    /// Verrou « on saute le corps d’une fonction remplacée » (dialecte).
    pub skip_function: bool,
}

impl FragmentCursor {
    pub fn new(fragment: Fragment, kind: FragmentKind, path: Utf8PathBuf) -> Self {
        Self { fragment, kind, path, index: 0, line_no: 0, skip_function: false }
    }

    /// `nom.ext`, tel qu’écrit dans le marqueur.
    pub fn display_name(&self) -> String {
        self.fragment.file_name(self.kind)
    }

    pub fn is(&self, stem: &str, kind: FragmentKind) -> bool {
        self.kind == kind && self.fragment.stem() == stem
    }
}

/* ───────────────────────────── Règles ───────────────────────────── */

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// `prologue` est écrit juste après le marqueur.
    Proceed { prologue: Option<String> },
    Skip,
    Abort(String),
}

impl Admission {
    pub fn proceed() -> Self {
        Admission::Proceed { prologue: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    Keep,
    Rewritten(String),
    SkipLine,
    /// Remplace la ligne par le contenu d’un fichier externe.
    Splice(Utf8PathBuf),
    /// Ignore la suite du fragment (le hook de fermeture est quand même appelé).
    SkipRestOfFile,
    AbortRun(String),
}

/// Table de règles consultée par le pipeline.
pub trait FragmentRules {
    fn admit(&mut self, cursor: &FragmentCursor) -> Admission;

    fn rewrite_line(&mut self, cursor: &mut FragmentCursor, line: &str) -> LineAction;

    /// Texte ajouté après la dernière ligne du fragment.
    fn on_close(&mut self, _cursor: &FragmentCursor) -> Option<String> {
        None
    }
}

/* ───────────────────────────── Sortie ───────────────────────────── */

/// Flux de sortie nommé : toute erreur d’écriture porte le chemin de l’artefact.
pub struct Output<W: Write> {
    path: Utf8PathBuf,
    inner: W,
}

impl Output<BufWriter<File>> {
    pub fn create(path: &Utf8Path) -> Result<Self> {
        let file = File::create(path).at(path)?;
        Ok(Self::new(path, BufWriter::new(file)))
    }
}

impl<W: Write> Output<W> {
    pub fn new(path: impl Into<Utf8PathBuf>, inner: W) -> Self {
        Self { path: path.into(), inner }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_bytes(s.as_bytes())
    }

    pub fn write_bytes(&mut self, b: &[u8]) -> Result<()> {
        self.inner.write_all(b).at(&self.path)
    }

    /// Recopie `src` dans la sortie, en flux.
    pub fn splice_file(&mut self, src: &Utf8Path) -> Result<u64> {
        let mut reader = BufReader::new(File::open(src).at(src)?);
        io::copy(&mut reader, &mut self.inner).at(&self.path)
    }

    /// Vide le tampon et rend l’écrivain sous-jacent.
    pub fn finish(mut self) -> Result<W> {
        self.inner.flush().at(&self.path)?;
        Ok(self.inner)
    }
}

/* ───────────────────────────── Pipeline ───────────────────────────── */

pub struct FragmentPipeline<'r, R: FragmentRules + ?Sized> {
    rules: &'r mut R,
}

impl<'r, R: FragmentRules + ?Sized> FragmentPipeline<'r, R> {
    pub fn new(rules: &'r mut R) -> Self {
        Self { rules }
    }

    /// Traite `fragments` (tous sous `base_dir`) vers `out`.
    /// Retourne le nombre de fragments admis par cette passe.
    pub fn run<W: Write>(
        &mut self,
        fragments: &[Fragment],
        base_dir: &Utf8Path,
        kind: FragmentKind,
        out: &mut Output<W>,
        counter: &mut FragmentCounter,
    ) -> Result<usize> {
        let mut admitted = 0usize;
        let mut line = LineBuffer::new();

        for &fragment in fragments {
            let mut cursor = FragmentCursor::new(fragment, kind, fragment.path(base_dir, kind));

            let prologue = match self.rules.admit(&cursor) {
                Admission::Skip => {
                    log::debug!("fragment ignoré: {}", cursor.path);
                    continue;
                }
                Admission::Abort(reason) => return Err(Error::aborted(cursor.display_name(), reason)),
                Admission::Proceed { prologue } => prologue,
            };

            let mut reader = BufReader::new(File::open(&cursor.path).at(&cursor.path)?);
            cursor.index = counter.advance();
            admitted += 1;
            log::debug!("[{}] {}", cursor.index, cursor.path);

            out.write_str(&format!("\n/* [{}] {} */\n", cursor.index, cursor.display_name()))?;
            if let Some(p) = prologue {
                out.write_str(&p)?;
            }

            self.copy_lines(&mut cursor, &mut reader, &mut line, out)?;

            if let Some(epilogue) = self.rules.on_close(&cursor) {
                out.write_str(&epilogue)?;
            }
        }
        Ok(admitted)
    }

    fn copy_lines<W: Write>(
        &mut self,
        cursor: &mut FragmentCursor,
        reader: &mut BufReader<File>,
        line: &mut LineBuffer,
        out: &mut Output<W>,
    ) -> Result<()> {
        loop {
            if line.read_line(reader).at(&cursor.path)? == 0 {
                return Ok(());
            }
            cursor.line_no += 1;

            if line.bytes().starts_with(b"#include") {
                continue;
            }
            let text = line.text();
            if let LineText::Latin1(_) = text {
                log::debug!("{}:{}: ligne non UTF-8, lue en Latin-1", cursor.path, cursor.line_no);
            }

            match self.rules.rewrite_line(cursor, text.as_str()) {
                LineAction::Keep => out.write_bytes(line.bytes())?,
                LineAction::Rewritten(s) => out.write_bytes(&text.encode(&s))?,
                LineAction::SkipLine => {}
                LineAction::Splice(src) => {
                    out.splice_file(&src).map_err(|e| {
                        Error::aborted(cursor.display_name(), format!("lecture de {src} impossible: {e}"))
                    })?;
                }
                LineAction::SkipRestOfFile => return Ok(()),
                LineAction::AbortRun(reason) => {
                    return Err(Error::aborted(
                        cursor.display_name(),
                        format!("ligne {}: {reason}", cursor.line_no),
                    ));
                }
            }
        }
    }
}
