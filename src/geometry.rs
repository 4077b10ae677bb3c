//! Page geometry classification
//!
//! Expert statements are ordinary A4 or Letter documents. Other page shapes
//! mostly come from slide decks, which are not worth running OCR on.

use crate::Result;
use anyhow::Context;
use lopdf::{Dictionary, Document, Object};
use std::{fmt, path::Path};

/// Tolerance on paper dimensions, in PostScript points
const TOLERANCE: f64 = 3.0;

/// A4 paper dimensions in points (portrait)
const A4: (f64, f64) = (595.0, 842.0);

/// US Letter paper dimensions in points (portrait)
const LETTER: (f64, f64) = (612.0, 792.0);

/// Maximal depth of page tree inheritance that we follow
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Known paper size, as inferred from page dimensions
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PaperSize {
    A4,
    A4Rotated,
    Letter,
    LetterRotated,
    Unknown,
}
//
impl PaperSize {
    /// Classify page dimensions, given in points
    pub fn classify(width: f64, height: f64) -> Self {
        let matches = |(w, h): (f64, f64)| {
            (width - w).abs() <= TOLERANCE && (height - h).abs() <= TOLERANCE
        };
        if matches(A4) {
            Self::A4
        } else if matches((A4.1, A4.0)) {
            Self::A4Rotated
        } else if matches(LETTER) {
            Self::Letter
        } else if matches((LETTER.1, LETTER.0)) {
            Self::LetterRotated
        } else {
            Self::Unknown
        }
    }

    /// Classify the first page of a PDF document
    ///
    /// Documents whose page size cannot be determined are [`Unknown`](Self::Unknown).
    pub fn of_pdf(path: &Path) -> Result<Self> {
        Ok(match probe_first_page(path)? {
            Some((width, height)) => Self::classify(width, height),
            None => Self::Unknown,
        })
    }

    /// Truth that pages of this size are worth running OCR on
    pub fn is_document(self) -> bool {
        self != Self::Unknown
    }
}
//
impl fmt::Display for PaperSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A4 => "A4",
            Self::A4Rotated => "A4 rotated",
            Self::Letter => "letter",
            Self::LetterRotated => "letter rotated",
            Self::Unknown => "unknown",
        })
    }
}

/// Width and height of the first page of a PDF document, in points
///
/// The page's MediaBox is looked up on the page itself, then on its ancestors
/// in the page tree. Returns `None` if the document has no page or no
/// usable MediaBox.
pub fn probe_first_page(path: &Path) -> Result<Option<(f64, f64)>> {
    let document =
        Document::load(path).with_context(|| format!("loading PDF {}", path.display()))?;
    let Some(&page_id) = document.get_pages().values().next() else {
        log::debug!("{} has no pages", path.display());
        return Ok(None);
    };
    let mut page = document
        .get_dictionary(page_id)
        .with_context(|| format!("reading first page of {}", path.display()))?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Some(dimensions) = media_box_dimensions(&document, page) {
            return Ok(Some(dimensions));
        }
        let Ok(parent) = page.get(b"Parent").and_then(Object::as_reference) else {
            break;
        };
        let Ok(parent) = document.get_dictionary(parent) else {
            break;
        };
        page = parent;
    }
    log::debug!("{} has no usable MediaBox", path.display());
    Ok(None)
}

/// Dimensions of a page tree node's MediaBox, if it has one
fn media_box_dimensions(document: &Document, node: &Dictionary) -> Option<(f64, f64)> {
    let media_box = resolve(document, node.get(b"MediaBox").ok()?)?;
    let Object::Array(corners) = media_box else {
        return None;
    };
    let corners = corners
        .iter()
        .map(|corner| number(resolve(document, corner)?))
        .collect::<Option<Vec<_>>>()?;
    let &[x0, y0, x1, y1] = corners.as_slice() else {
        return None;
    };
    Some(((x1 - x0).abs(), (y1 - y0).abs()))
}

/// Follow an indirect object reference, if needed
fn resolve<'doc>(document: &'doc Document, object: &'doc Object) -> Option<&'doc Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        direct => Some(direct),
    }
}

/// Numeric value of a PDF object
fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn standard_paper_sizes() {
        assert_eq!(PaperSize::classify(595.0, 842.0), PaperSize::A4);
        assert_eq!(PaperSize::classify(595.276, 841.89), PaperSize::A4);
        assert_eq!(PaperSize::classify(842.0, 595.0), PaperSize::A4Rotated);
        assert_eq!(PaperSize::classify(612.0, 792.0), PaperSize::Letter);
        assert_eq!(PaperSize::classify(792.0, 612.0), PaperSize::LetterRotated);
    }

    #[test]
    fn tolerance_is_inclusive() {
        assert_eq!(PaperSize::classify(592.0, 845.0), PaperSize::A4);
        assert_eq!(PaperSize::classify(591.9, 842.0), PaperSize::Unknown);
        assert_eq!(PaperSize::classify(615.0, 789.0), PaperSize::Letter);
    }

    #[test]
    fn odd_sizes_are_unknown() {
        assert_eq!(PaperSize::classify(800.0, 800.0), PaperSize::Unknown);
        // 16:9 slides
        assert_eq!(PaperSize::classify(960.0, 540.0), PaperSize::Unknown);
        assert!(!PaperSize::Unknown.is_document());
        assert!(PaperSize::A4Rotated.is_document());
    }

    /// Write a single-page PDF whose MediaBox is inherited from the page tree
    pub(crate) fn write_pdf(path: &Path, media_box: [i64; 4]) {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => media_box.iter().map(|&x| Object::Integer(x)).collect::<Vec<_>>(),
        };
        document.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);
        document.save(path).unwrap();
    }

    #[test]
    fn inherited_media_box_is_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a4.pdf");
        write_pdf(&path, [0, 0, 595, 842]);
        assert_eq!(probe_first_page(&path).unwrap(), Some((595.0, 842.0)));
        assert_eq!(PaperSize::of_pdf(&path).unwrap(), PaperSize::A4);

        let path = dir.path().join("slides.pdf");
        write_pdf(&path, [0, 0, 960, 540]);
        assert_eq!(PaperSize::of_pdf(&path).unwrap(), PaperSize::Unknown);
    }

    #[test]
    fn unreadable_pdf_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, "not a pdf").unwrap();
        assert!(probe_first_page(&path).is_err());
    }
}
