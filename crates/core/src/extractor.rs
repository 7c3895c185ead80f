use crate::error::LoadError;
use lopdf::Document;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// Turns the raw bytes of the handbook into page texts.
pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, LoadError>;
}

/// Parses the PDF in memory. Pages whose text cannot be decoded are skipped;
/// the document only fails when no page yields text.
#[derive(Debug, Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, LoadError> {
        let document =
            Document::load_mem(bytes).map_err(|error| LoadError::PdfParse(error.to_string()))?;

        let page_numbers = document.get_pages().into_keys().collect::<Vec<_>>();
        let mut pages = Vec::with_capacity(page_numbers.len());
        let mut unreadable = Vec::new();

        for number in page_numbers {
            match document.extract_text(&[number]) {
                Ok(text) if !text.trim().is_empty() => pages.push(PageText { number, text }),
                Ok(_) => {}
                Err(error) => {
                    warn!(page = number, %error, "skipping unreadable handbook page");
                    unreadable.push(number);
                }
            }
        }

        if pages.is_empty() {
            return Err(LoadError::PdfParse(if unreadable.is_empty() {
                "pdf has no text layer".to_string()
            } else {
                format!("no readable pages; failed pages: {unreadable:?}")
            }));
        }

        Ok(pages)
    }
}

/// Joins extracted pages into one document string, one page per line.
pub fn join_pages(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|page| page.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{join_pages, LopdfExtractor, PageText, PdfExtractor};
    use crate::LoadError;

    #[test]
    fn corrupt_pdf_is_a_parse_error() {
        let result = LopdfExtractor.extract_pages(b"%PDF-1.4\n%broken");
        assert!(matches!(result, Err(LoadError::PdfParse(_))));
    }

    #[test]
    fn empty_input_is_a_parse_error() {
        assert!(matches!(
            LopdfExtractor.extract_pages(&[]),
            Err(LoadError::PdfParse(_))
        ));
    }

    #[test]
    fn pages_are_joined_in_order_without_blank_pages() {
        let pages = vec![
            PageText {
                number: 1,
                text: " Welcome aboard \n".to_string(),
            },
            PageText {
                number: 2,
                text: "   ".to_string(),
            },
            PageText {
                number: 3,
                text: "Vacation policy".to_string(),
            },
        ];

        assert_eq!(join_pages(&pages), "Welcome aboard\nVacation policy");
    }
}
