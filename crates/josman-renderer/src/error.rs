//! HTML tree error types.

/// Error parsing HTML into a tree.
#[derive(Debug, thiserror::Error)]
pub enum HtmlError {
    /// Markup could not be tokenized.
    #[error("HTML parse error: {0}")]
    Parse(#[from] quick_xml::Error),

    /// Encoding error while decoding names or text.
    #[error("HTML encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
}
