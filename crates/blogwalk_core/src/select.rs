use crate::error::ExtractionFailure;
use crate::model::MediaVariant;

pub trait MediaSelector: Send + Sync {
    fn select(&self, variants: &[MediaVariant]) -> Result<String, ExtractionFailure>;
}

/// Picks the widest variant; on equal widths the earliest one wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct LargestWidthSelector;

impl MediaSelector for LargestWidthSelector {
    fn select(&self, variants: &[MediaVariant]) -> Result<String, ExtractionFailure> {
        let mut best: Option<&MediaVariant> = None;
        for variant in variants {
            if best.map_or(true, |current| variant.width > current.width) {
                best = Some(variant);
            }
        }
        best.map(|variant| variant.url.clone())
            .ok_or(ExtractionFailure::NoVariants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(width: u32, url: &str) -> MediaVariant {
        MediaVariant {
            width,
            url: url.to_string(),
            media_key: None,
        }
    }

    #[test]
    fn picks_widest_variant() {
        let variants = [variant(100, "a"), variant(500, "b"), variant(300, "c")];
        assert_eq!(LargestWidthSelector.select(&variants).unwrap(), "b");
    }

    #[test]
    fn ties_keep_original_order() {
        let variants = [variant(400, "first"), variant(400, "second"), variant(10, "x")];
        assert_eq!(LargestWidthSelector.select(&variants).unwrap(), "first");
    }

    #[test]
    fn empty_set_is_an_extraction_failure() {
        assert_eq!(
            LargestWidthSelector.select(&[]),
            Err(ExtractionFailure::NoVariants)
        );
    }
}
