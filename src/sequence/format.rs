//! Rendering of document numbers from templates.
//!
//! A template is literal text around exactly one run of placeholder
//! characters, e.g. `PO-######` or `GR/2024/####/A`. The run's width is the
//! minimum number of digits; larger values widen the number rather than
//! being truncated.

use crate::config::DEFAULT_PLACEHOLDER;
use crate::core::{DocketError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    prefix: String,
    width: usize,
    suffix: String,
}

impl Template {
    pub fn parse(template: &str) -> Result<Self> {
        Self::parse_with(template, DEFAULT_PLACEHOLDER)
    }

    pub fn parse_with(template: &str, placeholder: char) -> Result<Self> {
        let Some(start) = template.find(placeholder) else {
            return Err(DocketError::Format(format!(
                "template '{template}' has no '{placeholder}' placeholder run"
            )));
        };

        let run_bytes: usize = template[start..]
            .chars()
            .take_while(|c| *c == placeholder)
            .map(char::len_utf8)
            .sum();
        let end = start + run_bytes;

        if template[end..].contains(placeholder) {
            return Err(DocketError::Format(format!(
                "template '{template}' has more than one '{placeholder}' placeholder run"
            )));
        }

        Ok(Self {
            prefix: template[..start].to_string(),
            width: run_bytes / placeholder.len_utf8(),
            suffix: template[end..].to_string(),
        })
    }

    /// Minimum digit count of the numeric portion.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn render(&self, value: u64) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            value,
            self.suffix,
            width = self.width
        )
    }
}

/// Render `value` into `template` using the default placeholder.
///
/// Pure: no number is consumed, so this is safe for previews.
pub fn format_number(template: &str, value: u64) -> Result<String> {
    Ok(Template::parse(template)?.render(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pads_to_placeholder_width() {
        assert_eq!(format_number("PO-#####", 42).unwrap(), "PO-00042");
        assert_eq!(format_number("#####", 0).unwrap(), "00000");
        assert_eq!(format_number("GR/2024/####/A", 7).unwrap(), "GR/2024/0007/A");
    }

    #[test]
    fn test_every_value_that_fits_is_zero_padded() {
        let template = Template::parse("WO-######-X").unwrap();
        for value in [0u64, 1, 9, 10, 99, 12_345, 999_999] {
            let rendered = template.render(value);
            assert!(rendered.starts_with("WO-"));
            assert!(rendered.ends_with("-X"));
            let digits = &rendered[3..rendered.len() - 2];
            assert_eq!(digits.len(), 6);
            assert_eq!(digits.parse::<u64>().unwrap(), value);
        }
    }

    #[test]
    fn test_wide_values_are_not_truncated() {
        assert_eq!(format_number("PO-###", 12_345).unwrap(), "PO-12345");
        assert_eq!(format_number("#-end", 100).unwrap(), "100-end");
        assert_eq!(
            format_number("X##", u64::MAX).unwrap(),
            format!("X{}", u64::MAX)
        );
    }

    #[test]
    fn test_missing_placeholder_is_format_error() {
        let err = format_number("PO-00000", 1).unwrap_err();
        assert!(matches!(err, DocketError::Format(_)));
        assert!(format_number("", 1).is_err());
    }

    #[test]
    fn test_second_run_is_format_error() {
        let err = Template::parse("##-PO-###").unwrap_err();
        assert!(matches!(err, DocketError::Format(_)));
    }

    #[test]
    fn test_custom_and_multibyte_placeholders() {
        let star = Template::parse_with("INV*****", '*').unwrap();
        assert_eq!(star.render(31), "INV00031");

        let wide = Template::parse_with("№§§§/Ü", '§').unwrap();
        assert_eq!(wide.width(), 3);
        assert_eq!(wide.render(5), "№005/Ü");
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let template = Template::parse("RC-####").unwrap();
        assert_eq!(template.render(77), template.render(77));
        assert_eq!(
            format_number("RC-####", 77).unwrap(),
            format_number("RC-####", 77).unwrap()
        );
    }
}
