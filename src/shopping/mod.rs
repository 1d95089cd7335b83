//! Shopping list aggregation and PDF export.
//!
//! The aggregation is a pure fold over (name, unit, amount) rows so it can
//! be tested without a store or a renderer behind it.

use std::collections::BTreeMap;

use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::errors::AppError;

/// One aggregated shopping-list line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

impl ShoppingItem {
    /// The line as printed in the exported document.
    pub fn to_line(&self) -> String {
        format!("- {}: {} {}", self.name, self.amount, self.measurement_unit)
    }
}

/// Fold raw ingredient rows into one line per distinct ingredient name,
/// alphabetical. Amounts for the same name are summed; two different units
/// under one name abort the whole aggregation.
pub fn aggregate(rows: &[(String, String, i64)]) -> Result<Vec<ShoppingItem>, AppError> {
    let mut totals: BTreeMap<String, (String, i64)> = BTreeMap::new();

    for (name, unit, amount) in rows {
        match totals.get_mut(name) {
            Some((existing_unit, total)) => {
                if existing_unit != unit {
                    return Err(AppError::UnitMismatch {
                        ingredient: name.clone(),
                        units: (existing_unit.clone(), unit.clone()),
                    });
                }
                *total += amount;
            }
            None => {
                totals.insert(name.clone(), (unit.clone(), *amount));
            }
        }
    }

    Ok(totals
        .into_iter()
        .map(|(name, (measurement_unit, amount))| ShoppingItem {
            name,
            measurement_unit,
            amount,
        })
        .collect())
}

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 20.0;
const MARGIN_TOP: f32 = 20.0;
const MARGIN_BOTTOM: f32 = 20.0;
const TITLE_SIZE: f32 = 18.0;
const BODY_SIZE: f32 = 12.0;
const LINE_HEIGHT: f32 = 8.0;

/// Render the aggregated list as an A4 PDF. An empty list still yields a
/// valid document with just the heading.
pub fn render_pdf(items: &[ShoppingItem]) -> Result<Vec<u8>, AppError> {
    let document = PdfDocument::empty("Shopping list");
    let (page_index, layer_index) =
        document.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Page 1, Layer 1");

    let title_font = document
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AppError::Internal(format!("PDF font setup failed: {}", e)))?;
    let body_font = document
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::Internal(format!("PDF font setup failed: {}", e)))?;

    let mut layer = document.get_page(page_index).get_layer(layer_index);
    let mut page_count = 1;
    let mut y = PAGE_HEIGHT - MARGIN_TOP;

    layer.use_text("Shopping list", TITLE_SIZE, Mm(MARGIN_LEFT), Mm(y), &title_font);
    y -= LINE_HEIGHT * 2.0;

    for item in items {
        if y < MARGIN_BOTTOM {
            page_count += 1;
            let (page_index, layer_index) = document.add_page(
                Mm(PAGE_WIDTH),
                Mm(PAGE_HEIGHT),
                format!("Page {}, Layer 1", page_count),
            );
            layer = document.get_page(page_index).get_layer(layer_index);
            y = PAGE_HEIGHT - MARGIN_TOP;
        }
        layer.use_text(item.to_line(), BODY_SIZE, Mm(MARGIN_LEFT), Mm(y), &body_font);
        y -= LINE_HEIGHT;
    }

    document
        .save_to_bytes()
        .map_err(|e| AppError::Internal(format!("PDF rendering failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: i64) -> (String, String, i64) {
        (name.to_string(), unit.to_string(), amount)
    }

    #[test]
    fn test_amounts_sum_across_recipes() {
        let rows = vec![row("flour", "g", 200), row("flour", "g", 100), row("salt", "g", 5)];
        let items = aggregate(&rows).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "flour");
        assert_eq!(items[0].amount, 300);
        assert_eq!(items[0].measurement_unit, "g");
        assert_eq!(items[1].name, "salt");
        assert_eq!(items[1].amount, 5);
    }

    #[test]
    fn test_unit_mismatch_aborts_aggregation() {
        let rows = vec![row("milk", "l", 1), row("milk", "ml", 200)];
        let err = aggregate(&rows).unwrap_err();
        match err {
            AppError::UnitMismatch { ingredient, units } => {
                assert_eq!(ingredient, "milk");
                assert_eq!(units, ("l".to_string(), "ml".to_string()));
            }
            other => panic!("expected UnitMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_output_is_alphabetical() {
        let rows = vec![row("salt", "g", 5), row("flour", "g", 200), row("apple", "pcs", 3)];
        let items = aggregate(&rows).unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["apple", "flour", "salt"]);
    }

    #[test]
    fn test_empty_cart_aggregates_to_nothing() {
        assert!(aggregate(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_line_format() {
        let item = ShoppingItem {
            name: "flour".to_string(),
            measurement_unit: "g".to_string(),
            amount: 300,
        };
        assert_eq!(item.to_line(), "- flour: 300 g");
    }

    #[test]
    fn test_pdf_has_magic_bytes() {
        let items = aggregate(&[row("flour", "g", 300)]).unwrap();
        let bytes = render_pdf(&items).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_empty_list_still_renders() {
        let bytes = render_pdf(&[]).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_long_list_spills_to_extra_pages() {
        let items: Vec<ShoppingItem> = (0..120)
            .map(|i| ShoppingItem {
                name: format!("ingredient-{:03}", i),
                measurement_unit: "g".to_string(),
                amount: i + 1,
            })
            .collect();
        let bytes = render_pdf(&items).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
