//! Bulk-edit operation catalog.

use crate::columns::CellValue;

/// One entry in the bulk-edit catalog. The modifier types the raw operator
/// input once; [`OpKind::apply`] then folds it into each row's current
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    SetNumber,
    SetText,
    Add,
    Subtract,
    Multiply,
    MultiplyPercent,
    AddItem,
    RemoveItem,
    SetItems,
}

/// Operations offered on numeric columns.
pub const NUMBER_OPS: &[OpKind] = &[
    OpKind::SetNumber,
    OpKind::Add,
    OpKind::Subtract,
    OpKind::Multiply,
    OpKind::MultiplyPercent,
];

/// Operations offered on list columns.
pub const LIST_OPS: &[OpKind] = &[OpKind::AddItem, OpKind::RemoveItem, OpKind::SetItems];

/// Operations offered on plain text columns.
pub const TEXT_OPS: &[OpKind] = &[OpKind::SetText];

impl OpKind {
    /// Human-readable label for selection menus.
    pub fn label(&self) -> &'static str {
        match self {
            OpKind::SetNumber | OpKind::SetText => "Set",
            OpKind::Add => "Add",
            OpKind::Subtract => "Subtract",
            OpKind::Multiply => "Multiply",
            OpKind::MultiplyPercent => "Multiply %",
            OpKind::AddItem => "Add Item",
            OpKind::RemoveItem => "Remove Item",
            OpKind::SetItems => "Set Items",
        }
    }

    /// Convert the raw operator input into the value the per-row operation
    /// consumes. `None` when the input does not parse for this operation.
    pub fn modifier(&self, input: &str) -> Option<CellValue> {
        match self {
            OpKind::SetNumber | OpKind::Add | OpKind::Subtract | OpKind::Multiply => {
                input.trim().parse::<f64>().ok().map(CellValue::Number)
            }
            OpKind::MultiplyPercent => input
                .trim()
                .parse::<f64>()
                .ok()
                .map(|percent| CellValue::Number(percent / 100.0)),
            OpKind::SetText | OpKind::AddItem | OpKind::RemoveItem => {
                Some(CellValue::Text(input.trim().to_string()))
            }
            OpKind::SetItems => Some(CellValue::List(
                input
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
        }
    }

    /// Fold the typed modifier into a row's current value. `None` skips the
    /// row, which is also the behavior for empty current values under the
    /// arithmetic operations.
    pub fn apply(&self, current: &CellValue, modifier: &CellValue) -> Option<CellValue> {
        match self {
            OpKind::SetNumber | OpKind::SetText | OpKind::SetItems => Some(modifier.clone()),
            OpKind::Add => Some(CellValue::Number(current.as_number()? + modifier.as_number()?)),
            OpKind::Subtract => {
                Some(CellValue::Number(current.as_number()? - modifier.as_number()?))
            }
            OpKind::Multiply | OpKind::MultiplyPercent => Some(CellValue::Number(
                (current.as_number()? * modifier.as_number()?).round(),
            )),
            OpKind::AddItem => {
                let item = modifier.as_text()?;
                if item.is_empty() {
                    return None;
                }
                let mut list = current.as_list()?.to_vec();
                if !list.iter().any(|have| have.eq_ignore_ascii_case(item)) {
                    list.push(item.to_string());
                }
                Some(CellValue::List(list))
            }
            OpKind::RemoveItem => {
                let item = modifier.as_text()?;
                let mut list = current.as_list()?.to_vec();
                list.retain(|have| !have.eq_ignore_ascii_case(item));
                Some(CellValue::List(list))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiply_percent_halves_and_rounds() {
        let modifier = OpKind::MultiplyPercent.modifier("50").unwrap();
        assert_eq!(modifier, CellValue::Number(0.5));
        let result = OpKind::MultiplyPercent
            .apply(&CellValue::Number(15.0), &modifier)
            .unwrap();
        assert_eq!(result, CellValue::Number(8.0));
    }

    #[test]
    fn arithmetic_skips_empty_cells() {
        let modifier = OpKind::Add.modifier("5").unwrap();
        assert_eq!(OpKind::Add.apply(&CellValue::Empty, &modifier), None);
        assert_eq!(
            OpKind::Add.apply(&CellValue::Number(10.0), &modifier),
            Some(CellValue::Number(15.0))
        );
    }

    #[test]
    fn add_item_is_case_insensitive() {
        let current = CellValue::List(vec!["Military".to_string()]);
        let modifier = OpKind::AddItem.modifier("military").unwrap();
        let result = OpKind::AddItem.apply(&current, &modifier).unwrap();
        assert_eq!(result, current);

        let modifier = OpKind::AddItem.modifier("Police").unwrap();
        let result = OpKind::AddItem.apply(&current, &modifier).unwrap();
        assert_eq!(
            result,
            CellValue::List(vec!["Military".to_string(), "Police".to_string()])
        );
    }

    #[test]
    fn remove_item_drops_all_case_variants() {
        let current = CellValue::List(vec![
            "Military".to_string(),
            "military".to_string(),
            "Police".to_string(),
        ]);
        let modifier = OpKind::RemoveItem.modifier("MILITARY").unwrap();
        let result = OpKind::RemoveItem.apply(&current, &modifier).unwrap();
        assert_eq!(result, CellValue::List(vec!["Police".to_string()]));
    }

    #[test]
    fn set_items_splits_and_drops_empties() {
        let modifier = OpKind::SetItems.modifier(" Tier1 , Tier2 ,, ").unwrap();
        assert_eq!(
            modifier,
            CellValue::List(vec!["Tier1".to_string(), "Tier2".to_string()])
        );
    }

    #[test]
    fn unparsable_numeric_input_is_rejected() {
        assert_eq!(OpKind::Multiply.modifier("ten"), None);
        assert!(OpKind::SetNumber.modifier("10").is_some());
    }
}
