use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Agent-supplied revenue shape. Amounts arrive from an LLM reply, so both
/// money fields are deserialized leniently: a missing or non-numeric value
/// degrades to `None` instead of rejecting the whole payload. The store is
/// the layer that rejects drafts without a numeric `amount`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueDraft {
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub amount: Option<Decimal>,
    pub product: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub pro_fund_allocation: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueEntry {
    pub amount: Decimal,
    pub product: String,
    pub pro_fund_allocation: Decimal,
    pub timestamp: DateTime<Utc>,
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decimal_from_json_number(&value))
}

/// Accepts JSON numbers only; strings and other shapes are not money.
pub fn decimal_from_json_number(value: &Value) -> Option<Decimal> {
    let number = value.as_number()?;
    if let Some(integer) = number.as_i64() {
        return Some(Decimal::from(integer));
    }
    if let Some(unsigned) = number.as_u64() {
        return Some(Decimal::from(unsigned));
    }
    number.as_f64().and_then(|float| Decimal::try_from(float).ok())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::RevenueDraft;

    #[test]
    fn numeric_amounts_deserialize_from_json_numbers() {
        let draft: RevenueDraft = serde_json::from_value(serde_json::json!({
            "amount": 97,
            "product": "Concierge Setup",
            "pro_fund_allocation": 19.4,
        }))
        .expect("draft should deserialize");

        assert_eq!(draft.amount, Some(Decimal::from(97)));
        assert_eq!(draft.pro_fund_allocation, Some(Decimal::new(194, 1)));
    }

    #[test]
    fn non_numeric_amount_degrades_to_absent() {
        let draft: RevenueDraft = serde_json::from_value(serde_json::json!({
            "amount": "ninety-seven",
            "product": "Concierge Setup",
        }))
        .expect("draft should still deserialize");

        assert_eq!(draft.amount, None);
        assert_eq!(draft.pro_fund_allocation, None);
    }
}
