//! Helpers for building attribute expressions.

use hcl::expr::{FuncCall, TemplateExpr};
use hcl::{Expression, Identifier, ObjectKey};

use crate::error::{HclError, HclResult};
use crate::reference::Reference;

/// Convert decoded JSON into an expression, keeping key order. Object keys
/// are always quoted so reserved words such as `for` or `null` stay literal.
pub fn from_json(json: serde_json::Value) -> HclResult<Expression> {
    Ok(hcl::to_expression(json)?)
}

/// Wrap structured data in `jsonencode(...)` so terraform receives it as a
/// JSON string built from a real object.
pub fn json_encode(json: serde_json::Value) -> HclResult<Expression> {
    Ok(FuncCall::builder("jsonencode")
        .arg(from_json(json)?)
        .build()
        .into())
}

/// Whether an expression is a `jsonencode(...)` call.
pub fn is_json_encode(expr: &Expression) -> bool {
    matches!(expr, Expression::FuncCall(call) if call.name.name.as_str() == "jsonencode")
}

/// Numeric strings become numbers; anything else stays a string.
pub fn coerce_number(text: &str) -> Expression {
    let trimmed = text.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Expression::from(i);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => Expression::from(f),
        _ => Expression::String(text.to_string()),
    }
}

/// List of strings.
pub fn strings<I, S>(items: I) -> Expression
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items
        .into_iter()
        .map(|s| Expression::String(s.into()))
        .collect()
}

/// Object with bare identifier keys, e.g. `{ source = "duplocloud/duplocloud" }`.
pub fn object<I, V>(entries: I) -> HclResult<Expression>
where
    I: IntoIterator<Item = (&'static str, V)>,
    V: Into<Expression>,
{
    entries
        .into_iter()
        .map(|(key, value)| {
            let key = Identifier::new(key).map_err(|_| HclError::InvalidIdentifier(key.to_string()))?;
            Ok((ObjectKey::Identifier(key), value.into()))
        })
        .collect()
}

/// Quoted template made of a literal prefix followed by one interpolation,
/// e.g. `"cache-${local.tenant_name}"`.
pub fn interpolate(prefix: &str, reference: &Reference) -> HclResult<Expression> {
    // Quoted templates are written verbatim, so the literal part goes
    // through the string escaper first.
    let quoted = hcl::format::to_string(&Expression::String(prefix.to_string()))?;
    let literal = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| HclError::Format(format!("unexpected string rendering {:?}", quoted)))?;
    Ok(TemplateExpr::QuotedString(format!("{}${{{}}}", literal, reference)).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number("8080"), Expression::from(8080_i64));
        assert_eq!(coerce_number(" 1.5 "), Expression::from(1.5));
        assert_eq!(coerce_number("http"), Expression::from("http"));
        assert_eq!(coerce_number("NaN"), Expression::from("NaN"));
    }

    #[test]
    fn test_from_json_keeps_key_order() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"zeta": 1, "alpha": [true, null], "mid": 2.5}"#).unwrap();
        match from_json(json).unwrap() {
            Expression::Object(map) => {
                let keys: Vec<_> = map.keys().map(ToString::to_string).collect();
                assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_json_encode_quotes_every_key() {
        let json = serde_json::json!({"for": 1, "null": {"my-key": "v"}, "Name": [1, 2]});
        let expr = json_encode(json).unwrap();
        assert!(is_json_encode(&expr));

        let text = expr.to_string();
        assert_eq!(
            text,
            r#"jsonencode({ "for" = 1, "null" = { "my-key" = "v" }, "Name" = [1, 2] })"#
        );
    }

    #[test]
    fn test_interpolate_escapes_literal_prefix() {
        let reference = Reference::local("tenant_name").unwrap();
        let plain = interpolate("mycache-", &reference).unwrap();
        assert_eq!(plain.to_string(), r#""mycache-${local.tenant_name}""#);

        let tricky = interpolate(r#"a"${b}-"#, &reference).unwrap();
        assert_eq!(tricky.to_string(), r#""a\"$${b}-${local.tenant_name}""#);
    }

    #[test]
    fn test_object_uses_identifier_keys() {
        let expr = object([("source", "duplocloud/duplocloud"), ("version", ">= 0.10")]).unwrap();
        assert_eq!(
            expr.to_string(),
            "{\n  source = \"duplocloud/duplocloud\"\n  version = \">= 0.10\"\n}"
        );
        assert!(object([("not valid", 1)]).is_err());
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            strings(["EC2", "FARGATE"]).to_string(),
            "[\n  \"EC2\",\n  \"FARGATE\"\n]"
        );
    }
}
