//! Symbolic references such as `local.tenant_id`.

use std::fmt;

use hcl::expr::{Traversal, Variable};
use hcl::{Expression, Identifier};

use crate::error::{HclError, HclResult};

fn valid(name: &str) -> bool {
    Identifier::new(name).is_ok()
}

/// A traversal from a root name through attribute names, for example
/// `local.tenant_id` or `duplocloud_aws_load_balancer.web.arn`.
///
/// References are resolved by terraform, never by tfgen. Construction only
/// guarantees that the text is well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    root: String,
    attrs: Vec<String>,
}

impl Reference {
    /// Create a reference to a bare root name (`string`, `number`, ...).
    pub fn new(root: impl Into<String>) -> HclResult<Self> {
        let root = root.into();
        if !valid(&root) {
            return Err(HclError::InvalidReference(root));
        }
        Ok(Self {
            root,
            attrs: Vec::new(),
        })
    }

    /// Append an attribute step.
    pub fn attr(mut self, name: impl Into<String>) -> HclResult<Self> {
        let name = name.into();
        if !valid(&name) {
            return Err(HclError::InvalidReference(format!("{}.{}", self, name)));
        }
        self.attrs.push(name);
        Ok(self)
    }

    /// Parse dotted text such as `var.redis_cache_size`.
    pub fn parse(text: &str) -> HclResult<Self> {
        let mut parts = text.split('.');
        let root = parts.next().unwrap_or_default();
        let mut reference =
            Self::new(root).map_err(|_| HclError::InvalidReference(text.to_string()))?;
        for part in parts {
            reference = reference
                .attr(part)
                .map_err(|_| HclError::InvalidReference(text.to_string()))?;
        }
        Ok(reference)
    }

    /// `var.<name>`
    pub fn var(name: &str) -> HclResult<Self> {
        Self::new("var")?.attr(name)
    }

    /// `local.<name>`
    pub fn local(name: &str) -> HclResult<Self> {
        Self::new("local")?.attr(name)
    }

    /// `<kind>.<name>.<attr>` for a managed resource.
    pub fn resource(kind: &str, name: &str, attr: &str) -> HclResult<Self> {
        Self::new(kind)?.attr(name)?.attr(attr)
    }

    /// `data.<kind>.<name>.<attr>` for a data source.
    pub fn data(kind: &str, name: &str, attr: &str) -> HclResult<Self> {
        Self::new("data")?.attr(kind)?.attr(name)?.attr(attr)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn attrs(&self) -> &[String] {
        &self.attrs
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for attr in &self.attrs {
            write!(f, ".{}", attr)?;
        }
        Ok(())
    }
}

impl From<Reference> for Expression {
    fn from(reference: Reference) -> Self {
        // Segments were checked on construction.
        let root = Variable::unchecked(reference.root);
        if reference.attrs.is_empty() {
            return Expression::Variable(root);
        }
        reference
            .attrs
            .into_iter()
            .fold(Traversal::builder(root), |traversal, attr| {
                traversal.attr(Identifier::unchecked(attr))
            })
            .build()
            .into()
    }
}

impl From<&Reference> for Expression {
    fn from(reference: &Reference) -> Self {
        reference.clone().into()
    }
}

/// Collect every reference root used by an expression, recursing into
/// templates, function arguments and collections.
///
/// Template interpolations are recognised by their `${root.` prefix, which is
/// all tfgen ever emits inside a quoted template.
pub fn collect_roots(expr: &Expression, roots: &mut Vec<Reference>) {
    match expr {
        Expression::Variable(var) => {
            if let Ok(r) = Reference::new(var.as_str()) {
                roots.push(r);
            }
        }
        Expression::Traversal(traversal) => {
            if let Expression::Variable(var) = &traversal.expr {
                let attrs = traversal.operators.iter().filter_map(|op| match op {
                    hcl::expr::TraversalOperator::GetAttr(ident) => Some(ident.as_str()),
                    _ => None,
                });
                let parsed = attrs.fold(Reference::new(var.as_str()), |r, a| r.and_then(|r| r.attr(a)));
                if let Ok(r) = parsed {
                    roots.push(r);
                }
            }
        }
        Expression::TemplateExpr(template) => {
            let text = template.to_string();
            let mut rest = text.as_str();
            while let Some(start) = rest.find("${") {
                // `$${` is an escaped literal.
                let escaped = start > 0 && rest.as_bytes()[start - 1] == b'$';
                let after = &rest[start + 2..];
                let end = after.find('}').unwrap_or(after.len());
                if !escaped {
                    if let Ok(r) = Reference::parse(after[..end].trim()) {
                        roots.push(r);
                    }
                }
                rest = &after[end..];
            }
        }
        Expression::FuncCall(call) => call.args.iter().for_each(|arg| collect_roots(arg, roots)),
        Expression::Array(items) => items.iter().for_each(|item| collect_roots(item, roots)),
        Expression::Object(object) => object.values().for_each(|value| collect_roots(value, roots)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_display() {
        let r = Reference::resource("duplocloud_aws_load_balancer", "web", "arn").unwrap();
        assert_eq!(r.to_string(), "duplocloud_aws_load_balancer.web.arn");
        assert_eq!(Reference::local("tenant_id").unwrap().to_string(), "local.tenant_id");
    }

    #[test]
    fn test_reference_rejects_malformed_segments() {
        assert!(Reference::new("1abc").is_err());
        assert!(Reference::var("has space").is_err());
        assert!(Reference::parse("a..b").is_err());
        assert!(Reference::parse("").is_err());
    }

    #[test]
    fn test_reference_parse_roundtrip() {
        let r = Reference::parse("duplocloud_tenant_config.tenant-config.tenant_id").unwrap();
        assert_eq!(r.root(), "duplocloud_tenant_config");
        assert_eq!(r.attrs().len(), 2);
        assert_eq!(r.to_string(), "duplocloud_tenant_config.tenant-config.tenant_id");
    }

    #[test]
    fn test_reference_becomes_traversal() {
        let expr = Expression::from(Reference::local("tenant_id").unwrap());
        let text = hcl::format::to_string(&expr).unwrap();
        assert_eq!(text, "local.tenant_id");

        let bare = Expression::from(Reference::new("string").unwrap());
        assert!(matches!(bare, Expression::Variable(_)));
    }

    #[test]
    fn test_collect_roots_walks_nested_expressions() {
        let template = crate::expr::interpolate("cache-", &Reference::local("tenant_name").unwrap())
            .unwrap();
        let expr = Expression::from(vec![
            template,
            Expression::from(Reference::data("duplocloud_tenant_aws_kms_key", "tenant_kms", "key_id").unwrap()),
            Expression::from("$${not.a_reference}"),
        ]);

        let mut roots = Vec::new();
        collect_roots(&expr, &mut roots);
        let text: Vec<_> = roots.iter().map(ToString::to_string).collect();
        assert_eq!(
            text,
            vec!["local.tenant_name", "data.duplocloud_tenant_aws_kms_key.tenant_kms.key_id"]
        );
    }
}
