//! Per-resource configuration: everything that distinguishes one resource is data here.

use serde_json::Value;

/// One declarative constraint on a request field. Fields are dotted paths
/// into the JSON body (e.g. `contact.email`).
#[derive(Clone, Debug, Default)]
pub struct FieldRule {
    pub field: String,
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Anchored regex the string value must match.
    pub pattern: Option<String>,
    /// Case-sensitive allowed set (enum membership).
    pub allowed: Option<Vec<String>>,
    pub minimum: Option<f64>,
    /// Lightweight email shape check; the value is also lowercased before persistence.
    pub email: bool,
    /// Re-checked at the storage adapter before every write (schema-level rule).
    pub storage: bool,
}

impl FieldRule {
    pub fn new(field: &str) -> Self {
        FieldRule {
            field: field.to_string(),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn pattern(mut self, re: &str) -> Self {
        self.pattern = Some(re.to_string());
        self
    }

    pub fn allowed(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn minimum(mut self, n: f64) -> Self {
        self.minimum = Some(n);
        self
    }

    pub fn email(mut self) -> Self {
        self.email = true;
        self
    }

    pub fn storage(mut self) -> Self {
        self.storage = true;
        self
    }
}

/// Constraint spanning two fields of the same body.
#[derive(Clone, Debug)]
pub enum CrossRule {
    /// `field` must be >= `other` when both are present (numeric).
    GteField {
        field: String,
        other: String,
        message: String,
    },
    /// `field` must differ from `other` when both are present.
    NeField {
        field: String,
        other: String,
        message: String,
    },
    /// `field` must equal `other`; only enforced on create.
    EqFieldOnCreate {
        field: String,
        other: String,
        message: String,
    },
}

/// How one recognized `list` query key becomes a storage filter.
#[derive(Clone, Debug)]
pub enum FilterKind {
    /// Case-insensitive substring match on the given document path.
    Contains(String),
    /// Exact match on the given document path.
    Exact(String),
    /// Lower bound (inclusive) on the given document path.
    DateFrom(String),
    /// Upper bound (inclusive) on the given document path.
    DateTo(String),
}

/// Complete description of one CRUD resource. The service, handlers, stores,
/// allocator, and transformer are all generic over this.
#[derive(Clone, Debug)]
pub struct ResourceSpec {
    /// URL path segment; doubles as the collection name and the items key
    /// in list/search responses.
    pub path: String,
    /// Singular display name used in messages ("Supplier").
    pub entity: String,
    /// Public name of the internal id ("supplier_Id").
    pub id_key: String,
    /// Stored and public name of the domain id ("supplierID").
    pub domain_key: String,
    /// Domain-id prefix including the dash ("SP-").
    pub prefix: String,
    /// Zero-pad width of the domain-id numeric suffix.
    pub pad_width: usize,
    /// Fields the transformer passes through verbatim.
    pub public_fields: Vec<String>,
    /// Document paths under a storage-level unique index, besides the domain key.
    pub unique_fields: Vec<String>,
    /// Fields never exposed by the transformer (password hashes and the like).
    pub sensitive_fields: Vec<String>,
    /// Request-only fields stripped before persistence (confirmPassword).
    pub virtual_fields: Vec<String>,
    pub field_rules: Vec<FieldRule>,
    pub cross_rules: Vec<CrossRule>,
    /// Recognized list query keys.
    pub filters: Vec<(String, FilterKind)>,
    /// Document paths probed by `search`.
    pub search_fields: Vec<String>,
    /// Default sort expression ("name" or "-createdAt").
    pub default_sort: String,
    /// Value assigned to `status` on create when the client omits it.
    pub default_status: Option<String>,
}

impl ResourceSpec {
    /// Anchored pattern a domain id of this resource must match on lookup routes.
    pub fn domain_id_pattern(&self) -> String {
        format!("^{}\\d{{{}}}$", regex::escape(&self.prefix), self.pad_width)
    }

    /// All document paths under a unique index, domain key first.
    pub fn unique_paths(&self) -> Vec<String> {
        let mut out = vec![self.domain_key.clone()];
        out.extend(self.unique_fields.iter().cloned());
        out
    }

    /// Rules re-checked at the storage adapter boundary.
    pub fn storage_rules(&self) -> impl Iterator<Item = &FieldRule> {
        self.field_rules.iter().filter(|r| r.storage)
    }

    /// Lowercase configured email fields in place (pre-persistence normalization).
    pub fn normalize(&self, body: &mut serde_json::Map<String, Value>) {
        for rule in self.field_rules.iter().filter(|r| r.email) {
            lowercase_path(body, &rule.field);
        }
    }
}

fn lowercase_path(obj: &mut serde_json::Map<String, Value>, path: &str) {
    let mut parts = path.splitn(2, '.');
    let head = match parts.next() {
        Some(h) => h,
        None => return,
    };
    match parts.next() {
        None => {
            if let Some(Value::String(s)) = obj.get_mut(head) {
                *s = s.to_lowercase();
            }
        }
        Some(rest) => {
            if let Some(Value::Object(inner)) = obj.get_mut(head) {
                lowercase_path(inner, rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn domain_id_pattern_is_anchored_and_padded() {
        let spec = ResourceSpec {
            path: "suppliers".into(),
            entity: "Supplier".into(),
            id_key: "supplier_Id".into(),
            domain_key: "supplierID".into(),
            prefix: "SP-".into(),
            pad_width: 5,
            public_fields: vec![],
            unique_fields: vec![],
            sensitive_fields: vec![],
            virtual_fields: vec![],
            field_rules: vec![],
            cross_rules: vec![],
            filters: vec![],
            search_fields: vec![],
            default_sort: "name".into(),
            default_status: None,
        };
        let re = regex::Regex::new(&spec.domain_id_pattern()).unwrap();
        assert!(re.is_match("SP-00001"));
        assert!(!re.is_match("SP-1"));
        assert!(!re.is_match("XX-00001"));
        assert!(!re.is_match("SP-000012"));
    }

    #[test]
    fn normalize_lowercases_nested_email() {
        let spec = ResourceSpec {
            path: "suppliers".into(),
            entity: "Supplier".into(),
            id_key: "supplier_Id".into(),
            domain_key: "supplierID".into(),
            prefix: "SP-".into(),
            pad_width: 5,
            public_fields: vec![],
            unique_fields: vec![],
            sensitive_fields: vec![],
            virtual_fields: vec![],
            field_rules: vec![FieldRule::new("contact.email").email()],
            cross_rules: vec![],
            filters: vec![],
            search_fields: vec![],
            default_sort: "name".into(),
            default_status: None,
        };
        let mut body = json!({"contact": {"email": "Ops@Acme.COM"}})
            .as_object()
            .cloned()
            .unwrap();
        spec.normalize(&mut body);
        assert_eq!(body["contact"]["email"], json!("ops@acme.com"));
    }
}
