//! Built-in resource catalog. Adding a resource means adding an entry here,
//! not writing another service/handler stack.

use crate::error::ConfigError;
use crate::resource::spec::{CrossRule, FieldRule, FilterKind, ResourceSpec};
use std::collections::HashMap;

/// 24-hex storage id, as carried in cross-resource references.
pub const INTERNAL_ID_PATTERN: &str = "^[0-9a-fA-F]{24}$";

const PHONE_PATTERN: &str = "^\\d{10,15}$";

/// Resolved catalog: specs plus a path index.
#[derive(Clone, Debug)]
pub struct Catalog {
    specs: Vec<ResourceSpec>,
    by_path: HashMap<String, usize>,
}

impl Catalog {
    /// Build and validate a catalog. Paths and prefixes must be unique and
    /// the domain key must not double as a public field.
    pub fn new(specs: Vec<ResourceSpec>) -> Result<Self, ConfigError> {
        let mut by_path = HashMap::new();
        let mut prefixes = HashMap::new();
        for (i, spec) in specs.iter().enumerate() {
            if by_path.insert(spec.path.clone(), i).is_some() {
                return Err(ConfigError::DuplicatePath(spec.path.clone()));
            }
            if let Some(other) = prefixes.insert(spec.prefix.clone(), spec.path.clone()) {
                return Err(ConfigError::DuplicatePrefix {
                    prefix: spec.prefix.clone(),
                    paths: format!("{}, {}", other, spec.path),
                });
            }
            if spec.public_fields.iter().any(|f| *f == spec.domain_key) {
                return Err(ConfigError::DomainKeyInPublicFields(spec.path.clone()));
            }
            if spec.pad_width == 0 {
                return Err(ConfigError::ZeroPadWidth(spec.path.clone()));
            }
        }
        Ok(Catalog { specs, by_path })
    }

    pub fn builtin() -> Self {
        Catalog::new(builtin_specs()).expect("builtin catalog is valid")
    }

    pub fn by_path(&self, path: &str) -> Option<&ResourceSpec> {
        self.by_path.get(path).map(|i| &self.specs[*i])
    }

    pub fn specs(&self) -> &[ResourceSpec] {
        &self.specs
    }
}

struct Builder {
    spec: ResourceSpec,
}

fn resource(path: &str, entity: &str, id_key: &str, domain_key: &str, prefix: &str) -> Builder {
    Builder {
        spec: ResourceSpec {
            path: path.into(),
            entity: entity.into(),
            id_key: id_key.into(),
            domain_key: domain_key.into(),
            prefix: prefix.into(),
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
        },
    }
}

impl Builder {
    fn public(mut self, fields: &[&str]) -> Self {
        self.spec.public_fields = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    fn unique(mut self, fields: &[&str]) -> Self {
        self.spec.unique_fields = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    fn sensitive(mut self, fields: &[&str]) -> Self {
        self.spec.sensitive_fields = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    fn virtual_fields(mut self, fields: &[&str]) -> Self {
        self.spec.virtual_fields = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    fn rule(mut self, rule: FieldRule) -> Self {
        self.spec.field_rules.push(rule);
        self
    }

    fn cross(mut self, rule: CrossRule) -> Self {
        self.spec.cross_rules.push(rule);
        self
    }

    fn filter(mut self, key: &str, kind: FilterKind) -> Self {
        self.spec.filters.push((key.to_string(), kind));
        self
    }

    fn search(mut self, fields: &[&str]) -> Self {
        self.spec.search_fields = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    fn sort(mut self, expr: &str) -> Self {
        self.spec.default_sort = expr.into();
        self
    }

    fn default_status(mut self, status: &str) -> Self {
        self.spec.default_status = Some(status.into());
        self
    }

    fn build(self) -> ResourceSpec {
        self.spec
    }
}

/// Shared contact/address shape (suppliers, customers, warehouses).
fn contact_address_rules(b: Builder) -> Builder {
    b.rule(FieldRule::new("contact.phone").pattern(PHONE_PATTERN))
        .rule(FieldRule::new("contact.email").email().max_length(100))
        .rule(FieldRule::new("address.street").max_length(100).storage())
        .rule(FieldRule::new("address.city").max_length(50).storage())
        .rule(FieldRule::new("address.state").max_length(50).storage())
        .rule(FieldRule::new("address.postalCode").max_length(20).storage())
        .rule(FieldRule::new("address.country").max_length(50).storage())
}

fn builtin_specs() -> Vec<ResourceSpec> {
    let suppliers = contact_address_rules(resource(
        "suppliers",
        "Supplier",
        "supplier_Id",
        "supplierID",
        "SP-",
    ))
    .public(&["name", "contact", "address"])
    .unique(&["contact.email"])
    .rule(
        FieldRule::new("name")
            .required()
            .min_length(1)
            .max_length(100)
            .storage(),
    )
    .rule(
        FieldRule::new("status")
            .allowed(&["Active", "Inactive", "Pending", "Blocked"])
            .storage(),
    )
    .filter("name", FilterKind::Contains("name".into()))
    .filter("country", FilterKind::Contains("address.country".into()))
    .filter("city", FilterKind::Contains("address.city".into()))
    .filter("state", FilterKind::Contains("address.state".into()))
    .filter("status", FilterKind::Exact("status".into()))
    .search(&["name", "contact.email", "address.city"])
    .default_status("Active")
    .build();

    let products = resource("products", "Product", "product_Id", "productID", "PR-")
        .public(&["name", "description", "category", "price", "unit", "supplier"])
        .rule(
            FieldRule::new("name")
                .required()
                .min_length(1)
                .max_length(100)
                .storage(),
        )
        .rule(FieldRule::new("description").max_length(500).storage())
        .rule(FieldRule::new("category").max_length(100).storage())
        .rule(FieldRule::new("price").minimum(0.0))
        .rule(FieldRule::new("unit").max_length(20).storage())
        .rule(FieldRule::new("supplier").pattern(INTERNAL_ID_PATTERN))
        .rule(
            FieldRule::new("status")
                .allowed(&["Active", "Inactive", "Discontinued"])
                .storage(),
        )
        .filter("name", FilterKind::Contains("name".into()))
        .filter("category", FilterKind::Contains("category".into()))
        .filter("supplier", FilterKind::Exact("supplier".into()))
        .filter("status", FilterKind::Exact("status".into()))
        .search(&["name", "category"])
        .default_status("Active")
        .build();

    let customers = contact_address_rules(resource(
        "customers",
        "Customer",
        "customer_Id",
        "customerID",
        "CU-",
    ))
    .public(&["name", "contact", "address"])
    .unique(&["contact.email"])
    .rule(
        FieldRule::new("name")
            .required()
            .min_length(1)
            .max_length(100)
            .storage(),
    )
    .rule(
        FieldRule::new("status")
            .allowed(&["Active", "Inactive"])
            .storage(),
    )
    .filter("name", FilterKind::Contains("name".into()))
    .filter("country", FilterKind::Contains("address.country".into()))
    .filter("city", FilterKind::Contains("address.city".into()))
    .filter("status", FilterKind::Exact("status".into()))
    .search(&["name", "contact.email", "address.city"])
    .default_status("Active")
    .build();

    let warehouses = contact_address_rules(resource(
        "warehouses",
        "Warehouse",
        "warehouse_Id",
        "warehouseID",
        "WH-",
    ))
    .public(&["name", "contact", "address", "capacity"])
    .rule(
        FieldRule::new("name")
            .required()
            .min_length(1)
            .max_length(100)
            .storage(),
    )
    .rule(FieldRule::new("capacity").minimum(0.0))
    .rule(
        FieldRule::new("status")
            .allowed(&["Active", "Inactive", "Maintenance", "Full"])
            .storage(),
    )
    .filter("name", FilterKind::Contains("name".into()))
    .filter("city", FilterKind::Contains("address.city".into()))
    .filter("state", FilterKind::Contains("address.state".into()))
    .filter("status", FilterKind::Exact("status".into()))
    .search(&["name", "address.city"])
    .default_status("Active")
    .build();

    let orders = resource("orders", "Order", "order_Id", "orderID", "OR-")
        .public(&["customer", "totalAmount", "notes"])
        .rule(
            FieldRule::new("customer")
                .required()
                .pattern(INTERNAL_ID_PATTERN)
                .storage(),
        )
        .rule(FieldRule::new("totalAmount").minimum(0.0))
        .rule(FieldRule::new("notes").max_length(500).storage())
        .rule(
            FieldRule::new("status")
                .allowed(&["pending", "processing", "shipped", "delivered", "cancelled"])
                .storage(),
        )
        .filter("customer", FilterKind::Exact("customer".into()))
        .filter("status", FilterKind::Exact("status".into()))
        .filter("dateFrom", FilterKind::DateFrom("createdAt".into()))
        .filter("dateTo", FilterKind::DateTo("createdAt".into()))
        .search(&["notes"])
        .sort("-createdAt")
        .default_status("pending")
        .build();

    let purchases = resource("purchases", "Purchase", "purchase_Id", "purchaseID", "PU-")
        .public(&["supplier", "totalAmount", "notes"])
        .rule(
            FieldRule::new("supplier")
                .required()
                .pattern(INTERNAL_ID_PATTERN)
                .storage(),
        )
        .rule(FieldRule::new("totalAmount").minimum(0.0))
        .rule(FieldRule::new("notes").max_length(500).storage())
        .rule(
            FieldRule::new("status")
                .allowed(&["Pending", "Ordered", "Received", "Cancelled"])
                .storage(),
        )
        .filter("supplier", FilterKind::Exact("supplier".into()))
        .filter("status", FilterKind::Exact("status".into()))
        .filter("dateFrom", FilterKind::DateFrom("createdAt".into()))
        .filter("dateTo", FilterKind::DateTo("createdAt".into()))
        .search(&["notes"])
        .sort("-createdAt")
        .default_status("Pending")
        .build();

    let users = resource("users", "User", "user_Id", "userID", "USR-")
        .public(&["name", "email", "role"])
        .unique(&["email"])
        .sensitive(&["password"])
        .virtual_fields(&["confirmPassword"])
        .rule(
            FieldRule::new("name")
                .required()
                .min_length(1)
                .max_length(100)
                .storage(),
        )
        .rule(FieldRule::new("email").required().email().max_length(100).storage())
        .rule(FieldRule::new("password").required().min_length(8))
        .rule(
            FieldRule::new("role")
                .allowed(&["Admin", "Manager", "Staff"])
                .storage(),
        )
        .cross(CrossRule::EqFieldOnCreate {
            field: "confirmPassword".into(),
            other: "password".into(),
            message: "confirmPassword must match password".into(),
        })
        .filter("name", FilterKind::Contains("name".into()))
        .filter("role", FilterKind::Exact("role".into()))
        .search(&["name", "email"])
        .build();

    let inventory = resource(
        "inventory",
        "Inventory",
        "inventory_Id",
        "inventoryID",
        "IN-",
    )
    .public(&["product", "warehouse", "quantity", "minStockLevel", "maxStockLevel"])
    .rule(
        FieldRule::new("product")
            .required()
            .pattern(INTERNAL_ID_PATTERN)
            .storage(),
    )
    .rule(
        FieldRule::new("warehouse")
            .required()
            .pattern(INTERNAL_ID_PATTERN)
            .storage(),
    )
    .rule(FieldRule::new("quantity").required().minimum(0.0))
    .rule(FieldRule::new("minStockLevel").minimum(0.0))
    .rule(FieldRule::new("maxStockLevel").minimum(0.0))
    .rule(
        FieldRule::new("status")
            .allowed(&["In Stock", "Low Stock", "Out of Stock", "Reserved", "Damaged"])
            .storage(),
    )
    .cross(CrossRule::GteField {
        field: "maxStockLevel".into(),
        other: "minStockLevel".into(),
        message: "maxStockLevel must be greater than or equal to minStockLevel".into(),
    })
    .filter("product", FilterKind::Exact("product".into()))
    .filter("warehouse", FilterKind::Exact("warehouse".into()))
    .filter("status", FilterKind::Exact("status".into()))
    .search(&["product"])
    .sort("-createdAt")
    .default_status("In Stock")
    .build();

    let adjustments = resource(
        "inventory-adjustments",
        "Inventory adjustment",
        "adjustment_Id",
        "adjustmentID",
        "ADJ-",
    )
    .public(&["inventory", "quantityChange", "reason"])
    .rule(
        FieldRule::new("inventory")
            .required()
            .pattern(INTERNAL_ID_PATTERN)
            .storage(),
    )
    .rule(FieldRule::new("quantityChange").required())
    .rule(FieldRule::new("reason").required().max_length(200).storage())
    .filter("inventory", FilterKind::Exact("inventory".into()))
    .filter("dateFrom", FilterKind::DateFrom("createdAt".into()))
    .filter("dateTo", FilterKind::DateTo("createdAt".into()))
    .search(&["reason"])
    .sort("-createdAt")
    .build();

    let returns = resource(
        "inventory-returns",
        "Inventory return",
        "return_Id",
        "returnID",
        "RET-",
    )
    .public(&["inventory", "quantity", "reason"])
    .rule(
        FieldRule::new("inventory")
            .required()
            .pattern(INTERNAL_ID_PATTERN)
            .storage(),
    )
    .rule(FieldRule::new("quantity").required().minimum(1.0))
    .rule(FieldRule::new("reason").max_length(200).storage())
    .filter("inventory", FilterKind::Exact("inventory".into()))
    .filter("dateFrom", FilterKind::DateFrom("createdAt".into()))
    .filter("dateTo", FilterKind::DateTo("createdAt".into()))
    .search(&["reason"])
    .sort("-createdAt")
    .build();

    let transfers = resource(
        "inventory-transfers",
        "Inventory transfer",
        "transfer_Id",
        "transferID",
        "TR-",
    )
    .public(&["inventory", "fromWarehouse", "toWarehouse", "quantity"])
    .rule(
        FieldRule::new("inventory")
            .required()
            .pattern(INTERNAL_ID_PATTERN)
            .storage(),
    )
    .rule(
        FieldRule::new("fromWarehouse")
            .required()
            .pattern(INTERNAL_ID_PATTERN)
            .storage(),
    )
    .rule(
        FieldRule::new("toWarehouse")
            .required()
            .pattern(INTERNAL_ID_PATTERN)
            .storage(),
    )
    .rule(FieldRule::new("quantity").required().minimum(1.0))
    .cross(CrossRule::NeField {
        field: "toWarehouse".into(),
        other: "fromWarehouse".into(),
        message: "toWarehouse must differ from fromWarehouse".into(),
    })
    .filter("inventory", FilterKind::Exact("inventory".into()))
    .filter("fromWarehouse", FilterKind::Exact("fromWarehouse".into()))
    .filter("toWarehouse", FilterKind::Exact("toWarehouse".into()))
    .search(&["inventory"])
    .sort("-createdAt")
    .build();

    let transactions = resource(
        "inventory-transactions",
        "Inventory transaction",
        "transaction_Id",
        "transactionID",
        "IT-",
    )
    .public(&["inventory", "transactionType", "quantity"])
    .rule(
        FieldRule::new("inventory")
            .required()
            .pattern(INTERNAL_ID_PATTERN)
            .storage(),
    )
    .rule(
        FieldRule::new("transactionType")
            .required()
            .allowed(&["Inbound", "Outbound", "Adjustment", "Transfer"])
            .storage(),
    )
    .rule(FieldRule::new("quantity").required())
    .filter("inventory", FilterKind::Exact("inventory".into()))
    .filter("transactionType", FilterKind::Exact("transactionType".into()))
    .filter("dateFrom", FilterKind::DateFrom("createdAt".into()))
    .filter("dateTo", FilterKind::DateTo("createdAt".into()))
    .search(&["inventory"])
    .sort("-createdAt")
    .build();

    vec![
        suppliers,
        products,
        customers,
        warehouses,
        orders,
        purchases,
        users,
        inventory,
        adjustments,
        returns,
        transfers,
        transactions,
    ]
}
