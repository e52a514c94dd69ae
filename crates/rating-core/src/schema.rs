//! Table metadata for the rating schema
//!
//! Tables, columns and foreign keys are declared once here. Store adapters
//! render their DDL from this metadata, and foreign-key constraints are named
//! through a [`NamingConvention`].

use rating_types::{EntityKind, Record};

/// Column storage class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    Real,
}

impl ColumnType {
    pub fn sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
            ColumnType::Real => "REAL",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub primary_key: bool,
}

impl Column {
    const fn primary(name: &'static str) -> Self {
        Self {
            name,
            ty: ColumnType::Integer,
            primary_key: true,
        }
    }

    const fn of(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            primary_key: false,
        }
    }
}

/// A single-column foreign key
#[derive(Debug)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
    pub referred: EntityKind,
    pub referred_column: &'static str,
}

impl ForeignKey {
    pub fn referred_table(&self) -> &'static str {
        self.referred.table_name()
    }

    /// Value of this key in `record`, if the record's table carries it
    pub fn value_in(&self, record: &Record) -> Option<i64> {
        match record {
            Record::Review(r) if self.table == EntityKind::Review.table_name() => {
                match self.column {
                    "customer_id" => Some(r.customer_id),
                    "item_id" => Some(r.item_id),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

pub static FK_REVIEW_CUSTOMER: ForeignKey = ForeignKey {
    table: "reviews",
    column: "customer_id",
    referred: EntityKind::Customer,
    referred_column: "id",
};

pub static FK_REVIEW_ITEM: ForeignKey = ForeignKey {
    table: "reviews",
    column: "item_id",
    referred: EntityKind::Item,
    referred_column: "id",
};

#[derive(Debug)]
pub struct Table {
    pub kind: EntityKind,
    pub columns: &'static [Column],
    pub foreign_keys: &'static [&'static ForeignKey],
}

impl Table {
    pub fn name(&self) -> &'static str {
        self.kind.table_name()
    }

    /// Column names in declared order
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> {
        self.columns.iter().map(|c| c.name)
    }
}

/// Tables in creation order (referenced tables first)
pub static TABLES: [Table; 3] = [
    Table {
        kind: EntityKind::Customer,
        columns: &[Column::primary("id"), Column::of("name", ColumnType::Text)],
        foreign_keys: &[],
    },
    Table {
        kind: EntityKind::Item,
        columns: &[
            Column::primary("id"),
            Column::of("name", ColumnType::Text),
            Column::of("price", ColumnType::Real),
        ],
        foreign_keys: &[],
    },
    Table {
        kind: EntityKind::Review,
        columns: &[
            Column::primary("id"),
            Column::of("comment", ColumnType::Text),
            Column::of("customer_id", ColumnType::Integer),
            Column::of("item_id", ColumnType::Integer),
        ],
        foreign_keys: &[&FK_REVIEW_CUSTOMER, &FK_REVIEW_ITEM],
    },
];

pub fn table(kind: EntityKind) -> &'static Table {
    match kind {
        EntityKind::Customer => &TABLES[0],
        EntityKind::Item => &TABLES[1],
        EntityKind::Review => &TABLES[2],
    }
}

/// Default template for foreign-key constraint names
pub const FOREIGN_KEY_TEMPLATE: &str = "fk_%(table_name)s_%(column_0_name)s_%(referred_table_name)s";

/// Constraint naming rules, applied once when the schema is rendered
#[derive(Debug, Clone)]
pub struct NamingConvention {
    foreign_key: String,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            foreign_key: FOREIGN_KEY_TEMPLATE.to_string(),
        }
    }
}

impl NamingConvention {
    pub fn with_foreign_key_template(template: impl Into<String>) -> Self {
        Self {
            foreign_key: template.into(),
        }
    }

    pub fn foreign_key_name(&self, fk: &ForeignKey) -> String {
        self.foreign_key
            .replace("%(table_name)s", fk.table)
            .replace("%(column_0_name)s", fk.column)
            .replace("%(referred_table_name)s", fk.referred_table())
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for one table
    pub fn create_table_sql(&self, table: &Table) -> String {
        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|c| {
                if c.primary_key {
                    format!("    {} {} PRIMARY KEY", c.name, c.ty.sql())
                } else {
                    format!("    {} {} NOT NULL", c.name, c.ty.sql())
                }
            })
            .collect();

        for fk in table.foreign_keys {
            lines.push(format!(
                "    CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                self.foreign_key_name(fk),
                fk.column,
                fk.referred_table(),
                fk.referred_column
            ));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            table.name(),
            lines.join(",\n")
        )
    }

    /// DDL for the whole schema, in dependency order
    pub fn create_statements(&self) -> Vec<String> {
        TABLES.iter().map(|t| self.create_table_sql(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rating_types::Review;

    #[test]
    fn test_foreign_key_names_follow_convention() {
        let naming = NamingConvention::default();
        assert_eq!(
            naming.foreign_key_name(&FK_REVIEW_CUSTOMER),
            "fk_reviews_customer_id_customers"
        );
        assert_eq!(
            naming.foreign_key_name(&FK_REVIEW_ITEM),
            "fk_reviews_item_id_items"
        );
    }

    #[test]
    fn test_reviews_ddl_declares_named_constraints() {
        let sql = NamingConvention::default().create_table_sql(table(EntityKind::Review));
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS reviews"));
        assert!(sql.contains("id INTEGER PRIMARY KEY"));
        assert!(sql.contains(
            "CONSTRAINT fk_reviews_customer_id_customers FOREIGN KEY (customer_id) REFERENCES customers (id)"
        ));
        assert!(sql.contains(
            "CONSTRAINT fk_reviews_item_id_items FOREIGN KEY (item_id) REFERENCES items (id)"
        ));
    }

    #[test]
    fn test_create_statements_order() {
        let statements = NamingConvention::default().create_statements();
        assert_eq!(statements.len(), 3);
        assert!(statements[0].contains("customers"));
        assert!(statements[1].contains("items"));
        assert!(statements[2].contains("reviews"));
    }

    #[test]
    fn test_table_columns_match_record_shape() {
        let names: Vec<_> = table(EntityKind::Item).column_names().collect();
        assert_eq!(names, ["id", "name", "price"]);

        let review = Record::Review(Review::new(4, "ok", 7, 9));
        assert_eq!(FK_REVIEW_CUSTOMER.value_in(&review), Some(7));
        assert_eq!(FK_REVIEW_ITEM.value_in(&review), Some(9));
    }

    #[test]
    fn test_custom_template() {
        let naming = NamingConvention::with_foreign_key_template("%(table_name)s_%(column_0_name)s_fkey");
        assert_eq!(naming.foreign_key_name(&FK_REVIEW_ITEM), "reviews_item_id_fkey");
    }
}
