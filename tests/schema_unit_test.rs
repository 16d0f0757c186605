use sql_restore::schema::{
    parse_columns_tsv, parse_ddl, parse_enum_values, Catalog, ColumnMeta, DataType, TableCatalog,
};

const MYSQLDUMP_SCHEMA: &str = r#"
-- MySQL dump 10.13
/*!40101 SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT */;

DROP TABLE IF EXISTS `orders`;
CREATE TABLE `orders` (
  `id` bigint unsigned NOT NULL AUTO_INCREMENT,
  `customer_id` int NOT NULL,
  `status` enum('new','paid','it''s done') NOT NULL DEFAULT 'new',
  `total` decimal(10,2) NOT NULL,
  `note` varchar(255) DEFAULT NULL,
  `meta` json NOT NULL,
  `placed_at` datetime NOT NULL DEFAULT CURRENT_TIMESTAMP,
  `total_cents` int GENERATED ALWAYS AS ((`total` * 100)) VIRTUAL,
  PRIMARY KEY (`id`),
  KEY `idx_customer` (`customer_id`),
  CONSTRAINT `fk_customer` FOREIGN KEY (`customer_id`) REFERENCES `customers` (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;

CREATE TABLE IF NOT EXISTS "shop"."Customers" (
  id int NOT NULL,
  active tinyint(1) NOT NULL DEFAULT '1'
);
"#;

mod tests {
    use super::*;

    #[test]
    fn test_data_type_classification() {
        assert_eq!(DataType::from_mysql_type("int(10) unsigned"), DataType::Integer);
        assert_eq!(DataType::from_mysql_type("TINYINT(1)"), DataType::Boolean);
        assert_eq!(DataType::from_mysql_type("tinyint(4)"), DataType::Integer);
        assert_eq!(DataType::from_mysql_type("double"), DataType::Decimal);
        assert_eq!(DataType::from_mysql_type("timestamp(3)"), DataType::DateTime);
        assert_eq!(DataType::from_mysql_type("date"), DataType::Date);
        assert_eq!(DataType::from_mysql_type("time"), DataType::Time);
        assert_eq!(DataType::from_mysql_type("json"), DataType::Json);
        assert_eq!(DataType::from_mysql_type("enum('a')"), DataType::Enum);
        assert_eq!(DataType::from_mysql_type("longtext"), DataType::String);
        assert_eq!(DataType::from_mysql_type("set('a','b')"), DataType::String);
    }

    #[test]
    fn test_enum_values_parsed_once_at_construction() {
        let column = ColumnMeta::new("status", r"enum('a','b\'c','d''e')");
        assert_eq!(column.enum_values, vec!["a", "b'c", "d'e"]);
        assert!(ColumnMeta::new("n", "int").enum_values.is_empty());
        assert!(parse_enum_values("enum()").is_empty());
    }

    #[test]
    fn test_required_columns() {
        assert!(ColumnMeta::new("a", "int").nullable(false).is_required());
        assert!(!ColumnMeta::new("a", "int").is_required());
        assert!(!ColumnMeta::new("a", "int").nullable(false).with_default(true).is_required());
        assert!(!ColumnMeta::new("a", "int").nullable(false).auto_increment(true).is_required());
    }

    #[test]
    fn test_catalog_is_case_insensitive() {
        let mut catalog = Catalog::new();
        catalog.add_table(TableCatalog::with_columns(
            "Users",
            vec![ColumnMeta::new("Email", "varchar(10)")],
        ));
        assert!(catalog.contains("users"));
        let table = catalog.get_table("USERS").unwrap();
        assert_eq!(table.name, "Users");
        assert_eq!(table.column_index("email"), Some(0));
        assert!(table.get_column("missing").is_none());
    }

    #[test]
    fn test_parse_mysqldump_schema() {
        let catalog = parse_ddl(MYSQLDUMP_SCHEMA);
        assert_eq!(catalog.len(), 2);

        let orders = catalog.get_table("orders").unwrap();
        let names: Vec<&str> = orders.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["id", "customer_id", "status", "total", "note", "meta", "placed_at", "total_cents"]
        );

        let id = &orders.columns[0];
        assert!(id.auto_increment);
        assert!(!id.nullable);
        assert_eq!(id.raw_type, "bigint unsigned");

        let status = orders.get_column("status").unwrap();
        assert_eq!(status.enum_values, vec!["new", "paid", "it's done"]);
        assert!(status.has_default);

        assert_eq!(orders.get_column("total").unwrap().raw_type, "decimal(10,2)");

        let note = orders.get_column("note").unwrap();
        assert!(note.nullable);
        assert!(!note.has_default);

        assert!(orders.get_column("placed_at").unwrap().has_default);
        assert!(orders.get_column("total_cents").unwrap().generated);
        assert!(!orders.get_column("meta").unwrap().generated);
    }

    #[test]
    fn test_parse_qualified_quoted_table() {
        let catalog = parse_ddl(MYSQLDUMP_SCHEMA);
        let customers = catalog.get_table("customers").unwrap();
        assert_eq!(customers.name, "Customers");
        assert_eq!(customers.columns[1].data_type, DataType::Boolean);
        assert!(customers.columns[1].has_default);
    }

    #[test]
    fn test_catalog_from_information_schema_rows() {
        let tsv = "t\tid\tint\tNO\t0\tauto_increment\nt\tname\tvarchar(20)\tNO\t0\t\n";
        let catalog = parse_columns_tsv(tsv).unwrap();
        let table = catalog.get_table("t").unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.columns[0].auto_increment);
        assert!(table.columns[1].is_required());
    }

    #[test]
    fn test_information_schema_extra_variants() {
        let tsv = "t\tcreated_at\ttimestamp\tNO\t1\tDEFAULT_GENERATED\n\
                   t\tupdated_at\tdatetime(3)\tNO\t1\tDEFAULT_GENERATED on update CURRENT_TIMESTAMP(3)\n\
                   t\tslug\tvarchar(20)\tYES\t0\tVIRTUAL GENERATED\n\
                   t\ttotal\tint\tYES\t0\tSTORED GENERATED\n";
        let catalog = parse_columns_tsv(tsv).unwrap();
        let table = catalog.get_table("t").unwrap();

        let created_at = table.get_column("created_at").unwrap();
        assert!(!created_at.generated);
        assert!(created_at.has_default);
        assert!(!table.get_column("updated_at").unwrap().generated);
        assert!(table.get_column("slug").unwrap().generated);
        assert!(table.get_column("total").unwrap().generated);
    }

    #[test]
    fn test_bit_columns() {
        assert!(ColumnMeta::new("flag", "bit(1)").is_bit());
        assert!(ColumnMeta::new("mask", "BIT(8)").is_bit());
        assert!(!ColumnMeta::new("n", "bigint").is_bit());
    }
}
