//! Structured SQL construction.
//!
//! Query text only ever contains identifiers and numbers taken from the
//! layer catalog. Every value that originates in a request (envelope
//! corners, filter codes, buffer distance) goes into the bind list and is
//! referenced by `$n` placeholder.

use map_common::{
    BoundingBox, CrsCode, GeometryKind, LayerDescriptor, ProjectedEnvelope, ResolutionVariant,
};

use crate::filter::AttributeFilter;

/// Alias of the data table inside assembled queries.
pub(crate) const TABLE_ALIAS: &str = "t";

/// A value passed to the database out of band.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Float(f64),
    Int(i32),
    Text(String),
    TextArray(Vec<String>),
}

/// SQL text plus its positional parameters (`$1` is `binds[0]`).
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

/// Accumulates bind values and hands out their placeholders.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    binds: Vec<BindValue>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value and return its `$n` placeholder.
    pub fn bind(&mut self, value: BindValue) -> String {
        self.binds.push(value);
        format!("${}", self.binds.len())
    }

    /// `ST_MakeEnvelope` over four bound corners.
    pub fn make_envelope(&mut self, bbox: &BoundingBox, srid: i32) -> String {
        let min_x = self.bind(BindValue::Float(bbox.min_x));
        let min_y = self.bind(BindValue::Float(bbox.min_y));
        let max_x = self.bind(BindValue::Float(bbox.max_x));
        let max_y = self.bind(BindValue::Float(bbox.max_y));
        format!(
            "ST_MakeEnvelope({}, {}, {}, {}, {})",
            min_x, min_y, max_x, max_y, srid
        )
    }

    /// A geographic viewport reprojected into the queried table's SRID.
    pub fn projected_envelope(&mut self, envelope: &ProjectedEnvelope) -> String {
        let geographic = self.make_envelope(&envelope.envelope.as_bbox(), CrsCode::Epsg4326.srid());
        transform(&geographic, CrsCode::Epsg4326.srid(), envelope.target_srid)
    }

    /// `column::text = ANY($n)` for every active constraint, in column order.
    ///
    /// A constraint on a column the variant does not have is compared
    /// against the empty default, so it matches no rows instead of erroring.
    pub fn filter_predicates(
        &mut self,
        variant: &ResolutionVariant,
        filter: &AttributeFilter,
    ) -> Vec<String> {
        filter
            .iter()
            .map(|(column, values)| {
                let placeholder =
                    self.bind(BindValue::TextArray(values.iter().cloned().collect()));
                format!("{} = ANY({})", text_column(variant, column), placeholder)
            })
            .collect()
    }

    pub fn finish(self, sql: String) -> SqlQuery {
        SqlQuery {
            sql,
            binds: self.binds,
        }
    }
}

/// Quote an identifier for PostgreSQL.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a string literal for PostgreSQL.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `"schema"."table" AS t`
pub fn from_table(variant: &ResolutionVariant) -> String {
    format!(
        "{}.{} AS {}",
        quote_ident(&variant.table.schema),
        quote_ident(&variant.table.name),
        TABLE_ALIAS
    )
}

/// A qualified column of the data table.
pub fn column(name: &str) -> String {
    format!("{}.{}", TABLE_ALIAS, quote_ident(name))
}

/// An exposed attribute as text, or `''` when the variant lacks it.
pub fn text_column(variant: &ResolutionVariant, name: &str) -> String {
    if variant.has_column(name) {
        format!("{}::text", column(name))
    } else {
        "''::text".to_string()
    }
}

/// The record id as bigint.
pub fn id_column(variant: &ResolutionVariant) -> String {
    format!("{}::bigint", column(&variant.id_column))
}

/// Wrap `expr` in `ST_Transform` unless the SRIDs already match.
pub fn transform(expr: &str, from_srid: i32, to_srid: i32) -> String {
    if from_srid == to_srid {
        expr.to_string()
    } else {
        format!("ST_Transform({}, {})", expr, to_srid)
    }
}

/// Coarse index test followed by the exact intersection test.
pub fn intersects_predicates(variant: &ResolutionVariant, envelope_expr: &str) -> [String; 2] {
    let geom = column(&variant.geom_column);
    [
        format!("{} && {}", geom, envelope_expr),
        format!("ST_Intersects({}, {})", geom, envelope_expr),
    ]
}

/// Repair invalid geometry and keep only the layer's own dimension.
pub fn repaired_geometry(variant: &ResolutionVariant, kind: GeometryKind) -> String {
    format!(
        "ST_CollectionExtract(ST_MakeValid({}), {})",
        column(&variant.geom_column),
        kind.collection_type()
    )
}

/// `jsonb_build_object(...)::text` over the record id and the layer's
/// exposed attributes.
///
/// The record id keeps its numeric type; every other attribute is text.
pub fn properties_object(layer: &LayerDescriptor, variant: &ResolutionVariant) -> String {
    let mut entries = vec![format!(
        "{}, {}",
        quote_literal(&variant.id_column),
        id_column(variant)
    )];
    entries.extend(layer.attribute_fields().map(|field| {
        format!("{}, {}", quote_literal(field), text_column(variant, field))
    }));

    format!("jsonb_build_object({})::text", entries.join(", "))
}

/// Join predicates with AND, or `TRUE` when there are none.
pub fn conjunction(predicates: &[String]) -> String {
    if predicates.is_empty() {
        "TRUE".to_string()
    } else {
        predicates.join("\n      AND ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use map_common::{Envelope, TableRef};

    fn variant(columns: &[&str]) -> ResolutionVariant {
        ResolutionVariant {
            table: TableRef::new("filter", "owner_s30"),
            srid: 5186,
            id_column: "gid".to_string(),
            geom_column: "geom".to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_placeholders_are_sequential() {
        let mut qb = QueryBuilder::new();
        assert_eq!(qb.bind(BindValue::Int(1)), "$1");
        assert_eq!(qb.bind(BindValue::Float(2.0)), "$2");
        let q = qb.finish(String::new());
        assert_eq!(q.binds, vec![BindValue::Int(1), BindValue::Float(2.0)]);
    }

    #[test]
    fn test_projected_envelope_binds_corners() {
        let env = Envelope::parse("126.8,36.5,126.9,36.6").unwrap();
        let mut qb = QueryBuilder::new();
        let expr = qb.projected_envelope(&env.in_srid(5186));
        assert_eq!(
            expr,
            "ST_Transform(ST_MakeEnvelope($1, $2, $3, $4, 4326), 5186)"
        );

        let mut qb = QueryBuilder::new();
        let expr = qb.projected_envelope(&env.in_srid(4326));
        assert_eq!(expr, "ST_MakeEnvelope($1, $2, $3, $4, 4326)");
        let q = qb.finish(expr);
        assert_eq!(q.binds[0], BindValue::Float(126.8));
        assert_eq!(q.binds[3], BindValue::Float(36.6));
    }

    #[test]
    fn test_missing_column_defaults_to_empty_text() {
        let v = variant(&["a20"]);
        assert_eq!(text_column(&v, "a20"), "t.\"a20\"::text");
        assert_eq!(text_column(&v, "a8"), "''::text");
    }

    #[test]
    fn test_filter_values_never_reach_sql_text() {
        let v = variant(&["a20", "a8"]);
        let filter = AttributeFilter::none()
            .with_values("a20", ["08'; DROP TABLE owner; --"])
            .with_values("a8", ["02"]);

        let mut qb = QueryBuilder::new();
        let predicates = qb.filter_predicates(&v, &filter);
        assert_eq!(
            predicates,
            vec![
                "t.\"a20\"::text = ANY($1)".to_string(),
                "t.\"a8\"::text = ANY($2)".to_string(),
            ]
        );
        for p in &predicates {
            assert!(!p.contains("DROP"));
        }
        let q = qb.finish(String::new());
        assert_eq!(
            q.binds[0],
            BindValue::TextArray(vec!["08'; DROP TABLE owner; --".to_string()])
        );
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(from_table(&variant(&[])), "\"filter\".\"owner_s30\" AS t");
    }

    #[test]
    fn test_conjunction() {
        assert_eq!(conjunction(&[]), "TRUE");
        assert_eq!(
            conjunction(&["a".to_string(), "b".to_string()]),
            "a\n      AND b"
        );
    }
}
