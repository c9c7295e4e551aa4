//! Request-parameter DSLs that shape a `QueryContext`, plus envelope reconstruction of result rows.

pub mod columns;
pub mod envelope;
pub mod filter;
pub mod paging;
pub mod sort;

pub use columns::*;
pub use envelope::*;
pub use filter::*;
pub use paging::*;
pub use sort::*;

use crate::error::{AppError, SchemaError};
use crate::schema::ResourceSchema;
use crate::sql::{ColumnRef, QueryContext};

/// Left-joins the `belongs_to` relation `label` of `root` on
/// `<root>.<mapping> = <label>.<related primary key>`. A label is joined at most once per query.
pub fn join_table(
    query: &mut QueryContext,
    root: &ResourceSchema,
    label: &str,
    related: &ResourceSchema,
) -> Result<(), AppError> {
    if query.is_joined(label) {
        return Ok(());
    }
    let rel = root
        .belongs_to()
        .get(label)
        .ok_or_else(|| AppError::InvalidArgument(format!("'{}' is not a relation of {}", label, root.name)))?;
    let pk = related.primary_key.as_deref().ok_or_else(|| SchemaError::InvalidRelation {
        resource: root.name.clone(),
        field: label.to_string(),
        reason: format!("related resource '{}' has no primary key", related.name),
    })?;
    query.left_join(
        label,
        related.table.clone(),
        root.column(&rel.mapping),
        ColumnRef::new(label, pk),
    );
    Ok(())
}
