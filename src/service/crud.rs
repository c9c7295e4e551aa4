//! CRUD orchestration: composes projection, filters, sorting and paging over a `Store`.

use crate::config::Registry;
use crate::error::AppError;
use crate::hooks::HookOutcome;
use crate::query::{
    apply_columns, apply_envelopes, apply_filters, apply_paging, apply_sorting, assemble_paging_links, strip_hidden,
    PageLinks, Selection,
};
use crate::request::ResourceRequest;
use crate::schema::ResourceSchema;
use crate::service::RequestValidator;
use crate::sql::{delete_where, insert, update_where, Condition, QueryContext, SqlValue};
use crate::store::{Row, Store};
use serde_json::Value;

/// Result of `find_all`: the (possibly hooked) body plus collection metadata.
#[derive(Debug)]
pub struct Listing {
    pub outcome: HookOutcome,
    pub length: usize,
    pub total: u64,
    pub links: Option<PageLinks>,
}

/// Result of `create`.
#[derive(Debug)]
pub struct Created {
    /// `<base_url><path>/<id>` of the first created record, when the resource has a primary key.
    pub location: Option<String>,
    /// Default-projected created rows when `expand` was requested.
    pub body: Option<Value>,
}

pub struct CrudService<'a> {
    store: &'a dyn Store,
    registry: &'a Registry,
    base_url: &'a str,
}

impl<'a> CrudService<'a> {
    pub fn new(store: &'a dyn Store, registry: &'a Registry, base_url: &'a str) -> Self {
        CrudService {
            store,
            registry,
            base_url,
        }
    }

    fn primary_key<'s>(schema: &'s ResourceSchema, key: &str) -> Result<(&'s str, SqlValue), AppError> {
        let pk = schema
            .primary_key
            .as_deref()
            .ok_or_else(|| AppError::InvalidArgument("no primary key for this resource".into()))?;
        let primitive = schema
            .field_type(pk)
            .map(|t| t.primitive())
            .ok_or_else(|| AppError::InvalidArgument("no primary key for this resource".into()))?;
        let raw = Value::String(key.to_string());
        if key.is_empty() || !primitive.validate_json(&raw) {
            return Err(AppError::invalid_value(key, pk));
        }
        Ok((pk, primitive.to_sql_value(&raw)))
    }

    fn base_query(schema: &ResourceSchema) -> QueryContext {
        let mut query = QueryContext::new(schema.table.clone());
        if let Some(sd) = &schema.soft_delete {
            query.push_condition(Condition::eq(schema.column(&sd.column), SqlValue::from_json(&sd.live)));
        }
        query
    }

    fn envelope(&self, schema: &ResourceSchema, row: Row) -> Value {
        let mut envelope = apply_envelopes(schema, row);
        strip_hidden(self.registry, schema, &mut envelope);
        Value::Object(envelope)
    }

    pub async fn find_by_primary_key(
        &self,
        schema: &ResourceSchema,
        key: &str,
        req: &ResourceRequest,
    ) -> Result<HookOutcome, AppError> {
        let (pk, value) = Self::primary_key(schema, key)?;
        let mut query = Self::base_query(schema);
        query.push_condition(Condition::eq(schema.column(pk), value));
        apply_columns(self.registry, schema, &Selection::from_params(&req.params), &mut query)?;

        let rows = self.store.fetch_rows(&query.render_select()).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(key.to_string()))?;
        let envelope = self.envelope(schema, row);
        Ok(match self.registry.hook(&schema.name) {
            Some(hook) => hook.single(envelope),
            None => HookOutcome::Send(envelope),
        })
    }

    /// Row and count queries run concurrently; both complete before the listing is returned.
    pub async fn find_all(&self, schema: &ResourceSchema, req: &ResourceRequest) -> Result<Listing, AppError> {
        let filters = req.params.as_map();

        let mut query = Self::base_query(schema);
        apply_columns(self.registry, schema, &Selection::from_params(&req.params), &mut query)?;
        apply_filters(self.registry, schema, filters, &mut query, None)?;
        apply_sorting(self.registry, schema, &req.params, &mut query, false)?;
        apply_paging(&req.params, &mut query, false)?;

        let mut count = Self::base_query(schema);
        apply_filters(self.registry, schema, filters, &mut count, None)?;

        let select = query.render_select();
        let count = count.render_count();
        let (rows, total) = tokio::try_join!(self.store.fetch_rows(&select), self.store.fetch_count(&count))?;

        let length = rows.len();
        let envelopes: Vec<Value> = rows.into_iter().map(|row| self.envelope(schema, row)).collect();
        let outcome = match self.registry.hook(&schema.name) {
            Some(hook) => hook.collection(envelopes),
            None => HookOutcome::Send(Value::Array(envelopes)),
        };
        Ok(Listing {
            outcome,
            length,
            total,
            links: assemble_paging_links(self.base_url, &req.path, &req.params, total),
        })
    }

    /// Accepts one object or an array of objects. Every record is validated before the
    /// single bulk insert is issued.
    pub async fn create(&self, schema: &ResourceSchema, req: &ResourceRequest, body: Value) -> Result<Created, AppError> {
        let (records, many) = match body {
            Value::Object(record) => (vec![record], false),
            Value::Array(items) => {
                let mut records = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(record) => records.push(record),
                        _ => return Err(AppError::InvalidArgument("each element must be a JSON object".into())),
                    }
                }
                (records, true)
            }
            _ => return Err(AppError::InvalidArgument("body must be a JSON object or array".into())),
        };
        if records.is_empty() {
            return Err(AppError::InvalidArgument("nothing to create".into()));
        }

        let mut rows = Vec::with_capacity(records.len());
        for mut record in records {
            RequestValidator::stamp_owner(schema, &mut record, req.actor.as_ref())?;
            rows.push(RequestValidator::assemble_insert(schema, &record)?);
        }

        let pk = schema.primary_key.as_deref();
        if pk.is_none() && rows.len() > 1 && rows.iter().all(|row| row.is_empty()) {
            return Err(AppError::InvalidArgument(
                "records without any field can only be created one at a time".into(),
            ));
        }
        let statement = insert(&schema.table, &rows, schema.upsert_noop_column.as_deref(), pk);
        let inserted = match pk {
            Some(_) => self.store.fetch_rows(&statement).await,
            None => self.store.execute(&statement).await.map(|_| Vec::new()),
        }
        .map_err(|e| create_failed(schema, e))?;

        let Some(pk) = pk else {
            return Ok(Created {
                location: None,
                body: None,
            });
        };
        let ids: Vec<Value> = inserted.into_iter().filter_map(|mut row| row.remove(pk)).collect();
        let location = ids.first().map(|id| {
            let id = match id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}{}/{}", self.base_url, req.path, id)
        });

        if !req.params.contains("expand") || ids.is_empty() {
            return Ok(Created { location, body: None });
        }

        let primitive = schema
            .field_type(pk)
            .map(|t| t.primitive())
            .ok_or_else(|| AppError::InvalidArgument("no primary key for this resource".into()))?;
        let mut query = QueryContext::new(schema.table.clone());
        apply_columns(self.registry, schema, &Selection::Default, &mut query)?;
        query.push_condition(Condition::AnyOf(
            ids.iter()
                .map(|id| Condition::eq(schema.column(pk), primitive.to_sql_value(id)))
                .collect(),
        ));
        let fetched = self
            .store
            .fetch_rows(&query.render_select())
            .await
            .map_err(|e| create_failed(schema, e))?;
        let mut envelopes: Vec<Value> = fetched.into_iter().map(|row| self.envelope(schema, row)).collect();
        let body = if many {
            Value::Array(envelopes)
        } else if envelopes.is_empty() {
            Value::Null
        } else {
            envelopes.swap_remove(0)
        };
        Ok(Created {
            location,
            body: Some(body),
        })
    }

    /// Soft-deletes when the resource has a soft-delete column, otherwise removes the row.
    /// Owned resources only match the caller's records.
    pub async fn delete_by_primary_key(
        &self,
        schema: &ResourceSchema,
        key: &str,
        req: &ResourceRequest,
    ) -> Result<(), AppError> {
        let (pk, value) = Self::primary_key(schema, key)?;
        let mut conditions = vec![Condition::eq(schema.column(pk), value)];
        if let Some(ownership) = &schema.ownership {
            let owner = req
                .actor
                .as_ref()
                .and_then(|a| a.field(&ownership.actor_field))
                .ok_or_else(|| AppError::Unauthorized(format!("{} requires an authenticated owner", schema.name)))?;
            conditions.push(Condition::eq(schema.column(&ownership.column), SqlValue::from_json(owner)));
        }

        let statement = match &schema.soft_delete {
            Some(sd) => {
                conditions.push(Condition::eq(schema.column(&sd.column), SqlValue::from_json(&sd.live)));
                update_where(
                    &schema.table,
                    &[(sd.column.clone(), SqlValue::from_json(&sd.deleted))],
                    &conditions,
                )
            }
            None => delete_where(&schema.table, &conditions),
        };
        let affected = self.store.execute(&statement).await?;
        if affected == 0 {
            return Err(AppError::NotFound(key.to_string()));
        }
        Ok(())
    }
}

fn create_failed(schema: &ResourceSchema, e: crate::error::StoreError) -> AppError {
    tracing::warn!(resource = %schema.name, error = %e, "create failed");
    AppError::Store(e.create_message().to_string())
}
