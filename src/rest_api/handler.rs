//! # REST API Handler
//!
//! Maps HTTP verbs on resource paths to validated storage operations.
//!
//! Every request goes through the same stages:
//!
//! ```text
//! path lookup -> storage bound? -> mode allowed? -> validated -> executed
//! ```
//!
//! | Request             | Mode              | Success                |
//! |---------------------|-------------------|------------------------|
//! | `GET /res`          | List              | 200 + `X-Total`        |
//! | `GET /res/{id}`     | Read              | 200 + `ETag`           |
//! | `POST /res`         | Create            | 201 + `ETag`           |
//! | `PATCH /res/{id}`   | Update            | 200 + `ETag`           |
//! | `PUT /res/{id}`     | Replace or Create | 200 or 201 + `ETag`    |
//! | `DELETE /res/{id}`  | Delete            | 204                    |
//! | `DELETE /res`       | Clear             | 204 + `X-Total`        |

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::query::{Predicate, Query, QueryValidator, RawQuery, Window};
use crate::resource::{Index, Item, Mode, RequestContext, Resource, Route, Storer};
use crate::schema::{Document, DocumentValidator, Issues, ID_FIELD};

use super::errors::{RestError, RestResult};
use super::request::Request;
use super::response::Response;

/// What a method/path pair asks for, before existence is known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    List,
    Read,
    Create,
    Update,
    Put,
    Delete,
    Clear,
}

impl Operation {
    fn resolve(method: &Method, has_id: bool) -> RestResult<Self> {
        let op = match (method.as_str(), has_id) {
            ("GET", false) => Operation::List,
            ("GET", true) => Operation::Read,
            ("POST", false) => Operation::Create,
            ("PATCH", true) => Operation::Update,
            ("PUT", true) => Operation::Put,
            ("DELETE", true) => Operation::Delete,
            ("DELETE", false) => Operation::Clear,
            _ => return Err(RestError::MethodNotAllowed),
        };
        Ok(op)
    }

    /// Mode checked before execution. `PUT` is checked once existence is known.
    fn mode(self) -> Option<Mode> {
        match self {
            Operation::List => Some(Mode::List),
            Operation::Read => Some(Mode::Read),
            Operation::Create => Some(Mode::Create),
            Operation::Update => Some(Mode::Update),
            Operation::Put => None,
            Operation::Delete => Some(Mode::Delete),
            Operation::Clear => Some(Mode::Clear),
        }
    }
}

/// Request handler over a bound [`Index`]
#[derive(Debug, Clone)]
pub struct RestHandler {
    index: Arc<Index>,
}

/// Resolved target of one request
struct Target<'a> {
    resource: &'a Resource,
    storer: &'a Arc<dyn Storer>,
    /// `parent_field == parent id` for sub-resources
    scope: Option<Predicate>,
    /// `(field, parent id)` forced onto written documents
    parent: Option<(&'a str, Value)>,
}

impl RestHandler {
    pub fn new(index: Arc<Index>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Handles one request. Errors are rendered as the JSON error envelope.
    pub async fn serve(&self, ctx: &RequestContext, req: &Request) -> Response {
        match self.dispatch(ctx, req).await {
            Ok(response) => response,
            Err(err) => {
                match &err {
                    RestError::Internal(reason) => {
                        warn!(request_id = %ctx.request_id, path = %req.path, %reason, "storage failure")
                    }
                    RestError::Canceled | RestError::DeadlineExceeded => {
                        warn!(request_id = %ctx.request_id, path = %req.path, error = %err, "request abandoned")
                    }
                    _ => debug!(
                        request_id = %ctx.request_id,
                        path = %req.path,
                        status = err.status_code().as_u16(),
                        error = %err,
                        "request rejected"
                    ),
                }
                Response::from(err)
            }
        }
    }

    async fn dispatch(&self, ctx: &RequestContext, req: &Request) -> RestResult<Response> {
        let segments = req.segments();
        let segments: Vec<&str> = segments.iter().map(|s| s.as_ref()).collect();
        let route = self
            .index
            .lookup(&segments)
            .ok_or(RestError::ResourceNotFound)?;
        let resource = route.resource;
        let storer = resource.storer().ok_or(RestError::NotConfigured)?;

        let op = Operation::resolve(&req.method, route.id.is_some())?;
        if let Some(mode) = op.mode() {
            check_mode(resource, mode)?;
        } else if !resource.conf().is_mode_allowed(Mode::Replace)
            && !resource.conf().is_mode_allowed(Mode::Create)
        {
            return Err(RestError::ModeNotAllowed);
        }

        debug!(
            request_id = %ctx.request_id,
            resource = %route.path(),
            operation = ?op,
            "dispatching request"
        );

        let target = self.resolve_parents(ctx, &route, storer).await?;
        let id = route.id.clone();

        match (op, id) {
            (Operation::List, _) => list(ctx, req, &target).await,
            (Operation::Clear, _) => clear(ctx, req, &target).await,
            (Operation::Create, _) => create(ctx, req, &target).await,
            (Operation::Read, Some(id)) => read(ctx, &target, id).await,
            (Operation::Update, Some(id)) => update(ctx, req, &target, id).await,
            (Operation::Put, Some(id)) => put(ctx, req, &target, id).await,
            (Operation::Delete, Some(id)) => delete(ctx, req, &target, id).await,
            _ => Err(RestError::MethodNotAllowed),
        }
    }

    /// Checks that every parent in the path exists and builds the scope
    async fn resolve_parents<'a>(
        &self,
        ctx: &RequestContext,
        route: &Route<'a>,
        storer: &'a Arc<dyn Storer>,
    ) -> RestResult<Target<'a>> {
        let mut previous: Option<&Value> = None;
        for parent in &route.parents {
            let parent_storer = parent.resource.storer().ok_or(RestError::NotConfigured)?;
            let scope = parent_scope(parent.resource, previous);
            if find_one(ctx, parent_storer, parent.id.clone(), scope)
                .await?
                .is_none()
            {
                return Err(RestError::NotFound);
            }
            previous = Some(&parent.id);
        }

        Ok(Target {
            resource: route.resource,
            storer,
            scope: parent_scope(route.resource, previous),
            parent: route.resource.parent_field().zip(previous.cloned()),
        })
    }
}

/// `parent_field == parent id` when `resource` hangs below a parent
fn parent_scope(resource: &Resource, parent_id: Option<&Value>) -> Option<Predicate> {
    Some(Predicate::equal(resource.parent_field()?, parent_id?.clone()))
}

fn check_mode(resource: &Resource, mode: Mode) -> RestResult<()> {
    if resource.conf().is_mode_allowed(mode) {
        Ok(())
    } else {
        Err(RestError::ModeNotAllowed)
    }
}

/// Validates the request's query parameters for `target`
fn validate_query(
    req: &Request,
    target: &Target<'_>,
    default_limit: Option<usize>,
) -> RestResult<Query> {
    let conf = target.resource.conf();
    let query = QueryValidator::new(target.resource.schema())
        .with_default_sort(&conf.default_sort)
        .validate(&RawQuery::from_params(&req.params), default_limit)
        .map_err(RestError::InvalidParams)?;
    Ok(match &target.scope {
        Some(scope) => query.and_predicate(scope.clone()),
        None => query,
    })
}

/// Fetches the item with `id`, within `scope`
async fn find_one(
    ctx: &RequestContext,
    storer: &Arc<dyn Storer>,
    id: Value,
    scope: Option<Predicate>,
) -> RestResult<Option<Item>> {
    let mut query = Query::new()
        .with_predicate(Predicate::equal(ID_FIELD, id))
        .with_window(Window::new(0, Some(1)));
    if let Some(scope) = scope {
        query = query.and_predicate(scope);
    }
    let list = storer.find(ctx, &query).await?;
    Ok(list.items.into_iter().next())
}

/// Parses the body as a JSON object
fn body_object(req: &Request) -> RestResult<Document> {
    if req.body.is_empty() {
        return Err(RestError::MalformedBody("empty body".to_string()));
    }
    match serde_json::from_slice::<Value>(&req.body) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(_) => Err(RestError::MalformedBody("expected a JSON object".to_string())),
        Err(e) => Err(RestError::MalformedBody(e.to_string())),
    }
}

fn check_if_match(req: &Request, item: &Item) -> RestResult<()> {
    match req.if_match() {
        Some(tag) if !item.matches_etag(tag) => Err(RestError::Conflict),
        _ => Ok(()),
    }
}

/// Writes the parent id onto a document of a sub-resource
fn force_parent(doc: &mut Document, target: &Target<'_>) {
    if let Some((field, pid)) = &target.parent {
        doc.insert(field.to_string(), pid.clone());
    }
}

/// Document validator for `target`, exempting the parent link it assigns
fn document_validator<'t>(target: &'t Target<'_>) -> DocumentValidator<'t> {
    DocumentValidator::new(target.resource.schema())
        .with_assigned(target.parent.as_ref().map(|(field, _)| *field))
}

/// Validates the document of a new item whose identity is `id`.
///
/// `issues` may already hold problems found by the caller; all are reported
/// together.
fn new_item(
    target: &Target<'_>,
    mut body: Document,
    id: Value,
    mut issues: Issues,
) -> RestResult<Item> {
    force_parent(&mut body, target);
    body.remove(ID_FIELD);
    let schema = target.resource.schema();

    let id = match schema.id_field().map(|def| def.validate(&id)) {
        Some(Ok(normalised)) => normalised,
        Some(Err(reason)) => {
            issues.add(ID_FIELD, reason);
            id
        }
        None => id,
    };
    let doc = match document_validator(target).validate_create(body) {
        Ok(doc) => doc,
        Err(doc_issues) => {
            for (key, messages) in doc_issues.iter() {
                issues.extend(key, messages.iter().cloned());
            }
            Document::new()
        }
    };
    if !issues.is_empty() {
        return Err(RestError::InvalidDocument(issues));
    }
    Ok(Item::new(id, doc))
}

fn item_response(status: StatusCode, item: Item) -> Response {
    let etag = item.etag.clone();
    Response::json(status, Value::Object(item.payload)).with_etag(&etag)
}

async fn list(ctx: &RequestContext, req: &Request, target: &Target<'_>) -> RestResult<Response> {
    let default_limit = target.resource.conf().pagination_default_limit;
    let query = validate_query(req, target, default_limit)?;
    let list = target.storer.find(ctx, &query).await?;

    let body = list
        .items
        .into_iter()
        .map(|item| Value::Object(item.payload))
        .collect();
    Ok(Response::json(StatusCode::OK, Value::Array(body)).with_total(list.total))
}

async fn clear(ctx: &RequestContext, req: &Request, target: &Target<'_>) -> RestResult<Response> {
    // no default limit: a bare DELETE clears every matching item
    let query = validate_query(req, target, None)?;
    let removed = target.storer.delete(ctx, &query).await?;
    debug!(request_id = %ctx.request_id, removed, "resource cleared");
    Ok(Response::no_content().with_total(removed))
}

async fn read(ctx: &RequestContext, target: &Target<'_>, id: Value) -> RestResult<Response> {
    let item = find_one(ctx, target.storer, id, target.scope.clone())
        .await?
        .ok_or(RestError::NotFound)?;
    Ok(item_response(StatusCode::OK, item))
}

async fn create(ctx: &RequestContext, req: &Request, target: &Target<'_>) -> RestResult<Response> {
    let mut body = body_object(req)?;
    let mut issues = Issues::new();

    let id = match body.remove(ID_FIELD) {
        Some(id) if !id.is_null() => {
            if target.resource.schema().id_field().is_some_and(|def| def.read_only) {
                issues.add(ID_FIELD, "read-only");
            }
            id
        }
        _ => Value::String(Uuid::new_v4().to_string()),
    };

    let item = new_item(target, body, id, issues)?;
    target.storer.insert(ctx, vec![item.clone()]).await?;
    Ok(item_response(StatusCode::CREATED, item))
}

async fn update(
    ctx: &RequestContext,
    req: &Request,
    target: &Target<'_>,
    id: Value,
) -> RestResult<Response> {
    let original = find_one(ctx, target.storer, id, target.scope.clone())
        .await?
        .ok_or(RestError::NotFound)?;
    check_if_match(req, &original)?;

    let mut patch = body_object(req)?;
    force_parent(&mut patch, target);
    let doc = document_validator(target)
        .validate_update(patch, &original.payload)
        .map_err(RestError::InvalidDocument)?;

    let item = Item::new(original.id.clone(), doc);
    target.storer.update(ctx, item.clone(), &original).await?;
    Ok(item_response(StatusCode::OK, item))
}

async fn put(
    ctx: &RequestContext,
    req: &Request,
    target: &Target<'_>,
    id: Value,
) -> RestResult<Response> {
    let existing = find_one(ctx, target.storer, id.clone(), target.scope.clone()).await?;

    let original = match existing {
        Some(original) => original,
        None => {
            if req.if_match().is_some() {
                return Err(RestError::NotFound);
            }
            check_mode(target.resource, Mode::Create)?;
            let item = new_item(target, body_object(req)?, id, Issues::new())?;
            target.storer.insert(ctx, vec![item.clone()]).await?;
            return Ok(item_response(StatusCode::CREATED, item));
        }
    };

    check_mode(target.resource, Mode::Replace)?;
    check_if_match(req, &original)?;

    let mut body = body_object(req)?;
    force_parent(&mut body, target);
    body.insert(ID_FIELD.to_string(), original.id.clone());

    let doc = document_validator(target)
        .validate_replace(body, &original.payload)
        .map_err(RestError::InvalidDocument)?;

    let item = Item::new(original.id.clone(), doc);
    target.storer.update(ctx, item.clone(), &original).await?;
    Ok(item_response(StatusCode::OK, item))
}

async fn delete(
    ctx: &RequestContext,
    req: &Request,
    target: &Target<'_>,
    id: Value,
) -> RestResult<Response> {
    let item = find_one(ctx, target.storer, id, target.scope.clone())
        .await?
        .ok_or(RestError::NotFound)?;
    check_if_match(req, &item)?;
    target.storer.delete_item(ctx, &item).await?;
    Ok(Response::no_content())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Conf, Modes, Resource};
    use crate::schema::{FieldDef, FieldKind, Schema};
    use crate::storage::MemoryStorer;
    use axum::http::header;
    use serde_json::json;

    fn users_schema() -> Schema {
        Schema::new()
            .field("name", FieldDef::new(FieldKind::string()).required().filterable())
            .field("age", FieldDef::new(FieldKind::integer()).filterable().sortable())
            .field("created", FieldDef::new(FieldKind::Time).read_only())
    }

    fn handler_with(conf: Conf, storer: Option<Arc<dyn Storer>>) -> RestHandler {
        let mut index = Index::new();
        index
            .bind(Resource::bind("users", users_schema(), storer, conf).unwrap())
            .unwrap();
        RestHandler::new(Arc::new(index))
    }

    fn handler() -> RestHandler {
        handler_with(Conf::default(), Some(Arc::new(MemoryStorer::new())))
    }

    async fn call(handler: &RestHandler, req: Request) -> Response {
        handler.serve(&RequestContext::new(), &req).await
    }

    async fn create_user(handler: &RestHandler, body: Value) -> Response {
        call(handler, Request::new(Method::POST, "/users").with_json(&body)).await
    }

    #[tokio::test]
    async fn test_create_generates_uuid() {
        let handler = handler();
        let res = create_user(&handler, json!({"name": "Alice"})).await;

        assert_eq!(res.status, StatusCode::CREATED);
        let body = res.body.clone().unwrap();
        let id = body["id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(res.etag().map(str::len), Some(64));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_document() {
        let handler = handler();
        let res = create_user(&handler, json!({"age": "x", "created": "2024-01-01T00:00:00Z"})).await;

        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            res.body.unwrap(),
            json!({
                "code": 422,
                "message": "Document contains error(s)",
                "issues": {
                    "age": ["not an integer"],
                    "created": ["read-only"],
                    "name": ["required"]
                }
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let handler = handler();
        let res = call(&handler, Request::new(Method::POST, "/users").with_body("{nope")).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);

        let res = create_user(&handler, json!([1, 2])).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_duplicate_id_conflicts() {
        let handler = handler();
        create_user(&handler, json!({"id": "a", "name": "Alice"})).await;
        let res = create_user(&handler, json!({"id": "a", "name": "Again"})).await;
        assert_eq!(res.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_read_and_not_found() {
        let handler = handler();
        create_user(&handler, json!({"id": "a", "name": "Alice"})).await;

        let res = call(&handler, Request::new(Method::GET, "/users/a")).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body.unwrap()["name"], "Alice");

        let res = call(&handler, Request::new(Method::GET, "/users/b")).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body.unwrap()["message"], "Not Found");

        let res = call(&handler, Request::new(Method::GET, "/groups")).await;
        assert_eq!(res.body.unwrap()["message"], "Resource Not Found");
    }

    #[tokio::test]
    async fn test_patch_with_if_match() {
        let handler = handler();
        let created = create_user(&handler, json!({"id": "a", "name": "Alice"})).await;
        let etag = created.etag().unwrap().to_string();

        let stale = call(
            &handler,
            Request::new(Method::PATCH, "/users/a")
                .with_header(header::IF_MATCH, "\"0000\"")
                .with_json(&json!({"age": 31})),
        )
        .await;
        assert_eq!(stale.status, StatusCode::CONFLICT);

        let res = call(
            &handler,
            Request::new(Method::PATCH, "/users/a")
                .with_header(header::IF_MATCH, &format!("\"{}\"", etag))
                .with_json(&json!({"age": 31})),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        let body = res.body.clone().unwrap();
        assert_eq!(body["age"], 31);
        assert_eq!(body["name"], "Alice");
        assert_ne!(res.etag(), Some(etag.as_str()));
    }

    #[tokio::test]
    async fn test_put_creates_then_replaces() {
        let handler = handler();

        let res = call(
            &handler,
            Request::new(Method::PUT, "/users/z").with_json(&json!({"name": "Zed", "age": 3})),
        )
        .await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.body.unwrap()["id"], "z");

        let res = call(
            &handler,
            Request::new(Method::PUT, "/users/z").with_json(&json!({"name": "Zoe"})),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        let body = res.body.unwrap();
        assert_eq!(body["name"], "Zoe");
        // full replacement drops omitted fields
        assert!(body.get("age").is_none());

        let res = call(
            &handler,
            Request::new(Method::PUT, "/users/missing")
                .with_header(header::IF_MATCH, "\"x\"")
                .with_json(&json!({"name": "M"})),
        )
        .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_item() {
        let handler = handler();
        create_user(&handler, json!({"id": "a", "name": "Alice"})).await;

        let res = call(&handler, Request::new(Method::DELETE, "/users/a")).await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);
        let res = call(&handler, Request::new(Method::DELETE, "/users/a")).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_reports_pre_window_total() {
        let handler = handler();
        for (id, age) in [("a", 30), ("b", 20), ("c", 40)] {
            create_user(&handler, json!({"id": id, "name": id, "age": age})).await;
        }

        let res = call(
            &handler,
            Request::new(Method::GET, "/users")
                .with_param("sort", "-age")
                .with_param("limit", "2"),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.total(), Some(3));
        let body = res.body.unwrap();
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_mode_not_allowed() {
        let handler = handler_with(
            Conf::with_modes(Modes::READ_ONLY),
            Some(Arc::new(MemoryStorer::new())),
        );
        let res = create_user(&handler, json!({"name": "A"})).await;
        assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.body.unwrap()["message"], "Invalid method");

        let res = call(&handler, Request::new(Method::GET, "/users")).await;
        assert_eq!(res.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let handler = handler();
        let res = call(&handler, Request::new(Method::POST, "/users/a")).await;
        assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
        let res = call(&handler, Request::new(Method::PATCH, "/users")).await;
        assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unbound_resource_answers_501_first() {
        // even a disallowed mode or a bad query reports the missing storage
        let handler = handler_with(Conf::with_modes(Modes::NONE), None);
        let requests = [
            Request::new(Method::GET, "/users").with_param("filter", "invalid"),
            Request::new(Method::GET, "/users/1"),
            Request::new(Method::POST, "/users"),
            Request::new(Method::PATCH, "/users/1"),
            Request::new(Method::PUT, "/users/1"),
            Request::new(Method::DELETE, "/users/1"),
            Request::new(Method::DELETE, "/users"),
        ];
        for req in requests {
            let res = call(&handler, req).await;
            assert_eq!(res.status, StatusCode::NOT_IMPLEMENTED);
            assert_eq!(
                res.body.unwrap(),
                json!({"code": 501, "message": "No Storage Defined"})
            );
        }
    }

    #[tokio::test]
    async fn test_cancelled_request() {
        let handler = handler();
        let (ctx, cancel) = RequestContext::cancellable();
        cancel.cancel();
        let res = handler
            .serve(&ctx, &Request::new(Method::GET, "/users"))
            .await;
        assert_eq!(res.status.as_u16(), 499);
    }

    fn memory() -> Option<Arc<dyn Storer>> {
        Some(Arc::new(MemoryStorer::new()))
    }

    #[tokio::test]
    async fn test_stale_if_match_on_delete_and_put() {
        let handler = handler();
        create_user(&handler, json!({"id": "a", "name": "Alice"})).await;

        let res = call(
            &handler,
            Request::new(Method::DELETE, "/users/a").with_header(header::IF_MATCH, "\"0000\""),
        )
        .await;
        assert_eq!(res.status, StatusCode::CONFLICT);

        let res = call(
            &handler,
            Request::new(Method::PUT, "/users/a")
                .with_header(header::IF_MATCH, "\"0000\"")
                .with_json(&json!({"name": "Bob"})),
        )
        .await;
        assert_eq!(res.status, StatusCode::CONFLICT);

        // both requests left the item untouched
        let res = call(&handler, Request::new(Method::GET, "/users/a")).await;
        assert_eq!(res.body.unwrap()["name"], "Alice");
    }

    #[tokio::test]
    async fn test_nested_defaults_and_read_only() {
        let address = Schema::new()
            .field("city", FieldDef::new(FieldKind::string()))
            .field(
                "since",
                FieldDef::new(FieldKind::string())
                    .read_only()
                    .with_default(json!("x")),
            );
        let schema = Schema::new()
            .field("name", FieldDef::new(FieldKind::string()))
            .field("address", FieldDef::new(FieldKind::Object { schema: address }));
        let mut index = Index::new();
        index
            .bind(Resource::bind("people", schema, memory(), Conf::default()).unwrap())
            .unwrap();
        let handler = RestHandler::new(Arc::new(index));

        let res = call(
            &handler,
            Request::new(Method::POST, "/people")
                .with_json(&json!({"id": "p", "name": "A", "address": {"city": "Oslo"}})),
        )
        .await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.body.unwrap()["address"]["since"], "x");

        let res = call(
            &handler,
            Request::new(Method::PATCH, "/people/p").with_json(&json!({"name": "B"})),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(
            res.body.unwrap(),
            json!({"id": "p", "name": "B", "address": {"city": "Oslo", "since": "x"}})
        );

        let res = call(
            &handler,
            Request::new(Method::PUT, "/people/p")
                .with_json(&json!({"name": "C", "address": {"city": "Bergen"}})),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(
            res.body.unwrap()["address"],
            json!({"city": "Bergen", "since": "x"})
        );

        let res = call(
            &handler,
            Request::new(Method::PATCH, "/people/p")
                .with_json(&json!({"address": {"city": "Oslo", "since": "y"}})),
        )
        .await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            res.body.unwrap()["issues"],
            json!({"address": ["since: read-only"]})
        );
    }

    #[tokio::test]
    async fn test_read_only_parent_link_is_assigned() {
        let posts = Schema::new()
            .field("user", FieldDef::new(FieldKind::string()).read_only().filterable())
            .field("title", FieldDef::new(FieldKind::string()));
        let users = Resource::bind("users", users_schema(), memory(), Conf::default()).unwrap();
        let posts = Resource::bind("posts", posts, memory(), Conf::default()).unwrap();
        let mut index = Index::new();
        index
            .bind(users.with_sub_resource("user", posts).unwrap())
            .unwrap();
        let handler = RestHandler::new(Arc::new(index));
        create_user(&handler, json!({"id": "u1", "name": "Ann"})).await;

        let res = call(
            &handler,
            Request::new(Method::POST, "/users/u1/posts").with_json(&json!({"title": "t"})),
        )
        .await;
        assert_eq!(res.status, StatusCode::CREATED);
        let body = res.body.unwrap();
        assert_eq!(body["user"], "u1");
        let uri = format!("/users/u1/posts/{}", body["id"].as_str().unwrap());

        let res = call(
            &handler,
            Request::new(Method::PATCH, &uri).with_json(&json!({"title": "u"})),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);

        let res = call(
            &handler,
            Request::new(Method::PUT, &uri).with_json(&json!({"title": "v"})),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body.unwrap()["user"], "u1");
    }

    #[tokio::test]
    async fn test_percent_encoded_id() {
        let handler = handler();
        create_user(&handler, json!({"id": "a b", "name": "Spaced"})).await;

        let res = call(&handler, Request::new(Method::GET, "/users/a%20b")).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body.unwrap()["name"], "Spaced");
    }
}
