use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use quick_xml::escape::escape;
use serde::Deserialize;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub const SPARQL_XML: &str = "application/sparql-results+xml";

const INPUT_FORMATS: [&str; 6] = [
    "application/rdf+xml",
    "text/plain",
    "application/x-turtle",
    "text/rdf+n3",
    "application/trix",
    "application/x-trig",
];

/// A stored triple. Terms keep their N-Triples spelling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub context: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Repository {
    pub title: String,
    pub statements: Vec<Statement>,
    pub namespaces: BTreeMap<String, String>,
}

pub type Db = Arc<RwLock<BTreeMap<String, Repository>>>;

/// Startup options: repositories to create and optional Basic credentials.
#[derive(Clone, Debug)]
pub struct MockConfig {
    pub repositories: Vec<String>,
    pub credentials: Option<(String, String)>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            repositories: vec!["test".to_string()],
            credentials: None,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    authorization: Option<String>,
}

#[derive(Deserialize)]
pub struct ContextParam {
    pub context: Option<String>,
}

#[derive(Deserialize)]
pub struct QueryForm {
    pub query: String,
    #[serde(rename = "queryLn")]
    pub query_ln: String,
    pub infer: String,
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let repositories = config
        .repositories
        .iter()
        .map(|id| {
            let repo = Repository {
                title: format!("{id} repository"),
                ..Repository::default()
            };
            (id.clone(), repo)
        })
        .collect();
    let state = AppState {
        db: Arc::new(RwLock::new(repositories)),
        authorization: config
            .credentials
            .map(|(user, password)| format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))),
    };
    Router::new()
        .route("/repositories", get(list_repositories))
        .route("/repositories/{repo}", post(query))
        .route(
            "/repositories/{repo}/statements",
            post(append).put(overwrite).delete(clear),
        )
        .route(
            "/repositories/{repo}/namespaces/{prefix}",
            get(get_namespace).put(set_namespace).delete(delete_namespace),
        )
        .route("/repositories/{repo}/contexts", post(contexts))
        .route("/repositories/{repo}/size", post(size))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockConfig::default()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(expected) = &state.authorization {
        let given = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        if given != Some(expected.as_str()) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }
    debug!(method = %request.method(), uri = %request.uri(), "mock request");
    next.run(request).await
}

/// Renders one N-Triples term as a SPARQL results XML term element.
fn term_xml(term: &str) -> String {
    if let Some(uri) = term.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return format!("<uri>{}</uri>", escape(uri));
    }
    if let Some(id) = term.strip_prefix("_:") {
        return format!("<bnode>{}</bnode>", escape(id));
    }
    if let Some(rest) = term.strip_prefix('"') {
        if let Some(end) = rest.rfind('"') {
            let value = &rest[..end];
            let suffix = &rest[end + 1..];
            if let Some(lang) = suffix.strip_prefix('@') {
                return format!("<literal xml:lang=\"{}\">{}</literal>", escape(lang), escape(value));
            }
            if let Some(datatype) = suffix
                .strip_prefix("^^<")
                .and_then(|t| t.strip_suffix('>'))
            {
                return format!("<literal datatype=\"{}\">{}</literal>", escape(datatype), escape(value));
            }
            return format!("<literal>{}</literal>", escape(value));
        }
    }
    format!("<literal>{}</literal>", escape(term))
}

fn results_xml(variables: &[&str], rows: &[Vec<(&str, String)>]) -> Response {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<sparql xmlns=\"http://www.w3.org/2005/sparql-results#\">\n<head>\n");
    for variable in variables {
        out.push_str(&format!("<variable name=\"{variable}\"/>\n"));
    }
    out.push_str("</head>\n<results>\n");
    for row in rows {
        out.push_str("<result>\n");
        for (variable, term) in row {
            out.push_str(&format!("<binding name=\"{variable}\">{term}</binding>\n"));
        }
        out.push_str("</result>\n");
    }
    out.push_str("</results>\n</sparql>\n");
    ([(header::CONTENT_TYPE, SPARQL_XML)], out).into_response()
}

/// Splits N-Triples-like lines into terms. Every non-blank, non-comment line
/// is one statement regardless of the declared format.
fn parse_statements(body: &str, context: Option<String>) -> Option<Vec<Statement>> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let line = line.strip_suffix('.').unwrap_or(line).trim_end();
            let mut parts = line.splitn(3, char::is_whitespace);
            let subject = parts.next()?.to_string();
            let predicate = parts.next()?.to_string();
            let object = parts.next()?.trim().to_string();
            if object.is_empty() {
                return None;
            }
            Some(Statement {
                subject,
                predicate,
                object,
                context: context.clone(),
            })
        })
        .collect()
}

/// `None` selects every context, `Some(None)` the default graph.
fn context_filter(param: Option<&str>) -> Option<Option<String>> {
    match param {
        None => None,
        Some("null") => Some(None),
        Some(value) => Some(Some(
            value
                .strip_prefix('<')
                .and_then(|v| v.strip_suffix('>'))
                .unwrap_or(value)
                .to_string(),
        )),
    }
}

fn input_format_ok(headers: &HeaderMap, allowed: &[&str]) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| allowed.contains(&mime.trim()))
}

async fn list_repositories(State(state): State<AppState>) -> Response {
    let db = state.db.read().await;
    let boolean = |b: bool| format!("<literal datatype=\"http://www.w3.org/2001/XMLSchema#boolean\">{b}</literal>");
    let rows: Vec<_> = db
        .iter()
        .map(|(id, repo)| {
            vec![
                ("id", format!("<literal>{}</literal>", escape(id.as_str()))),
                ("title", format!("<literal>{}</literal>", escape(repo.title.as_str()))),
                ("readable", boolean(true)),
                ("writable", boolean(true)),
            ]
        })
        .collect();
    results_xml(&["id", "title", "readable", "writable"], &rows)
}

async fn query(
    State(state): State<AppState>,
    Path(repo): Path<String>,
    headers: HeaderMap,
    Form(form): Form<QueryForm>,
) -> Result<Response, StatusCode> {
    let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()).unwrap_or(SPARQL_XML);
    if !accept.contains(SPARQL_XML) {
        return Err(StatusCode::NOT_ACCEPTABLE);
    }
    if form.query.trim().is_empty()
        || !matches!(form.query_ln.as_str(), "sparql" | "serql")
        || !matches!(form.infer.as_str(), "true" | "false")
    {
        return Err(StatusCode::BAD_REQUEST);
    }
    let db = state.db.read().await;
    let repository = db.get(&repo).ok_or(StatusCode::NOT_FOUND)?;
    let rows: Vec<_> = repository
        .statements
        .iter()
        .map(|st| {
            vec![
                ("s", term_xml(&st.subject)),
                ("p", term_xml(&st.predicate)),
                ("o", term_xml(&st.object)),
            ]
        })
        .collect();
    Ok(results_xml(&["s", "p", "o"], &rows))
}

async fn store_statements(
    state: AppState,
    repo: String,
    param: ContextParam,
    headers: HeaderMap,
    body: Bytes,
    replace: bool,
) -> Result<StatusCode, StatusCode> {
    if !input_format_ok(&headers, &INPUT_FORMATS) {
        return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
    let filter = context_filter(param.context.as_deref());
    let target = filter.clone().flatten();
    let text = std::str::from_utf8(&body).map_err(|_| StatusCode::BAD_REQUEST)?;
    let statements = parse_statements(text, target).ok_or(StatusCode::BAD_REQUEST)?;

    let mut db = state.db.write().await;
    let repository = db.get_mut(&repo).ok_or(StatusCode::NOT_FOUND)?;
    if replace {
        match &filter {
            None => repository.statements.clear(),
            Some(context) => repository.statements.retain(|st| &st.context != context),
        }
    }
    repository.statements.extend(statements);
    Ok(StatusCode::NO_CONTENT)
}

async fn append(
    State(state): State<AppState>,
    Path(repo): Path<String>,
    Query(param): Query<ContextParam>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    store_statements(state, repo, param, headers, body, false).await
}

async fn overwrite(
    State(state): State<AppState>,
    Path(repo): Path<String>,
    Query(param): Query<ContextParam>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    store_statements(state, repo, param, headers, body, true).await
}

async fn clear(
    State(state): State<AppState>,
    Path(repo): Path<String>,
    Query(param): Query<ContextParam>,
) -> Result<StatusCode, StatusCode> {
    let mut db = state.db.write().await;
    let repository = db.get_mut(&repo).ok_or(StatusCode::NOT_FOUND)?;
    match context_filter(param.context.as_deref()) {
        None => repository.statements.clear(),
        Some(context) => repository.statements.retain(|st| st.context != context),
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn get_namespace(
    State(state): State<AppState>,
    Path((repo, prefix)): Path<(String, String)>,
) -> Result<Response, StatusCode> {
    let db = state.db.read().await;
    let repository = db.get(&repo).ok_or(StatusCode::NOT_FOUND)?;
    let namespace = repository.namespaces.get(&prefix).ok_or(StatusCode::NOT_FOUND)?;
    Ok(([(header::CONTENT_TYPE, "text/plain")], namespace.clone()).into_response())
}

async fn set_namespace(
    State(state): State<AppState>,
    Path((repo, prefix)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    if !input_format_ok(&headers, &["text/plain"]) {
        return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
    let namespace = String::from_utf8(body.to_vec()).map_err(|_| StatusCode::BAD_REQUEST)?;
    if namespace.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut db = state.db.write().await;
    let repository = db.get_mut(&repo).ok_or(StatusCode::NOT_FOUND)?;
    repository.namespaces.insert(prefix, namespace);
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_namespace(
    State(state): State<AppState>,
    Path((repo, prefix)): Path<(String, String)>,
) -> Result<StatusCode, StatusCode> {
    let mut db = state.db.write().await;
    let repository = db.get_mut(&repo).ok_or(StatusCode::NOT_FOUND)?;
    repository.namespaces.remove(&prefix);
    Ok(StatusCode::NO_CONTENT)
}

async fn contexts(
    State(state): State<AppState>,
    Path(repo): Path<String>,
) -> Result<Response, StatusCode> {
    let db = state.db.read().await;
    let repository = db.get(&repo).ok_or(StatusCode::NOT_FOUND)?;
    let named: BTreeSet<&String> = repository
        .statements
        .iter()
        .filter_map(|st| st.context.as_ref())
        .collect();
    let rows: Vec<_> = named
        .into_iter()
        .map(|context| vec![("contextID", format!("<uri>{}</uri>", escape(context.as_str())))])
        .collect();
    Ok(results_xml(&["contextID"], &rows))
}

async fn size(
    State(state): State<AppState>,
    Path(repo): Path<String>,
    Query(param): Query<ContextParam>,
) -> Result<Response, StatusCode> {
    let db = state.db.read().await;
    let repository = db.get(&repo).ok_or(StatusCode::NOT_FOUND)?;
    let count = match context_filter(param.context.as_deref()) {
        None => repository.statements.len(),
        Some(context) => repository
            .statements
            .iter()
            .filter(|st| st.context == context)
            .count(),
    };
    Ok(([(header::CONTENT_TYPE, "text/plain")], count.to_string()).into_response())
}
