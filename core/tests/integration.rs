//! Full repository lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every operation of
//! a `Connection<UreqTransport>` over real HTTP. Validates that request
//! building, status contracts and result decoding agree with the server.
#![cfg(feature = "ureq")]

use std::io::{BufRead, BufReader, Write};

use mock_server::MockConfig;
use sesame_core::{
    BindingKind, Connection, Context, Credentials, EndpointConfig, InputFormat, Operation, QueryLanguage,
    QueryOptions, ResultFormat, SesameClient, SesameError, Transport, UreqTransport,
};

/// Spawns the mock server and returns its base address.
fn start_server(config: MockConfig) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, config).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

#[test]
fn repository_lifecycle() {
    let base = start_server(MockConfig::default());
    let config = EndpointConfig::new(&base).unwrap().with_repository("test");
    let conn = Connection::new(config, UreqTransport::new());

    // Step 1: the repository is listed.
    let repos = conn.list_repositories().unwrap();
    let ids: Vec<_> = repos.column("id").map(|v| v.lexical_value().to_string()).collect();
    assert_eq!(ids, vec!["test"]);

    // Step 2: empty repository.
    assert_eq!(conn.size(&Context::Default).unwrap(), 0);

    // Step 3: append to the default graph and to a named graph.
    conn.append(
        "<http://example.org/alice> <http://xmlns.com/foaf/0.1/name> \"Alice\"@en .\n",
        &Context::parse("null"),
        InputFormat::NTriples,
    )
    .unwrap();
    conn.append(
        "<http://example.org/bob> <http://xmlns.com/foaf/0.1/knows> _:carol .\n\
         <http://example.org/bob> <http://xmlns.com/foaf/0.1/age> \"42\"^^<http://www.w3.org/2001/XMLSchema#integer> .\n",
        &Context::parse("http://example.org/g1"),
        InputFormat::NTriples,
    )
    .unwrap();

    // Step 4: sizes per context.
    assert_eq!(conn.size(&Context::parse("null")).unwrap(), 1);
    assert_eq!(conn.size(&Context::parse("http://example.org/g1")).unwrap(), 2);
    assert_eq!(conn.size(&Context::parse("<http://example.org/g1>")).unwrap(), 2);

    // Step 5: query decodes every term kind in server order.
    let results = conn
        .query("SELECT ?s ?p ?o WHERE { ?s ?p ?o }", &QueryOptions::default())
        .unwrap();
    assert_eq!(results.variables(), ["s", "p", "o"].map(String::from));
    assert_eq!(results.len(), 3);
    let first = results.get(0).unwrap();
    assert_eq!(first.get("s").unwrap().lexical_value(), "http://example.org/alice");
    assert_eq!(first.get("o").unwrap().language(), Some("en"));
    assert_eq!(results.get(1).unwrap().get("o").unwrap().kind(), BindingKind::BlankNode);
    assert_eq!(
        results.get(2).unwrap().get("o").unwrap().datatype(),
        Some("http://www.w3.org/2001/XMLSchema#integer")
    );

    let serql = QueryOptions::default().language(QueryLanguage::Serql).infer(false);
    assert_eq!(conn.query("SELECT * FROM {S} P {O}", &serql).unwrap().len(), 3);

    // Step 6: contexts lists the named graph only.
    let contexts = conn.list_contexts(ResultFormat::SparqlXml).unwrap();
    let ids: Vec<_> = contexts.column("contextID").map(|v| v.lexical_value()).collect();
    assert_eq!(ids, vec!["http://example.org/g1"]);

    // Step 7: overwrite the named graph.
    conn.overwrite(
        "<http://example.org/dave> <http://xmlns.com/foaf/0.1/name> \"Dave\" .\n",
        &Context::parse("http://example.org/g1"),
        InputFormat::Turtle,
    )
    .unwrap();
    assert_eq!(conn.size(&Context::parse("http://example.org/g1")).unwrap(), 1);

    // Step 8: namespaces.
    conn.set_namespace("foaf", "http://xmlns.com/foaf/0.1/").unwrap();
    assert_eq!(conn.get_namespace("foaf").unwrap(), "http://xmlns.com/foaf/0.1/");
    conn.delete_namespace("foaf").unwrap();
    let err = conn.get_namespace("foaf").unwrap_err();
    assert!(matches!(
        err,
        SesameError::Protocol { operation: Operation::GetNamespace, status: 404, .. }
    ));

    // Step 9: clear.
    conn.clear().unwrap();
    assert_eq!(conn.size(&Context::Default).unwrap(), 0);
    assert!(conn.query("SELECT * WHERE { ?s ?p ?o }", &QueryOptions::default()).unwrap().is_empty());
}

#[test]
fn server_rejections_become_protocol_errors() {
    let base = start_server(MockConfig::default());
    let config = EndpointConfig::new(&base).unwrap().with_repository("missing");
    let conn = Connection::new(config, UreqTransport::new());

    let err = conn.clear().unwrap_err();
    assert!(matches!(err, SesameError::Protocol { operation: Operation::Clear, status: 404, .. }));

    let err = conn.query("ASK {}", &QueryOptions::default()).unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[test]
fn credentials_are_sent() {
    let base = start_server(MockConfig {
        credentials: Some(("admin".to_string(), "secret".to_string())),
        ..MockConfig::default()
    });
    let config = EndpointConfig::new(&base).unwrap().with_repository("test");

    let anonymous = Connection::new(config.clone(), UreqTransport::new());
    assert_eq!(anonymous.size(&Context::Default).unwrap_err().status(), Some(401));

    let authorized = Connection::new(
        config.with_credentials(Credentials::new("admin", "secret")),
        UreqTransport::new(),
    );
    assert_eq!(authorized.size(&Context::Default).unwrap(), 0);
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = EndpointConfig::new(&format!("http://{addr}")).unwrap();
    let conn = Connection::new(config, UreqTransport::new());
    assert!(matches!(conn.list_repositories(), Err(SesameError::Transport(_))));
}

/// Answers a single request with `200 OK` and `body`, then closes.
fn serve_once(body: Vec<u8>) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap() > 2 {
            line.clear();
        }
        let head = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        );
        // The client may hang up early when it enforces a limit.
        let _ = stream.write_all(head.as_bytes()).and_then(|()| stream.write_all(&body));
    });

    format!("http://{addr}")
}

#[test]
fn large_bodies_are_read_in_full() {
    let body = vec![b'x'; 11 * 1024 * 1024];
    let base = serve_once(body.clone());
    let request = SesameClient::new(EndpointConfig::new(&base).unwrap()).build_list_repositories();

    let response = UreqTransport::new().execute(&request).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body.len(), body.len());
}

#[test]
fn body_limit_is_opt_in() {
    let base = serve_once(b"0123456789".to_vec());
    let request = SesameClient::new(EndpointConfig::new(&base).unwrap()).build_list_repositories();

    let err = UreqTransport::new().with_body_limit(4).execute(&request).unwrap_err();
    assert!(matches!(err, SesameError::Transport(_)));
}
