use abfs_azure_dfs::{AppendOutcome, ContainerStatus, CreateBlobOutcome};
use abfs_core::ErrorKind;
use bytes::Bytes;
use http::Method;
use pretty_assertions::assert_eq;
use test_case::test_case;

use crate::mock::{gateway, ScriptedHttpSend};

#[test_case(200, Some(ContainerStatus::Exists) ; "ok")]
#[test_case(404, Some(ContainerStatus::NotFound) ; "not found")]
#[test_case(403, None ; "forbidden")]
#[test_case(500, None ; "server error")]
#[tokio::test]
async fn test_container_exists(status: u16, expected: Option<ContainerStatus>) {
    let http = ScriptedHttpSend::new();
    http.reply(status);

    let result = gateway(&http).container_exists().await;
    match expected {
        Some(v) => assert_eq!(result.unwrap(), v),
        None => assert_eq!(result.unwrap_err().kind(), ErrorKind::Unexpected),
    }

    let req = &http.requests()[0];
    assert_eq!(req.line(), "HEAD /logs?resource=filesystem");
    assert_eq!(req.header("x-ms-version"), "2018-11-09");
    assert!(req.header("authorization").starts_with("SharedKey account:"));
}

#[tokio::test]
async fn test_create_container() {
    let http = ScriptedHttpSend::new();
    http.reply(201).reply_with(409, &[], "ContainerAlreadyExists");

    let gateway = gateway(&http);
    gateway.create_container().await.unwrap();

    let err = gateway.create_container().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unexpected);
    assert!(err.to_string().contains("409"));
    assert!(err.to_string().contains("ContainerAlreadyExists"));

    assert_eq!(http.lines()[0], "PUT /logs?resource=filesystem");
}

#[test_case(201, Some(CreateBlobOutcome::Created) ; "created")]
#[test_case(409, Some(CreateBlobOutcome::AlreadyExists) ; "already exists")]
#[test_case(404, None ; "missing container")]
#[tokio::test]
async fn test_create_blob(status: u16, expected: Option<CreateBlobOutcome>) {
    let http = ScriptedHttpSend::new();
    http.reply(status);

    let result = gateway(&http).create_blob("/app/a.log").await;
    match expected {
        Some(v) => assert_eq!(result.unwrap(), v),
        None => assert_eq!(result.unwrap_err().kind(), ErrorKind::Unexpected),
    }

    let req = &http.requests()[0];
    assert_eq!(req.method, Method::PUT);
    assert_eq!(req.query, "resource=file&recursive=false");
    assert_eq!(req.header("content-type"), "text/plain");
    assert!(req.body.is_empty());
}

#[test_case(202, Some(AppendOutcome::Appended) ; "accepted")]
#[test_case(409, Some(AppendOutcome::Conflict) ; "conflict")]
#[test_case(404, Some(AppendOutcome::NotFound) ; "not found")]
#[test_case(400, None ; "bad request")]
#[test_case(503, None ; "unavailable")]
#[tokio::test]
async fn test_append_block(status: u16, expected: Option<AppendOutcome>) {
    let http = ScriptedHttpSend::new();
    http.reply(status);

    let result = gateway(&http)
        .append_block("/app/a.log", Bytes::from_static(b"0123456789"), 42)
        .await;
    match expected {
        Some(v) => assert_eq!(result.unwrap(), v),
        None => assert_eq!(result.unwrap_err().kind(), ErrorKind::Unexpected),
    }

    let req = &http.requests()[0];
    assert_eq!(req.line(), "PATCH /logs/app/a.log?action=append&position=42");
    assert_eq!(req.header("content-length"), "10");
    assert_eq!(req.body, Bytes::from_static(b"0123456789"));
}

#[tokio::test]
async fn test_flush() {
    let http = ScriptedHttpSend::new();
    http.reply(200).reply(409);

    let gateway = gateway(&http);
    gateway.flush("/app/a.log", 4096).await.unwrap();
    let err = gateway.flush("/app/a.log", 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unexpected);

    let requests = http.requests();
    assert_eq!(
        requests[0].line(),
        "PATCH /logs/app/a.log?action=flush&position=4096"
    );
    assert_eq!(requests[0].header("content-length"), "0");
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_get_blob_size() {
    let http = ScriptedHttpSend::new();
    http.reply_with(200, &[("content-length", "4194304")], "")
        .reply(404)
        .reply(200)
        .reply_with(200, &[("content-length", "lots")], "")
        .reply(500);

    let gateway = gateway(&http);
    assert_eq!(gateway.get_blob_size("/app/a.log").await.unwrap(), 4194304);
    assert_eq!(gateway.get_blob_size("/app/a.log").await.unwrap(), 0);

    let err = gateway.get_blob_size("/app/a.log").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unexpected);
    let err = gateway.get_blob_size("/app/a.log").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unexpected);
    let err = gateway.get_blob_size("/app/a.log").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unexpected);

    assert_eq!(http.lines()[0], "HEAD /logs/app/a.log");
}

#[tokio::test]
async fn test_path_is_percent_encoded() {
    let http = ScriptedHttpSend::new();
    http.reply(202);

    gateway(&http)
        .append_block("/app/my log#1.log", Bytes::from_static(b"x"), 0)
        .await
        .unwrap();

    assert_eq!(http.requests()[0].path, "/logs/app/my%20log%231.log");
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let http = ScriptedHttpSend::new();
    http.time_out();

    let err = gateway(&http)
        .append_block("/app/a.log", Bytes::from_static(b"x"), 0)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}
