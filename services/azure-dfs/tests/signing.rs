use abfs_azure_dfs::provide_credential::{AzureCliCredentialProvider, StaticCredentialProvider};
use abfs_azure_dfs::{RequestSigner, StorageGateway};
use abfs_core::{Context, Signer};
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

use crate::mock::{context, reference_signature, ScriptedCommand, ScriptedHttpSend, ACCOUNT_KEY};

const DATE: &str = "Tue, 01 Mar 2022 08:12:34 GMT";

fn fixed_time_gateway(ctx: Context) -> StorageGateway {
    let time = Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap();
    let signer = Signer::new(
        ctx,
        StaticCredentialProvider::new("account", ACCOUNT_KEY),
        RequestSigner::new().with_time(time),
    );
    StorageGateway::new(signer, "account.dfs.core.windows.net", "logs")
}

#[tokio::test]
async fn test_shared_key_append_signature() {
    let http = ScriptedHttpSend::new();
    http.reply(202);

    fixed_time_gateway(context(&http))
        .append_block("/app/x.log", Bytes::from_static(b"hello"), 1024)
        .await
        .unwrap();

    let req = &http.requests()[0];
    assert_eq!(req.header("x-ms-date"), DATE);
    assert_eq!(req.header("x-ms-version"), "2018-11-09");

    let string_to_sign = format!(
        "PATCH\n\n\n5\n\n\n\n\n\n\n\n\n\
         x-ms-date:{DATE}\n\
         x-ms-version:2018-11-09\n\
         /account/logs/app/x.log\naction:append\nposition:1024"
    );
    assert_eq!(
        req.header("authorization"),
        format!(
            "SharedKey account:{}",
            reference_signature(ACCOUNT_KEY, &string_to_sign)
        )
    );
}

#[tokio::test]
async fn test_shared_key_create_signature_covers_content_type() {
    let http = ScriptedHttpSend::new();
    http.reply(201);

    fixed_time_gateway(context(&http))
        .create_blob("/app/x.log")
        .await
        .unwrap();

    let string_to_sign = format!(
        "PUT\n\n\n\n\ntext/plain\n\n\n\n\n\n\n\
         x-ms-date:{DATE}\n\
         x-ms-version:2018-11-09\n\
         /account/logs/app/x.log\nresource:file\nrecursive:false"
    );
    assert_eq!(
        http.requests()[0].header("authorization"),
        format!(
            "SharedKey account:{}",
            reference_signature(ACCOUNT_KEY, &string_to_sign)
        )
    );
}

#[tokio::test]
async fn test_signature_is_deterministic() {
    let http = ScriptedHttpSend::new();
    http.reply(202).reply(202);

    let gateway = fixed_time_gateway(context(&http));
    for _ in 0..2 {
        gateway
            .append_block("/app/x.log", Bytes::from_static(b"abc"), 0)
            .await
            .unwrap();
    }

    let requests = http.requests();
    assert_eq!(
        requests[0].header("authorization"),
        requests[1].header("authorization")
    );
}

#[tokio::test]
async fn test_signature_depends_on_position() {
    let http = ScriptedHttpSend::new();
    http.reply(202).reply(202);

    let gateway = fixed_time_gateway(context(&http));
    for position in [0, 3] {
        gateway
            .append_block("/app/x.log", Bytes::from_static(b"abc"), position)
            .await
            .unwrap();
    }

    let requests = http.requests();
    assert_ne!(
        requests[0].header("authorization"),
        requests[1].header("authorization")
    );
}

#[tokio::test]
async fn test_bearer_token_authorization() {
    let http = ScriptedHttpSend::new();
    http.reply(200);
    let cmd = ScriptedCommand::new(0, "eyJ0eXAi.token\n", "");

    let signer = Signer::new(
        context(&http).with_command_execute(cmd.clone()),
        AzureCliCredentialProvider::new("https://storage.azure.com/"),
        RequestSigner::new(),
    );
    StorageGateway::new(signer, "account.dfs.core.windows.net", "logs")
        .container_exists()
        .await
        .unwrap();

    let req = &http.requests()[0];
    assert_eq!(req.header("authorization"), "Bearer eyJ0eXAi.token");
    assert!(!req.header("x-ms-date").is_empty());
    // The token is acquired lazily on first use.
    assert_eq!(cmd.calls().len(), 1);
}
